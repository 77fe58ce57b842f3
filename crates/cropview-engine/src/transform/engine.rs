use crate::buffers::FrameBufferCache;
use crate::config::EngineConfig;
use crate::coords::{Affine2, Vec2, Viewport};
use crate::error::TransformError;
use crate::geometry::{OffsetLimits, ViewportGeometry};

use super::rotation::{split_angle, Rotation};

/// Distance (normalized units) past which a bottom-right corner is reported
/// as inconsistent with the other three.
const CORNER_SKEW_TOLERANCE: f32 = 1e-3;

/// Human-meaningful decomposition of the current transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CropState {
    /// Zoom relative to the base cover-fit scale; `1.0` shows the widest crop.
    pub scale_ratio: f32,
    pub rotation: Rotation,
    /// Residual angle in degrees on top of `rotation`.
    pub fine_angle: f32,
    /// Anchor mapped into texture space.
    pub center: Vec2,
}

impl CropState {
    fn reset(center: Vec2) -> Self {
        Self {
            scale_ratio: 1.0,
            rotation: Rotation::Normal,
            fine_angle: 0.0,
            center,
        }
    }

    /// Quadrant plus fine angle, in degrees.
    #[inline]
    pub fn total_rotation(&self) -> f32 {
        self.rotation.as_angle() + self.fine_angle
    }
}

/// The clamp circle's bounding square expressed in texture coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CropCorners {
    pub top_left: Vec2,
    pub top_right: Vec2,
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
}

impl CropCorners {
    pub const fn new(top_left: Vec2, top_right: Vec2, bottom_left: Vec2, bottom_right: Vec2) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    fn from_array(c: [Vec2; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    pub fn to_array(self) -> [Vec2; 4] {
        [self.top_left, self.top_right, self.bottom_left, self.bottom_right]
    }
}

/// Result of a scale gesture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScaleOutcome {
    Applied,
    /// The resulting ratio would leave the configured bounds; nothing changed.
    Rejected,
}

/// Owns the viewport-to-texture transform and keeps it consistent with
/// gestures and the boundary clamp.
///
/// Every mutator finishes with [`TransformEngine::clamp_to_bounds`], so the
/// coordinate buffers always reflect the latest transform.
#[derive(Debug, Clone)]
pub struct TransformEngine {
    config: EngineConfig,
    geometry: ViewportGeometry,
    transform: Affine2,
    crop: CropState,
    buffers: FrameBufferCache,
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl TransformEngine {
    pub fn new(config: EngineConfig) -> Self {
        let geometry = ViewportGeometry::new(config.default_anchor);
        let buffers = FrameBufferCache::new(config.reference_tex_coords);
        let mut engine = Self {
            crop: CropState::reset(geometry.anchor()),
            transform: Affine2::IDENTITY,
            geometry,
            buffers,
            config,
        };
        engine.reseed();
        engine
    }

    // ── sizes ─────────────────────────────────────────────────────────────

    /// Applies a new output surface size and reseeds the transform.
    pub fn set_output_size(&mut self, width: u32, height: u32) {
        self.geometry.set_output_size(width as f32, height as f32);
        self.reseed();
    }

    /// Applies a newly loaded image's pixel size and reseeds the transform.
    pub fn set_image_size(&mut self, width: u32, height: u32) {
        self.geometry.set_image_size(width as f32, height as f32);
        self.reseed();
    }

    /// Redefines the anchor and clamp radius from pixel insets.
    ///
    /// The base scale picks the new radius up on the next reseed.
    pub fn set_offset_limits(&mut self, limits: OffsetLimits) {
        if !(limits.output_width > 0.0 && limits.output_height > 0.0) {
            log::warn!("ignoring offset limits measured against an empty output: {limits:?}");
            return;
        }
        self.geometry.set_offset_limits(limits);
        self.clamp_to_bounds();
    }

    fn reseed(&mut self) {
        self.transform = self.geometry.reseed();
        self.crop = CropState::reset(self.geometry.anchor());
        log::debug!(
            "transform reseeded: base scale {:?}, radius {}",
            self.geometry.base_scale(),
            self.geometry.radius()
        );
        self.clamp_to_bounds();
    }

    // ── gestures ──────────────────────────────────────────────────────────

    /// Zooms by `factor` about the current center (`factor > 1` zooms in).
    pub fn set_scale(&mut self, factor: f32) -> ScaleOutcome {
        if !factor.is_finite() || factor <= 0.0 {
            return ScaleOutcome::Rejected;
        }
        let ratio = self.crop.scale_ratio / factor;
        if !(self.config.min_scale_ratio..=self.config.max_scale_ratio).contains(&ratio) {
            log::trace!("scale factor {factor} rejected (ratio would be {ratio})");
            return ScaleOutcome::Rejected;
        }

        let c = self.crop.center;
        self.transform.post_scale(1.0 / factor, 1.0 / factor, c.x, c.y);
        self.crop.scale_ratio = ratio;
        self.clamp_to_bounds();
        ScaleOutcome::Applied
    }

    /// Pans by a pixel delta measured on the output surface.
    ///
    /// The delta is rotated by the applied rotation so the image follows the
    /// pointer regardless of how it is turned.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let output = self.geometry.output();
        if !output.is_valid() {
            return;
        }
        let ratio = self.crop.scale_ratio;
        let delta = Vec2::new(dx / output.width * ratio, dy / output.height * ratio);
        let delta = Affine2::rotate(self.crop.total_rotation(), 0.0, 0.0).map_vector(delta);

        self.transform.post_translate(delta.x, delta.y);
        self.clamp_to_bounds();
    }

    /// Sets the fine rotation angle in degrees, on top of the quadrant.
    pub fn set_rotation_angle(&mut self, degrees: f32) {
        let step = self.aspect_corrected_rotation(degrees - self.crop.fine_angle);
        self.transform.post_concat(step);
        self.clamp_to_bounds();
        self.crop.fine_angle = degrees;
    }

    /// Turns the image to the given quadrant.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        let step = self.aspect_corrected_rotation(rotation.as_angle() - self.crop.rotation.as_angle());
        self.transform.post_concat(step);
        self.clamp_to_bounds();
        self.crop.rotation = rotation;
    }

    /// Advances to the next quadrant in the given direction.
    pub fn rotate_step(&mut self, clockwise: bool) {
        let next = if clockwise {
            self.crop.rotation.clockwise_next()
        } else {
            self.crop.rotation.counter_clockwise_next()
        };
        self.set_rotation(next);
    }

    /// Rotation about the current center that stays rigid on screen for
    /// non-square images: squash to a square aspect, rotate, stretch back.
    fn aspect_corrected_rotation(&self, degrees: f32) -> Affine2 {
        let image = self.geometry.image();
        let aspect = if image.is_valid() {
            image.height / image.width
        } else {
            1.0
        };
        let c = self.crop.center;
        let mut step = Affine2::scale(1.0, aspect, c.x, c.y);
        step.post_rotate(degrees, c.x, c.y);
        step.post_scale(1.0, 1.0 / aspect, c.x, c.y);
        step
    }

    /// Solves the transform that maps the clamp circle's bounding square onto
    /// `corners`, then recovers rotation and scale from it.
    ///
    /// Only top-left, top-right and bottom-left determine the solution;
    /// a bottom-right corner that does not complete the parallelogram is
    /// logged and otherwise ignored. On error the engine is unchanged.
    pub fn set_crop_from_corners(&mut self, corners: CropCorners) -> Result<(), TransformError> {
        let [tl, tr, bl, br] = self.geometry.circle_square();
        let solved = Affine2::from_point_correspondence(
            [tl, tr, bl],
            [corners.top_left, corners.top_right, corners.bottom_left],
        )?;
        if !solved.is_invertible() {
            return Err(TransformError::NonInvertible {
                determinant: solved.determinant(),
            });
        }

        let skew = solved.map_point(br).distance(corners.bottom_right);
        if skew > CORNER_SKEW_TOLERANCE {
            log::debug!("crop corners are not a parallelogram (bottom-right off by {skew}); approximating");
        }

        let output = self.geometry.output();
        let base = self.geometry.base_scale();
        let p1 = solved.map_point(Vec2::new(0.0, 0.0));
        let p2 = solved.map_point(Vec2::new(1.0, 0.0));
        let dy = (p2.y - p1.y) * output.height / base.y;
        let dx = (p2.x - p1.x) * output.width / base.x;
        let angle = dy.atan2(dx).to_degrees();
        let (rotation, fine_angle) = split_angle(angle);

        self.transform = solved;
        self.crop.rotation = rotation;
        self.crop.fine_angle = fine_angle;
        self.crop.scale_ratio = dx.hypot(dy) / output.width;
        self.clamp_to_bounds();
        Ok(())
    }

    // ── boundary clamp ────────────────────────────────────────────────────

    /// Translates the transform so the anchor stays at least one clamp radius
    /// away from every texture edge, then rebuilds the coordinate buffers.
    ///
    /// Each axis is corrected at most once per call and not re-checked.
    pub fn clamp_to_bounds(&mut self) {
        let anchor = self.geometry.anchor();
        let output = self.geometry.output();
        let ratio = self.crop.scale_ratio;

        if output.is_valid() && ratio > 0.0 {
            let base = self.geometry.base_scale();
            let radius = self.geometry.radius();
            let center = self.transform.map_point(anchor);

            let image_width_px = output.width / base.x / ratio;
            let image_height_px = output.height / base.y / ratio;
            let reach_x = radius / image_width_px;
            let reach_y = radius / image_height_px;

            if center.x < reach_x {
                self.transform.post_translate(reach_x - center.x, 0.0);
            } else if 1.0 - center.x < reach_x {
                self.transform.post_translate(1.0 - center.x - reach_x, 0.0);
            }

            if center.y < reach_y {
                self.transform.post_translate(0.0, reach_y - center.y);
            } else if 1.0 - center.y < reach_y {
                self.transform.post_translate(0.0, 1.0 - center.y - reach_y);
            }
        }

        self.crop.center = self.transform.map_point(anchor);
        self.buffers
            .set_tex_coords(self.transform.map_quad(self.config.reference_tex_coords));
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn crop_top_left(&self) -> Vec2 {
        self.crop_corners().top_left
    }

    pub fn crop_top_right(&self) -> Vec2 {
        self.crop_corners().top_right
    }

    pub fn crop_bottom_left(&self) -> Vec2 {
        self.crop_corners().bottom_left
    }

    pub fn crop_bottom_right(&self) -> Vec2 {
        self.crop_corners().bottom_right
    }

    /// The clamp circle's bounding square mapped into texture space.
    pub fn crop_corners(&self) -> CropCorners {
        CropCorners::from_array(self.transform.map_quad(self.geometry.circle_square()))
    }

    #[inline]
    pub fn crop_state(&self) -> CropState {
        self.crop
    }

    #[inline]
    pub fn scale_ratio(&self) -> f32 {
        self.crop.scale_ratio
    }

    #[inline]
    pub fn rotation(&self) -> Rotation {
        self.crop.rotation
    }

    #[inline]
    pub fn rotation_angle(&self) -> f32 {
        self.crop.fine_angle
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.crop.center
    }

    #[inline]
    pub fn transform(&self) -> Affine2 {
        self.transform
    }

    #[inline]
    pub fn base_scale(&self) -> Vec2 {
        self.geometry.base_scale()
    }

    #[inline]
    pub fn output(&self) -> Viewport {
        self.geometry.output()
    }

    #[inline]
    pub fn geometry(&self) -> &ViewportGeometry {
        &self.geometry
    }

    #[inline]
    pub fn buffers(&self) -> &FrameBufferCache {
        &self.buffers
    }
}
