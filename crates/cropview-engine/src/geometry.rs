//! Viewport geometry: output/image sizes, the clamp circle, and the base
//! cover-fit scale derived from them.

use crate::coords::{Affine2, Vec2, Viewport};

/// Pixel insets that shrink the clamp circle and move its anchor away from
/// the center of the output surface.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct OffsetLimits {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    /// Output size the insets were measured against.
    pub output_width: f32,
    pub output_height: f32,
}

impl OffsetLimits {
    /// Normalized anchor at the center of the inset region.
    pub fn anchor(&self) -> Vec2 {
        Vec2::new(
            0.5 + 0.5 * (self.left - self.right) / self.output_width,
            0.5 + 0.5 * (self.top - self.bottom) / self.output_height,
        )
    }

    /// Clamp radius in pixels: half the horizontal extent left between the insets.
    pub fn radius(&self) -> f32 {
        (self.output_width - self.left - self.right) / 2.0
    }
}

/// Computes the cover-fit base scale so the image always fills a circle of
/// `radius` pixels inscribed in the output rectangle.
///
/// The larger image dimension constrains: for landscape images the vertical
/// axis is fitted to the circle diameter and the horizontal one follows from
/// the aspect ratios. Degenerate sizes produce a unit scale instead of NaN.
pub fn compute_base_scale(
    image_width: f32,
    image_height: f32,
    output_width: f32,
    output_height: f32,
    radius: f32,
) -> Vec2 {
    let dims = [image_width, image_height, output_width, output_height, radius];
    if dims.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return Vec2::new(1.0, 1.0);
    }

    let width_ratio = image_width / output_width;
    let height_ratio = image_height / output_height;

    if image_width >= image_height {
        let scale_y = output_height / (radius * 2.0);
        Vec2::new(scale_y * height_ratio / width_ratio, scale_y)
    } else {
        let scale_x = output_width / (radius * 2.0);
        Vec2::new(scale_x, scale_x * width_ratio / height_ratio)
    }
}

/// Output/image sizes, clamp circle and anchor.
#[derive(Debug, Clone)]
pub struct ViewportGeometry {
    output: Viewport,
    image: Viewport,
    radius_override: Option<f32>,
    anchor: Vec2,
    base_scale: Vec2,
}

impl ViewportGeometry {
    pub fn new(anchor: Vec2) -> Self {
        Self {
            output: Viewport::default(),
            image: Viewport::default(),
            radius_override: None,
            anchor,
            base_scale: Vec2::new(1.0, 1.0),
        }
    }

    #[inline]
    pub fn output(&self) -> Viewport {
        self.output
    }

    #[inline]
    pub fn image(&self) -> Viewport {
        self.image
    }

    #[inline]
    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    #[inline]
    pub fn base_scale(&self) -> Vec2 {
        self.base_scale
    }

    /// Clamp radius in pixels.
    ///
    /// Derived from the output size unless offset limits set it explicitly.
    pub fn radius(&self) -> f32 {
        self.radius_override
            .unwrap_or_else(|| self.output.inscribed_radius())
    }

    pub fn set_output_size(&mut self, width: f32, height: f32) {
        self.output = Viewport::new(width, height);
    }

    pub fn set_image_size(&mut self, width: f32, height: f32) {
        self.image = Viewport::new(width, height);
    }

    pub fn set_offset_limits(&mut self, limits: OffsetLimits) {
        self.anchor = limits.anchor();
        self.radius_override = Some(limits.radius());
    }

    /// Half-extent of the clamp circle's bounding square in normalized
    /// output units.
    pub fn radius_extent(&self) -> Vec2 {
        if !self.output.is_valid() {
            return Vec2::zero();
        }
        let r = self.radius();
        Vec2::new(r / self.output.width, r / self.output.height)
    }

    /// Corners of the clamp circle's bounding square around the anchor, in
    /// `[top-left, top-right, bottom-left, bottom-right]` order.
    pub fn circle_square(&self) -> [Vec2; 4] {
        let e = self.radius_extent();
        let a = self.anchor;
        [
            Vec2::new(a.x - e.x, a.y - e.y),
            Vec2::new(a.x + e.x, a.y - e.y),
            Vec2::new(a.x - e.x, a.y + e.y),
            Vec2::new(a.x + e.x, a.y + e.y),
        ]
    }

    /// Recomputes the base scale and returns the seed transform for it.
    pub fn reseed(&mut self) -> Affine2 {
        self.base_scale = compute_base_scale(
            self.image.width,
            self.image.height,
            self.output.width,
            self.output.height,
            self.radius(),
        );
        Affine2::scale(self.base_scale.x, self.base_scale.y, 0.5, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── base scale ────────────────────────────────────────────────────────

    #[test]
    fn landscape_image_fits_height() {
        let s = compute_base_scale(1000.0, 500.0, 500.0, 500.0, 250.0);
        assert_eq!(s, Vec2::new(0.5, 1.0));
    }

    #[test]
    fn portrait_image_fits_width() {
        let s = compute_base_scale(500.0, 1000.0, 500.0, 500.0, 250.0);
        assert_eq!(s, Vec2::new(1.0, 0.5));
    }

    #[test]
    fn smaller_radius_scales_up_sampling_window() {
        // A 125 px circle in a 500 px output only needs half the image height.
        let s = compute_base_scale(800.0, 800.0, 500.0, 500.0, 125.0);
        assert_eq!(s, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn degenerate_sizes_yield_unit_scale() {
        assert_eq!(compute_base_scale(0.0, 0.0, 500.0, 500.0, 250.0), Vec2::new(1.0, 1.0));
        assert_eq!(compute_base_scale(100.0, 50.0, 0.0, 0.0, 0.0), Vec2::new(1.0, 1.0));
    }

    // ── radius / anchor ───────────────────────────────────────────────────

    #[test]
    fn radius_defaults_to_inscribed_circle() {
        let mut g = ViewportGeometry::new(Vec2::new(0.5, 0.5));
        g.set_output_size(400.0, 600.0);
        assert_eq!(g.radius(), 200.0);
    }

    #[test]
    fn offset_limits_move_anchor_and_radius() {
        let mut g = ViewportGeometry::new(Vec2::new(0.5, 0.5));
        g.set_output_size(500.0, 800.0);
        g.set_offset_limits(OffsetLimits {
            left: 50.0,
            right: 50.0,
            top: 100.0,
            bottom: 300.0,
            output_width: 500.0,
            output_height: 800.0,
        });
        assert_eq!(g.radius(), 200.0);
        assert_eq!(g.anchor(), Vec2::new(0.5, 0.375));
    }

    #[test]
    fn circle_square_surrounds_anchor() {
        let mut g = ViewportGeometry::new(Vec2::new(0.5, 0.5));
        g.set_output_size(500.0, 500.0);
        let [tl, tr, bl, br] = g.circle_square();
        assert_eq!(tl, Vec2::new(0.0, 0.0));
        assert_eq!(tr, Vec2::new(1.0, 0.0));
        assert_eq!(bl, Vec2::new(0.0, 1.0));
        assert_eq!(br, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn reseed_scales_about_center() {
        let mut g = ViewportGeometry::new(Vec2::new(0.5, 0.5));
        g.set_output_size(500.0, 500.0);
        g.set_image_size(1000.0, 500.0);
        let t = g.reseed();
        assert_eq!(g.base_scale(), Vec2::new(0.5, 1.0));
        assert_eq!(t.map_point(Vec2::new(0.5, 0.5)), Vec2::new(0.5, 0.5));
        assert_eq!(t.map_point(Vec2::new(0.0, 0.0)), Vec2::new(0.25, 0.0));
    }
}
