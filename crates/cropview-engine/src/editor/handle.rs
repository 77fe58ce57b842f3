use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::coords::ColorRgba;
use crate::error::{EditorError, RenderError, TransformError};
use crate::geometry::OffsetLimits;
use crate::readback::{CaptureRegion, PixelFrame};
use crate::transform::{CropCorners, Rotation};

use super::command::EditCommand;
use super::{CropSnapshot, Pending, Shared};

/// Control-side handle to a [`super::CropEditor`].
///
/// Cheap to clone and safe to use from any thread. Mutators return as soon
/// as the command is queued; they take effect on the next frame.
#[derive(Clone)]
pub struct CropHandle {
    shared: Arc<Shared>,
}

impl CropHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    fn submit(&self, cmd: EditCommand) {
        log::trace!("queued {}", cmd.name());
        self.shared.commands.push(cmd);
        self.shared.request_render();
    }

    // ── gestures ──────────────────────────────────────────────────────────

    /// Zooms by `factor` (`> 1` zooms in). Out-of-range factors are dropped
    /// silently when the command runs.
    pub fn set_scale(&self, factor: f32) {
        self.submit(EditCommand::SetScale(factor));
    }

    /// Pans by a pixel delta on the output surface.
    pub fn pan(&self, dx: f32, dy: f32) {
        self.submit(EditCommand::Pan { dx, dy });
    }

    pub fn set_rotation_angle(&self, degrees: f32) {
        self.submit(EditCommand::SetRotationAngle(degrees));
    }

    pub fn set_rotation(&self, rotation: Rotation) {
        self.submit(EditCommand::SetRotation(rotation));
    }

    pub fn rotate_step(&self, clockwise: bool) {
        self.submit(EditCommand::RotateStep { clockwise });
    }

    /// Fits the crop to four texture-space corners.
    ///
    /// Degenerate corners resolve the reply with
    /// [`TransformError::NonInvertible`] and leave the crop unchanged.
    pub fn set_crop(&self, corners: CropCorners) -> Pending<Result<(), TransformError>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.submit(EditCommand::SetCrop {
            corners,
            reply: Some(tx),
        });
        Pending::new(rx, Arc::clone(&self.shared))
    }

    pub fn set_offset_limits(&self, limits: OffsetLimits) {
        self.submit(EditCommand::SetOffsetLimits(limits));
    }

    // ── image & appearance ────────────────────────────────────────────────

    /// Replaces the displayed image.
    ///
    /// The reply resolves after the first frame showing the new image, or
    /// with the upload error.
    pub fn set_image(&self, image: RgbaImage) -> Pending<Result<(), RenderError>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.submit(EditCommand::SetImage {
            image,
            reply: Some(tx),
        });
        Pending::new(rx, Arc::clone(&self.shared))
    }

    /// [`CropHandle::set_image`] and wait for it to be drawn.
    pub fn set_image_and_wait(&self, image: RgbaImage, timeout: Duration) -> Result<(), EditorError> {
        Ok(self.set_image(image).wait(timeout)??)
    }

    pub fn delete_image(&self) {
        self.submit(EditCommand::DeleteImage);
    }

    pub fn set_background_color(&self, color: ColorRgba) {
        self.submit(EditCommand::SetBackground(color));
    }

    /// Asks the render loop for another frame.
    pub fn request_render(&self) {
        self.shared.request_render();
    }

    // ── capture ───────────────────────────────────────────────────────────

    /// Captures the full output at its current size.
    pub fn capture(&self, timeout: Duration) -> Result<PixelFrame, EditorError> {
        self.capture_region(CaptureRegion::Full, timeout)
    }

    /// [`CropHandle::capture`] with the editor's configured timeout.
    pub fn capture_default(&self) -> Result<PixelFrame, EditorError> {
        self.capture(self.shared.capture_timeout)
    }

    /// Renders one frame at `width x height`, captures it, then returns the
    /// output to its measured size.
    ///
    /// The crop survives both resizes: each one keeps the same texture
    /// region under the crop square, so scale, rotation and pan carry over.
    pub fn capture_sized(
        &self,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<PixelFrame, EditorError> {
        self.check_capture_allowed()?;
        self.submit(EditCommand::ForceOutputSize(Some((width, height))));
        let frame = self.request_capture(CaptureRegion::Full, timeout);
        // Restore even on timeout so a late frame does not stay resized.
        self.submit(EditCommand::ForceOutputSize(None));
        frame
    }

    /// Captures the square `output_w - 2 * padding_left` wide, starting
    /// `padding_top` below the top edge.
    pub fn capture_cropped(
        &self,
        padding_left: u32,
        padding_top: u32,
        timeout: Duration,
    ) -> Result<PixelFrame, EditorError> {
        self.capture_region(
            CaptureRegion::CroppedSquare {
                padding_left,
                padding_top,
            },
            timeout,
        )
    }

    /// Blocks until the next frame has been drawn and `region` read back.
    ///
    /// Fails with [`EditorError::InvalidState`] on the render thread or
    /// before the first frame, and with [`EditorError::Timeout`] when no
    /// frame is drawn within `timeout`.
    pub fn capture_region(
        &self,
        region: CaptureRegion,
        timeout: Duration,
    ) -> Result<PixelFrame, EditorError> {
        self.check_capture_allowed()?;
        self.request_capture(region, timeout)
    }

    fn check_capture_allowed(&self) -> Result<(), EditorError> {
        if self.shared.is_render_thread() {
            return Err(EditorError::InvalidState(
                "capture must not be called from the render thread",
            ));
        }
        if self.shared.frames() == 0 {
            return Err(EditorError::InvalidState(
                "capture requested before the first frame was drawn",
            ));
        }
        Ok(())
    }

    fn request_capture(
        &self,
        region: CaptureRegion,
        timeout: Duration,
    ) -> Result<PixelFrame, EditorError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.submit(EditCommand::RequestCapture { region, reply: tx });
        let frame = Pending::new(rx, Arc::clone(&self.shared)).wait(timeout)??;
        log::debug!("captured {}x{}", frame.width, frame.height);
        Ok(frame)
    }

    // ── queries (last drawn frame) ────────────────────────────────────────

    pub fn snapshot(&self) -> CropSnapshot {
        self.shared.snapshot()
    }

    pub fn crop_corners(&self) -> CropCorners {
        self.snapshot().corners
    }

    pub fn rotation(&self) -> Rotation {
        self.snapshot().state.rotation
    }

    pub fn rotation_angle(&self) -> f32 {
        self.snapshot().state.fine_angle
    }

    pub fn scale_ratio(&self) -> f32 {
        self.snapshot().state.scale_ratio
    }

    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames()
    }
}
