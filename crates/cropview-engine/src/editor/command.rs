use crossbeam_channel::Sender;
use image::RgbaImage;

use crate::coords::ColorRgba;
use crate::error::{RenderError, TransformError};
use crate::geometry::OffsetLimits;
use crate::readback::{CaptureRegion, PixelFrame};
use crate::render::TextureHandle;
use crate::transform::{CropCorners, Rotation};

pub(crate) type Reply<T> = Sender<T>;

/// Mutation requested by the control context, applied at the start of the
/// next frame on the render context.
pub(crate) enum EditCommand {
    SetScale(f32),
    Pan { dx: f32, dy: f32 },
    SetRotationAngle(f32),
    SetRotation(Rotation),
    RotateStep { clockwise: bool },
    SetCrop {
        corners: CropCorners,
        reply: Option<Reply<Result<(), TransformError>>>,
    },
    SetOffsetLimits(OffsetLimits),
    SetImage {
        image: RgbaImage,
        reply: Option<Reply<Result<(), RenderError>>>,
    },
    DeleteImage,
    SetBackground(ColorRgba),
    /// Overrides the measured output size; `None` goes back to it.
    ForceOutputSize(Option<(u32, u32)>),
    RequestCapture {
        region: CaptureRegion,
        reply: Reply<Result<PixelFrame, RenderError>>,
    },
}

impl EditCommand {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            EditCommand::SetScale(_) => "set_scale",
            EditCommand::Pan { .. } => "pan",
            EditCommand::SetRotationAngle(_) => "set_rotation_angle",
            EditCommand::SetRotation(_) => "set_rotation",
            EditCommand::RotateStep { .. } => "rotate_step",
            EditCommand::SetCrop { .. } => "set_crop",
            EditCommand::SetOffsetLimits(_) => "set_offset_limits",
            EditCommand::SetImage { .. } => "set_image",
            EditCommand::DeleteImage => "delete_image",
            EditCommand::SetBackground(_) => "set_background",
            EditCommand::ForceOutputSize(_) => "force_output_size",
            EditCommand::RequestCapture { .. } => "request_capture",
        }
    }
}

/// Work that must wait until the current frame has been drawn.
pub(crate) enum PostDrawAction {
    /// Previous texture; safe to drop once its replacement is on screen.
    ReleaseTexture(TextureHandle),
    /// Resolves with the outcome of the draw that followed the request.
    Notify(Reply<Result<(), RenderError>>),
    Capture {
        region: CaptureRegion,
        reply: Reply<Result<PixelFrame, RenderError>>,
    },
}
