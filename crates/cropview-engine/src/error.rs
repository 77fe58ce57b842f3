//! Error types surfaced by the engine.
//!
//! Out-of-range scale gestures are not errors; they are reported through
//! [`crate::transform::ScaleOutcome`] and leave the transform untouched.

use std::time::Duration;

/// Failures of the affine math.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// The matrix (or the point basis used to solve a crop) is singular.
    #[error("transform is not invertible (determinant {determinant})")]
    NonInvertible { determinant: f32 },
}

/// Failures of the rendering collaborator (GPU resources, readback).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("no output surface has been configured")]
    NoOutput,

    #[error("unknown texture handle {0}")]
    UnknownTexture(u32),

    #[error("texture upload failed: {0}")]
    TextureUpload(String),

    #[error("framebuffer readback failed: {0}")]
    Readback(String),

    #[error(
        "capture region {x},{y} {width}x{height} lies outside the {output_width}x{output_height} framebuffer"
    )]
    InvalidRegion {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        output_width: u32,
        output_height: u32,
    },

    #[error("gpu device error: {0}")]
    Device(String),
}

/// Errors returned to the control context.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    /// The operation cannot run in the current state (wrong thread, no frame yet).
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The render context did not answer in time.
    #[error("render context did not respond within {0:?}")]
    Timeout(Duration),

    /// The render context went away while a reply was pending.
    #[error("render context disconnected")]
    Disconnected,

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
