//! Gesture-driven transform engine.
//!
//! The engine keeps one affine transform from the viewport's reference quad
//! to texture coordinates. Gestures compose onto it; a boundary clamp runs
//! after every change so the clamp circle never shows untextured space.

mod engine;
mod rotation;

pub use engine::{CropCorners, CropState, ScaleOutcome, TransformEngine};
pub use rotation::{split_angle, Rotation};
