//! Coordinate and geometry types shared by the transform engine and renderers.
//!
//! Two spaces are in play:
//! - output pixels: origin top-left, +X right, +Y down (gesture deltas, radius, insets)
//! - normalized texture space: `[0, 1] x [0, 1]` over the image, same orientation
//!
//! `Affine2` maps points of the viewport reference quad into texture space.

mod affine;
mod color;
mod vec2;
mod viewport;

pub use affine::Affine2;
pub use color::ColorRgba;
pub use vec2::Vec2;
pub use viewport::Viewport;
