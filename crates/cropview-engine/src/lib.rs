//! Cropview engine crate.
//!
//! Pans, zooms and rotates an image behind a fixed crop window while keeping
//! the window fully covered, and renders the result through a GPU renderer.
//!
//! - [`transform::TransformEngine`] owns the viewport-to-texture transform
//! - [`editor::CropEditor`] / [`editor::CropHandle`] split it across a render
//!   thread and any number of control threads
//! - [`render::WgpuRenderer`] draws offscreen and supports pixel readback

pub mod bitmap;
pub mod buffers;
pub mod config;
pub mod coords;
pub mod device;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod queue;
pub mod readback;
pub mod render;
pub mod transform;
