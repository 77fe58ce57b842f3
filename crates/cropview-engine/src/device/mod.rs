//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - exposing them to the offscreen renderer

mod gpu;

pub use gpu::{GpuInit, HeadlessGpu};
