//! Rendering collaborator.
//!
//! The editor never talks to the GPU directly. It hands a [`Renderer`] the
//! current texture and the [`FrameBufferCache`] once per frame, and asks it
//! for pixels when a capture is pending.
//!
//! Convention:
//! - geometry is a constant full-screen quad in NDC
//! - texture coordinates are normalized, top-left origin

mod ctx;
mod quad;
mod wgpu_renderer;

use image::RgbaImage;

use crate::buffers::FrameBufferCache;
use crate::coords::ColorRgba;
use crate::error::RenderError;
use crate::readback::RowOrder;

pub use ctx::{RenderCtx, RenderTarget};
pub use quad::TexturedQuadPipeline;
pub use wgpu_renderer::WgpuRenderer;

/// Opaque handle to a compiled shader program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramHandle(pub u32);

/// Opaque handle to an uploaded texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureHandle(pub u32);

/// Operations the editor needs from a GPU backend.
///
/// Every method is called on the render context only. Implementations own
/// their GPU resources; the editor only holds handles.
pub trait Renderer {
    /// Compiles the quad program. Called once when the surface is created.
    fn init_program(&mut self) -> Result<ProgramHandle, RenderError>;

    fn bind_program(&mut self, program: ProgramHandle) -> Result<(), RenderError>;

    /// The output surface changed size (physical pixels).
    fn on_output_size_changed(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    fn set_clear_color(&mut self, color: ColorRgba);

    fn upload_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, RenderError>;

    /// Releases a texture. Unknown handles are ignored.
    fn release_texture(&mut self, texture: TextureHandle);

    /// Clears to the clear color, then draws `texture` through `buffers` if
    /// one is bound.
    fn draw(
        &mut self,
        texture: Option<TextureHandle>,
        buffers: &FrameBufferCache,
    ) -> Result<(), RenderError>;

    /// Reads a rectangle of the last drawn frame as packed RGBA8, rows in
    /// [`Renderer::row_order`] order.
    fn read_pixels(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<u32>, RenderError>;

    fn row_order(&self) -> RowOrder;

    /// Drops every GPU resource. The renderer is unusable afterwards until
    /// `init_program` runs again.
    fn destroy(&mut self);
}
