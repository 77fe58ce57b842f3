use std::collections::HashMap;

use image::RgbaImage;

use crate::bitmap::pad_to_even_width;
use crate::buffers::FrameBufferCache;
use crate::coords::ColorRgba;
use crate::device::HeadlessGpu;
use crate::error::RenderError;
use crate::readback::RowOrder;
use crate::render::{
    ProgramHandle, RenderCtx, RenderTarget, Renderer, TextureHandle, TexturedQuadPipeline,
};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const QUAD_PROGRAM: ProgramHandle = ProgramHandle(1);

struct Offscreen {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct ImageTexture {
    // Kept alive for the bind group.
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    /// Fraction of the uploaded width covered by the source image; odd-width
    /// images carry one padding column that must never be sampled.
    u_scale: f32,
}

/// [`Renderer`] backed by wgpu, drawing into an offscreen RGBA8 target.
pub struct WgpuRenderer {
    gpu: HeadlessGpu,
    quad: TexturedQuadPipeline,
    bound: Option<ProgramHandle>,

    target: Option<Offscreen>,
    clear: ColorRgba,

    textures: HashMap<u32, ImageTexture>,
    next_texture: u32,
}

impl WgpuRenderer {
    pub fn new(gpu: HeadlessGpu) -> Self {
        Self {
            gpu,
            quad: TexturedQuadPipeline::new(),
            bound: None,
            target: None,
            clear: ColorRgba::black(),
            textures: HashMap::new(),
            next_texture: 1,
        }
    }

    pub fn gpu(&self) -> &HeadlessGpu {
        &self.gpu
    }

    /// Size of the offscreen target, if one exists.
    pub fn output_size(&self) -> Option<(u32, u32)> {
        self.target.as_ref().map(|t| (t.width, t.height))
    }

    fn ctx(&self) -> RenderCtx<'_> {
        RenderCtx::new(self.gpu.device(), self.gpu.queue(), TARGET_FORMAT)
    }

    fn check_size(&self, what: &str, width: u32, height: u32) -> Result<(), RenderError> {
        let max = self.gpu.max_texture_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::Device(format!(
                "{what} size {width}x{height} outside 1..={max}"
            )));
        }
        Ok(())
    }
}

impl Renderer for WgpuRenderer {
    fn init_program(&mut self) -> Result<ProgramHandle, RenderError> {
        let mut quad = std::mem::take(&mut self.quad);
        quad.ensure(&self.ctx());
        self.quad = quad;
        log::debug!("quad program ready ({TARGET_FORMAT:?})");
        Ok(QUAD_PROGRAM)
    }

    fn bind_program(&mut self, program: ProgramHandle) -> Result<(), RenderError> {
        if program != QUAD_PROGRAM || !self.quad.is_ready() {
            return Err(RenderError::Device(format!(
                "program {} has not been initialized",
                program.0
            )));
        }
        self.bound = Some(program);
        Ok(())
    }

    fn on_output_size_changed(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if self.output_size() == Some((width, height)) {
            return Ok(());
        }
        self.check_size("output", width, height)?;

        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("cropview offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.target = Some(Offscreen {
            texture,
            view,
            width,
            height,
        });
        log::debug!("offscreen target resized to {width}x{height}");
        Ok(())
    }

    fn set_clear_color(&mut self, color: ColorRgba) {
        self.clear = color;
    }

    fn upload_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, RenderError> {
        let (src_w, src_h) = image.dimensions();
        let padded = pad_to_even_width(image);
        let (width, height) = padded.dimensions();
        self.check_size("texture", width, height)
            .map_err(|e| RenderError::TextureUpload(e.to_string()))?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("cropview image texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            padded.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self
            .quad
            .bind_texture(&self.ctx(), &view)
            .ok_or_else(|| RenderError::TextureUpload("quad program not initialized".into()))?;

        let handle = TextureHandle(self.next_texture);
        self.next_texture = self.next_texture.wrapping_add(1).max(1);
        self.textures.insert(
            handle.0,
            ImageTexture {
                _texture: texture,
                bind_group,
                u_scale: src_w as f32 / width as f32,
            },
        );
        log::debug!("uploaded texture {} ({src_w}x{src_h})", handle.0);
        Ok(handle)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture.0).is_some() {
            log::debug!("released texture {}", texture.0);
        }
    }

    fn draw(
        &mut self,
        texture: Option<TextureHandle>,
        buffers: &FrameBufferCache,
    ) -> Result<(), RenderError> {
        if self.bound.is_none() {
            return Err(RenderError::Device("no program bound".into()));
        }
        let image = match texture {
            Some(handle) => Some(
                self.textures
                    .get(&handle.0)
                    .ok_or(RenderError::UnknownTexture(handle.0))?,
            ),
            None => None,
        };
        let target = self.target.as_ref().ok_or(RenderError::NoOutput)?;

        let mut vertices = buffers.vertices();
        if let Some(image) = image {
            for v in &mut vertices {
                v.uv[0] *= image.u_scale;
            }
        }

        let ctx = RenderCtx::new(self.gpu.device(), self.gpu.queue(), TARGET_FORMAT);
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cropview frame encoder"),
            });
        {
            let mut rt = RenderTarget::new(&mut encoder, &target.view, self.clear.to_wgpu());
            self.quad
                .render(&ctx, &mut rt, &vertices, image.map(|i| &i.bind_group));
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_pixels(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<u32>, RenderError> {
        let target = self.target.as_ref().ok_or(RenderError::NoOutput)?;
        if width == 0
            || height == 0
            || x.saturating_add(width) > target.width
            || y.saturating_add(height) > target.height
        {
            return Err(RenderError::InvalidRegion {
                x: x.into(),
                y: y.into(),
                width: width.into(),
                height: height.into(),
                output_width: target.width,
                output_height: target.height,
            });
        }

        let device = self.gpu.device();
        let unpadded = width * 4;
        let bytes_per_row = unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cropview readback buffer"),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("cropview readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue().submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RenderError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|_| RenderError::Readback("map callback dropped".into()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(bytes_per_row as usize) {
                pixels.extend(
                    row[..unpadded as usize]
                        .chunks_exact(4)
                        .map(|p| u32::from_ne_bytes([p[0], p[1], p[2], p[3]])),
                );
            }
        }
        buffer.unmap();
        Ok(pixels)
    }

    fn row_order(&self) -> RowOrder {
        RowOrder::TopDown
    }

    fn destroy(&mut self) {
        let released = self.textures.len();
        self.textures.clear();
        self.target = None;
        self.bound = None;
        self.quad = TexturedQuadPipeline::new();
        log::debug!("renderer destroyed ({released} textures released)");
    }
}
