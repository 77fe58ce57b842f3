//! Framebuffer readback and row-order correction.
//!
//! GPU framebuffers are not uniformly oriented: GL-style targets hand rows
//! back bottom-up, while callers always expect top-down images. Renderers
//! report their convention through [`RowOrder`] and `capture` normalizes it.

use crate::error::RenderError;
use crate::render::Renderer;

/// Row order of pixels returned by a renderer's `read_pixels`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RowOrder {
    /// First row is the bottom of the image; region `y` counts from the bottom.
    BottomUp,
    /// First row is the top of the image; region `y` counts from the top.
    TopDown,
}

/// Captured pixels, top-down row-major.
///
/// Each `u32` holds one RGBA8 pixel in memory order (red in the lowest byte
/// on little-endian targets).
#[derive(Debug, Clone, PartialEq)]
pub struct PixelFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl PixelFrame {
    /// Converts into an `image` buffer for encoding. Returns `None` if the
    /// pixel count does not match the dimensions.
    pub fn into_rgba_image(self) -> Option<image::RgbaImage> {
        let bytes: Vec<u8> = bytemuck::cast_slice(&self.pixels).to_vec();
        image::RgbaImage::from_raw(self.width, self.height, bytes)
    }
}

/// Reverses row order, leaving columns untouched:
/// `out[(height - 1 - row) * width + col] = pixels[row * width + col]`.
///
/// Applying it twice yields the input. Fails when `pixels` does not hold
/// exactly `width * height` entries.
pub fn flip_rows(pixels: &[u32], width: usize, height: usize) -> Result<Vec<u32>, RenderError> {
    if pixels.len() != width * height {
        return Err(RenderError::Readback(format!(
            "expected {} pixels for {width}x{height}, got {}",
            width * height,
            pixels.len()
        )));
    }
    if pixels.is_empty() {
        return Ok(Vec::new());
    }
    Ok(pixels.chunks_exact(width).rev().flatten().copied().collect())
}

/// Region of the framebuffer to capture, resolved against the output size at
/// the time the capture runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CaptureRegion {
    /// The whole output surface.
    Full,
    /// Explicit rectangle in the renderer's native row order.
    Rect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// A square spanning the output width minus `padding_left` on both sides,
    /// starting `padding_top` pixels below the top edge.
    CroppedSquare { padding_left: u32, padding_top: u32 },
}

/// A concrete, bounds-checked rectangle in framebuffer coordinates.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ResolvedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn resolve(
        self,
        output_width: u32,
        output_height: u32,
        order: RowOrder,
    ) -> Result<ResolvedRegion, RenderError> {
        let (x, y, width, height): (i64, i64, i64, i64) = match self {
            CaptureRegion::Full => (0, 0, output_width.into(), output_height.into()),
            CaptureRegion::Rect {
                x,
                y,
                width,
                height,
            } => (x.into(), y.into(), width.into(), height.into()),
            CaptureRegion::CroppedSquare {
                padding_left,
                padding_top,
            } => {
                let side = i64::from(output_width) - 2 * i64::from(padding_left);
                let y = match order {
                    RowOrder::BottomUp => {
                        i64::from(output_height) - (i64::from(padding_top) + side)
                    }
                    RowOrder::TopDown => padding_top.into(),
                };
                (padding_left.into(), y, side, side)
            }
        };

        let fits = width > 0
            && height > 0
            && x >= 0
            && y >= 0
            && x + width <= i64::from(output_width)
            && y + height <= i64::from(output_height);
        if !fits {
            return Err(RenderError::InvalidRegion {
                x,
                y,
                width,
                height,
                output_width,
                output_height,
            });
        }

        // Bounds were checked against u32 output dimensions above.
        Ok(ResolvedRegion {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Reads `region` from the renderer's framebuffer and returns it top-down.
///
/// Must run on the render context, after the frame has been drawn.
pub fn capture<R>(renderer: &mut R, region: ResolvedRegion) -> Result<PixelFrame, RenderError>
where
    R: Renderer + ?Sized,
{
    let raw = renderer.read_pixels(region.x, region.y, region.width, region.height)?;
    let (w, h) = (region.width as usize, region.height as usize);
    if raw.len() != w * h {
        return Err(RenderError::Readback(format!(
            "expected {} pixels, renderer returned {}",
            w * h,
            raw.len()
        )));
    }

    let pixels = match renderer.row_order() {
        RowOrder::BottomUp => flip_rows(&raw, w, h)?,
        RowOrder::TopDown => raw,
    };

    Ok(PixelFrame {
        width: region.width,
        height: region.height,
        pixels,
    })
}
