//! Per-frame coordinate buffers handed to the renderer.

use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;

/// Full-screen quad in NDC, triangle-strip order:
/// bottom-left, bottom-right, top-left, top-right.
pub const GEOMETRY_QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Geometry quad plus the texture coordinates sampled at each corner.
///
/// Rebuilt by the transform engine whenever the transform changes and read
/// by the renderer once per draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameBufferCache {
    geometry: [[f32; 2]; 4],
    tex_coords: [[f32; 2]; 4],
}

impl FrameBufferCache {
    pub fn new(tex_coords: [Vec2; 4]) -> Self {
        Self {
            geometry: GEOMETRY_QUAD,
            tex_coords: tex_coords.map(Vec2::to_array),
        }
    }

    #[inline]
    pub fn geometry(&self) -> &[[f32; 2]; 4] {
        &self.geometry
    }

    #[inline]
    pub fn tex_coords(&self) -> &[[f32; 2]; 4] {
        &self.tex_coords
    }

    pub(crate) fn set_tex_coords(&mut self, coords: [Vec2; 4]) {
        self.tex_coords = coords.map(Vec2::to_array);
    }

    /// Interleaves geometry and texture coordinates for a single vertex buffer.
    pub fn vertices(&self) -> [QuadVertex; 4] {
        let mut out = [QuadVertex::zeroed(); 4];
        for (i, v) in out.iter_mut().enumerate() {
            v.pos = self.geometry[i];
            v.uv = self.tex_coords[i];
        }
        out
    }
}

/// Interleaved vertex consumed by the wgpu quad pipeline.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2  // uv
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TEXTURE_NO_ROTATION;

    #[test]
    fn geometry_is_constant_full_screen_quad() {
        let cache = FrameBufferCache::new(TEXTURE_NO_ROTATION);
        assert_eq!(cache.geometry(), &GEOMETRY_QUAD);
    }

    #[test]
    fn vertices_pair_geometry_with_tex_coords() {
        let cache = FrameBufferCache::new(TEXTURE_NO_ROTATION);
        let v = cache.vertices();
        assert_eq!(v[0], QuadVertex { pos: [-1.0, -1.0], uv: [0.0, 1.0] });
        assert_eq!(v[3], QuadVertex { pos: [1.0, 1.0], uv: [1.0, 0.0] });
    }

    #[test]
    fn vertex_bytes_are_tightly_packed() {
        let cache = FrameBufferCache::new(TEXTURE_NO_ROTATION);
        let verts = cache.vertices();
        let bytes: &[u8] = bytemuck::cast_slice(&verts);
        assert_eq!(bytes.len(), 4 * 4 * std::mem::size_of::<f32>());
    }
}
