use std::time::Duration;

use crate::coords::{ColorRgba, Vec2};

/// Texture coordinates sampled at the four geometry-quad corners when no
/// transform is applied.
///
/// Order matches [`crate::buffers::GEOMETRY_QUAD`]: bottom-left, bottom-right,
/// top-left, top-right of the output surface.
pub const TEXTURE_NO_ROTATION: [Vec2; 4] = [
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
];

/// Engine tuning parameters.
///
/// Values are copied into the engine at construction; changing a config after
/// the fact has no effect on a running engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Smallest accepted scale ratio (most zoomed in), relative to the base
    /// cover-fit scale.
    pub min_scale_ratio: f32,

    /// Largest accepted scale ratio. `1.0` is the cover-fit scale itself;
    /// going above would let the image stop covering the viewport.
    pub max_scale_ratio: f32,

    /// Reference quad mapped through the transform to produce texture coordinates.
    pub reference_tex_coords: [Vec2; 4],

    /// Normalized anchor used until offset limits are set.
    pub default_anchor: Vec2,

    /// Clear color used before any frame-specific color is set.
    pub background: ColorRgba,

    /// Timeout applied by the capture helpers that do not take one explicitly.
    pub capture_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_scale_ratio: 0.1,
            max_scale_ratio: 1.0,
            reference_tex_coords: TEXTURE_NO_ROTATION,
            default_anchor: Vec2::new(0.5, 0.5),
            background: ColorRgba::black(),
            capture_timeout: Duration::from_secs(5),
        }
    }
}
