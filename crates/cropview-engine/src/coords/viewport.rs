/// Output surface size in pixels.
///
/// This is the size the renderer draws into; all pixel-space gesture deltas
/// are interpreted relative to it.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Radius of the largest circle inscribed in the viewport.
    #[inline]
    pub fn inscribed_radius(self) -> f32 {
        self.width.min(self.height) / 2.0
    }
}
