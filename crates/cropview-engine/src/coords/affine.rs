use super::Vec2;
use crate::error::TransformError;

/// Determinants at or below this magnitude are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Sine/cosine values this close to zero are snapped to exactly zero so that
/// quarter-turn rotations stay axis aligned.
const TRIG_SNAP: f32 = 1.0 / (1 << 16) as f32;

/// 2D affine transform.
///
/// Stored as the top two rows of a 3x3 matrix; the homogeneous row is
/// implicitly `[0, 0, 1]`:
///
/// ```text
/// | a  b  tx |
/// | c  d  ty |
/// ```
///
/// Points map as `x' = a*x + b*y + tx`, `y' = c*x + d*y + ty`.
///
/// The `post_*` mutators apply the new operation *after* the existing mapping:
/// `T.post_scale(..)` yields `p -> scale(T(p))`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2 {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    #[inline]
    pub const fn translate(dx: f32, dy: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    /// Scale by `(sx, sy)` keeping the pivot `(px, py)` fixed.
    #[inline]
    pub fn scale(sx: f32, sy: f32, px: f32, py: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, px - sx * px, py - sy * py)
    }

    /// Rotate by `degrees` about the pivot `(px, py)`.
    ///
    /// Positive angles turn +X towards +Y.
    pub fn rotate(degrees: f32, px: f32, py: f32) -> Self {
        let (sin, cos) = snapped_sin_cos(degrees);
        Self::new(
            cos,
            -sin,
            sin,
            cos,
            px - (cos * px - sin * py),
            py - (sin * px + cos * py),
        )
    }

    /// Returns `lhs · rhs`: the transform that applies `rhs` first, then `lhs`.
    pub fn concat(lhs: Affine2, rhs: Affine2) -> Affine2 {
        Affine2::new(
            lhs.a * rhs.a + lhs.b * rhs.c,
            lhs.a * rhs.b + lhs.b * rhs.d,
            lhs.c * rhs.a + lhs.d * rhs.c,
            lhs.c * rhs.b + lhs.d * rhs.d,
            lhs.a * rhs.tx + lhs.b * rhs.ty + lhs.tx,
            lhs.c * rhs.tx + lhs.d * rhs.ty + lhs.ty,
        )
    }

    /// Returns the transform that applies `self`, then `next`.
    #[inline]
    pub fn then(self, next: Affine2) -> Affine2 {
        Affine2::concat(next, self)
    }

    #[inline]
    pub fn post_concat(&mut self, op: Affine2) {
        *self = self.then(op);
    }

    #[inline]
    pub fn post_scale(&mut self, sx: f32, sy: f32, px: f32, py: f32) {
        self.post_concat(Affine2::scale(sx, sy, px, py));
    }

    #[inline]
    pub fn post_rotate(&mut self, degrees: f32, px: f32, py: f32) {
        self.post_concat(Affine2::rotate(degrees, px, py));
    }

    #[inline]
    pub fn post_translate(&mut self, dx: f32, dy: f32) {
        self.post_concat(Affine2::translate(dx, dy));
    }

    #[inline]
    pub fn map_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.b * p.y + self.tx,
            self.c * p.x + self.d * p.y + self.ty,
        )
    }

    /// Maps a direction, ignoring translation.
    #[inline]
    pub fn map_vector(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.a * v.x + self.b * v.y, self.c * v.x + self.d * v.y)
    }

    pub fn map_points(&self, points: &[Vec2]) -> Vec<Vec2> {
        points.iter().map(|&p| self.map_point(p)).collect()
    }

    #[inline]
    pub fn map_quad(&self, quad: [Vec2; 4]) -> [Vec2; 4] {
        quad.map(|p| self.map_point(p))
    }

    #[inline]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    pub fn is_invertible(&self) -> bool {
        (self.determinant() as f64).abs() > SINGULAR_EPSILON && self.determinant().is_finite()
    }

    /// Returns `T⁻¹` such that `T⁻¹ · T` is the identity.
    pub fn invert(&self) -> Result<Affine2, TransformError> {
        let det = self.determinant();
        if !self.is_invertible() {
            return Err(TransformError::NonInvertible { determinant: det });
        }
        let inv = 1.0 / det;
        Ok(Affine2::new(
            self.d * inv,
            -self.b * inv,
            -self.c * inv,
            self.a * inv,
            (self.b * self.ty - self.d * self.tx) * inv,
            (self.c * self.tx - self.a * self.ty) * inv,
        ))
    }

    /// Solves for the transform mapping each `src[i]` onto `dst[i]`.
    ///
    /// Both triples are written as `(x, y, 1)` columns of a 3x3 basis; the
    /// result is `dst_basis · src_basis⁻¹`. Fails when the source points are
    /// collinear.
    pub fn from_point_correspondence(
        src: [Vec2; 3],
        dst: [Vec2; 3],
    ) -> Result<Affine2, TransformError> {
        let src_basis = PointBasis::from_points(src);
        let inverse = src_basis.inverse().ok_or(TransformError::NonInvertible {
            determinant: src_basis.determinant() as f32,
        })?;
        Ok(PointBasis::from_points(dst).mul(&inverse).to_affine())
    }

    pub fn approx_eq(&self, other: &Affine2, eps: f32) -> bool {
        (self.a - other.a).abs() <= eps
            && (self.b - other.b).abs() <= eps
            && (self.c - other.c).abs() <= eps
            && (self.d - other.d).abs() <= eps
            && (self.tx - other.tx).abs() <= eps
            && (self.ty - other.ty).abs() <= eps
    }
}

fn snapped_sin_cos(degrees: f32) -> (f32, f32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let snap = |v: f32| if v.abs() <= TRIG_SNAP { 0.0 } else { v };
    (snap(sin), snap(cos))
}

/// Row-major 3x3 matrix whose columns are homogeneous points `(x, y, 1)`.
///
/// Solved in f64; only the final affine is narrowed back to f32.
#[derive(Debug, Copy, Clone)]
struct PointBasis {
    m: [[f64; 3]; 3],
}

impl PointBasis {
    fn from_points(p: [Vec2; 3]) -> Self {
        Self {
            m: [
                [p[0].x as f64, p[1].x as f64, p[2].x as f64],
                [p[0].y as f64, p[1].y as f64, p[2].y as f64],
                [1.0, 1.0, 1.0],
            ],
        }
    }

    fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    fn inverse(&self) -> Option<PointBasis> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() <= SINGULAR_EPSILON {
            return None;
        }
        let m = &self.m;
        let inv = 1.0 / det;
        // Transposed cofactors.
        let cof = |r0: usize, r1: usize, c0: usize, c1: usize| {
            m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
        };
        Some(PointBasis {
            m: [
                [cof(1, 2, 1, 2) * inv, -cof(0, 2, 1, 2) * inv, cof(0, 1, 1, 2) * inv],
                [-cof(1, 2, 0, 2) * inv, cof(0, 2, 0, 2) * inv, -cof(0, 1, 0, 2) * inv],
                [cof(1, 2, 0, 1) * inv, -cof(0, 2, 0, 1) * inv, cof(0, 1, 0, 1) * inv],
            ],
        })
    }

    fn mul(&self, rhs: &PointBasis) -> PointBasis {
        let mut out = [[0.0f64; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[r][k] * rhs.m[k][c]).sum();
            }
        }
        PointBasis { m: out }
    }

    /// Drops the homogeneous row, which is `[0, 0, 1]` for a product of two
    /// point bases.
    fn to_affine(&self) -> Affine2 {
        let m = &self.m;
        Affine2::new(
            m[0][0] as f32,
            m[0][1] as f32,
            m[1][0] as f32,
            m[1][1] as f32,
            m[0][2] as f32,
            m[1][2] as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() <= EPS && (a.y - b.y).abs() <= EPS
    }

    // ── primitives ────────────────────────────────────────────────────────

    #[test]
    fn scale_keeps_pivot_fixed() {
        let t = Affine2::scale(3.0, 0.5, 0.5, 0.5);
        assert!(close(t.map_point(Vec2::new(0.5, 0.5)), Vec2::new(0.5, 0.5)));
        assert!(close(t.map_point(Vec2::new(1.0, 1.0)), Vec2::new(2.0, 0.75)));
    }

    #[test]
    fn rotate_quarter_turn_is_exact() {
        let t = Affine2::rotate(90.0, 0.0, 0.0);
        assert_eq!(t.map_point(Vec2::new(1.0, 0.0)), Vec2::new(0.0, 1.0));
        assert_eq!(t.map_point(Vec2::new(0.0, 1.0)), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn rotate_about_pivot() {
        let t = Affine2::rotate(180.0, 0.5, 0.5);
        assert!(close(t.map_point(Vec2::new(0.0, 0.0)), Vec2::new(1.0, 1.0)));
    }

    // ── composition ───────────────────────────────────────────────────────

    #[test]
    fn post_ops_apply_after_existing_mapping() {
        let mut t = Affine2::scale(2.0, 2.0, 0.0, 0.0);
        t.post_translate(1.0, 0.0);
        // scale first, then translate.
        assert!(close(t.map_point(Vec2::new(1.0, 1.0)), Vec2::new(3.0, 2.0)));
    }

    #[test]
    fn composition_is_not_commutative() {
        let s = Affine2::scale(2.0, 1.0, 0.0, 0.0);
        let r = Affine2::rotate(90.0, 0.0, 0.0);
        assert!(!s.then(r).approx_eq(&r.then(s), EPS));
    }

    #[test]
    fn composition_is_associative() {
        let a = Affine2::scale(2.0, 0.5, 0.3, 0.1);
        let b = Affine2::rotate(33.0, 0.2, 0.7);
        let c = Affine2::translate(-0.4, 0.9);
        let left = a.then(b).then(c);
        let right = a.then(b.then(c));
        assert!(left.approx_eq(&right, EPS));
    }

    #[test]
    fn map_points_preserves_length_and_order() {
        let t = Affine2::translate(1.0, 2.0);
        let out = t.map_points(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(-1.0, 0.0)]);
        assert_eq!(
            out,
            vec![Vec2::new(1.0, 2.0), Vec2::new(2.0, 3.0), Vec2::new(0.0, 2.0)]
        );
    }

    // ── inversion ─────────────────────────────────────────────────────────

    #[test]
    fn invert_then_compose_is_identity() {
        let t = Affine2::scale(0.5, 2.0, 0.5, 0.5)
            .then(Affine2::rotate(-27.0, 0.1, 0.9))
            .then(Affine2::translate(0.25, -0.75));
        let inv = t.invert().unwrap();
        assert!(t.then(inv).approx_eq(&Affine2::IDENTITY, EPS));
        assert!(inv.then(t).approx_eq(&Affine2::IDENTITY, EPS));
    }

    #[test]
    fn invert_singular_fails() {
        let t = Affine2::scale(0.0, 1.0, 0.0, 0.0);
        assert!(matches!(t.invert(), Err(TransformError::NonInvertible { .. })));
    }

    // ── point correspondence ──────────────────────────────────────────────

    #[test]
    fn correspondence_maps_sources_onto_targets() {
        let src = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        let expected = Affine2::rotate(40.0, 0.5, 0.5).then(Affine2::translate(0.1, 0.2));
        let dst = src.map(|p| expected.map_point(p));

        let solved = Affine2::from_point_correspondence(src, dst).unwrap();
        assert!(solved.approx_eq(&expected, 1e-5));
    }

    #[test]
    fn correspondence_with_collinear_sources_fails() {
        let src = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)];
        let dst = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        assert!(Affine2::from_point_correspondence(src, dst).is_err());
    }
}
