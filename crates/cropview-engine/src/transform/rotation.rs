/// Canonical quarter-turn rotation of the image inside the viewport.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Rotation {
    #[default]
    Normal,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Normal,
        Rotation::Rotation90,
        Rotation::Rotation180,
        Rotation::Rotation270,
    ];

    #[inline]
    pub const fn degrees(self) -> u32 {
        match self {
            Rotation::Normal => 0,
            Rotation::Rotation90 => 90,
            Rotation::Rotation180 => 180,
            Rotation::Rotation270 => 270,
        }
    }

    #[inline]
    pub fn as_angle(self) -> f32 {
        self.degrees() as f32
    }

    /// Quadrant index in `0..4`, wrapping.
    #[inline]
    pub const fn from_index(index: i64) -> Rotation {
        Self::ALL[index.rem_euclid(4) as usize]
    }

    #[inline]
    pub const fn index(self) -> i64 {
        (self.degrees() / 90) as i64
    }

    #[inline]
    pub const fn clockwise_next(self) -> Rotation {
        Self::from_index(self.index() + 1)
    }

    #[inline]
    pub const fn counter_clockwise_next(self) -> Rotation {
        Self::from_index(self.index() - 1)
    }
}

/// Splits an angle in degrees (as returned by `atan2`, i.e. in `[-180, 180]`)
/// into a quadrant and a residual in `[-45, 45)`.
///
/// The quadrant is the 90° sector centered on each quarter turn, so the two
/// parts always sum back to the input modulo 360.
pub fn split_angle(angle: f32) -> (Rotation, f32) {
    let fine = (angle + 225.0).rem_euclid(90.0) - 45.0;
    let quadrant = ((angle + 405.0) / 90.0).floor() as i64;
    (Rotation::from_index(quadrant), fine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_wraps_both_ways() {
        assert_eq!(Rotation::Rotation270.clockwise_next(), Rotation::Normal);
        assert_eq!(Rotation::Normal.counter_clockwise_next(), Rotation::Rotation270);
        assert_eq!(Rotation::Rotation90.clockwise_next(), Rotation::Rotation180);
    }

    #[test]
    fn split_zero() {
        assert_eq!(split_angle(0.0), (Rotation::Normal, 0.0));
    }

    #[test]
    fn split_sector_edges() {
        assert_eq!(split_angle(45.0), (Rotation::Rotation90, -45.0));
        assert_eq!(split_angle(-45.0), (Rotation::Normal, -45.0));
        assert_eq!(split_angle(180.0), (Rotation::Rotation180, 0.0));
        assert_eq!(split_angle(-180.0), (Rotation::Rotation180, 0.0));
    }

    #[test]
    fn just_below_minus_45_floors_into_last_quadrant() {
        let (q, fine) = split_angle(-45.5);
        assert_eq!(q, Rotation::Rotation270);
        assert!((fine - 44.5).abs() < 1e-4);
    }

    #[test]
    fn split_reassembles_input() {
        for deg in [-170.0f32, -100.0, -46.0, -10.0, 30.0, 44.0, 91.0, 135.5, 179.0] {
            let (q, fine) = split_angle(deg);
            assert!((-45.0..45.0).contains(&fine), "{deg} -> {fine}");
            let back = (q.as_angle() + fine).rem_euclid(360.0);
            assert!((back - deg.rem_euclid(360.0)).abs() < 1e-3, "{deg} -> {back}");
        }
    }
}
