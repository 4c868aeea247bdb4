//! Axial hexagonal lattice geometry.
//!
//! Positions use axial `(q, r)` coordinates. The six unit directions are
//! indexed counterclockwise starting at `+q`:
//!
//! | index | offset    |
//! |-------|-----------|
//! | 0     | `( 1,  0)`|
//! | 1     | `( 0,  1)`|
//! | 2     | `(-1,  1)`|
//! | 3     | `(-1,  0)`|
//! | 4     | `( 0, -1)`|
//! | 5     | `( 1, -1)`|
//!
//! A [`Rotation`] of `+1` turns 60° counterclockwise, so rotating a
//! direction by `k` yields the direction at index `i + k`.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A cell on the axial hex lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HexPos {
    pub q: i32,
    pub r: i32,
}

impl HexPos {
    pub const ORIGIN: HexPos = HexPos { q: 0, r: 0 };

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Rotates the position about the lattice origin.
    pub fn rotate(self, rotation: Rotation) -> Self {
        let HexPos { q, r } = self;
        match rotation.steps() {
            0 => self,
            1 => HexPos::new(-r, q + r),
            2 => HexPos::new(-q - r, q),
            3 => HexPos::new(-q, -r),
            4 => HexPos::new(r, -q - r),
            _ => HexPos::new(q + r, -q),
        }
    }

    pub fn rotate_around(self, rotation: Rotation, pivot: HexPos) -> Self {
        (self - pivot).rotate(rotation) + pivot
    }

    /// Hex distance from the origin.
    pub fn length(self) -> i32 {
        (self.q.abs() + self.r.abs() + (self.q + self.r).abs()) / 2
    }

    pub fn distance(self, other: HexPos) -> i32 {
        (self - other).length()
    }

    pub fn neighbor(self, direction: Rotation) -> Self {
        self + direction.unit()
    }

    /// Direction of `other` when it is an immediate neighbor of `self`.
    pub fn direction_to(self, other: HexPos) -> Option<Rotation> {
        let delta = other - self;
        Rotation::ALL.into_iter().find(|d| d.unit() == delta)
    }

    /// Sum `q + r`, the coordinate measured by the diagonal extent.
    pub fn diagonal(self) -> i32 {
        self.q + self.r
    }
}

impl fmt::Display for HexPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

impl Add for HexPos {
    type Output = HexPos;

    fn add(self, rhs: HexPos) -> HexPos {
        HexPos::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl AddAssign for HexPos {
    fn add_assign(&mut self, rhs: HexPos) {
        self.q += rhs.q;
        self.r += rhs.r;
    }
}

impl Sub for HexPos {
    type Output = HexPos;

    fn sub(self, rhs: HexPos) -> HexPos {
        HexPos::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl Neg for HexPos {
    type Output = HexPos;

    fn neg(self) -> HexPos {
        HexPos::new(-self.q, -self.r)
    }
}

impl Mul<i32> for HexPos {
    type Output = HexPos;

    fn mul(self, rhs: i32) -> HexPos {
        HexPos::new(self.q * rhs, self.r * rhs)
    }
}

/// An element of the six-fold rotation group, stored as counterclockwise steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Rotation(u8);

impl Rotation {
    pub const ZERO: Rotation = Rotation(0);
    pub const COUNTERCLOCKWISE: Rotation = Rotation(1);
    pub const CLOCKWISE: Rotation = Rotation(5);
    pub const HALF_TURN: Rotation = Rotation(3);

    pub const ALL: [Rotation; 6] = [
        Rotation(0),
        Rotation(1),
        Rotation(2),
        Rotation(3),
        Rotation(4),
        Rotation(5),
    ];

    /// Builds a rotation from any signed number of counterclockwise steps.
    pub fn new(steps: i32) -> Self {
        Rotation(steps.rem_euclid(6) as u8)
    }

    pub fn steps(self) -> u8 {
        self.0
    }

    /// The shortest signed step count, in `-2..=3`.
    pub fn signed(self) -> i32 {
        let s = self.0 as i32;
        if s > 3 { s - 6 } else { s }
    }

    /// The unit vector pointing in this direction.
    pub fn unit(self) -> HexPos {
        match self.0 {
            0 => HexPos::new(1, 0),
            1 => HexPos::new(0, 1),
            2 => HexPos::new(-1, 1),
            3 => HexPos::new(-1, 0),
            4 => HexPos::new(0, -1),
            _ => HexPos::new(1, -1),
        }
    }

    pub fn opposite(self) -> Self {
        self + Rotation::HALF_TURN
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Rotation {
    type Output = Rotation;

    fn add(self, rhs: Rotation) -> Rotation {
        Rotation((self.0 + rhs.0) % 6)
    }
}

impl AddAssign for Rotation {
    fn add_assign(&mut self, rhs: Rotation) {
        *self = *self + rhs;
    }
}

impl Sub for Rotation {
    type Output = Rotation;

    fn sub(self, rhs: Rotation) -> Rotation {
        Rotation((self.0 + 6 - rhs.0) % 6)
    }
}

impl Neg for Rotation {
    type Output = Rotation;

    fn neg(self) -> Rotation {
        Rotation((6 - self.0) % 6)
    }
}

/// The sense in which a rotating motion sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationSense {
    Clockwise,
    Counterclockwise,
}

impl RotationSense {
    /// The single 60° step taken in this sense.
    pub fn step(self) -> Rotation {
        match self {
            RotationSense::Clockwise => Rotation::CLOCKWISE,
            RotationSense::Counterclockwise => Rotation::COUNTERCLOCKWISE,
        }
    }

    /// Number of 60° steps needed to turn from `from` to `to` in this sense.
    pub fn steps_between(self, from: Rotation, to: Rotation) -> u8 {
        match self {
            RotationSense::Counterclockwise => (to - from).steps(),
            RotationSense::Clockwise => (from - to).steps(),
        }
    }
}

/// A lattice position together with an orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pose {
    pub position: HexPos,
    pub rotation: Rotation,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: HexPos::ORIGIN,
        rotation: Rotation::ZERO,
    };

    pub fn new(position: HexPos, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: HexPos) -> Self {
        Self::new(position, Rotation::ZERO)
    }

    /// Maps a point expressed in this pose's frame into the parent frame.
    pub fn apply(self, local: HexPos) -> HexPos {
        self.position + local.rotate(self.rotation)
    }

    /// Composes `self` (the parent) with `child`, yielding the child's pose
    /// in the parent's parent frame.
    pub fn compose(self, child: Pose) -> Pose {
        Pose {
            position: self.apply(child.position),
            rotation: self.rotation + child.rotation,
        }
    }

    pub fn inverse(self) -> Pose {
        let rotation = -self.rotation;
        Pose {
            position: (-self.position).rotate(rotation),
            rotation,
        }
    }
}

/// Cells on the straight lattice line from `a` to `b`, both ends included.
pub fn hex_line(a: HexPos, b: HexPos) -> Vec<HexPos> {
    let n = a.distance(b);
    if n == 0 {
        return vec![a];
    }
    // Nudge off cell boundaries so ties round consistently.
    let (aq, ar) = (a.q as f64 + 1e-6, a.r as f64 + 1e-6);
    let (bq, br) = (b.q as f64 + 1e-6, b.r as f64 + 1e-6);
    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            cube_round(aq + (bq - aq) * t, ar + (br - ar) * t)
        })
        .collect()
}

fn cube_round(q: f64, r: f64) -> HexPos {
    let s = -q - r;
    let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
    let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    HexPos::new(rq as i32, rr as i32)
}

/// The next cell along the ring of constant distance around the origin.
///
/// Walking `d` steps from any cell at distance `d` reaches the image of that
/// cell under one 60° rotation in the same sense.
pub fn ring_step(pos: HexPos, sense: RotationSense) -> HexPos {
    let d = pos.length();
    if d == 0 {
        return pos;
    }
    for sector in Rotation::ALL {
        let corner = sector.unit() * d;
        let edge = (sector + Rotation::new(2)).unit();
        for i in 0..d {
            if corner + edge * i != pos {
                continue;
            }
            return match sense {
                RotationSense::Counterclockwise if i + 1 < d => corner + edge * (i + 1),
                RotationSense::Counterclockwise => (sector + Rotation::COUNTERCLOCKWISE).unit() * d,
                RotationSense::Clockwise if i > 0 => corner + edge * (i - 1),
                RotationSense::Clockwise => {
                    let prev = sector + Rotation::CLOCKWISE;
                    prev.unit() * d + (prev + Rotation::new(2)).unit() * (d - 1)
                }
            };
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rotation_table_matches_unit_directions() {
        for dir in Rotation::ALL {
            for step in Rotation::ALL {
                assert_eq!(dir.unit().rotate(step), (dir + step).unit());
            }
        }
    }

    #[test]
    fn clockwise_maps_axial_coordinates() {
        assert_eq!(HexPos::new(2, 1).rotate(Rotation::CLOCKWISE), HexPos::new(3, -2));
        assert_eq!(
            HexPos::new(2, 1).rotate(Rotation::COUNTERCLOCKWISE),
            HexPos::new(-1, 3)
        );
    }

    #[test]
    fn rotation_arithmetic_wraps() {
        assert_eq!(Rotation::new(-1), Rotation::CLOCKWISE);
        assert_eq!(Rotation::new(7), Rotation::COUNTERCLOCKWISE);
        assert_eq!(-Rotation::new(2), Rotation::new(4));
        assert_eq!(Rotation::new(4).signed(), -2);
        assert_eq!(Rotation::new(3).signed(), 3);
        assert_eq!(Rotation::new(1).opposite(), Rotation::new(4));
    }

    #[test]
    fn steps_between_respects_sense() {
        let cw = RotationSense::Clockwise;
        let ccw = RotationSense::Counterclockwise;
        assert_eq!(cw.steps_between(Rotation::new(2), Rotation::new(1)), 1);
        assert_eq!(ccw.steps_between(Rotation::new(2), Rotation::new(1)), 5);
        assert_eq!(ccw.steps_between(Rotation::new(5), Rotation::new(0)), 1);
    }

    #[test]
    fn distance_and_direction() {
        assert_eq!(HexPos::new(3, -1).length(), 3);
        assert_eq!(HexPos::new(-2, -2).length(), 4);
        assert_eq!(
            HexPos::new(1, 1).direction_to(HexPos::new(1, 2)),
            Some(Rotation::new(1))
        );
        assert_eq!(HexPos::new(1, 1).direction_to(HexPos::new(2, 2)), None);
    }

    #[test]
    fn hex_line_follows_axes() {
        let line = hex_line(HexPos::new(0, 0), HexPos::new(3, 0));
        assert_eq!(
            line,
            vec![
                HexPos::new(0, 0),
                HexPos::new(1, 0),
                HexPos::new(2, 0),
                HexPos::new(3, 0)
            ]
        );
        let diagonal = hex_line(HexPos::new(0, 0), HexPos::new(-2, 2));
        assert_eq!(diagonal.len(), 3);
        assert_eq!(diagonal[1], HexPos::new(-1, 1));
    }

    #[test]
    fn ring_step_walks_one_sector_per_radius() {
        let start = HexPos::new(0, 3);
        let mut pos = start;
        for _ in 0..3 {
            pos = ring_step(pos, RotationSense::Clockwise);
            assert_eq!(pos.length(), 3);
        }
        assert_eq!(pos, start.rotate(Rotation::CLOCKWISE));

        let mut pos = start;
        for _ in 0..3 {
            pos = ring_step(pos, RotationSense::Counterclockwise);
        }
        assert_eq!(pos, start.rotate(Rotation::COUNTERCLOCKWISE));
    }

    #[test]
    fn pose_compose_and_inverse() {
        let parent = Pose::new(HexPos::new(2, -1), Rotation::new(1));
        let child = Pose::new(HexPos::new(1, 0), Rotation::new(2));
        let world = parent.compose(child);
        assert_eq!(world.position, HexPos::new(2, 0));
        assert_eq!(world.rotation, Rotation::new(3));
        assert_eq!(parent.compose(parent.inverse()), Pose::IDENTITY);
    }

    fn any_pos() -> impl Strategy<Value = HexPos> {
        (-20i32..20, -20i32..20).prop_map(|(q, r)| HexPos::new(q, r))
    }

    fn any_pose() -> impl Strategy<Value = Pose> {
        (any_pos(), 0i32..6).prop_map(|(p, s)| Pose::new(p, Rotation::new(s)))
    }

    proptest! {
        #[test]
        fn six_rotations_are_identity(p in any_pos(), s in 0i32..6) {
            let step = Rotation::new(s);
            let mut q = p;
            for _ in 0..6 {
                q = q.rotate(step);
            }
            prop_assert_eq!(q, p);
        }

        #[test]
        fn rotation_preserves_length(p in any_pos(), s in 0i32..6) {
            prop_assert_eq!(p.rotate(Rotation::new(s)).length(), p.length());
        }

        #[test]
        fn pose_composition_is_associative(a in any_pose(), b in any_pose(), c in any_pose(), p in any_pos()) {
            prop_assert_eq!(a.compose(b).compose(c), a.compose(b.compose(c)));
            prop_assert_eq!(a.compose(b).apply(p), a.apply(b.apply(p)));
        }

        #[test]
        fn ring_walk_reaches_rotated_cell(p in any_pos()) {
            let d = p.length();
            prop_assume!(d > 0);
            let mut ccw = p;
            let mut cw = p;
            for _ in 0..d {
                ccw = ring_step(ccw, RotationSense::Counterclockwise);
                cw = ring_step(cw, RotationSense::Clockwise);
            }
            prop_assert_eq!(ccw, p.rotate(Rotation::COUNTERCLOCKWISE));
            prop_assert_eq!(cw, p.rotate(Rotation::CLOCKWISE));
        }
    }
}
