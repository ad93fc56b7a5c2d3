//! Simulation box geometry and small vector helpers.
//!
//! The box is centered at the origin: along every axis the valid coordinate
//! range is `[-L/2, L/2)`. Periodic axes wrap positions back into that range
//! and measure distances under the minimum-image convention.

use serde::Deserialize;

/// Three-dimensional vector stored as a plain array, as elsewhere in the crate.
pub type Vec3 = [f64; 3];

#[inline]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn norm_squared(a: Vec3) -> f64 {
    dot(a, a)
}

/// Rectangular simulation domain with per-axis periodicity.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SimulationBox {
    /// Edge lengths along x, y and z.
    pub size: Vec3,
    /// Whether each axis wraps around.
    #[serde(default = "default_periodic")]
    pub periodic: [bool; 3],
}

fn default_periodic() -> [bool; 3] {
    [true, true, true]
}

impl Default for SimulationBox {
    fn default() -> Self {
        Self {
            size: [1.0, 1.0, 1.0],
            periodic: default_periodic(),
        }
    }
}

impl SimulationBox {
    pub fn new(size: Vec3, periodic: [bool; 3]) -> Self {
        Self { size, periodic }
    }

    /// Lower corner of the box.
    #[inline]
    pub fn lower(&self) -> Vec3 {
        scale(self.size, -0.5)
    }

    /// Difference vector `to - from`, using the minimum image along periodic axes.
    pub fn shortest_difference(&self, from: Vec3, to: Vec3) -> Vec3 {
        let mut d = sub(to, from);
        for axis in 0..3 {
            if self.periodic[axis] {
                let l = self.size[axis];
                d[axis] -= l * (d[axis] / l).round();
            }
        }
        d
    }

    #[inline]
    pub fn dist_squared(&self, a: Vec3, b: Vec3) -> f64 {
        norm_squared(self.shortest_difference(a, b))
    }

    /// Wraps a position into `[-L/2, L/2)` along every periodic axis.
    ///
    /// Non-periodic axes are left untouched.
    pub fn fix_position(&self, pos: &mut Vec3) {
        for axis in 0..3 {
            if !self.periodic[axis] {
                continue;
            }
            let l = self.size[axis];
            let half = 0.5 * l;
            pos[axis] -= l * ((pos[axis] + half) / l).floor();
            // rounding in the subtraction above can land exactly on the upper edge
            if pos[axis] >= half {
                pos[axis] -= l;
            }
        }
    }

    /// Returns a wrapped copy of `pos`.
    pub fn wrapped(&self, mut pos: Vec3) -> Vec3 {
        self.fix_position(&mut pos);
        pos
    }

    /// Index of the longest box edge.
    pub fn longest_axis(&self) -> usize {
        let mut best = 0;
        for axis in 1..3 {
            if self.size[axis] > self.size[best] {
                best = axis;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn periodic_box() -> SimulationBox {
        SimulationBox::new([10.0, 10.0, 10.0], [true, true, true])
    }

    #[test]
    fn shortest_difference_uses_minimum_image() {
        let b = periodic_box();
        let d = b.shortest_difference([-4.5, 0.0, 0.0], [4.5, 0.0, 0.0]);
        assert!((d[0] + 1.0).abs() < 1e-12);
        assert!((b.dist_squared([-4.5, 0.0, 0.0], [4.5, 0.0, 0.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn shortest_difference_ignores_non_periodic_axes() {
        let b = SimulationBox::new([10.0, 10.0, 10.0], [false, true, true]);
        let d = b.shortest_difference([-4.5, 0.0, 0.0], [4.5, 0.0, 0.0]);
        assert_eq!(d[0], 9.0);
    }

    #[test]
    fn fix_position_wraps_into_half_open_range() {
        let b = periodic_box();
        let mut p = [5.0, -5.0, 12.5];
        b.fix_position(&mut p);
        assert_eq!(p[0], -5.0);
        assert_eq!(p[1], -5.0);
        assert!((p[2] - 2.5).abs() < 1e-12);
        for x in p {
            assert!((-5.0..5.0).contains(&x));
        }
    }

    #[test]
    fn fix_position_leaves_non_periodic_alone() {
        let b = SimulationBox::new([10.0, 10.0, 10.0], [false, false, false]);
        let mut p = [7.0, -8.0, 0.0];
        b.fix_position(&mut p);
        assert_eq!(p, [7.0, -8.0, 0.0]);
    }

    #[test]
    fn longest_axis_is_detected() {
        let b = SimulationBox::new([4.0, 9.0, 3.0], [true; 3]);
        assert_eq!(b.longest_axis(), 1);
    }

    #[test]
    fn vector_helpers() {
        assert_eq!(add([1.0, 2.0, 3.0], [1.0, 1.0, 1.0]), [2.0, 3.0, 4.0]);
        assert_eq!(sub([1.0, 2.0, 3.0], [1.0, 1.0, 1.0]), [0.0, 1.0, 2.0]);
        assert_eq!(scale([1.0, 2.0, 3.0], 2.0), [2.0, 4.0, 6.0]);
        assert_eq!(norm_squared([1.0, 2.0, 2.0]), 9.0);
    }
}
