//! Per-type configuration of bonded topology potentials.
//!
//! Keys are canonical under reversal: a bond `(a, b)` equals `(b, a)`, an
//! angle `(a, b, c)` equals `(c, b, a)`, and a torsion `(a, b, c, d)` equals
//! `(d, c, b, a)`. The central type of an angle stays in the middle.

use crate::model::types::ParticleTypeId;
use serde::Deserialize;
use std::collections::HashMap;

type T = ParticleTypeId;

/// Harmonic bond parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BondConfiguration {
    pub force_constant: f64,
    pub length: f64,
}

/// Harmonic angle parameters; the angle is in radians.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AngleConfiguration {
    pub force_constant: f64,
    /// Equilibrium angle in radians.
    pub equilibrium_angle: f64,
}

/// Cosine torsion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TorsionConfiguration {
    pub force_constant: f64,
    pub multiplicity: i32,
    /// Phase shift in radians.
    pub phi0: f64,
}

/// Key of an unordered type pair.
#[inline]
pub fn canonical_pair(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Key of a type triple, identical for the triple and its reverse.
#[inline]
pub fn canonical_triple(a: T, b: T, c: T) -> (T, T, T) {
    if a <= c { (a, b, c) } else { (c, b, a) }
}

/// Key of a type quadruple, identical for the quadruple and its reverse.
#[inline]
pub fn canonical_quadruple(a: T, b: T, c: T, d: T) -> (T, T, T, T) {
    if (a, b, c, d) <= (d, c, b, a) {
        (a, b, c, d)
    } else {
        (d, c, b, a)
    }
}

/// Bond, angle and torsion configurations by particle types.
#[derive(Debug, Clone, Default)]
pub struct TopologyPotentialRegistry {
    bonds: HashMap<(T, T), BondConfiguration>,
    angles: HashMap<(T, T, T), AngleConfiguration>,
    torsions: HashMap<(T, T, T, T), TorsionConfiguration>,
}

impl TopologyPotentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_bond(&mut self, t1: T, t2: T, config: BondConfiguration) {
        self.bonds.insert(canonical_pair(t1, t2), config);
    }

    pub fn configure_angle(&mut self, t1: T, t2: T, t3: T, config: AngleConfiguration) {
        self.angles.insert(canonical_triple(t1, t2, t3), config);
    }

    pub fn configure_torsion(&mut self, t1: T, t2: T, t3: T, t4: T, config: TorsionConfiguration) {
        self.torsions
            .insert(canonical_quadruple(t1, t2, t3, t4), config);
    }

    pub fn bond(&self, t1: T, t2: T) -> Option<&BondConfiguration> {
        self.bonds.get(&canonical_pair(t1, t2))
    }

    pub fn angle(&self, t1: T, t2: T, t3: T) -> Option<&AngleConfiguration> {
        self.angles.get(&canonical_triple(t1, t2, t3))
    }

    pub fn torsion(&self, t1: T, t2: T, t3: T, t4: T) -> Option<&TorsionConfiguration> {
        self.torsions.get(&canonical_quadruple(t1, t2, t3, t4))
    }
}
