//! Bonded potential terms of a configured topology.
//!
//! Indices refer to topology-local particle indices, i.e. positions in
//! [`GraphTopology::particles`](crate::GraphTopology::particles). Evaluating
//! these terms is left to an external force component.

#[derive(Debug, Clone, PartialEq)]
pub enum BondPotential {
    Harmonic {
        i: usize,
        j: usize,
        force_constant: f64,
        length: f64,
    },
}

impl BondPotential {
    pub fn indices(&self) -> (usize, usize) {
        match *self {
            BondPotential::Harmonic { i, j, .. } => (i, j),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnglePotential {
    Harmonic {
        i: usize,
        j: usize,
        k: usize,
        force_constant: f64,
        theta0: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DihedralPotential {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
    pub force_constant: f64,
    pub multiplicity: i32,
    pub phi0: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologyPotentials {
    pub bonds: Vec<BondPotential>,
    pub angles: Vec<AnglePotential>,
    pub dihedrals: Vec<DihedralPotential>,
}

impl TopologyPotentials {
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty() && self.angles.is_empty() && self.dihedrals.is_empty()
    }

    pub fn clear(&mut self) {
        self.bonds.clear();
        self.angles.clear();
        self.dihedrals.clear();
    }
}
