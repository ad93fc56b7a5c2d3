//! Bonded particle topologies and their structural reactions.
//!
//! A [`GraphTopology`] ties a [`Graph`] to a slice of particle-store indices:
//! vertex `i` of the graph represents the store entry `particles()[i]`. Its
//! bonded potential terms are derived from the graph on [`GraphTopology::configure`]
//! and consumed by an external force evaluation. Structural reactions live in
//! [`reactions`].

pub mod error;
pub mod graph;
pub mod potentials;
pub mod reactions;

pub use error::Error;
pub use graph::{Component, Graph, NTuples, Vertex};

use crate::model::topology::{AnglePotential, BondPotential, DihedralPotential, TopologyPotentials};
use crate::model::types::ParticleTypeId;
use potentials::TopologyPotentialRegistry;
use reactions::TopologyReaction;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOPOLOGY_ID: AtomicU64 = AtomicU64::new(0);

/// A bonded group of particles: store indices, their graph, derived
/// potentials and the structural reactions that may fire on it.
#[derive(Debug, Clone)]
pub struct GraphTopology {
    id: u64,
    particles: Vec<usize>,
    graph: Graph,
    potentials: TopologyPotentials,
    reactions: Vec<Arc<TopologyReaction>>,
    rates: Vec<f64>,
}

impl GraphTopology {
    /// Creates an edgeless topology over `(store index, particle type)` pairs.
    pub fn new<I>(particles: I) -> Self
    where
        I: IntoIterator<Item = (usize, ParticleTypeId)>,
    {
        let (particles, types): (Vec<usize>, Vec<ParticleTypeId>) = particles.into_iter().unzip();
        Self::from_parts(particles, Graph::from_types(types), Vec::new())
    }

    fn from_parts(particles: Vec<usize>, graph: Graph, reactions: Vec<Arc<TopologyReaction>>) -> Self {
        let rates = vec![0.0; reactions.len()];
        Self {
            id: NEXT_TOPOLOGY_ID.fetch_add(1, Ordering::Relaxed),
            particles,
            graph,
            potentials: TopologyPotentials::default(),
            reactions,
            rates,
        }
    }

    /// Process-wide unique identity, fresh for every split child.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Store indices of the topology's particles, in vertex order.
    pub fn particles(&self) -> &[usize] {
        &self.particles
    }

    pub fn n_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable graph access. Potentials and rates are stale until the next
    /// `configure` and `update_reaction_rates`.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn potentials(&self) -> &TopologyPotentials {
        &self.potentials
    }

    /// Bonds two vertices during setup. Already bonded pairs are left alone.
    pub fn add_edge(&mut self, a: usize, b: usize) -> Result<(), Error> {
        self.graph.add_edge(a, b).map(|_| ())
    }

    /// Labels vertex `v` so recipes can address it by name.
    pub fn set_label(&mut self, v: usize, label: impl Into<String>) -> Result<(), Error> {
        self.graph.set_label(v, label)
    }

    pub fn add_reaction(&mut self, reaction: TopologyReaction) {
        self.add_shared_reaction(Arc::new(reaction));
    }

    /// Adds a reaction shared with other topologies, e.g. split siblings.
    pub fn add_shared_reaction(&mut self, reaction: Arc<TopologyReaction>) {
        self.reactions.push(reaction);
        self.rates.push(0.0);
    }

    pub fn reactions(&self) -> &[Arc<TopologyReaction>] {
        &self.reactions
    }

    /// Cached rates, valid after [`GraphTopology::update_reaction_rates`].
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Sum of the cached reaction rates.
    pub fn cumulative_rate(&self) -> f64 {
        self.rates.iter().sum()
    }

    /// Re-evaluates every reaction's rate against the current graph.
    pub fn update_reaction_rates(&mut self) {
        let rates = self.reactions.iter().map(|r| r.rate(self)).collect();
        self.rates = rates;
    }

    /// Derives bonded potential terms from the current graph.
    ///
    /// Every bond needs a configuration for its type pair. Angles and torsions
    /// without a configuration are skipped.
    pub fn configure(&mut self, registry: &TopologyPotentialRegistry) -> Result<(), Error> {
        let tuples = self.graph.find_n_tuples();
        let type_of = |v: usize| self.graph.vertices()[v].particle_type;
        let local = |v: usize| self.graph.vertices()[v].particle_index;

        let mut potentials = TopologyPotentials::default();
        for (i, j) in tuples.pairs {
            let (ti, tj) = (type_of(i), type_of(j));
            let config = registry
                .bond(ti, tj)
                .ok_or(Error::MissingBondConfiguration {
                    type1: ti.min(tj),
                    type2: ti.max(tj),
                })?;
            potentials.bonds.push(BondPotential::Harmonic {
                i: local(i),
                j: local(j),
                force_constant: config.force_constant,
                length: config.length,
            });
        }
        for (i, j, k) in tuples.triples {
            if let Some(config) = registry.angle(type_of(i), type_of(j), type_of(k)) {
                potentials.angles.push(AnglePotential::Harmonic {
                    i: local(i),
                    j: local(j),
                    k: local(k),
                    force_constant: config.force_constant,
                    theta0: config.equilibrium_angle,
                });
            }
        }
        for (i, j, k, l) in tuples.quadruples {
            if let Some(config) = registry.torsion(type_of(i), type_of(j), type_of(k), type_of(l)) {
                potentials.dihedrals.push(DihedralPotential {
                    i: local(i),
                    j: local(j),
                    k: local(k),
                    l: local(l),
                    force_constant: config.force_constant,
                    multiplicity: config.multiplicity,
                    phi0: config.phi0,
                });
            }
        }
        self.potentials = potentials;
        Ok(())
    }

    /// Replaces this topology by its connected components.
    ///
    /// The parent is left empty. Children inherit the parent's reactions, get
    /// fresh ids and have neither potentials nor rates until configured.
    pub fn split(&mut self) -> Vec<GraphTopology> {
        let graph = std::mem::take(&mut self.graph);
        let particles = std::mem::take(&mut self.particles);
        self.potentials.clear();
        graph
            .connected_components()
            .into_iter()
            .map(|component| {
                let child_particles = component
                    .original_particle_indices
                    .iter()
                    .map(|&local| particles[local])
                    .collect();
                Self::from_parts(child_particles, component.graph, self.reactions.clone())
            })
            .collect()
    }

    /// Rewrites store indices after the store was compacted.
    ///
    /// Returns `false` and leaves the topology untouched if one of its
    /// particles was removed by the compaction.
    pub fn remap_particles(&mut self, mapping: &[Option<usize>]) -> bool {
        let remapped: Option<Vec<usize>> = self
            .particles
            .iter()
            .map(|&p| mapping.get(p).copied().flatten())
            .collect();
        match remapped {
            Some(particles) => {
                self.particles = particles;
                true
            }
            None => false,
        }
    }
}
