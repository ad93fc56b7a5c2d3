mod compartments;
mod config;
mod error;
mod events;
mod neighbor_list;
mod reactions;
mod scheduler;

pub use compartments::{Compartment, Compartments, Region, RegionFn};
pub use config::{
    AngleSpec, BondSpec, CompartmentSpec, KernelConfig, ParticleTypeSpec, ReactionSpec,
    RegionSpec, SchedulerPolicy, SystemSetup, TorsionSpec,
};
pub use error::Error;
pub use events::{Event, acceptance_probability};
pub use neighbor_list::{CellList, NeighborIter};
pub use scheduler::PassStats;

use crate::model::context::Context;
use crate::model::geometry::Vec3;
use crate::model::particle::{Particle, ParticleEntry};
use crate::model::record::{ReactionCounts, ReactionRecord};
use crate::model::store::{ParticleDataStore, ParticleStore, ParticleUpdate};
use crate::model::types::ParticleFlavor;
use crate::topology::GraphTopology;
use crate::topology::reactions::Outcome;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::{ThreadPool, ThreadPoolBuilder};
use scheduler::ReactionPass;
use std::sync::Arc;

/// Summary of one [`Kernel::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Particles retyped by compartments.
    pub converted: usize,
    pub reactions: PassStats,
    /// Topology reactions that changed their topology.
    pub topology_reactions: usize,
    pub compacted: bool,
}

/// Owns a system and advances its reactions step by step.
///
/// Diffusion and forces are evaluated elsewhere; between two steps a caller
/// may move particles through [`Kernel::set_position`], which keeps the
/// neighbor list consistent.
pub struct Kernel {
    ctx: Context,
    config: KernelConfig,
    store: ParticleStore,
    cell_list: Option<CellList>,
    topologies: Vec<GraphTopology>,
    compartments: Compartments,
    rng: StdRng,
    pool: ThreadPool,
    records: Vec<ReactionRecord>,
    counts: ReactionCounts,
    n_steps: u64,
    neighbors_stale: bool,
    topologies_stale: bool,
}

impl Kernel {
    /// Builds the worker pool, the seeded generator and, when any reaction or
    /// interaction needs one, the cell list.
    pub fn new(ctx: Context, config: KernelConfig) -> Result<Self, Error> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.n_threads)
            .build()?;
        let cutoff = ctx.max_cutoff();
        let cell_list = if cutoff > 0.0 {
            Some(CellList::set_up(*ctx.simulation_box(), cutoff)?)
        } else {
            None
        };
        log::debug!(
            "kernel set up: {} types, {} reactions, cutoff {}, {} threads",
            ctx.particle_types().n_types(),
            ctx.reactions().len(),
            cutoff,
            pool.current_num_threads()
        );
        Ok(Self {
            counts: ReactionCounts::for_registry(ctx.reactions()),
            rng: StdRng::seed_from_u64(config.seed),
            ctx,
            config,
            store: ParticleStore::new(),
            cell_list,
            topologies: Vec::new(),
            compartments: Compartments::new(),
            pool,
            records: Vec::new(),
            n_steps: 0,
            neighbors_stale: true,
            topologies_stale: false,
        })
    }

    /// Builds a kernel from a parsed TOML system setup, compartments included.
    pub fn from_setup(setup: &SystemSetup) -> Result<Self, Error> {
        let ctx = setup.to_context()?;
        let compartments = setup.to_compartments(&ctx)?;
        let mut kernel = Self::new(ctx, setup.kernel.clone())?;
        kernel.compartments = compartments;
        Ok(kernel)
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    pub fn cell_list(&self) -> Option<&CellList> {
        self.cell_list.as_ref()
    }

    pub fn topologies(&self) -> &[GraphTopology] {
        &self.topologies
    }

    /// Mutable access to a registered topology, e.g. to add edges or
    /// reactions. Potentials and rates are re-derived before the next step.
    pub fn topology_mut(&mut self, index: usize) -> Option<&mut GraphTopology> {
        self.topologies_stale = true;
        self.topologies.get_mut(index)
    }

    pub fn compartments(&self) -> &Compartments {
        &self.compartments
    }

    /// Records of the last reaction pass, if recording is enabled.
    pub fn records(&self) -> &[ReactionRecord] {
        &self.records
    }

    /// Counts of the last reaction pass, if counting is enabled.
    pub fn counts(&self) -> &ReactionCounts {
        &self.counts
    }

    pub fn n_steps(&self) -> u64 {
        self.n_steps
    }

    /// Active particles, in store order.
    pub fn particles(&self) -> impl Iterator<Item = Particle> + '_ {
        self.store
            .entries()
            .iter()
            .filter(|e| !e.is_deactivated())
            .map(ParticleEntry::to_particle)
    }

    /// Inserts one particle of the named type at the wrapped `position`
    /// and returns its store index.
    pub fn add_particle(&mut self, type_name: &str, position: Vec3) -> Result<usize, Error> {
        let mut indices = self.add_particles(type_name, [position])?;
        Ok(indices.remove(0))
    }

    /// Adds particles of one type. Positions are wrapped into the box.
    pub fn add_particles<I>(&mut self, type_name: &str, positions: I) -> Result<Vec<usize>, Error>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let type_id = self.ctx.type_id(type_name)?;
        let simulation_box = *self.ctx.simulation_box();
        let indices = self.store.add_particles(
            positions
                .into_iter()
                .map(|p| Particle::new(type_id, simulation_box.wrapped(p))),
        );
        self.neighbors_stale = true;
        Ok(indices)
    }

    /// Moves an active particle, e.g. after an external diffusion step.
    pub fn set_position(&mut self, index: usize, position: Vec3) -> Result<(), Error> {
        if index >= self.store.size() {
            return Err(Error::InvalidParticleIndex {
                index,
                reason: "out of range",
            });
        }
        let entry = self.store.entry_at_mut(index);
        if entry.is_deactivated() {
            return Err(Error::InvalidParticleIndex {
                index,
                reason: "deactivated",
            });
        }
        let mut position = position;
        self.ctx.fix_position(&mut position);
        entry.position = position;
        self.neighbors_stale = true;
        Ok(())
    }

    /// Registers a topology over new particles, given as `(type name, position)`.
    ///
    /// All types must be topology-flavored. The topology starts without edges
    /// and is returned for further setup.
    pub fn add_topology<'n, I>(&mut self, particles: I) -> Result<&mut GraphTopology, Error>
    where
        I: IntoIterator<Item = (&'n str, Vec3)>,
    {
        let types = self.ctx.particle_types();
        let mut resolved = Vec::new();
        for (i, (name, position)) in particles.into_iter().enumerate() {
            let type_id = types.id_of(name)?;
            if types.flavor_of(type_id) != Some(ParticleFlavor::Topology) {
                return Err(Error::invalid_topology_particle(
                    i,
                    format!("type '{}' is not topology-flavored", name),
                ));
            }
            resolved.push(Particle::new(type_id, self.ctx.simulation_box().wrapped(position)));
        }
        let type_ids: Vec<_> = resolved.iter().map(|p| p.type_id).collect();
        let indices = self.store.add_particles(resolved);
        self.topologies
            .push(GraphTopology::new(indices.into_iter().zip(type_ids)));
        self.neighbors_stale = true;
        self.topologies_stale = true;
        let last = self.topologies.len() - 1;
        Ok(&mut self.topologies[last])
    }

    /// Registers a compartment, applied from the next step on.
    pub fn add_compartment(&mut self, compartment: Compartment) -> usize {
        self.compartments.add(compartment)
    }

    /// Adds a compartment with conversions given by type name.
    pub fn add_compartment_by_names(
        &mut self,
        name: &str,
        region: Region,
        conversions: &[(&str, &str)],
    ) -> Result<usize, Error> {
        let mut compartment = Compartment::new(name, region);
        for (from, to) in conversions {
            compartment = compartment.with_conversion(self.ctx.type_id(from)?, self.ctx.type_id(to)?);
        }
        Ok(self.compartments.add(compartment))
    }

    /// Assigns every active particle to its cell from scratch.
    pub fn update_neighbor_list(&mut self) {
        if let Some(list) = self.cell_list.as_mut() {
            list.fill_cells(&self.store);
        }
        self.neighbors_stale = false;
    }

    /// Brings the neighbor list and topology potentials up to date.
    pub fn initialize(&mut self) -> Result<(), Error> {
        if self.topologies_stale {
            for topology in &mut self.topologies {
                topology.configure(self.ctx.topology_potentials())?;
                topology.update_reaction_rates();
            }
            self.topologies_stale = false;
        }
        if self.neighbors_stale {
            self.update_neighbor_list();
        }
        Ok(())
    }

    /// Runs one reaction pass over free particles under the configured policy.
    pub fn evaluate_reactions(&mut self, dt: f64) -> Result<PassStats, Error> {
        self.initialize()?;
        self.records.clear();
        self.counts.reset(self.ctx.reactions());

        let bound = self.bound_particles();
        let pass = ReactionPass {
            ctx: &self.ctx,
            store: &mut self.store,
            cell_list: self.cell_list.as_ref(),
            bound: &bound,
            pool: &self.pool,
            dt,
            exact: self.config.exact_acceptance,
            records: self.config.record_reactions.then_some(&mut self.records),
            counts: self.config.record_counts.then_some(&mut self.counts),
        };
        let (update, stats) = pass.run(self.config.scheduler, &mut self.rng);
        self.apply_update(update);
        Ok(stats)
    }

    /// Flags every store index owned by a topology.
    fn bound_particles(&self) -> Vec<bool> {
        let mut bound = Vec::new();
        if self.topologies.is_empty() {
            return bound;
        }
        bound.resize(self.store.size(), false);
        for &index in self.topologies.iter().flat_map(|t| t.particles()) {
            bound[index] = true;
        }
        bound
    }

    fn apply_update(&mut self, update: ParticleUpdate) {
        if update.is_empty() {
            return;
        }
        let applied = self.store.update(update);
        if let Some(list) = self.cell_list.as_mut()
            && list.update_data(&self.store, &applied, self.config.rebuild_threshold)
        {
            log::debug!("cell list rebuilt after {} changes", applied.n_changes());
        }
    }

    /// Gives every topology the chance to fire one structural reaction.
    ///
    /// A topology with total rate `r` reacts with probability `1 - exp(-r·dt)`,
    /// picking one reaction proportionally to its rate. Split children replace
    /// their parent; single-vertex children whose particle left the topology
    /// flavor are dissolved into free particles. An error stops the pass and
    /// leaves the remaining topologies untouched.
    pub fn evaluate_topology_reactions(&mut self, dt: f64) -> Result<usize, Error> {
        self.initialize()?;
        let topologies = std::mem::take(&mut self.topologies);
        let mut survivors = Vec::with_capacity(topologies.len());
        let mut executed = 0;
        let mut failure = None;

        for mut topology in topologies {
            if failure.is_some() {
                survivors.push(topology);
                continue;
            }
            let total = topology.cumulative_rate();
            if total <= 0.0 || self.rng.gen_range(0.0..1.0) >= 1.0 - (-total * dt).exp() {
                survivors.push(topology);
                continue;
            }

            let x = self.rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            let mut chosen = topology.rates().len() - 1;
            for (k, rate) in topology.rates().iter().enumerate() {
                cumulative += rate;
                if x < cumulative {
                    chosen = k;
                    break;
                }
            }
            let reaction = Arc::clone(&topology.reactions()[chosen]);

            match reaction.execute(&mut topology, &mut self.store, &self.ctx, &mut self.rng) {
                Ok(Outcome::InPlace) => {
                    executed += 1;
                    survivors.push(topology);
                }
                Ok(Outcome::RolledBack) => survivors.push(topology),
                Ok(Outcome::Split(children)) => {
                    executed += 1;
                    let types = self.ctx.particle_types();
                    for child in children {
                        let dissolves = child.n_particles() == 1
                            && types.flavor_of(child.graph().vertices()[0].particle_type)
                                != Some(ParticleFlavor::Topology);
                        if dissolves {
                            log::debug!(
                                "topology {} dissolved into free particle {}",
                                child.id(),
                                child.particles()[0]
                            );
                        } else {
                            survivors.push(child);
                        }
                    }
                }
                Err(e) => {
                    log::warn!(
                        "topology reaction '{}' on topology {} failed: {}",
                        reaction.name(),
                        topology.id(),
                        e
                    );
                    survivors.push(topology);
                    failure = Some(e);
                }
            }
        }

        self.topologies = survivors;
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(executed),
        }
    }

    /// Removes deactivated entries, remapping topologies and rebuilding the
    /// neighbor list.
    pub fn compact(&mut self) {
        let mapping = self.store.compact();
        self.topologies.retain_mut(|topology| {
            let kept = topology.remap_particles(&mapping);
            if !kept {
                log::error!(
                    "critical: topology {} referenced a removed particle and was dropped",
                    topology.id()
                );
            }
            kept
        });
        self.update_neighbor_list();
    }

    /// Compartment conversions, the reaction pass and the topology pass, in
    /// that order, followed by compaction once enough slots are dead.
    pub fn step(&mut self, dt: f64) -> Result<StepReport, Error> {
        self.initialize()?;
        let bound = self.bound_particles();
        let converted = self.compartments.apply(&self.ctx, &mut self.store, &bound);
        let reactions = self.evaluate_reactions(dt)?;
        let topology_reactions = self.evaluate_topology_reactions(dt)?;

        let size = self.store.size();
        let compacted = size > 0
            && self.config.compaction_threshold < 1.0
            && self.store.n_deactivated() as f64 > self.config.compaction_threshold * size as f64;
        if compacted {
            self.compact();
        }
        self.n_steps += 1;
        Ok(StepReport {
            converted,
            reactions,
            topology_reactions,
            compacted,
        })
    }

    /// Runs `n_steps` steps of length `dt`, stopping at the first error.
    pub fn run(&mut self, n_steps: usize, dt: f64) -> Result<(), Error> {
        for _ in 0..n_steps {
            self.step(dt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::geometry::SimulationBox;
    use crate::model::reaction::Reaction;
    use crate::topology::Error as TopologyError;
    use crate::topology::potentials::BondConfiguration;
    use crate::topology::reactions::{Recipe, TopologyReaction};

    fn make_decay_kernel(policy: SchedulerPolicy) -> Kernel {
        let mut ctx = Context::new(SimulationBox::new([10.0; 3], [true; 3]));
        let a = ctx
            .add_particle_type("A", 1.0, 0.5, ParticleFlavor::Normal)
            .unwrap();
        ctx.add_reaction(Reaction::decay("decay", a, 1.0)).unwrap();
        let config = KernelConfig {
            scheduler: policy,
            exact_acceptance: true,
            n_threads: 2,
            seed: 1234,
            ..Default::default()
        };
        Kernel::new(ctx, config).unwrap()
    }

    fn make_topology_context() -> Context {
        let mut ctx = Context::new(SimulationBox::new([10.0; 3], [true; 3]));
        ctx.add_particle_type("A", 1.0, 0.5, ParticleFlavor::Normal)
            .unwrap();
        ctx.add_particle_type("T", 1.0, 0.5, ParticleFlavor::Topology)
            .unwrap();
        ctx.configure_topology_bond_potential(
            "T",
            "T",
            BondConfiguration {
                force_constant: 10.0,
                length: 1.0,
            },
        )
        .unwrap();
        ctx
    }

    fn add_chain(kernel: &mut Kernel, n: usize) -> &mut GraphTopology {
        let particles: Vec<(&str, Vec3)> = (0..n).map(|i| ("T", [i as f64, 0.0, 0.0])).collect();
        let topology = kernel.add_topology(particles).unwrap();
        for i in 1..n {
            topology.add_edge(i - 1, i).unwrap();
        }
        topology
    }

    fn decay_grid(kernel: &mut Kernel, n: usize) {
        let positions = (0..n).map(|i| {
            let x = (i % 10) as f64 - 4.5;
            let y = ((i / 10) % 10) as f64 - 4.5;
            let z = (i / 100) as f64 - 4.5;
            [x, y, z]
        });
        kernel.add_particles("A", positions).unwrap();
    }

    #[test]
    fn decay_population_trends_to_zero() {
        for policy in [
            SchedulerPolicy::Gillespie,
            SchedulerPolicy::UncontrolledApproximation,
            SchedulerPolicy::GillespieParallel,
        ] {
            let mut kernel = make_decay_kernel(policy);
            decay_grid(&mut kernel, 200);

            let mut remaining = vec![kernel.store().n_active()];
            for _ in 0..20 {
                kernel.step(1.0).unwrap();
                remaining.push(kernel.store().n_active());
            }
            assert!(remaining.windows(2).all(|w| w[1] <= w[0]));
            // survival per step is exp(-1); 200 e^-1 ≈ 74
            assert!((40..=110).contains(&remaining[1]), "{policy:?}: {:?}", remaining);
            assert!(remaining[20] <= 2, "{policy:?}: {:?}", remaining);
        }
    }

    #[test]
    fn records_and_counts_follow_configuration() {
        let mut kernel = make_decay_kernel(SchedulerPolicy::Gillespie);
        kernel.config.record_reactions = true;
        kernel.config.record_counts = true;
        decay_grid(&mut kernel, 50);

        let stats = kernel.evaluate_reactions(1.0).unwrap();
        assert_eq!(kernel.records().len(), stats.executed);
        assert_eq!(kernel.counts().total(), stats.executed);
        assert_eq!(kernel.store().n_active(), 50 - stats.executed);

        kernel.config.record_reactions = false;
        kernel.evaluate_reactions(1.0).unwrap();
        assert!(kernel.records().is_empty());
    }

    #[test]
    fn compaction_keeps_topologies_consistent() {
        let mut ctx = make_topology_context();
        let a = ctx.type_id("A").unwrap();
        ctx.add_reaction(Reaction::decay("decay", a, 50.0)).unwrap();
        let config = KernelConfig {
            exact_acceptance: true,
            compaction_threshold: 0.2,
            ..Default::default()
        };
        let mut kernel = Kernel::new(ctx, config).unwrap();
        kernel.add_particles("A", [[1.0, 1.0, 1.0]; 6]).unwrap();
        add_chain(&mut kernel, 3);

        let report = kernel.step(1.0).unwrap();
        assert!(report.compacted);
        assert_eq!(kernel.store().size(), 3);
        let topology = &kernel.topologies()[0];
        assert_eq!(topology.particles(), &[0, 1, 2]);
        for &index in topology.particles() {
            assert_eq!(kernel.store().entry_at(index).type_id, 1);
        }
    }

    #[test]
    fn topology_particles_must_be_topology_flavored() {
        let mut kernel = Kernel::new(make_topology_context(), KernelConfig::default()).unwrap();
        let err = kernel
            .add_topology([("T", [0.0; 3]), ("A", [1.0, 0.0, 0.0])])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTopologyParticle { index: 1, .. }));
        assert!(kernel.topologies().is_empty());
        assert_eq!(kernel.store().size(), 0);
    }

    #[test]
    fn breaking_reaction_splits_and_dissolves() {
        let mut kernel = Kernel::new(make_topology_context(), KernelConfig::default()).unwrap();
        let a = kernel.context().type_id("A").unwrap();
        let topology = add_chain(&mut kernel, 3);
        topology.add_reaction(TopologyReaction::new(
            "release_head",
            move |top: &GraphTopology, _: &mut dyn rand::RngCore| {
                let mut recipe = Recipe::new(top);
                recipe.change_particle_type(0usize, a).remove_edge(0usize, 1usize);
                recipe
            },
            1e6,
        ));

        let executed = kernel.evaluate_topology_reactions(1.0).unwrap();
        assert_eq!(executed, 1);
        assert_eq!(kernel.topologies().len(), 1);
        let survivor = &kernel.topologies()[0];
        assert_eq!(survivor.particles(), &[1, 2]);
        assert_eq!(survivor.graph().n_edges(), 1);
        assert_eq!(survivor.potentials().bonds.len(), 1);
        assert_eq!(kernel.store().entry_at(0).type_id, a);
        assert!(kernel.store().is_active(0));
    }

    #[test]
    fn raising_reaction_aborts_the_pass() {
        let mut kernel = Kernel::new(make_topology_context(), KernelConfig::default()).unwrap();
        let topology = add_chain(&mut kernel, 3);
        topology.add_reaction(
            TopologyReaction::new(
                "break",
                |top: &GraphTopology, _: &mut dyn rand::RngCore| {
                    let mut recipe = Recipe::new(top);
                    recipe.remove_edge(1usize, 2usize);
                    recipe
                },
                1e6,
            )
            .expect_connected()
            .raise_if_invalid(),
        );

        let err = kernel.evaluate_topology_reactions(1.0).unwrap_err();
        assert!(matches!(
            err,
            Error::Topology(TopologyError::StructuralViolation { .. })
        ));
        assert_eq!(kernel.topologies().len(), 1);
    }

    #[test]
    fn moved_particles_are_reindexed() {
        let mut ctx = make_topology_context();
        let a = ctx.type_id("A").unwrap();
        ctx.add_reaction(Reaction::fusion("fuse", a, a, a, 1e6, 1.0))
            .unwrap();
        let config = KernelConfig {
            scheduler: SchedulerPolicy::Gillespie,
            exact_acceptance: true,
            compaction_threshold: 1.0,
            ..Default::default()
        };
        let mut kernel = Kernel::new(ctx, config).unwrap();
        kernel.add_particles("A", [[0.0; 3], [4.0, 0.0, 0.0]]).unwrap();
        kernel.initialize().unwrap();
        assert_eq!(kernel.evaluate_reactions(1.0).unwrap().executed, 0);

        kernel.set_position(1, [0.5, 0.0, 0.0]).unwrap();
        let stats = kernel.evaluate_reactions(1.0).unwrap();
        assert_eq!(stats.executed, 1);
        assert_eq!(kernel.particles().count(), 1);
    }

    #[test]
    fn set_position_rejects_missing_and_deactivated_particles() {
        let mut kernel = make_decay_kernel(SchedulerPolicy::Gillespie);
        kernel.add_particles("A", [[0.0; 3]]).unwrap();
        assert!(matches!(
            kernel.set_position(3, [1.0, 0.0, 0.0]),
            Err(Error::InvalidParticleIndex { index: 3, .. })
        ));

        kernel.set_position(0, [6.0, 0.0, 0.0]).unwrap();
        assert_eq!(kernel.store().entry_at(0).position, [-4.0, 0.0, 0.0]);

        kernel.store.deactivate(0);
        assert!(matches!(
            kernel.set_position(0, [1.0, 0.0, 0.0]),
            Err(Error::InvalidParticleIndex { index: 0, .. })
        ));
        assert_eq!(kernel.store().entry_at(0).position, [-4.0, 0.0, 0.0]);
    }

    #[test]
    fn topology_vertices_are_never_consumed_by_particle_reactions() {
        let mut ctx = make_topology_context();
        ctx.configure_topology_bond_potential(
            "T",
            "A",
            BondConfiguration {
                force_constant: 10.0,
                length: 1.0,
            },
        )
        .unwrap();
        let a = ctx.type_id("A").unwrap();
        ctx.add_reaction(Reaction::decay("decay", a, 1e6)).unwrap();
        for policy in [
            SchedulerPolicy::Gillespie,
            SchedulerPolicy::UncontrolledApproximation,
            SchedulerPolicy::GillespieParallel,
        ] {
            let config = KernelConfig {
                scheduler: policy,
                exact_acceptance: true,
                ..Default::default()
            };
            let mut kernel = Kernel::new(ctx.clone(), config).unwrap();
            let topology = add_chain(&mut kernel, 3);
            topology.add_reaction(TopologyReaction::new(
                "retype_tail",
                move |top: &GraphTopology, _: &mut dyn rand::RngCore| {
                    let mut recipe = Recipe::new(top);
                    recipe.change_particle_type(2usize, a);
                    recipe
                },
                1e6,
            ));
            let free = kernel.add_particles("A", [[0.0, 4.0, 0.0]]).unwrap()[0];

            kernel.step(1.0).unwrap();
            kernel.step(1.0).unwrap();

            assert!(!kernel.store().is_active(free), "{policy:?}");
            assert_eq!(kernel.topologies().len(), 1, "{policy:?}");
            let topology = &kernel.topologies()[0];
            assert_eq!(topology.n_particles(), 3);
            for &index in topology.particles() {
                assert!(kernel.store().is_active(index), "{policy:?}: {index}");
            }
            let tail = topology.particles()[2];
            assert_eq!(kernel.store().entry_at(tail).type_id, a);
        }
    }

    #[test]
    fn unconfigurable_split_keeps_the_parent() {
        let mut ctx = make_topology_context();
        ctx.add_particle_type("U", 1.0, 0.5, ParticleFlavor::Topology)
            .unwrap();
        let u = ctx.type_id("U").unwrap();
        let t = ctx.type_id("T").unwrap();
        let mut kernel = Kernel::new(ctx, KernelConfig::default()).unwrap();
        let topology = add_chain(&mut kernel, 3);
        topology.add_reaction(TopologyReaction::new(
            "retype_and_cut",
            move |top: &GraphTopology, _: &mut dyn rand::RngCore| {
                let mut recipe = Recipe::new(top);
                recipe.change_particle_type(2usize, u).remove_edge(0usize, 1usize);
                recipe
            },
            1e6,
        ));
        kernel.initialize().unwrap();
        let before = kernel.topologies()[0].graph().clone();

        let err = kernel.evaluate_topology_reactions(1.0).unwrap_err();
        assert!(matches!(
            err,
            Error::Topology(TopologyError::MissingBondConfiguration { .. })
        ));
        assert_eq!(kernel.topologies().len(), 1);
        let topology = &kernel.topologies()[0];
        assert_eq!(topology.particles(), &[0, 1, 2]);
        assert_eq!(topology.graph(), &before);
        assert_eq!(topology.potentials().bonds.len(), 2);
        assert_eq!(kernel.store().entry_at(2).type_id, t);
    }

    #[test]
    fn builds_from_setup() {
        let setup = SystemSetup::from_toml(
            r#"
            [box]
            size = [8.0, 8.0, 8.0]

            [kernel]
            scheduler = "uncontrolled_approximation"
            seed = 3

            [[particle_types]]
            name = "A"
            diffusion_constant = 1.0

            [[particle_types]]
            name = "B"
            diffusion_constant = 1.0

            [[reactions]]
            kind = "conversion"
            name = "ab"
            from = "A"
            to = "B"
            rate = 0.0

            [[compartments]]
            name = "left"
            region = { shape = "plane", normal = [1.0, 0.0, 0.0], distance = 0.0 }
            conversions = { A = "B" }
            "#,
        )
        .unwrap();
        let mut kernel = Kernel::from_setup(&setup).unwrap();
        assert!(kernel.cell_list().is_none());
        kernel
            .add_particles("A", [[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
            .unwrap();

        let report = kernel.step(0.1).unwrap();
        assert_eq!(report.converted, 1);
        assert_eq!(kernel.store().entry_at(0).type_id, 1);
        assert_eq!(kernel.store().entry_at(1).type_id, 0);
        assert_eq!(kernel.n_steps(), 1);
    }
}
