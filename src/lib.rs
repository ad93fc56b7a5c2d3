//! A pure Rust kernel for particle-based reaction-diffusion simulations.
//! It finds reaction partners with a cell list, schedules stochastic reaction
//! events with conflict resolution on a worker pool, and runs transactional
//! structural reactions on bonded particle topologies.
//!
//! # Features
//!
//! - **Neighbor search**: Cell-list partition of a periodic or closed box with
//!   lazy minimum-image neighbor iteration and incremental updates
//! - **Reaction scheduling**: Rate-weighted Gillespie selection, independent
//!   fixed-step acceptance gathered on a thread pool, and a two-way spatial
//!   decomposition with halo resolution; no particle is consumed twice per step
//! - **Reactions**: Conversion, decay, fission, fusion and enzymatic reactions
//!   with optional per-event records and per-reaction counters
//! - **Topologies**: Bonded particle graphs whose structural reactions are
//!   applied as reversible actions, rolled back or raised on failure, and
//!   split into children when the graph falls apart
//! - **Setup documents**: Complete systems described in TOML
//!
//! # Quick Start
//!
//! ```
//! use rd_kernel::{Context, Kernel, KernelConfig, KernelError, ParticleFlavor};
//! use rd_kernel::{Reaction, SchedulerPolicy, SimulationBox};
//!
//! let mut ctx = Context::new(SimulationBox::new([10.0; 3], [true; 3]));
//! let a = ctx.add_particle_type("A", 1.0, 0.5, ParticleFlavor::Normal)?;
//! let b = ctx.add_particle_type("B", 1.0, 0.5, ParticleFlavor::Normal)?;
//! ctx.add_reaction(Reaction::fusion("bind", a, a, b, 1e6, 1.0))?;
//!
//! let config = KernelConfig {
//!     scheduler: SchedulerPolicy::Gillespie,
//!     exact_acceptance: true,
//!     record_reactions: true,
//!     ..Default::default()
//! };
//! let mut kernel = Kernel::new(ctx, config)?;
//! kernel.add_particles("A", [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [4.0, 4.0, 4.0]])?;
//!
//! let report = kernel.step(1.0)?;
//!
//! // The close pair fused into one B, the distant A is untouched.
//! assert_eq!(report.reactions.executed, 1);
//! assert_eq!(kernel.records().len(), 1);
//! let types: Vec<_> = kernel.particles().map(|p| p.type_id).collect();
//! assert_eq!(types.iter().filter(|&&t| t == b).count(), 1);
//! assert_eq!(types.iter().filter(|&&t| t == a).count(), 1);
//! # Ok::<(), KernelError>(())
//! ```
//!
//! # Module Organization
//!
//! - [`model`] – Plain data: box geometry, particles, the particle store,
//!   types, reactions, records and the [`Context`]
//! - [`kernel`] – The [`Kernel`] step loop, neighbor list, schedulers,
//!   compartments and configuration
//! - [`topology`] – Topology graphs, their potential configuration and
//!   structural reactions
//!
//! # Data Types
//!
//! ## System Description
//!
//! - [`Context`] – Box, particle types, reactions and topology potential configuration
//! - [`SimulationBox`] – Box edges and periodicity with minimum-image queries
//! - [`Reaction`] / [`ReactionKind`] – Reaction rules
//! - [`ParticleFlavor`] – Whether a type may be part of a topology
//!
//! ## Simulation State
//!
//! - [`ParticleStore`] – Dense particle table with deactivation and compaction
//! - [`GraphTopology`] – A bonded graph over store entries
//! - [`ReactionRecord`] / [`ReactionCounts`] – Optional diagnostics
//!
//! ## Configuration
//!
//! - [`KernelConfig`] – Scheduler, acceptance formula, seeding, threads and bookkeeping
//! - [`SchedulerPolicy`] – Gillespie, uncontrolled approximation or domain-parallel
//! - [`SystemSetup`] – TOML description of a complete system

pub mod kernel;
pub mod model;
pub mod topology;

pub use model::context::Context;
pub use model::geometry::{SimulationBox, Vec3};
pub use model::particle::{Particle, ParticleEntry, ParticleId};
pub use model::reaction::{InvalidReactionError, Reaction, ReactionKind, ReactionType};
pub use model::record::{ReactionCounts, ReactionRecord};
pub use model::store::{AppliedUpdate, ParticleDataStore, ParticleStore, ParticleUpdate};
pub use model::topology::{AnglePotential, BondPotential, DihedralPotential, TopologyPotentials};
pub use model::types::{
    ParticleFlavor, ParticleTypeId, ParticleTypeInfo, RegisterTypeError, UnknownParticleTypeError,
};

pub use kernel::{
    CellList, Compartment, Kernel, KernelConfig, PassStats, Region, SchedulerPolicy, StepReport,
    SystemSetup,
};
pub use topology::potentials::{AngleConfiguration, BondConfiguration, TorsionConfiguration};
pub use topology::reactions::{Recipe, TopologyReaction};
pub use topology::{Graph, GraphTopology};

pub use kernel::Error as KernelError;
pub use topology::Error as TopologyError;
