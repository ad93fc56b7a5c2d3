//! Plain data types shared by the kernel and the topology engine.
//!
//! - [`geometry`] – Simulation box, minimum-image differences and position wrapping.
//! - [`particle`] – Particle identities and the rows of the particle table.
//! - [`store`] – The dense particle table and the batched update contract.
//! - [`types`] – Particle type registry and flavors.
//! - [`reaction`] – Reaction rules and their registry.
//! - [`record`] – Optional per-step reaction diagnostics.
//! - [`topology`] – Bonded potential terms derived from a topology graph.
//! - [`context`] – The read-only description of a system handed to the kernel.
//!
//! Nothing in here mutates particles on its own; the [`crate::kernel`] owns
//! the step loop and funnels every change through [`store::ParticleDataStore::update`].

pub mod context;
pub mod geometry;
pub mod particle;
pub mod reaction;
pub mod record;
pub mod store;
pub mod topology;
pub mod types;
