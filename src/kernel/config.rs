//! Kernel configuration and TOML system setup documents.
//!
//! - [`KernelConfig`] – Scheduler selection, seeding, threading and bookkeeping knobs.
//! - [`SchedulerPolicy`] – Which reaction scheduler runs each step.
//! - [`SystemSetup`] – A complete system (box, types, reactions, topology
//!   potentials, compartments) described in TOML.
//!
//! # Examples
//!
//! ```
//! use rd_kernel::{SchedulerPolicy, SystemSetup};
//!
//! let setup = SystemSetup::from_toml(r#"
//!     [box]
//!     size = [10.0, 10.0, 10.0]
//!
//!     [kernel]
//!     scheduler = "gillespie"
//!     seed = 7
//!
//!     [[particle_types]]
//!     name = "A"
//!     diffusion_constant = 1.0
//!
//!     [[particle_types]]
//!     name = "B"
//!     diffusion_constant = 1.0
//!
//!     [[reactions]]
//!     kind = "fusion"
//!     name = "bind"
//!     from1 = "A"
//!     from2 = "A"
//!     to = "B"
//!     rate = 0.5
//!     educt_distance = 1.0
//! "#).unwrap();
//!
//! assert_eq!(setup.kernel.scheduler, SchedulerPolicy::Gillespie);
//! let ctx = setup.to_context().unwrap();
//! assert_eq!(ctx.max_cutoff(), 1.0);
//! ```

use super::compartments::{Compartment, Compartments, Region};
use super::error::Error;
use crate::model::context::Context;
use crate::model::geometry::{SimulationBox, Vec3};
use crate::model::reaction::Reaction;
use crate::model::types::{ParticleFlavor, ParticleTypeRegistry};
use crate::topology::potentials::{AngleConfiguration, BondConfiguration, TorsionConfiguration};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Reaction scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPolicy {
    /// Repeated single draws weighted by cumulative rate, serial.
    Gillespie,
    /// Independent per-event acceptance, shuffled serial execution.
    #[default]
    UncontrolledApproximation,
    /// Gillespie-style acceptance on two spatial halves in parallel, halo events serial.
    GillespieParallel,
}

/// Main configuration of a [`Kernel`](super::Kernel).
///
/// # Examples
///
/// ```
/// use rd_kernel::{KernelConfig, SchedulerPolicy};
///
/// let config = KernelConfig {
///     scheduler: SchedulerPolicy::GillespieParallel,
///     n_threads: 2,
///     ..Default::default()
/// };
/// assert!(!config.exact_acceptance);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub scheduler: SchedulerPolicy,

    /// Accept events with `1 - exp(-r·dt)` instead of `r·dt`.
    pub exact_acceptance: bool,

    /// Worker threads for the gather phase. `0` lets rayon decide.
    pub n_threads: usize,

    /// Seed of the kernel's random number generator.
    pub seed: u64,

    /// Append a [`ReactionRecord`](crate::ReactionRecord) per executed event.
    pub record_reactions: bool,

    /// Count executed events per reaction.
    pub record_counts: bool,

    /// Fraction of changed entries above which the cell list is rebuilt
    /// from scratch instead of being updated incrementally.
    pub rebuild_threshold: f64,

    /// Fraction of deactivated store slots above which the store is
    /// compacted at the end of a step. Values `>= 1` disable compaction.
    pub compaction_threshold: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerPolicy::default(),
            exact_acceptance: false,
            n_threads: 0,
            seed: 0,
            record_reactions: false,
            record_counts: false,
            rebuild_threshold: 0.1,
            compaction_threshold: 0.5,
        }
    }
}

fn default_weight() -> f64 {
    0.5
}

/// A particle type entry of the setup document.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticleTypeSpec {
    pub name: String,
    pub diffusion_constant: f64,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub flavor: ParticleFlavor,
}

/// A reaction as written in a setup document, with types given by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReactionSpec {
    Conversion {
        name: String,
        from: String,
        to: String,
        rate: f64,
    },
    Decay {
        name: String,
        from: String,
        rate: f64,
    },
    Fission {
        name: String,
        from: String,
        to1: String,
        to2: String,
        rate: f64,
        product_distance: f64,
        #[serde(default = "default_weight")]
        weight1: f64,
        #[serde(default = "default_weight")]
        weight2: f64,
    },
    Fusion {
        name: String,
        from1: String,
        from2: String,
        to: String,
        rate: f64,
        educt_distance: f64,
        #[serde(default = "default_weight")]
        weight1: f64,
        #[serde(default = "default_weight")]
        weight2: f64,
    },
    Enzymatic {
        name: String,
        catalyst: String,
        from: String,
        to: String,
        rate: f64,
        educt_distance: f64,
    },
}

impl ReactionSpec {
    /// Resolves type names into a [`Reaction`].
    pub fn to_reaction(&self, types: &ParticleTypeRegistry) -> Result<Reaction, Error> {
        let id = |name: &String| types.id_of(name);
        Ok(match self {
            ReactionSpec::Conversion {
                name,
                from,
                to,
                rate,
            } => Reaction::conversion(name, id(from)?, id(to)?, *rate),
            ReactionSpec::Decay { name, from, rate } => Reaction::decay(name, id(from)?, *rate),
            ReactionSpec::Fission {
                name,
                from,
                to1,
                to2,
                rate,
                product_distance,
                weight1,
                weight2,
            } => Reaction::fission(name, id(from)?, id(to1)?, id(to2)?, *rate, *product_distance)
                .with_weights(*weight1, *weight2),
            ReactionSpec::Fusion {
                name,
                from1,
                from2,
                to,
                rate,
                educt_distance,
                weight1,
                weight2,
            } => Reaction::fusion(name, id(from1)?, id(from2)?, id(to)?, *rate, *educt_distance)
                .with_weights(*weight1, *weight2),
            ReactionSpec::Enzymatic {
                name,
                catalyst,
                from,
                to,
                rate,
                educt_distance,
            } => Reaction::enzymatic(name, id(catalyst)?, id(from)?, id(to)?, *rate, *educt_distance),
        })
    }
}

/// Bond configuration between two topology particle types.
#[derive(Debug, Clone, Deserialize)]
pub struct BondSpec {
    pub types: [String; 2],
    #[serde(flatten)]
    pub config: BondConfiguration,
}

/// Angle configuration; the middle name is the central type.
#[derive(Debug, Clone, Deserialize)]
pub struct AngleSpec {
    pub types: [String; 3],
    #[serde(flatten)]
    pub config: AngleConfiguration,
}

/// Torsion configuration along a chain of four types.
#[derive(Debug, Clone, Deserialize)]
pub struct TorsionSpec {
    pub types: [String; 4],
    #[serde(flatten)]
    pub config: TorsionConfiguration,
}

/// Compartment region, tagged by `shape`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RegionSpec {
    Sphere {
        origin: Vec3,
        radius: f64,
        #[serde(default)]
        larger: bool,
    },
    Plane {
        normal: Vec3,
        distance: f64,
        #[serde(default)]
        larger: bool,
    },
}

impl From<RegionSpec> for Region {
    fn from(spec: RegionSpec) -> Self {
        match spec {
            RegionSpec::Sphere {
                origin,
                radius,
                larger,
            } => Region::Sphere {
                origin,
                radius,
                larger,
            },
            RegionSpec::Plane {
                normal,
                distance,
                larger,
            } => Region::Plane {
                normal,
                distance,
                larger,
            },
        }
    }
}

/// A compartment with conversions given as `from = "to"` type names.
#[derive(Debug, Clone, Deserialize)]
pub struct CompartmentSpec {
    pub name: String,
    pub region: RegionSpec,
    /// Type conversions `from = "to"`.
    #[serde(default)]
    pub conversions: BTreeMap<String, String>,
}

/// Complete description of a system, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemSetup {
    #[serde(rename = "box")]
    pub simulation_box: SimulationBox,
    /// Cutoff of externally evaluated pair interactions.
    #[serde(default)]
    pub interaction_cutoff: f64,
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub particle_types: Vec<ParticleTypeSpec>,
    #[serde(default)]
    pub reactions: Vec<ReactionSpec>,
    #[serde(default)]
    pub topology_bonds: Vec<BondSpec>,
    #[serde(default)]
    pub topology_angles: Vec<AngleSpec>,
    #[serde(default)]
    pub topology_torsions: Vec<TorsionSpec>,
    #[serde(default)]
    pub compartments: Vec<CompartmentSpec>,
}

impl SystemSetup {
    /// Parses a setup document. Missing sections fall back to their defaults.
    pub fn from_toml(document: &str) -> Result<Self, Error> {
        Ok(toml::from_str(document)?)
    }

    /// Builds the context, registering types first so reactions and
    /// potentials can refer to them by name.
    pub fn to_context(&self) -> Result<Context, Error> {
        if self.simulation_box.size.iter().any(|&l| !(l > 0.0 && l.is_finite())) {
            return Err(Error::InvalidBox(format!(
                "edge lengths must be positive, got {:?}",
                self.simulation_box.size
            )));
        }
        let mut ctx = Context::new(self.simulation_box);
        ctx.set_interaction_cutoff(self.interaction_cutoff);
        for t in &self.particle_types {
            ctx.add_particle_type(&t.name, t.diffusion_constant, t.radius, t.flavor)?;
        }
        for spec in &self.reactions {
            let reaction = spec.to_reaction(ctx.particle_types())?;
            ctx.add_reaction(reaction)?;
        }
        for bond in &self.topology_bonds {
            ctx.configure_topology_bond_potential(&bond.types[0], &bond.types[1], bond.config)?;
        }
        for angle in &self.topology_angles {
            let [t1, t2, t3] = &angle.types;
            ctx.configure_topology_angle_potential(t1, t2, t3, angle.config)?;
        }
        for torsion in &self.topology_torsions {
            let [t1, t2, t3, t4] = &torsion.types;
            ctx.configure_topology_torsion_potential(
                [t1.as_str(), t2.as_str(), t3.as_str(), t4.as_str()],
                torsion.config,
            )?;
        }
        Ok(ctx)
    }

    /// Resolves the compartments against the types registered in `ctx`.
    pub fn to_compartments(&self, ctx: &Context) -> Result<Compartments, Error> {
        let mut compartments = Compartments::new();
        for spec in &self.compartments {
            let mut compartment = Compartment::new(&spec.name, spec.region.clone().into());
            for (from, to) in &spec.conversions {
                compartment = compartment.with_conversion(ctx.type_id(from)?, ctx.type_id(to)?);
            }
            compartments.add(compartment);
        }
        Ok(compartments)
    }
}
