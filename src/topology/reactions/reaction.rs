use super::operations::Action;
use super::recipe::Recipe;
use crate::model::context::Context;
use crate::model::store::ParticleDataStore;
use crate::model::types::ParticleFlavor;
use crate::topology::{Error, GraphTopology};
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

/// What to do when an operation or the postcondition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Propagate the structural violation; partial changes stay in place.
    Raise,
    /// Undo every applied action in reverse order.
    #[default]
    Rollback,
}

/// Expected shape of the topology after the reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeMode {
    /// The graph must stay connected and purely topology-flavored.
    ExpectConnected,
    /// A disconnected graph is split into child topologies.
    #[default]
    CreateChildren,
}

/// Failure and shape handling of one reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode {
    pub failure: FailureMode,
    pub shape: ShapeMode,
}

/// Result of executing a topology reaction.
#[derive(Debug)]
pub enum Outcome {
    /// The topology was modified in place, or the recipe was empty.
    InPlace,
    /// A structural violation was undone; the topology is unchanged.
    RolledBack,
    /// The topology fell apart; the children replace it.
    Split(Vec<GraphTopology>),
}

/// Builds the recipe for a topology.
pub type ReactionFn = dyn Fn(&GraphTopology, &mut dyn RngCore) -> Recipe + Send + Sync;
/// Rate as a function of the current topology.
pub type RateFn = dyn Fn(&GraphTopology) -> f64 + Send + Sync;

/// Rate of a topology reaction.
#[derive(Clone)]
pub enum TopologyRate {
    Constant(f64),
    Function(Arc<RateFn>),
}

impl fmt::Debug for TopologyRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyRate::Constant(r) => f.debug_tuple("Constant").field(r).finish(),
            TopologyRate::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// A stochastic structural reaction over one topology.
pub struct TopologyReaction {
    name: String,
    reaction_fn: Box<ReactionFn>,
    rate: TopologyRate,
    mode: Mode,
}

impl fmt::Debug for TopologyReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologyReaction")
            .field("name", &self.name)
            .field("rate", &self.rate)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl TopologyReaction {
    /// Creates a reaction with a constant rate.
    pub fn new<F>(name: &str, reaction_fn: F, rate: f64) -> Self
    where
        F: Fn(&GraphTopology, &mut dyn RngCore) -> Recipe + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            reaction_fn: Box::new(reaction_fn),
            rate: TopologyRate::Constant(rate),
            mode: Mode::default(),
        }
    }

    /// Creates a reaction whose rate depends on the topology.
    pub fn with_rate_fn<F, R>(name: &str, reaction_fn: F, rate_fn: R) -> Self
    where
        F: Fn(&GraphTopology, &mut dyn RngCore) -> Recipe + Send + Sync + 'static,
        R: Fn(&GraphTopology) -> f64 + Send + Sync + 'static,
    {
        Self {
            rate: TopologyRate::Function(Arc::new(rate_fn)),
            ..Self::new(name, reaction_fn, 0.0)
        }
    }

    /// Returns structural violations to the caller, keeping partial changes.
    pub fn raise_if_invalid(mut self) -> Self {
        self.mode.failure = FailureMode::Raise;
        self
    }

    /// Undoes every applied action on a structural violation.
    pub fn roll_back_if_invalid(mut self) -> Self {
        self.mode.failure = FailureMode::Rollback;
        self
    }

    /// Requires a connected, purely topology-flavored graph afterwards.
    pub fn expect_connected(mut self) -> Self {
        self.mode.shape = ShapeMode::ExpectConnected;
        self
    }

    /// Splits a disconnected result into child topologies.
    pub fn create_children(mut self) -> Self {
        self.mode.shape = ShapeMode::CreateChildren;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current rate on `topology`.
    pub fn rate(&self, topology: &GraphTopology) -> f64 {
        match &self.rate {
            TopologyRate::Constant(r) => *r,
            TopologyRate::Function(f) => f(topology),
        }
    }

    pub fn recipe(&self, topology: &GraphTopology, rng: &mut dyn RngCore) -> Recipe {
        (self.reaction_fn)(topology, rng)
    }

    /// Runs the reaction's recipe against `topology` as one transaction.
    ///
    /// Programmer errors (unresolvable vertex references, a recipe built for
    /// another topology, missing bond configuration) are returned before or
    /// after mutation regardless of the mode. Structural violations are
    /// undone in rollback mode and returned in raise mode.
    pub fn execute<S: ParticleDataStore>(
        &self,
        topology: &mut GraphTopology,
        store: &mut S,
        ctx: &Context,
        rng: &mut dyn RngCore,
    ) -> Result<Outcome, Error> {
        let recipe = self.recipe(topology, rng);
        if recipe.topology_id() != topology.id() {
            return Err(Error::ForeignRecipe {
                expected: recipe.topology_id(),
                found: topology.id(),
            });
        }
        if recipe.is_empty() {
            return Ok(Outcome::InPlace);
        }

        let mut actions = recipe
            .operations()
            .iter()
            .map(|op| op.materialize(topology))
            .collect::<Result<Vec<Action>, Error>>()?;

        let mut applied = 0;
        let mut failure = None;
        for action in &mut actions {
            match action.apply(topology, store, &self.name) {
                Ok(()) => applied += 1,
                Err(e) if e.is_recoverable() => {
                    log::warn!("topology reaction '{}' failed: {}", self.name, e);
                    failure = Some(e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if let Some(error) = failure {
            return match self.mode.failure {
                FailureMode::Raise => Err(error),
                FailureMode::Rollback => {
                    log::warn!("rolling back topology reaction '{}'", self.name);
                    undo_all(&actions[..applied], topology, store);
                    Ok(Outcome::RolledBack)
                }
            };
        }

        match self.mode.shape {
            ShapeMode::ExpectConnected => {
                let mut problems = Vec::new();
                if !topology.graph().is_connected() {
                    problems.push("the graph is no longer connected");
                }
                let types = ctx.particle_types();
                if topology
                    .graph()
                    .vertices()
                    .iter()
                    .any(|v| types.flavor_of(v.particle_type) != Some(ParticleFlavor::Topology))
                {
                    problems.push("a vertex is not topology-flavored");
                }
                if !problems.is_empty() {
                    let detail = problems.join("; ");
                    log::warn!(
                        "topology reaction '{}' left an invalid topology: {}",
                        self.name,
                        detail
                    );
                    log::warn!("GEXF representation: {}", topology.graph().to_gexf());
                    return match self.mode.failure {
                        FailureMode::Raise => Err(Error::structural(&self.name, detail)),
                        FailureMode::Rollback => {
                            log::warn!("rolling back topology reaction '{}'", self.name);
                            undo_all(&actions, topology, store);
                            Ok(Outcome::RolledBack)
                        }
                    };
                }
                self.reconfigure(&actions, topology, store, ctx)?;
                topology.update_reaction_rates();
                Ok(Outcome::InPlace)
            }
            ShapeMode::CreateChildren => {
                // Children's bonds are a subset of the parent's.
                self.reconfigure(&actions, topology, store, ctx)?;
                if topology.graph().is_connected() {
                    topology.update_reaction_rates();
                    return Ok(Outcome::InPlace);
                }
                let mut children = topology.split();
                for child in &mut children {
                    child.configure(ctx.topology_potentials())?;
                    child.update_reaction_rates();
                }
                Ok(Outcome::Split(children))
            }
        }
    }

    /// Derives the potentials of the modified topology.
    ///
    /// A missing configuration is returned as is. In rollback mode the
    /// actions are undone first, so the topology keeps its previous graph,
    /// types and potentials.
    fn reconfigure<S: ParticleDataStore>(
        &self,
        actions: &[Action],
        topology: &mut GraphTopology,
        store: &mut S,
        ctx: &Context,
    ) -> Result<(), Error> {
        let Err(error) = topology.configure(ctx.topology_potentials()) else {
            return Ok(());
        };
        log::warn!("topology reaction '{}' cannot be configured: {}", self.name, error);
        if self.mode.failure == FailureMode::Rollback {
            log::warn!("rolling back topology reaction '{}'", self.name);
            undo_all(actions, topology, store);
        }
        Err(error)
    }
}

fn undo_all<S: ParticleDataStore>(actions: &[Action], topology: &mut GraphTopology, store: &mut S) {
    for action in actions.iter().rev() {
        action.undo(topology, store);
    }
}
