//! Transactional structural reactions on topology graphs.
//!
//! A [`TopologyReaction`] produces a [`Recipe`] for a given topology. The
//! recipe's operations are materialized into reversible [`Action`]s and applied
//! in order. Two independent [`Mode`] flags decide what happens when something
//! goes wrong:
//!
//! - [`FailureMode`]: raise the structural violation, or roll back every applied
//!   action so the topology is exactly as before.
//! - [`ShapeMode`]: require the graph to stay connected (and purely topology
//!   flavored), or split it into child topologies when it falls apart.
//!
//! ```
//! use rd_kernel::topology::reactions::{Recipe, TopologyReaction};
//!
//! let unbind = TopologyReaction::new(
//!     "unbind",
//!     |top, _rng| {
//!         let mut recipe = Recipe::new(top);
//!         recipe.remove_edge(0usize, 1usize);
//!         recipe
//!     },
//!     0.1,
//! )
//! .create_children()
//! .roll_back_if_invalid();
//! assert_eq!(unbind.name(), "unbind");
//! ```

pub mod operations;
pub mod reaction;
pub mod recipe;

pub use operations::{Action, Operation, VertexRef};
pub use reaction::{FailureMode, Mode, Outcome, ShapeMode, TopologyRate, TopologyReaction};
pub use recipe::Recipe;
