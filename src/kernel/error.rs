//! Error types for kernel setup and stepping.
//!
//! Setup errors (invalid cutoff, unknown types, invalid reactions) are fatal
//! and reported before any step runs. During stepping, only topology reactions
//! in raise mode and programmer errors can fail a pass.

use crate::model::reaction::InvalidReactionError;
use crate::model::types::{RegisterTypeError, UnknownParticleTypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The neighbor list cutoff must be strictly positive and finite.
    #[error("invalid cutoff {0}: must be positive and finite")]
    InvalidCutoff(f64),

    /// Box edges must be positive and finite.
    #[error("invalid simulation box: {0}")]
    InvalidBox(String),

    /// A particle type was referenced by a name that is not registered.
    #[error(transparent)]
    UnknownParticleType(#[from] UnknownParticleTypeError),

    /// A particle type could not be registered.
    #[error(transparent)]
    RegisterType(#[from] RegisterTypeError),

    /// A reaction names unknown or topology-flavored types, or has invalid
    /// rates, distances or weights.
    #[error(transparent)]
    InvalidReaction(#[from] InvalidReactionError),

    /// A topology was registered over particles that cannot be part of one.
    #[error("invalid topology particle #{index}: {detail}")]
    InvalidTopologyParticle { index: usize, detail: String },

    /// A particle was addressed by an index that is out of range or deactivated.
    #[error("particle #{index} is {reason}")]
    InvalidParticleIndex { index: usize, reason: &'static str },

    /// The TOML system setup could not be deserialized.
    #[error("failed to parse system setup: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The rayon worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A topology reaction raised, or a topology could not be configured.
    #[error("topology reaction failed: {0}")]
    Topology(#[from] crate::topology::Error),
}

impl Error {
    pub(crate) fn invalid_topology_particle(index: usize, detail: impl Into<String>) -> Self {
        Self::InvalidTopologyParticle {
            index,
            detail: detail.into(),
        }
    }
}
