//! Error types for topology graphs and structural reactions.
//!
//! Only [`Error::StructuralViolation`] is recoverable: a reaction in rollback
//! mode converts it into a no-op. All other variants describe misuse of the
//! API and always propagate.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A graph operation or postcondition could not be satisfied.
    #[error("structural violation in topology reaction '{reaction}': {detail}")]
    StructuralViolation {
        /// Name of the reaction that produced the violation.
        reaction: String,
        /// What went wrong.
        detail: String,
    },

    /// A vertex index does not exist in the graph.
    #[error("vertex index {index} out of range for a graph with {n_vertices} vertices")]
    VertexOutOfRange { index: usize, n_vertices: usize },

    /// A recipe addressed a vertex by a label that no vertex carries.
    #[error("no vertex carries the label '{0}'")]
    UnknownLabel(String),

    /// Vertex labels are unique within a graph.
    #[error("label '{0}' is already taken by another vertex")]
    DuplicateLabel(String),

    /// A recipe was applied to a topology it was not built for.
    #[error("recipe for topology {expected} applied to topology {found}")]
    ForeignRecipe { expected: u64, found: u64 },

    /// Two bonded vertices have types without a bond configuration.
    #[error("no bond configuration between particle types {type1} and {type2}")]
    MissingBondConfiguration { type1: u16, type2: u16 },
}

impl Error {
    pub(crate) fn structural(reaction: &str, detail: impl Into<String>) -> Self {
        Self::StructuralViolation {
            reaction: reaction.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether a rollback-mode reaction may swallow this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::StructuralViolation { .. })
    }
}
