//! Graph operations and their reversible actions.
//!
//! An [`Operation`] is what a recipe asks for, addressing vertices by index or
//! label. Materializing it against a topology resolves those references and
//! yields an [`Action`], which can be applied and undone exactly.

use crate::model::store::ParticleDataStore;
use crate::model::types::ParticleTypeId;
use crate::topology::{Error, GraphTopology};

/// Reference to a vertex, resolved when the recipe is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexRef {
    Index(usize),
    Label(String),
}

impl From<usize> for VertexRef {
    fn from(v: usize) -> Self {
        VertexRef::Index(v)
    }
}

impl From<&str> for VertexRef {
    fn from(label: &str) -> Self {
        VertexRef::Label(label.to_string())
    }
}

impl From<String> for VertexRef {
    fn from(label: String) -> Self {
        VertexRef::Label(label)
    }
}

impl VertexRef {
    fn resolve(&self, topology: &GraphTopology) -> Result<usize, Error> {
        match self {
            VertexRef::Index(v) => {
                topology.graph().vertex(*v)?;
                Ok(*v)
            }
            VertexRef::Label(label) => topology.graph().vertex_by_label(label),
        }
    }
}

/// A recipe step, still addressing vertices by index or label.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ChangeParticleType {
        vertex: VertexRef,
        type_id: ParticleTypeId,
    },
    AddEdge(VertexRef, VertexRef),
    RemoveEdge(VertexRef, VertexRef),
}

impl Operation {
    /// Resolves vertex references against `topology`.
    ///
    /// Fails only on programmer errors: out-of-range indices or unknown labels.
    pub fn materialize(&self, topology: &GraphTopology) -> Result<Action, Error> {
        Ok(match self {
            Operation::ChangeParticleType { vertex, type_id } => Action::ChangeParticleType {
                vertex: vertex.resolve(topology)?,
                type_id: *type_id,
                previous: None,
            },
            Operation::AddEdge(a, b) => Action::AddEdge {
                a: a.resolve(topology)?,
                b: b.resolve(topology)?,
            },
            Operation::RemoveEdge(a, b) => Action::RemoveEdge {
                a: a.resolve(topology)?,
                b: b.resolve(topology)?,
            },
        })
    }
}

/// A materialized operation with an exact inverse.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ChangeParticleType {
        vertex: usize,
        type_id: ParticleTypeId,
        /// Type before the action was applied; set by `apply`.
        previous: Option<ParticleTypeId>,
    },
    AddEdge {
        a: usize,
        b: usize,
    },
    RemoveEdge {
        a: usize,
        b: usize,
    },
}

impl Action {
    /// Applies the action. A [`Error::StructuralViolation`] leaves the
    /// topology and the store untouched.
    pub fn apply<S: ParticleDataStore>(
        &mut self,
        topology: &mut GraphTopology,
        store: &mut S,
        reaction: &str,
    ) -> Result<(), Error> {
        match self {
            Action::ChangeParticleType {
                vertex,
                type_id,
                previous,
            } => {
                let store_index = topology.particles()[*vertex];
                let v = topology.graph_mut().vertex_mut(*vertex)?;
                *previous = Some(v.particle_type);
                v.particle_type = *type_id;
                store.entry_at_mut(store_index).type_id = *type_id;
                Ok(())
            }
            Action::AddEdge { a, b } => {
                if a == b {
                    return Err(Error::structural(
                        reaction,
                        format!("cannot bond vertex {} to itself", a),
                    ));
                }
                if !topology.graph_mut().add_edge(*a, *b)? {
                    return Err(Error::structural(
                        reaction,
                        format!("edge ({}, {}) already exists", a, b),
                    ));
                }
                Ok(())
            }
            Action::RemoveEdge { a, b } => {
                if !topology.graph_mut().remove_edge(*a, *b)? {
                    return Err(Error::structural(
                        reaction,
                        format!("edge ({}, {}) does not exist", a, b),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Reverts a previously applied action.
    pub fn undo<S: ParticleDataStore>(&self, topology: &mut GraphTopology, store: &mut S) {
        match *self {
            Action::ChangeParticleType {
                vertex,
                previous: Some(previous),
                ..
            } => {
                let store_index = topology.particles()[vertex];
                if let Ok(v) = topology.graph_mut().vertex_mut(vertex) {
                    v.particle_type = previous;
                }
                store.entry_at_mut(store_index).type_id = previous;
            }
            Action::ChangeParticleType { previous: None, .. } => {}
            Action::AddEdge { a, b } => {
                let _ = topology.graph_mut().remove_edge(a, b);
            }
            Action::RemoveEdge { a, b } => {
                let _ = topology.graph_mut().add_edge(a, b);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::particle::Particle;
    use crate::model::store::ParticleStore;

    fn make_setup() -> (GraphTopology, ParticleStore) {
        let mut store = ParticleStore::new();
        let indices = store.add_particles((0..3).map(|i| Particle::new(0, [i as f64, 0.0, 0.0])));
        let mut top = GraphTopology::new(indices.into_iter().map(|i| (i, 0)));
        top.add_edge(0, 1).unwrap();
        top.add_edge(1, 2).unwrap();
        top.set_label(1, "middle").unwrap();
        (top, store)
    }

    #[test]
    fn change_type_updates_vertex_and_store_and_undoes() {
        let (mut top, mut store) = make_setup();
        let mut action = Operation::ChangeParticleType {
            vertex: "middle".into(),
            type_id: 4,
        }
        .materialize(&top)
        .unwrap();
        action.apply(&mut top, &mut store, "r").unwrap();
        assert_eq!(top.graph().vertices()[1].particle_type, 4);
        assert_eq!(store.entry_at(1).type_id, 4);

        action.undo(&mut top, &mut store);
        assert_eq!(top.graph().vertices()[1].particle_type, 0);
        assert_eq!(store.entry_at(1).type_id, 0);
    }

    #[test]
    fn duplicate_edge_is_structural() {
        let (mut top, mut store) = make_setup();
        let mut action = Operation::AddEdge(VertexRef::Index(0), VertexRef::Index(1))
            .materialize(&top)
            .unwrap();
        let err = action.apply(&mut top, &mut store, "r").unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(top.graph().n_edges(), 2);
    }

    #[test]
    fn missing_edge_is_structural() {
        let (mut top, mut store) = make_setup();
        let mut action = Operation::RemoveEdge(VertexRef::Index(0), VertexRef::Index(2))
            .materialize(&top)
            .unwrap();
        assert!(matches!(
            action.apply(&mut top, &mut store, "r"),
            Err(Error::StructuralViolation { .. })
        ));
    }

    #[test]
    fn remove_edge_undo_restores_edge() {
        let (mut top, mut store) = make_setup();
        let mut action = Operation::RemoveEdge(VertexRef::Index(1), VertexRef::Index(2))
            .materialize(&top)
            .unwrap();
        action.apply(&mut top, &mut store, "r").unwrap();
        assert!(!top.graph().has_edge(1, 2));
        action.undo(&mut top, &mut store);
        assert!(top.graph().has_edge(1, 2));
    }

    #[test]
    fn unresolvable_references_are_programmer_errors() {
        let (top, _) = make_setup();
        let out_of_range = Operation::AddEdge(VertexRef::Index(0), VertexRef::Index(7)).materialize(&top);
        assert!(matches!(out_of_range, Err(Error::VertexOutOfRange { index: 7, .. })));
        let unknown = Operation::RemoveEdge("head".into(), VertexRef::Index(1)).materialize(&top);
        assert!(matches!(unknown, Err(Error::UnknownLabel(_))));
        assert!(!unknown.unwrap_err().is_recoverable());
    }
}
