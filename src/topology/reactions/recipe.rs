use super::operations::{Operation, VertexRef};
use crate::model::types::ParticleTypeId;
use crate::topology::{Error, GraphTopology};

/// Ordered list of graph operations a topology reaction wants to perform.
///
/// A recipe is bound to the topology it was created for; executing it on any
/// other topology is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    topology_id: u64,
    operations: Vec<Operation>,
}

impl Recipe {
    /// Starts an empty recipe bound to `topology`.
    pub fn new(topology: &GraphTopology) -> Self {
        Self {
            topology_id: topology.id(),
            operations: Vec::new(),
        }
    }

    pub fn topology_id(&self) -> u64 {
        self.topology_id
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Retypes a vertex. The particle keeps its id.
    pub fn change_particle_type(
        &mut self,
        vertex: impl Into<VertexRef>,
        type_id: ParticleTypeId,
    ) -> &mut Self {
        self.operations.push(Operation::ChangeParticleType {
            vertex: vertex.into(),
            type_id,
        });
        self
    }

    /// Bonds two vertices. Fails structurally if they are already bonded.
    pub fn add_edge(&mut self, a: impl Into<VertexRef>, b: impl Into<VertexRef>) -> &mut Self {
        self.operations.push(Operation::AddEdge(a.into(), b.into()));
        self
    }

    /// Breaks a bond. Fails structurally if there is none.
    pub fn remove_edge(&mut self, a: impl Into<VertexRef>, b: impl Into<VertexRef>) -> &mut Self {
        self.operations
            .push(Operation::RemoveEdge(a.into(), b.into()));
        self
    }

    /// Queues the removal of every edge of `vertex` as it is bonded right now.
    pub fn separate_vertex(
        &mut self,
        topology: &GraphTopology,
        vertex: usize,
    ) -> Result<&mut Self, Error> {
        let neighbors = topology.graph().vertex(vertex)?.neighbors().to_vec();
        for n in neighbors {
            self.remove_edge(vertex, n);
        }
        Ok(self)
    }
}
