//! Arena-backed undirected graph over the particles of one topology.
//!
//! Vertices live in a `Vec` and refer to each other by index. Removing a vertex
//! shifts every later vertex down by one and rewrites all adjacency lists, so
//! vertex indices are always dense and 0-based. Each vertex also carries the
//! topology-local index of the particle it represents; graphs built by
//! [`GraphTopology`](super::GraphTopology) keep the two equal.

use super::error::Error;
use crate::model::types::ParticleTypeId;
use std::collections::{BTreeSet, VecDeque};
use std::fmt::Write as _;

/// A graph vertex standing for one particle of the topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Topology-local particle index.
    pub particle_index: usize,
    pub particle_type: ParticleTypeId,
    pub label: Option<String>,
    neighbors: Vec<usize>,
}

impl Vertex {
    pub fn new(particle_index: usize, particle_type: ParticleTypeId) -> Self {
        Self {
            particle_index,
            particle_type,
            label: None,
            neighbors: Vec::new(),
        }
    }

    /// Adjacent vertex indices in ascending order.
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}

/// Connected chains of two, three and four vertices.
///
/// Every chain is reported once in canonical orientation: pairs and triples
/// have their end vertices in ascending order, quadruples are the smaller of
/// the chain and its reversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NTuples {
    pub pairs: Vec<(usize, usize)>,
    pub triples: Vec<(usize, usize, usize)>,
    pub quadruples: Vec<(usize, usize, usize, usize)>,
}

/// A connected piece of a split graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Subgraph with vertices and particle indices rebased to `0..n`.
    pub graph: Graph,
    /// `particle_index` each new vertex carried in the original graph.
    pub original_particle_indices: Vec<usize>,
}

/// Undirected simple graph over the particles of one topology.
///
/// Vertex `i` holds the particle at position `i` of the topology's slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    vertices: Vec<Vertex>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an edgeless graph whose vertex `i` represents local particle `i`.
    pub fn from_types<I>(types: I) -> Self
    where
        I: IntoIterator<Item = ParticleTypeId>,
    {
        Self {
            vertices: types
                .into_iter()
                .enumerate()
                .map(|(i, t)| Vertex::new(i, t))
                .collect(),
        }
    }

    /// Appends an unconnected vertex and returns its index.
    pub fn add_vertex(&mut self, particle_index: usize, particle_type: ParticleTypeId) -> usize {
        self.vertices.push(Vertex::new(particle_index, particle_type));
        self.vertices.len() - 1
    }

    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_edges(&self) -> usize {
        self.vertices.iter().map(Vertex::degree).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex(&self, v: usize) -> Result<&Vertex, Error> {
        self.vertices.get(v).ok_or(Error::VertexOutOfRange {
            index: v,
            n_vertices: self.vertices.len(),
        })
    }

    pub fn vertex_mut(&mut self, v: usize) -> Result<&mut Vertex, Error> {
        let n_vertices = self.vertices.len();
        self.vertices.get_mut(v).ok_or(Error::VertexOutOfRange {
            index: v,
            n_vertices,
        })
    }

    fn check(&self, v: usize) -> Result<(), Error> {
        self.vertex(v).map(|_| ())
    }

    /// Attaches a label to a vertex. Labels are unique within a graph.
    pub fn set_label(&mut self, v: usize, label: impl Into<String>) -> Result<(), Error> {
        let label = label.into();
        self.check(v)?;
        if let Ok(existing) = self.vertex_by_label(&label)
            && existing != v
        {
            return Err(Error::DuplicateLabel(label));
        }
        self.vertices[v].label = Some(label);
        Ok(())
    }

    /// Index of the vertex carrying `label`.
    pub fn vertex_by_label(&self, label: &str) -> Result<usize, Error> {
        self.vertices
            .iter()
            .position(|v| v.label.as_deref() == Some(label))
            .ok_or_else(|| Error::UnknownLabel(label.to_string()))
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.vertices
            .get(a)
            .is_some_and(|v| v.neighbors.binary_search(&b).is_ok())
    }

    /// Connects two vertices.
    ///
    /// Returns `Ok(false)` without touching the graph if the edge already
    /// exists or would be a self loop.
    pub fn add_edge(&mut self, a: usize, b: usize) -> Result<bool, Error> {
        self.check(a)?;
        self.check(b)?;
        if a == b || self.has_edge(a, b) {
            return Ok(false);
        }
        insert_sorted(&mut self.vertices[a].neighbors, b);
        insert_sorted(&mut self.vertices[b].neighbors, a);
        Ok(true)
    }

    /// Disconnects two vertices. Returns `Ok(false)` if they were not connected.
    pub fn remove_edge(&mut self, a: usize, b: usize) -> Result<bool, Error> {
        self.check(a)?;
        self.check(b)?;
        if !self.has_edge(a, b) {
            return Ok(false);
        }
        self.vertices[a].neighbors.retain(|&n| n != b);
        self.vertices[b].neighbors.retain(|&n| n != a);
        Ok(true)
    }

    /// Removes a vertex and all of its edges.
    ///
    /// Later vertices move down by one; particle indices above the removed
    /// one are shifted the same way so they stay dense.
    pub fn remove_vertex(&mut self, v: usize) -> Result<Vertex, Error> {
        self.check(v)?;
        let mut removed = self.vertices.remove(v);
        for vertex in &mut self.vertices {
            vertex.neighbors.retain(|&n| n != v);
            for n in &mut vertex.neighbors {
                if *n > v {
                    *n -= 1;
                }
            }
            if vertex.particle_index > removed.particle_index {
                vertex.particle_index -= 1;
            }
        }
        for n in &mut removed.neighbors {
            if *n > v {
                *n -= 1;
            }
        }
        Ok(removed)
    }

    fn reachable_from(&self, start: usize) -> Vec<bool> {
        let mut seen = vec![false; self.vertices.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(v) = queue.pop_front() {
            for &n in &self.vertices[v].neighbors {
                if !seen[n] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            }
        }
        seen
    }

    /// Whether every vertex is reachable from vertex 0. Empty graphs count as connected.
    pub fn is_connected(&self) -> bool {
        if self.vertices.is_empty() {
            return true;
        }
        self.reachable_from(0).into_iter().all(|s| s)
    }

    /// Splits the graph into its connected components, consuming it.
    ///
    /// Components are ordered by their lowest original vertex index; inside a
    /// component, vertices keep their relative order.
    pub fn connected_components(self) -> Vec<Component> {
        let n = self.vertices.len();
        let mut component_of = vec![usize::MAX; n];
        let mut members: Vec<Vec<usize>> = Vec::new();
        for start in 0..n {
            if component_of[start] != usize::MAX {
                continue;
            }
            let id = members.len();
            let seen = self.reachable_from(start);
            let list: Vec<usize> = (0..n).filter(|&v| seen[v]).collect();
            for &v in &list {
                component_of[v] = id;
            }
            members.push(list);
        }

        let mut new_index = vec![0; n];
        for list in &members {
            for (i, &v) in list.iter().enumerate() {
                new_index[v] = i;
            }
        }

        let mut vertices: Vec<Option<Vertex>> = self.vertices.into_iter().map(Some).collect();
        members
            .into_iter()
            .map(|list| {
                let mut graph = Graph::new();
                let mut original_particle_indices = Vec::with_capacity(list.len());
                for (i, v) in list.into_iter().enumerate() {
                    let Some(mut vertex) = vertices[v].take() else {
                        continue;
                    };
                    original_particle_indices.push(vertex.particle_index);
                    vertex.particle_index = i;
                    for n in &mut vertex.neighbors {
                        *n = new_index[*n];
                    }
                    graph.vertices.push(vertex);
                }
                Component {
                    graph,
                    original_particle_indices,
                }
            })
            .collect()
    }

    /// Enumerates all connected chains of two, three and four distinct vertices.
    pub fn find_n_tuples(&self) -> NTuples {
        let mut pairs = BTreeSet::new();
        let mut triples = BTreeSet::new();
        let mut quadruples = BTreeSet::new();

        for (j, vj) in self.vertices.iter().enumerate() {
            for &k in &vj.neighbors {
                if j < k {
                    pairs.insert((j, k));
                }
                for &i in &vj.neighbors {
                    if i < k {
                        triples.insert((i, j, k));
                    }
                }
                for &i in &vj.neighbors {
                    if i == k {
                        continue;
                    }
                    for &l in &self.vertices[k].neighbors {
                        if l == j || l == i {
                            continue;
                        }
                        let forward = (i, j, k, l);
                        let backward = (l, k, j, i);
                        quadruples.insert(forward.min(backward));
                    }
                }
            }
        }

        NTuples {
            pairs: pairs.into_iter().collect(),
            triples: triples.into_iter().collect(),
            quadruples: quadruples.into_iter().collect(),
        }
    }

    /// Renders the graph as a GEXF document.
    ///
    /// Node labels are the vertex labels where present and the particle type
    /// id otherwise.
    pub fn to_gexf(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<gexf xmlns=\"http://www.gexf.net/1.2draft\" version=\"1.2\">\n");
        out.push_str("<graph mode=\"static\" defaultedgetype=\"undirected\">\n<nodes>\n");
        for (i, v) in self.vertices.iter().enumerate() {
            let label = match &v.label {
                Some(l) => escape_xml(l),
                None => v.particle_type.to_string(),
            };
            let _ = writeln!(out, "<node id=\"{}\" label=\"{}\" />", i, label);
        }
        out.push_str("</nodes>\n<edges>\n");
        let mut edge_id = 0;
        for (i, v) in self.vertices.iter().enumerate() {
            for &n in &v.neighbors {
                if i < n {
                    let _ = writeln!(
                        out,
                        "<edge id=\"{}\" source=\"{}\" target=\"{}\" />",
                        edge_id, i, n
                    );
                    edge_id += 1;
                }
            }
        }
        out.push_str("</edges>\n</graph>\n</gexf>\n");
        out
    }
}

fn insert_sorted(neighbors: &mut Vec<usize>, v: usize) {
    if let Err(at) = neighbors.binary_search(&v) {
        neighbors.insert(at, v);
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_path(n: usize) -> Graph {
        let mut g = Graph::from_types(std::iter::repeat_n(0, n));
        for i in 1..n {
            g.add_edge(i - 1, i).unwrap();
        }
        g
    }

    #[test]
    fn add_edge_rejects_duplicates_and_self_loops() {
        let mut g = make_path(2);
        assert!(!g.add_edge(0, 1).unwrap());
        assert!(!g.add_edge(1, 0).unwrap());
        assert!(!g.add_edge(1, 1).unwrap());
        assert_eq!(g.n_edges(), 1);
        assert!(matches!(
            g.add_edge(0, 5),
            Err(Error::VertexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn remove_edge_reports_missing_edges() {
        let mut g = make_path(3);
        assert!(g.remove_edge(1, 0).unwrap());
        assert!(!g.remove_edge(0, 1).unwrap());
        assert!(!g.has_edge(0, 1));
        assert!(g.has_edge(1, 2));
    }

    #[test]
    fn neighbor_lists_stay_sorted_across_edge_edits() {
        let mut g = make_path(4);
        g.add_edge(3, 1).unwrap();
        let before = g.clone();
        assert_eq!(g.vertices()[1].neighbors(), &[0, 2, 3]);

        g.remove_edge(1, 0).unwrap();
        g.remove_edge(2, 1).unwrap();
        g.add_edge(2, 1).unwrap();
        g.add_edge(0, 1).unwrap();
        assert_eq!(g.vertices()[1].neighbors(), &[0, 2, 3]);
        assert_eq!(g, before);
    }

    #[test]
    fn remove_vertex_keeps_indices_dense() {
        let mut g = make_path(4);
        g.add_edge(0, 3).unwrap();
        let removed = g.remove_vertex(1).unwrap();
        assert_eq!(removed.particle_index, 1);
        assert_eq!(g.n_vertices(), 3);
        // former vertices 2 and 3 are now 1 and 2
        assert!(g.has_edge(1, 2));
        assert!(g.has_edge(0, 2));
        assert!(!g.has_edge(0, 1));
        let particles: Vec<_> = g.vertices().iter().map(|v| v.particle_index).collect();
        assert_eq!(particles, vec![0, 1, 2]);
    }

    #[test]
    fn connectivity() {
        let mut g = make_path(3);
        assert!(g.is_connected());
        g.remove_edge(0, 1).unwrap();
        assert!(!g.is_connected());
        assert!(Graph::new().is_connected());
    }

    #[test]
    fn components_are_rebased() {
        let mut g = make_path(5);
        g.remove_edge(1, 2).unwrap();
        g.set_label(3, "tail").unwrap();
        let components = g.connected_components();
        assert_eq!(components.len(), 2);

        assert_eq!(components[0].original_particle_indices, vec![0, 1]);
        assert!(components[0].graph.has_edge(0, 1));

        let second = &components[1];
        assert_eq!(second.original_particle_indices, vec![2, 3, 4]);
        assert_eq!(second.graph.n_edges(), 2);
        assert!(second.graph.has_edge(0, 1));
        assert!(second.graph.has_edge(1, 2));
        assert!(second.graph.is_connected());
        assert_eq!(second.graph.vertex_by_label("tail").unwrap(), 1);
        let particles: Vec<_> = second
            .graph
            .vertices()
            .iter()
            .map(|v| v.particle_index)
            .collect();
        assert_eq!(particles, vec![0, 1, 2]);
    }

    #[test]
    fn components_cover_every_vertex_once() {
        let mut g = Graph::from_types([0, 1, 2, 3, 4, 5]);
        g.add_edge(0, 4).unwrap();
        g.add_edge(2, 5).unwrap();
        g.add_edge(5, 3).unwrap();
        let components = g.connected_components();
        let mut all: Vec<usize> = components
            .iter()
            .flat_map(|c| c.original_particle_indices.iter().copied())
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4, 5]);
        assert!(components.iter().all(|c| c.graph.is_connected()));
        assert_eq!(components.len(), 3);
    }

    #[test]
    fn n_tuples_of_a_path() {
        let g = make_path(4);
        let tuples = g.find_n_tuples();
        assert_eq!(tuples.pairs, vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(tuples.triples, vec![(0, 1, 2), (1, 2, 3)]);
        assert_eq!(tuples.quadruples, vec![(0, 1, 2, 3)]);
    }

    #[test]
    fn n_tuples_of_a_triangle_skip_repeated_vertices() {
        let mut g = make_path(3);
        g.add_edge(2, 0).unwrap();
        let tuples = g.find_n_tuples();
        assert_eq!(tuples.pairs.len(), 3);
        assert_eq!(tuples.triples.len(), 3);
        assert!(tuples.quadruples.is_empty());
    }

    #[test]
    fn n_tuples_of_a_star() {
        let mut g = Graph::from_types([0; 4]);
        for leaf in 1..4 {
            g.add_edge(0, leaf).unwrap();
        }
        let tuples = g.find_n_tuples();
        assert_eq!(tuples.pairs.len(), 3);
        assert_eq!(tuples.triples, vec![(1, 0, 2), (1, 0, 3), (2, 0, 3)]);
        assert!(tuples.quadruples.is_empty());
    }

    #[test]
    fn labels_are_unique() {
        let mut g = make_path(3);
        g.set_label(1, "middle").unwrap();
        assert!(matches!(g.set_label(2, "middle"), Err(Error::DuplicateLabel(_))));
        assert!(matches!(g.vertex_by_label("nope"), Err(Error::UnknownLabel(_))));
    }

    #[test]
    fn gexf_contains_labels_and_edges() {
        let mut g = make_path(3);
        g.set_label(1, "middle").unwrap();
        let gexf = g.to_gexf();
        assert!(gexf.contains("<node id=\"1\" label=\"middle\""));
        assert!(gexf.contains("source=\"0\" target=\"1\""));
        assert!(gexf.contains("source=\"1\" target=\"2\""));
    }
}
