//! Hand-made topologies
//!
//! Provides builders for fixed edge sets over the nodes `N0..N(count-1)`:
//! - Ring: each node connected to its two neighbors
//! - Line: a ring without the closing edge
//! - Star: `N0` connected to every other node
//! - Full mesh: every node connected to every other
//! - Random: configurable connection probability, no isolated nodes
//!
//! Edges are undirected here and become a pair of directed edges when
//! applied to a [`World`]. Use them together with the `static`
//! connectivity model, which keeps existing edges across rounds.

use std::collections::{BTreeMap, BTreeSet};

use meshsim_core::{NodeId, RuntimeError, SimRng};
use rand::Rng;

use crate::world::World;

/// An undirected edge set over dense node ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    nodes: BTreeSet<NodeId>,
    /// Normalized `(smaller, larger)` pairs
    edges: BTreeSet<(NodeId, NodeId)>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: NodeId) {
        self.nodes.insert(id);
    }

    /// Add an undirected edge; self-loops are ignored
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        self.nodes.insert(a);
        self.nodes.insert(b);
        self.edges.insert(if a < b { (a, b) } else { (b, a) });
    }

    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        let key = if a < b { (a, b) } else { (b, a) };
        self.edges.contains(&key)
    }

    pub fn neighbors(&self, node: NodeId) -> BTreeSet<NodeId> {
        self.edges
            .iter()
            .filter_map(|&(a, b)| {
                if a == node {
                    Some(b)
                } else if b == node {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add every edge in both directions to `world`
    ///
    /// Returns the number of undirected edges applied.
    pub fn apply(&self, world: &mut World) -> Result<usize, RuntimeError> {
        for &(a, b) in &self.edges {
            world.connect_bidirectional(a, b)?;
        }
        Ok(self.edges.len())
    }

    /// Simple ASCII rendering of the adjacency lists
    pub fn visualize(&self) -> String {
        let mut adjacency: BTreeMap<NodeId, Vec<String>> =
            self.nodes.iter().map(|id| (*id, Vec::new())).collect();
        for &(a, b) in &self.edges {
            adjacency.entry(a).or_default().push(b.to_string());
            adjacency.entry(b).or_default().push(a.to_string());
        }

        let mut output = String::from("Topology:\n");
        output.push_str(&format!("  Nodes: {}\n", self.node_count()));
        output.push_str(&format!("  Edges: {}\n\n", self.edge_count()));
        for (id, mut neighbors) in adjacency {
            neighbors.sort_by_key(|n| n[1..].parse::<u32>().unwrap_or(u32::MAX));
            output.push_str(&format!("  {} -> [{}]\n", id, neighbors.join(", ")));
        }
        output
    }
}

/// Builds the standard topologies over `count` nodes
#[derive(Debug, Clone, Copy)]
pub struct TopologyBuilder {
    count: u32,
}

impl TopologyBuilder {
    pub fn new(count: u32) -> Self {
        Self { count }
    }

    fn empty(&self) -> (Topology, Vec<NodeId>) {
        let ids = NodeId::range(self.count);
        let mut topology = Topology::new();
        for id in &ids {
            topology.add_node(*id);
        }
        (topology, ids)
    }

    /// N0 - N1 - ... - N(n-1) - N0
    pub fn ring(self) -> Topology {
        let (mut topology, ids) = self.empty();
        for i in 0..ids.len() {
            topology.connect(ids[i], ids[(i + 1) % ids.len()]);
        }
        topology
    }

    /// N0 - N1 - ... - N(n-1)
    pub fn line(self) -> Topology {
        let (mut topology, ids) = self.empty();
        for pair in ids.windows(2) {
            topology.connect(pair[0], pair[1]);
        }
        topology
    }

    /// N0 in the center
    pub fn star(self) -> Topology {
        let (mut topology, ids) = self.empty();
        if let Some((center, rest)) = ids.split_first() {
            for id in rest {
                topology.connect(*center, *id);
            }
        }
        topology
    }

    pub fn full_mesh(self) -> Topology {
        let (mut topology, ids) = self.empty();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                topology.connect(ids[i], ids[j]);
            }
        }
        topology
    }

    /// Each pair connected with `probability`; isolated nodes get one
    /// random edge
    pub fn random(self, probability: f64, rng: &mut SimRng) -> Topology {
        let (mut topology, ids) = self.empty();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if rng.random::<f64>() < probability {
                    topology.connect(ids[i], ids[j]);
                }
            }
        }

        if ids.len() > 1 {
            for id in &ids {
                if topology.neighbors(*id).is_empty() {
                    let mut other = ids[rng.random_range(0..ids.len())];
                    if other == *id {
                        other = ids[(id.raw() as usize + 1) % ids.len()];
                    }
                    topology.connect(*id, other);
                }
            }
        }
        topology
    }
}

/// Build a topology from an edge list of raw ids
pub fn from_edges(edges: &[(u32, u32)]) -> Topology {
    let mut topology = Topology::new();
    for &(a, b) in edges {
        topology.connect(NodeId(a), NodeId(b));
    }
    topology
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_ring_topology() {
        let topology = TopologyBuilder::new(4).ring();
        assert_eq!(topology.node_count(), 4);
        assert_eq!(topology.edge_count(), 4);
        assert!(topology.are_connected(NodeId(3), NodeId(0)));
        assert!(!topology.are_connected(NodeId(0), NodeId(2)));
    }

    #[test]
    fn test_full_mesh() {
        let topology = TopologyBuilder::new(5).full_mesh();
        assert_eq!(topology.edge_count(), 10);
        assert_eq!(topology.neighbors(NodeId(2)).len(), 4);
    }

    #[test]
    fn test_line_and_star() {
        let line = TopologyBuilder::new(4).line();
        assert_eq!(line.edge_count(), 3);
        assert_eq!(line.neighbors(NodeId(0)), BTreeSet::from([NodeId(1)]));

        let star = TopologyBuilder::new(4).star();
        assert_eq!(star.neighbors(NodeId(0)).len(), 3);
        assert!(!star.are_connected(NodeId(1), NodeId(2)));
    }

    #[test]
    fn test_random_has_no_isolated_nodes() {
        let mut rng = SimRng::seed_from_u64(9);
        let topology = TopologyBuilder::new(12).random(0.05, &mut rng);
        for id in NodeId::range(12) {
            assert!(!topology.neighbors(id).is_empty(), "{id} is isolated");
        }
    }

    #[test]
    fn test_custom_topology() {
        let topology = from_edges(&[(0, 1), (0, 2), (1, 2), (1, 3), (3, 3)]);
        assert_eq!(topology.node_count(), 4);
        assert_eq!(topology.edge_count(), 4);
        assert!(topology.visualize().contains("N1 -> [N0, N2, N3]"));
    }
}
