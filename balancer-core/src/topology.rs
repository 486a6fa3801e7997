use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::TopologyError;
use crate::node::NodeId;

/// Directed network links between nodes.
///
/// Informational only: the balancer carries it around so a reporting layer can
/// display it, no placement or migration decision ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    adjacency: Vec<BTreeSet<NodeId>>,
}

impl Topology {
    /// Creates a topology of `node_count` isolated nodes.
    pub fn new(node_count: usize) -> Self {
        Topology {
            adjacency: vec![BTreeSet::new(); node_count],
        }
    }

    /// Builds a random topology, attempting 1 to 3 outgoing links per node.
    /// Attempts hitting the node itself or an existing link are skipped, so a
    /// node can end up with fewer links, or none.
    pub fn random<R: Rng>(node_count: usize, rng: &mut R) -> Self {
        let mut topology = Topology::new(node_count);
        if node_count < 2 {
            return topology;
        }

        for src in 0..node_count {
            let attempts = rng.random_range(1..=3usize);
            for _ in 0..attempts {
                let dest = rng.random_range(0..node_count);
                // self links and duplicates are simply skipped
                let _ = topology.add_edge(src as NodeId, dest as NodeId);
            }
        }
        topology
    }

    /// Adds the directed link `src -> dest`.
    pub fn add_edge(&mut self, src: NodeId, dest: NodeId) -> Result<(), TopologyError> {
        let src_idx = self.index(src)?;
        self.index(dest)?;

        if src == dest {
            return Err(TopologyError::SelfEdge(src));
        }
        if !self.adjacency[src_idx].insert(dest) {
            return Err(TopologyError::DuplicateEdge(src, dest));
        }
        Ok(())
    }

    pub fn has_edge(&self, src: NodeId, dest: NodeId) -> bool {
        self.neighbors(src).is_some_and(|n| n.contains(&dest))
    }

    pub fn neighbors(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        usize::try_from(id).ok().and_then(|i| self.adjacency.get(i))
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeSet::len).sum()
    }

    /// `(node, neighbors)` pairs in node id order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &BTreeSet<NodeId>)> {
        self.adjacency
            .iter()
            .enumerate()
            .map(|(i, n)| (i as NodeId, n))
    }

    fn index(&self, id: NodeId) -> Result<usize, TopologyError> {
        usize::try_from(id)
            .ok()
            .filter(|i| *i < self.adjacency.len())
            .ok_or(TopologyError::OutOfRange {
                id,
                node_count: self.adjacency.len(),
            })
    }
}
