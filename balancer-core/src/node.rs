use serde::{Deserialize, Serialize};

use crate::errors::{BalancerError, Result};

/// Stable identity of a node. Ids are assigned `0..n` when the balancer is built.
pub type NodeId = u64;

/// Node represents one worker able to accept task load.
///
/// `capacity` is fixed for the lifetime of the node. `current_load` is only
/// changed by dispatch (additive) and by rebalancing (migration), and is never
/// clamped against `capacity`: a node driven over 100% utilization stays
/// observable as such.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    capacity: f64,
    current_load: f64,
}

impl Node {
    /// Creates an idle node, rejecting non-positive or non-finite capacities.
    pub fn new(id: NodeId, capacity: f64) -> Result<Self> {
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(BalancerError::InvalidCapacity(format!(
                "node {} capacity must be a positive finite number, got {}",
                id, capacity
            )));
        }

        Ok(Node {
            id,
            capacity,
            current_load: 0.0,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn current_load(&self) -> f64 {
        self.current_load
    }

    /// Load as a percentage of capacity, may exceed 100.
    pub fn utilization_pct(&self) -> f64 {
        self.current_load / self.capacity * 100.0
    }

    /// Remaining room before the node reaches its capacity (0 when already over).
    pub fn headroom(&self) -> f64 {
        (self.capacity - self.current_load).max(0.0)
    }

    pub(crate) fn add_load(&mut self, amount: f64) {
        self.current_load += amount;
    }

    pub(crate) fn remove_load(&mut self, amount: f64) {
        // rounding must not leave a tiny negative residue behind
        self.current_load = (self.current_load - amount).max(0.0);
    }

    #[cfg(test)]
    pub(crate) fn with_load(id: NodeId, capacity: f64, current_load: f64) -> Self {
        Node {
            id,
            capacity,
            current_load,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_idle() {
        let node = Node::new(3, 120.0).unwrap();
        assert_eq!(node.id(), 3);
        assert_eq!(node.capacity(), 120.0);
        assert_eq!(node.current_load(), 0.0);
        assert_eq!(node.utilization_pct(), 0.0);
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        assert!(matches!(
            Node::new(0, 0.0),
            Err(BalancerError::InvalidCapacity(_))
        ));
        assert!(matches!(
            Node::new(0, -5.0),
            Err(BalancerError::InvalidCapacity(_))
        ));
        assert!(matches!(
            Node::new(0, f64::NAN),
            Err(BalancerError::InvalidCapacity(_))
        ));
        assert!(matches!(
            Node::new(0, f64::INFINITY),
            Err(BalancerError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_utilization_can_exceed_capacity() {
        let mut node = Node::new(0, 50.0).unwrap();
        node.add_load(75.0);
        assert_eq!(node.utilization_pct(), 150.0);
        assert_eq!(node.headroom(), 0.0);
    }

    #[test]
    fn test_remove_load_never_goes_negative() {
        let mut node = Node::new(0, 100.0).unwrap();
        node.add_load(0.1 + 0.2);
        node.remove_load(0.3 + 1e-12);
        assert!(node.current_load() >= 0.0);
    }
}
