use thiserror::Error;

use crate::node::NodeId;

pub type Result<T> = std::result::Result<T, BalancerError>;

#[derive(Debug, Error, PartialEq)]
pub enum BalancerError {
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    #[error("Load heap capacity exceeded ({0} entries)")]
    CapacityExceeded(usize),

    #[error("Load heap is empty")]
    Empty,

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("No nodes to balance")]
    NoNodes,

    #[error("Invalid task load: {0}")]
    InvalidTaskLoad(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("node id {id} out of range, valid range is 0..{node_count}")]
    OutOfRange { id: NodeId, node_count: usize },

    #[error("self edge on node {0}")]
    SelfEdge(NodeId),

    #[error("edge {0} -> {1} already exists")]
    DuplicateEdge(NodeId, NodeId),
}
