//! Least-loaded task placement with threshold-driven rebalancing.
//!
//! A [`Balancer`] keeps a set of [`Node`]s and a [`LoadHeap`] indexing them by
//! current load. Each dispatched task goes to the node with the lowest load,
//! and every `interval` dispatches the rebalancing policy moves part of the
//! most loaded node's excess to the least loaded one when their utilization
//! gap exceeds the configured threshold.

mod balancer_metrics;
mod config;
mod dispatch;
mod errors;
mod history;
mod load_heap;
mod node;
mod rebalancing;
mod shared;
mod topology;


pub use balancer_metrics::{describe_metrics, Metric, COUNTERS, GAUGES, HISTOGRAMS};
pub use config::{MigrationLimit, RebalancingConfig};
pub use dispatch::{Balancer, DispatchReport, LoadSummary};
pub use errors::{BalancerError, Result, TopologyError};
pub use history::{MigrationRecord, RebalanceTrigger, RebalancingHistory};
pub use load_heap::{LoadEntry, LoadHeap};
pub use node::{Node, NodeId};
pub use rebalancing::{
    calculate_imbalance, evaluate, evaluate_with_limit, ImbalanceMetrics, RebalanceOutcome,
    MIGRATION_FACTOR,
};
pub use shared::SharedBalancer;
pub use topology::Topology;
