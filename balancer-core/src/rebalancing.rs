use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::balancer_metrics::{IMBALANCE_PCT, MIGRATIONS_TOTAL, MIGRATION_AMOUNT};
use crate::config::MigrationLimit;
use crate::errors::{BalancerError, Result};
use crate::load_heap::LoadHeap;
use crate::node::{Node, NodeId};

/// Share of the most loaded node's excess over the mean moved by one migration
pub const MIGRATION_FACTOR: f64 = 0.5;

/// Result of one rebalancing evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RebalanceOutcome {
    /// Imbalance within threshold, or nothing meaningful to move
    NoActionTaken,
    /// `amount` of load moved from `from` to `to`
    Migrated {
        from: NodeId,
        to: NodeId,
        amount: f64,
        /// Utilization gap (percentage points) measured before the move
        imbalance_before: f64,
        /// Donor utilization before the move, in percent
        from_pct: f64,
        /// Recipient utilization before the move, in percent
        to_pct: f64,
    },
}

impl RebalanceOutcome {
    pub fn is_migrated(&self) -> bool {
        matches!(self, RebalanceOutcome::Migrated { .. })
    }
}

/// Snapshot of how load is spread over the node set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImbalanceMetrics {
    /// Arithmetic mean of `current_load`
    pub mean_load: f64,
    /// Node with the highest load (first occurrence on ties)
    pub most_loaded: NodeId,
    /// Node with the lowest load (first occurrence on ties)
    pub least_loaded: NodeId,
    pub max_load: f64,
    pub min_load: f64,
    /// Utilization of `most_loaded`, in percent
    pub most_loaded_pct: f64,
    /// Utilization of `least_loaded`, in percent
    pub least_loaded_pct: f64,
    /// `most_loaded_pct - least_loaded_pct`
    pub imbalance_pct: f64,
}

impl ImbalanceMetrics {
    /// True when the utilization gap is strictly above `threshold_pct`
    pub fn needs_rebalancing(&self, threshold_pct: f64) -> bool {
        self.imbalance_pct > threshold_pct
    }
}

/// Computes the mean load and locates the most and least loaded nodes.
///
/// Both scans are linear and keep the first node found on ties, so with
/// identical loads `most_loaded` and `least_loaded` are the same node.
pub fn calculate_imbalance(nodes: &[Node]) -> Result<ImbalanceMetrics> {
    let first = nodes.first().ok_or(BalancerError::NoNodes)?;

    let mut most = first;
    let mut least = first;
    let mut total = 0.0;

    for node in nodes {
        total += node.current_load();
        if node.current_load() > most.current_load() {
            most = node;
        }
        if node.current_load() < least.current_load() {
            least = node;
        }
    }

    let most_loaded_pct = most.utilization_pct();
    let least_loaded_pct = least.utilization_pct();

    Ok(ImbalanceMetrics {
        mean_load: total / nodes.len() as f64,
        most_loaded: most.id(),
        least_loaded: least.id(),
        max_load: most.current_load(),
        min_load: least.current_load(),
        most_loaded_pct,
        least_loaded_pct,
        imbalance_pct: most_loaded_pct - least_loaded_pct,
    })
}

/// Evaluates the node set and performs at most one migration.
///
/// ## Algorithm:
/// 1. Mean load, most and least loaded nodes, their utilization
/// 2. `imbalance = pct_most - pct_least`, nothing to do when `<= threshold_pct`
/// 3. Move `(most.load - mean) * 0.5` from the most to the least loaded node
/// 4. Mirror both new loads into `heap` before returning
///
/// The recipient may end up above its capacity, see [`evaluate_with_limit`]
/// for a capped variant.
pub fn evaluate(
    nodes: &mut [Node],
    threshold_pct: f64,
    heap: &mut LoadHeap,
) -> Result<RebalanceOutcome> {
    evaluate_with_limit(nodes, threshold_pct, heap, MigrationLimit::Unbounded)
}

/// Same as [`evaluate`], with an explicit cap on the migrated amount.
pub fn evaluate_with_limit(
    nodes: &mut [Node],
    threshold_pct: f64,
    heap: &mut LoadHeap,
    limit: MigrationLimit,
) -> Result<RebalanceOutcome> {
    let snapshot = calculate_imbalance(nodes)?;

    metrics::gauge!(IMBALANCE_PCT.name).set(snapshot.imbalance_pct);

    if !snapshot.needs_rebalancing(threshold_pct) {
        debug!(
            imbalance_pct = snapshot.imbalance_pct,
            threshold_pct, "load within threshold, no rebalancing needed"
        );
        return Ok(RebalanceOutcome::NoActionTaken);
    }

    if snapshot.most_loaded == snapshot.least_loaded {
        return Ok(RebalanceOutcome::NoActionTaken);
    }

    let most_idx = index_of(nodes, snapshot.most_loaded)?;
    let least_idx = index_of(nodes, snapshot.least_loaded)?;

    // both entries must be present before any node is touched
    for id in [snapshot.most_loaded, snapshot.least_loaded] {
        if heap.load_of(id).is_none() {
            return Err(BalancerError::NodeNotFound(id));
        }
    }

    let mut amount = (snapshot.max_load - snapshot.mean_load) * MIGRATION_FACTOR;

    if limit == MigrationLimit::RecipientHeadroom {
        let headroom = nodes[least_idx].headroom();
        if amount > headroom {
            warn!(
                from = snapshot.most_loaded,
                to = snapshot.least_loaded,
                requested = amount,
                headroom,
                "migration capped to recipient headroom"
            );
            amount = headroom;
        }
    }

    // an overflowed load makes the amount inf or NaN
    if !amount.is_finite() {
        warn!(
            from = snapshot.most_loaded,
            to = snapshot.least_loaded,
            amount,
            "skipping migration with a non-finite amount"
        );
        return Ok(RebalanceOutcome::NoActionTaken);
    }
    if amount <= 0.0 {
        return Ok(RebalanceOutcome::NoActionTaken);
    }

    nodes[most_idx].remove_load(amount);
    nodes[least_idx].add_load(amount);

    heap.update_load(snapshot.most_loaded, nodes[most_idx].current_load())?;
    heap.update_load(snapshot.least_loaded, nodes[least_idx].current_load())?;

    metrics::counter!(MIGRATIONS_TOTAL.name).increment(1);
    metrics::histogram!(MIGRATION_AMOUNT.name).record(amount);

    info!(
        from = snapshot.most_loaded,
        to = snapshot.least_loaded,
        amount,
        imbalance_pct = snapshot.imbalance_pct,
        threshold_pct,
        "rebalancing migrated load"
    );

    Ok(RebalanceOutcome::Migrated {
        from: snapshot.most_loaded,
        to: snapshot.least_loaded,
        amount,
        imbalance_before: snapshot.imbalance_pct,
        from_pct: snapshot.most_loaded_pct,
        to_pct: snapshot.least_loaded_pct,
    })
}

fn index_of(nodes: &[Node], id: NodeId) -> Result<usize> {
    nodes
        .iter()
        .position(|n| n.id() == id)
        .ok_or(BalancerError::NodeNotFound(id))
}
