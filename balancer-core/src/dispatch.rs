use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::balancer_metrics::{NODE_LOAD, TASKS_DISPATCHED_TOTAL, TASKS_REJECTED_TOTAL};
use crate::config::RebalancingConfig;
use crate::errors::{BalancerError, Result};
use crate::history::{MigrationRecord, RebalanceTrigger, RebalancingHistory};
use crate::load_heap::LoadHeap;
use crate::node::{Node, NodeId};
use crate::rebalancing::{self, RebalanceOutcome};
use crate::topology::Topology;

/// What the reporting layer learns about one dispatched task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// 1-based sequence number of the task
    pub seq: u64,
    pub task_load: f64,
    pub node_id: NodeId,
    /// Load of the node right after the task was added
    pub new_load: f64,
    pub capacity: f64,
    /// `new_load / capacity × 100`
    pub utilization_pct: f64,
    /// Set when this dispatch hit the rebalancing interval
    pub rebalance: Option<RebalanceOutcome>,
}

/// Whole-run statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub dispatched: u64,
    pub total_load: f64,
    pub average_load: f64,
    pub max_load: f64,
    pub min_load: f64,
    /// `max_load - min_load`
    pub load_difference: f64,
    /// Utilization gap between the most and least loaded nodes
    pub imbalance_pct: f64,
    /// Load difference below the rebalancing threshold
    pub well_balanced: bool,
    /// Migrations performed over the whole run
    pub migrations: u64,
}

/// Balancer owns the node set and the least-loaded index built over it.
///
/// Nodes and the `LoadHeap` are mutated together: every public operation
/// leaves each heap entry equal to its node's `current_load`.
#[derive(Debug, Clone)]
pub struct Balancer {
    nodes: Vec<Node>,
    heap: LoadHeap,
    config: RebalancingConfig,
    history: RebalancingHistory,
    topology: Option<Topology>,
    dispatched: u64,
    migrations: u64,
}

impl Balancer {
    /// Creates one idle node per capacity, with ids `0..n`, and indexes them all at load 0.
    pub fn new(capacities: &[f64], config: RebalancingConfig) -> Result<Self> {
        if capacities.is_empty() {
            return Err(BalancerError::NoNodes);
        }
        config.validate()?;

        let nodes = capacities
            .iter()
            .enumerate()
            .map(|(id, capacity)| Node::new(id as NodeId, *capacity))
            .collect::<Result<Vec<_>>>()?;

        let mut heap = LoadHeap::new(nodes.len())?;
        for node in &nodes {
            heap.insert(node.id(), node.current_load())?;
        }

        Ok(Balancer {
            history: RebalancingHistory::new(config.history_size),
            nodes,
            heap,
            config,
            topology: None,
            dispatched: 0,
            migrations: 0,
        })
    }

    /// Attaches a topology, carried along untouched.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Assigns one task to the least loaded node.
    ///
    /// ## Process:
    /// 1. Reject invalid loads (zero, negative, NaN, infinite, or overflowing the
    ///    least loaded node) before touching any state
    /// 2. Extract the least loaded entry from the heap
    /// 3. Add the task load to that node
    /// 4. Re-insert the node at its new load
    /// 5. Every `interval` dispatches, run the rebalancing policy
    pub fn dispatch(&mut self, task_load: f64) -> Result<DispatchReport> {
        if !task_load.is_finite() || task_load <= 0.0 {
            metrics::counter!(TASKS_REJECTED_TOTAL.name).increment(1);
            warn!(task_load, "rejected task with invalid load");
            return Err(BalancerError::InvalidTaskLoad(task_load));
        }

        if let Some(min) = self.heap.peek_min() {
            if !(min.load + task_load).is_finite() {
                metrics::counter!(TASKS_REJECTED_TOTAL.name).increment(1);
                warn!(
                    task_load,
                    node_id = min.node_id,
                    load = min.load,
                    "rejected task overflowing the node load"
                );
                return Err(BalancerError::InvalidTaskLoad(task_load));
            }
        }

        let entry = self.heap.extract_min()?;
        let idx = match self.index_of(entry.node_id) {
            Ok(idx) => idx,
            Err(e) => {
                // put the entry back so the heap keeps one entry per node
                self.heap.insert(entry.node_id, entry.load)?;
                return Err(e);
            }
        };

        let node = &mut self.nodes[idx];
        node.add_load(task_load);
        let (node_id, new_load, capacity, utilization_pct) = (
            node.id(),
            node.current_load(),
            node.capacity(),
            node.utilization_pct(),
        );
        self.heap.insert(node_id, new_load)?;
        self.dispatched += 1;

        metrics::counter!(TASKS_DISPATCHED_TOTAL.name).increment(1);
        metrics::gauge!(NODE_LOAD.name, "node" => node_id.to_string()).set(new_load);
        debug!(
            seq = self.dispatched,
            node_id, task_load, new_load, "task dispatched"
        );

        let rebalance = if self.dispatched % self.config.interval == 0 {
            Some(self.run_rebalance(RebalanceTrigger::Periodic)?)
        } else {
            None
        };

        Ok(DispatchReport {
            seq: self.dispatched,
            task_load,
            node_id,
            new_load,
            capacity,
            utilization_pct,
            rebalance,
        })
    }

    /// Dispatches every task pulled from `tasks`, stopping at the first error.
    pub fn dispatch_all<I>(&mut self, tasks: I) -> Result<Vec<DispatchReport>>
    where
        I: IntoIterator<Item = f64>,
    {
        tasks
            .into_iter()
            .map(|task_load| self.dispatch(task_load))
            .collect()
    }

    /// Runs the rebalancing policy on demand.
    pub fn rebalance(&mut self) -> Result<RebalanceOutcome> {
        self.run_rebalance(RebalanceTrigger::Manual)
    }

    fn run_rebalance(&mut self, trigger: RebalanceTrigger) -> Result<RebalanceOutcome> {
        let outcome = rebalancing::evaluate_with_limit(
            &mut self.nodes,
            self.config.threshold_pct,
            &mut self.heap,
            self.config.migration_limit,
        )?;

        if let RebalanceOutcome::Migrated {
            from,
            to,
            amount,
            imbalance_before,
            ..
        } = outcome
        {
            self.migrations += 1;

            for id in [from, to] {
                let load = self.node(id)?.current_load();
                metrics::gauge!(NODE_LOAD.name, "node" => id.to_string()).set(load);
            }

            self.history.record(MigrationRecord {
                from,
                to,
                amount,
                imbalance_before,
                dispatch_seq: self.dispatched,
                trigger,
            });
        }

        Ok(outcome)
    }

    /// Final statistics over the current node set.
    pub fn summary(&self) -> Result<LoadSummary> {
        let snapshot = rebalancing::calculate_imbalance(&self.nodes)?;
        let load_difference = snapshot.max_load - snapshot.min_load;

        Ok(LoadSummary {
            dispatched: self.dispatched,
            total_load: self.total_load(),
            average_load: snapshot.mean_load,
            max_load: snapshot.max_load,
            min_load: snapshot.min_load,
            load_difference,
            imbalance_pct: snapshot.imbalance_pct,
            well_balanced: load_difference < self.config.threshold_pct,
            migrations: self.migrations,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.index_of(id).map(|idx| &self.nodes[idx])
    }

    pub fn heap(&self) -> &LoadHeap {
        &self.heap
    }

    pub fn config(&self) -> &RebalancingConfig {
        &self.config
    }

    pub fn history(&self) -> &RebalancingHistory {
        &self.history
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    /// Number of tasks dispatched so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Number of migrations performed so far, including those no longer held in the history
    pub fn migrations(&self) -> u64 {
        self.migrations
    }

    pub fn total_load(&self) -> f64 {
        self.nodes.iter().map(Node::current_load).sum()
    }

    fn index_of(&self, id: NodeId) -> Result<usize> {
        // ids are assigned 0..n in construction order
        usize::try_from(id)
            .ok()
            .filter(|idx| self.nodes.get(*idx).is_some_and(|n| n.id() == id))
            .ok_or(BalancerError::NodeNotFound(id))
    }
}
