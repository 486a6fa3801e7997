use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::node::NodeId;

/// What caused a rebalancing evaluation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceTrigger {
    /// Dispatch counter reached a multiple of the configured interval
    Periodic,
    /// Requested on demand by the caller
    Manual,
}

/// A migration that has been applied to the node set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub amount: f64,
    pub imbalance_before: f64,
    /// Number of tasks dispatched when the migration happened
    pub dispatch_seq: u64,
    pub trigger: RebalanceTrigger,
}

/// Bounded record of recent migrations, oldest entries are dropped first
#[derive(Debug, Clone)]
pub struct RebalancingHistory {
    records: VecDeque<MigrationRecord>,
    max_size: usize,
}

impl RebalancingHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn record(&mut self, record: MigrationRecord) {
        if self.records.len() >= self.max_size {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// The `limit` most recent migrations, newest first
    pub fn recent(&self, limit: usize) -> Vec<&MigrationRecord> {
        self.records.iter().rev().take(limit).collect()
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Sum of all amounts still held in the buffer
    pub fn moved_total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationRecord> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
