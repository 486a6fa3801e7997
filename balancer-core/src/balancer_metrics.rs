pub struct Metric {
    pub name: &'static str,
    description: &'static str,
}

pub const COUNTERS: [Metric; 3] = [
    TASKS_DISPATCHED_TOTAL,
    TASKS_REJECTED_TOTAL,
    MIGRATIONS_TOTAL,
];
pub const GAUGES: [Metric; 2] = [IMBALANCE_PCT, NODE_LOAD];
pub const HISTOGRAMS: [Metric; 1] = [MIGRATION_AMOUNT];

// DISPATCH Metrics --------------------------

pub const TASKS_DISPATCHED_TOTAL: Metric = Metric {
    name: "balancer_tasks_dispatched_total",
    description: "Total number of tasks assigned to a node",
};

pub const TASKS_REJECTED_TOTAL: Metric = Metric {
    name: "balancer_tasks_rejected_total",
    description: "Total number of tasks rejected because of an invalid load",
};

pub const NODE_LOAD: Metric = Metric {
    name: "balancer_node_load",
    description: "Current load accounted to a node",
};

// REBALANCING Metrics --------------------------

pub const MIGRATIONS_TOTAL: Metric = Metric {
    name: "balancer_migrations_total",
    description: "Total number of load migrations performed by the rebalancing policy",
};

pub const IMBALANCE_PCT: Metric = Metric {
    name: "balancer_imbalance_pct",
    description: "Utilization gap between the most and least loaded nodes at the last evaluation",
};

pub const MIGRATION_AMOUNT: Metric = Metric {
    name: "balancer_migration_amount",
    description: "Amount of load moved by a single migration",
};

/// Describes every balancer metric to the installed recorder.
/// Without a recorder the metric macros are no-ops.
pub fn describe_metrics() {
    for metric in COUNTERS {
        metrics::describe_counter!(metric.name, metric.description);
    }

    for metric in GAUGES {
        metrics::describe_gauge!(metric.name, metric.description);
    }

    for metric in HISTOGRAMS {
        metrics::describe_histogram!(metric.name, metric.description);
    }
}
