use std::io::Write;

use anyhow::Result;
use balancer_core::{
    DispatchReport, LoadSummary, MigrationRecord, Node, RebalanceOutcome, Topology,
};
use prettytable::{format, Cell, Row, Table};
use serde::Serialize;

use crate::service_configuration::SimulationSettings;

/// Everything a batch run produced, emitted as one document with `--output json`
#[derive(Debug, Serialize)]
pub(crate) struct RunReport<'a> {
    pub(crate) settings: &'a SimulationSettings,
    pub(crate) dispatches: Vec<DispatchReport>,
    pub(crate) migrations: Vec<MigrationRecord>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) summary: LoadSummary,
}

pub(crate) fn print_banner<W: Write>(out: &mut W, settings: &SimulationSettings) -> Result<()> {
    writeln!(out, "=== Least-loaded balancer simulation (seed {}) ===", settings.seed)?;
    writeln!(out, "\nInitializing {} servers...", settings.capacities.len())?;
    for (id, capacity) in settings.capacities.iter().enumerate() {
        writeln!(out, "  Server {}: Capacity = {:.2}", id, capacity)?;
    }
    writeln!(
        out,
        "Rebalancing: threshold {:.2}%, every {} tasks, {} tasks queued",
        settings.rebalancing.threshold_pct,
        settings.rebalancing.interval,
        settings.task_loads.len()
    )?;
    Ok(())
}

pub(crate) fn print_topology<W: Write>(out: &mut W, topology: &Topology) -> Result<()> {
    writeln!(out, "\n--- Server Network Topology ---")?;
    for (id, neighbors) in topology.iter() {
        if neighbors.is_empty() {
            writeln!(out, "Server {} → (no connections)", id)?;
        } else {
            let list: Vec<String> = neighbors.iter().map(|n| n.to_string()).collect();
            writeln!(out, "Server {} → {}", id, list.join(", "))?;
        }
    }
    Ok(())
}

/// One line per dispatched task, followed by the rebalance event it triggered, if any.
pub(crate) fn print_dispatch<W: Write>(
    out: &mut W,
    report: &DispatchReport,
    threshold_pct: f64,
) -> Result<()> {
    writeln!(
        out,
        "Task {:2} → Server {} | Load: {:6.2}/{:6.2} ({:.1}%)",
        report.seq, report.node_id, report.new_load, report.capacity, report.utilization_pct
    )?;
    if let Some(outcome @ RebalanceOutcome::Migrated { .. }) = &report.rebalance {
        print_rebalance(out, outcome, threshold_pct)?;
    }
    Ok(())
}

pub(crate) fn print_rebalance<W: Write>(
    out: &mut W,
    outcome: &RebalanceOutcome,
    threshold_pct: f64,
) -> Result<()> {
    match outcome {
        RebalanceOutcome::NoActionTaken => {
            writeln!(out, "   No rebalancing needed (threshold: {:.2}%)", threshold_pct)?;
        }
        RebalanceOutcome::Migrated {
            from,
            to,
            amount,
            imbalance_before,
            from_pct,
            to_pct,
        } => {
            writeln!(out, "\n⚠ REBALANCING TRIGGERED")?;
            writeln!(
                out,
                "   Imbalance: {:.2}% (threshold: {:.2}%)",
                imbalance_before, threshold_pct
            )?;
            writeln!(
                out,
                "   Server {} ({:.2}%) → Server {} ({:.2}%)",
                from, from_pct, to, to_pct
            )?;
            writeln!(out, "   Migrating {:.2} load units", amount)?;
            writeln!(out, "   ✓ Rebalancing complete")?;
        }
    }
    Ok(())
}

pub(crate) fn print_servers<W: Write>(out: &mut W, nodes: &[Node]) -> Result<()> {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(vec![
        Cell::new("Server"),
        Cell::new("Load"),
        Cell::new("Capacity"),
        Cell::new("Utilization"),
    ]));

    for node in nodes {
        table.add_row(Row::new(vec![
            Cell::new(&node.id().to_string()),
            Cell::new(&format!("{:.2}", node.current_load())),
            Cell::new(&format!("{:.2}", node.capacity())),
            Cell::new(&format!("{:.1}%", node.utilization_pct())),
        ]));
    }

    table.print(out)?;
    Ok(())
}

pub(crate) fn print_summary<W: Write>(out: &mut W, summary: &LoadSummary) -> Result<()> {
    writeln!(out, "\n--- Final Statistics ---")?;
    writeln!(out, "Tasks assigned:  {}", summary.dispatched)?;
    writeln!(out, "Average Load:    {:.2}", summary.average_load)?;
    writeln!(out, "Max Load:        {:.2}", summary.max_load)?;
    writeln!(out, "Min Load:        {:.2}", summary.min_load)?;
    writeln!(out, "Load Difference: {:.2}", summary.load_difference)?;
    writeln!(out, "Imbalance:       {:.2}%", summary.imbalance_pct)?;
    writeln!(out, "Migrations:      {}", summary.migrations)?;

    if summary.well_balanced {
        writeln!(out, "\n✓ System is WELL-BALANCED")?;
    } else {
        writeln!(out, "\n⚠ System could benefit from further rebalancing")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_topology_lists_isolated_servers() {
        let mut topology = Topology::new(3);
        topology.add_edge(0, 2).unwrap();
        topology.add_edge(0, 1).unwrap();

        let text = render(|out| print_topology(out, &topology));
        assert!(text.contains("Server 0 → 1, 2"));
        assert!(text.contains("Server 1 → (no connections)"));
        assert!(text.contains("Server 2 → (no connections)"));
    }

    #[test]
    fn test_dispatch_line_format() {
        let report = DispatchReport {
            seq: 3,
            task_load: 7.5,
            node_id: 2,
            new_load: 17.5,
            capacity: 100.0,
            utilization_pct: 17.5,
            rebalance: Some(RebalanceOutcome::Migrated {
                from: 0,
                to: 1,
                amount: 4.25,
                imbalance_before: 31.0,
                from_pct: 42.5,
                to_pct: 11.5,
            }),
        };

        let text = render(|out| print_dispatch(out, &report, 20.0));
        assert!(text.starts_with("Task  3 → Server 2 | Load:  17.50/100.00 (17.5%)"));
        assert!(text.contains("Imbalance: 31.00% (threshold: 20.00%)"));
        assert!(text.contains("Server 0 (42.50%) → Server 1 (11.50%)"));
        assert!(text.contains("Migrating 4.25 load units"));
    }

    #[test]
    fn test_summary_verdict() {
        let mut summary = LoadSummary {
            dispatched: 4,
            total_load: 40.0,
            average_load: 20.0,
            max_load: 25.0,
            min_load: 15.0,
            load_difference: 10.0,
            imbalance_pct: 10.0,
            well_balanced: true,
            migrations: 1,
        };
        assert!(render(|out| print_summary(out, &summary)).contains("WELL-BALANCED"));

        summary.well_balanced = false;
        assert!(render(|out| print_summary(out, &summary)).contains("further rebalancing"));
    }
}
