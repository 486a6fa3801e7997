use std::io::Write;

use anyhow::{anyhow, Context, Result};
use balancer_core::{Balancer, DispatchReport, SharedBalancer};
use tracing::info;

use crate::report::{
    print_banner, print_dispatch, print_servers, print_summary, print_topology, RunReport,
};
use crate::service_configuration::SimulationSettings;
use crate::tasks::TaskSource;

pub(crate) fn build_balancer(settings: &SimulationSettings) -> Result<Balancer> {
    let balancer = Balancer::new(&settings.capacities, settings.rebalancing.clone())
        .context("Failed to initialize the balancer")?;
    Ok(balancer.with_topology(settings.topology.clone()))
}

/// Dispatches every task in order from a single producer.
pub(crate) fn run_batch<W: Write>(
    settings: &SimulationSettings,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let mut balancer = build_balancer(settings)?;
    let tasks = TaskSource::new(settings.task_loads.clone());

    if !json {
        print_intro(out, settings)?;
    }

    let mut dispatches = Vec::with_capacity(tasks.total());
    for load in tasks {
        let report = balancer.dispatch(load)?;
        if !json {
            print_dispatch(out, &report, settings.rebalancing.threshold_pct)?;
        }
        dispatches.push(report);
    }

    info!(
        tasks = dispatches.len(),
        migrations = balancer.migrations(),
        "simulation finished"
    );

    print_outcome(out, settings, &balancer, dispatches, json)
}

/// Splits the tasks over `producers` concurrent tokio tasks sharing one balancer.
pub(crate) async fn run_shared<W: Write>(
    settings: &SimulationSettings,
    producers: usize,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let shared = SharedBalancer::new(build_balancer(settings)?);
    let batches = TaskSource::new(settings.task_loads.clone()).split(producers);

    if !json {
        print_intro(out, settings)?;
        writeln!(out, "({} concurrent producers)", batches.len())?;
    }

    let handles = batches.into_iter().map(|batch| {
        let shared_cl = shared.clone();
        tokio::spawn(async move {
            let mut reports = Vec::with_capacity(batch.len());
            for load in batch {
                reports.push(shared_cl.dispatch(load).await?);
            }
            Ok::<_, balancer_core::BalancerError>(reports)
        })
    });

    let mut dispatches: Vec<DispatchReport> = Vec::new();
    for result in futures::future::join_all(handles).await {
        let reports = result.map_err(|e| anyhow!("producer task failed: {}", e))??;
        dispatches.extend(reports);
    }
    dispatches.sort_by_key(|r| r.seq);

    if !json {
        for report in &dispatches {
            print_dispatch(out, report, settings.rebalancing.threshold_pct)?;
        }
    }

    info!(
        tasks = dispatches.len(),
        producers, "shared simulation finished"
    );

    let balancer = shared.with(|b| b.clone()).await;
    print_outcome(out, settings, &balancer, dispatches, json)
}

fn print_intro<W: Write>(out: &mut W, settings: &SimulationSettings) -> Result<()> {
    print_banner(out, settings)?;
    print_topology(out, &settings.topology)?;
    writeln!(
        out,
        "\n--- Assigning {} Tasks Dynamically ---",
        settings.task_loads.len()
    )?;
    Ok(())
}

fn print_outcome<W: Write>(
    out: &mut W,
    settings: &SimulationSettings,
    balancer: &Balancer,
    dispatches: Vec<DispatchReport>,
    json: bool,
) -> Result<()> {
    let summary = balancer.summary()?;

    if json {
        let report = RunReport {
            settings,
            dispatches,
            migrations: balancer.history().iter().cloned().collect(),
            nodes: balancer.nodes().to_vec(),
            summary,
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(out, "\n=== FINAL LOAD DISTRIBUTION ===")?;
    print_servers(out, balancer.nodes())?;
    print_summary(out, &summary)
}
