mod interactive;
mod report;
mod runner;
mod service_configuration;
mod sim_metrics;
mod tasks;

use std::io::{self, Write};
use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    report::{print_banner, print_topology},
    service_configuration::{LoadConfiguration, Overrides, SimulationSettings},
    sim_metrics::init_metrics,
    tasks::TaskSource,
};

#[derive(Debug, Parser)]
#[command(name = "balancer-sim")]
#[command(about = "Simulates least-loaded task placement with periodic rebalancing")]
#[command(version)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Serve Prometheus metrics on this address, e.g. 127.0.0.1:9040"
    )]
    prom_exporter: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Dispatch every task and print the final distribution")]
    Run {
        #[command(flatten)]
        settings: SettingsArgs,
        #[arg(long, value_parser = ["json"], help = "Output format: json (default: text)")]
        output: Option<String>,
        #[arg(
            long,
            default_value_t = 1,
            help = "Number of concurrent producers sharing the balancer"
        )]
        producers: usize,
    },
    #[command(about = "Step through the simulation from a menu")]
    Interactive {
        #[command(flatten)]
        settings: SettingsArgs,
    },
    #[command(about = "Print the resolved simulation settings as YAML")]
    ShowConfig {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Debug, Args)]
struct SettingsArgs {
    #[arg(long, short = 'c', help = "Path to the YAML config file")]
    config: Option<String>,
    #[arg(long, help = "Seed for capacities, task loads and topology")]
    seed: Option<u64>,
    #[arg(long, help = "Number of servers")]
    servers: Option<usize>,
    #[arg(long, help = "Number of tasks")]
    tasks: Option<usize>,
    #[arg(long, help = "Rebalancing threshold, in percent")]
    threshold: Option<f64>,
    #[arg(long, help = "Run the rebalancing policy every N tasks")]
    interval: Option<u64>,
}

impl SettingsArgs {
    fn resolve(&self) -> Result<SimulationSettings> {
        let mut load_config = LoadConfiguration::load(self.config.as_deref())?;
        load_config.apply(&Overrides {
            seed: self.seed,
            servers: self.servers,
            tasks: self.tasks,
            threshold: self.threshold,
            interval: self.interval,
        })?;
        load_config.try_into()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging, stdout is reserved for the simulation output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let prom_addr: Option<SocketAddr> = match &cli.prom_exporter {
        Some(addr) => Some(
            addr.parse()
                .context(format!("Failed to parse into Socket address: {}", addr))?,
        ),
        None => None,
    };
    init_metrics(prom_addr)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Run {
            settings,
            output,
            producers,
        } => {
            let settings = settings.resolve()?;
            let json = matches!(output.as_deref(), Some("json"));
            info!(
                seed = settings.seed,
                servers = settings.capacities.len(),
                tasks = settings.task_loads.len(),
                "starting simulation"
            );

            if producers > 1 {
                runner::run_shared(&settings, producers, json, &mut out).await?;
            } else {
                runner::run_batch(&settings, json, &mut out)?;
            }
        }
        Commands::Interactive { settings } => {
            let settings = settings.resolve()?;
            let mut balancer = runner::build_balancer(&settings)?;
            let mut tasks = TaskSource::new(settings.task_loads.clone());

            print_banner(&mut out, &settings)?;
            print_topology(&mut out, &settings.topology)?;

            let stdin = io::stdin();
            interactive::run_menu(&mut balancer, &mut tasks, &mut stdin.lock(), &mut out)?;
        }
        Commands::ShowConfig { settings } => {
            let settings = settings.resolve()?;
            write!(out, "{}", serde_yaml::to_string(&settings)?)?;
        }
    }

    out.flush()?;
    Ok(())
}
