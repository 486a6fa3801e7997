use anyhow::{anyhow, bail, Context, Result};
use balancer_core::{RebalancingConfig, Topology};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub(crate) const MAX_SERVERS: usize = 20;
pub(crate) const MAX_TASKS: usize = 1000;
pub(crate) const MAX_INTERVAL: u64 = 100;
pub(crate) const MIN_THRESHOLD_PCT: f64 = 0.1;
pub(crate) const MAX_THRESHOLD_PCT: f64 = 100.0;

/// How server capacities are produced
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub(crate) enum CapacityMode {
    /// Uniform in `[min, max)`, one value per server
    Random { min: f64, max: f64 },
    /// One explicit capacity per server, the list length sets the server count
    Fixed { values: Vec<f64> },
}

/// How task loads are produced
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub(crate) enum TaskMode {
    Random { count: usize, min: f64, max: f64 },
    Fixed { values: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub(crate) enum TopologyMode {
    /// 1 to 3 random outgoing links per server
    Random,
    /// Explicit `[src, dest]` links
    Edges { edges: Vec<[u64; 2]> },
}

/// LoadConfiguration is used only to load the YAML file
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct LoadConfiguration {
    pub(crate) servers: usize,
    pub(crate) capacities: CapacityMode,
    pub(crate) tasks: TaskMode,
    pub(crate) topology: TopologyMode,
    pub(crate) rebalancing: RebalancingConfig,
    /// Seed for every random draw; a random seed is picked when absent
    pub(crate) seed: Option<u64>,
}

impl Default for LoadConfiguration {
    fn default() -> Self {
        LoadConfiguration {
            servers: 6,
            capacities: CapacityMode::Random {
                min: 80.0,
                max: 120.0,
            },
            tasks: TaskMode::Random {
                count: 30,
                min: 5.0,
                max: 15.0,
            },
            topology: TopologyMode::Random,
            rebalancing: RebalancingConfig::default(),
            seed: None,
        }
    }
}

/// Command line values taking precedence over the file
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub(crate) seed: Option<u64>,
    pub(crate) servers: Option<usize>,
    pub(crate) tasks: Option<usize>,
    pub(crate) threshold: Option<f64>,
    pub(crate) interval: Option<u64>,
}

impl LoadConfiguration {
    /// Reads the YAML file at `path`, or the built-in defaults when no path is given.
    pub(crate) fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path))?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {}", path))
            }
            None => Ok(LoadConfiguration::default()),
        }
    }

    pub(crate) fn apply(&mut self, overrides: &Overrides) -> Result<()> {
        if let Some(seed) = overrides.seed {
            self.seed = Some(seed);
        }
        if let Some(servers) = overrides.servers {
            if let CapacityMode::Fixed { values } = &self.capacities {
                if values.len() != servers {
                    bail!(
                        "--servers {} conflicts with the {} fixed capacities of the config file",
                        servers,
                        values.len()
                    );
                }
            }
            self.servers = servers;
        }
        if let Some(tasks) = overrides.tasks {
            match &mut self.tasks {
                TaskMode::Random { count, .. } => *count = tasks,
                TaskMode::Fixed { values } => bail!(
                    "--tasks {} conflicts with the {} fixed task loads of the config file",
                    tasks,
                    values.len()
                ),
            }
        }
        if let Some(threshold) = overrides.threshold {
            self.rebalancing.threshold_pct = threshold;
        }
        if let Some(interval) = overrides.interval {
            self.rebalancing.interval = interval;
        }
        Ok(())
    }
}

/// Validated, fully materialized simulation input
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimulationSettings {
    pub(crate) seed: u64,
    pub(crate) capacities: Vec<f64>,
    pub(crate) task_loads: Vec<f64>,
    pub(crate) topology: Topology,
    pub(crate) rebalancing: RebalancingConfig,
}

/// Implementing the TryFrom trait to transform LoadConfiguration into SimulationSettings
impl TryFrom<LoadConfiguration> for SimulationSettings {
    type Error = anyhow::Error;

    fn try_from(config: LoadConfiguration) -> Result<Self> {
        config
            .rebalancing
            .validate()
            .context("Invalid rebalancing settings")?;
        if config.rebalancing.interval > MAX_INTERVAL {
            bail!(
                "rebalancing interval must be between 1 and {}, got {}",
                MAX_INTERVAL,
                config.rebalancing.interval
            );
        }
        let threshold_pct = config.rebalancing.threshold_pct;
        if !(MIN_THRESHOLD_PCT..=MAX_THRESHOLD_PCT).contains(&threshold_pct) {
            bail!(
                "rebalancing threshold must be between {}% and {}%, got {}",
                MIN_THRESHOLD_PCT,
                MAX_THRESHOLD_PCT,
                threshold_pct
            );
        }

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let capacities = match config.capacities {
            CapacityMode::Random { min, max } => {
                check_range("capacity", min, max)?;
                check_count("servers", config.servers, MAX_SERVERS)?;
                (0..config.servers)
                    .map(|_| draw(&mut rng, min, max))
                    .collect()
            }
            CapacityMode::Fixed { values } => {
                check_count("servers", values.len(), MAX_SERVERS)?;
                if let Some(bad) = values.iter().find(|c| !c.is_finite() || **c <= 0.0) {
                    bail!("server capacities must be positive, got {}", bad);
                }
                values
            }
        };

        let task_loads = match config.tasks {
            TaskMode::Random { count, min, max } => {
                check_range("task load", min, max)?;
                check_count("tasks", count, MAX_TASKS)?;
                (0..count).map(|_| draw(&mut rng, min, max)).collect()
            }
            TaskMode::Fixed { values } => {
                check_count("tasks", values.len(), MAX_TASKS)?;
                if let Some(bad) = values.iter().find(|l| !l.is_finite() || **l <= 0.0) {
                    bail!("task loads must be positive, got {}", bad);
                }
                values
            }
        };

        let topology = match config.topology {
            TopologyMode::Random => Topology::random(capacities.len(), &mut rng),
            TopologyMode::Edges { edges } => {
                let mut topology = Topology::new(capacities.len());
                for [src, dest] in edges {
                    topology
                        .add_edge(src, dest)
                        .map_err(|e| anyhow!("Invalid topology edge {} -> {}: {}", src, dest, e))?;
                }
                topology
            }
        };

        Ok(SimulationSettings {
            seed,
            capacities,
            task_loads,
            topology,
            rebalancing: config.rebalancing,
        })
    }
}

fn draw(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    if min == max {
        min
    } else {
        rng.random_range(min..max)
    }
}

fn check_range(what: &str, min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
        bail!(
            "{} range must satisfy 0 < min <= max, got {}..{}",
            what,
            min,
            max
        );
    }
    Ok(())
}

fn check_count(what: &str, count: usize, max: usize) -> Result<()> {
    if count == 0 || count > max {
        bail!("number of {} must be between 1 and {}, got {}", what, max, count);
    }
    Ok(())
}
