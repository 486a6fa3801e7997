use serde::{Deserialize, Serialize};

use crate::errors::{BalancerError, Result};

/// Upper bound applied to the amount moved by one migration
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MigrationLimit {
    /// Move half of the most loaded node's excess over the mean, even when the
    /// recipient ends up above its own capacity
    #[default]
    Unbounded,
    /// Never move more than the recipient can still absorb before reaching capacity
    RecipientHeadroom,
}

/// Rebalancing configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RebalancingConfig {
    /// Utilization gap (percentage points) between the most and least loaded
    /// nodes above which a migration is triggered
    pub threshold_pct: f64,
    /// Run the rebalancing policy after every `interval` dispatches
    pub interval: u64,
    /// Cap applied to the migrated amount
    pub migration_limit: MigrationLimit,
    /// Number of migrations kept in the history ring buffer
    pub history_size: usize,
}

impl Default for RebalancingConfig {
    fn default() -> Self {
        Self {
            threshold_pct: 20.0,
            interval: 5,
            migration_limit: MigrationLimit::Unbounded,
            history_size: 1000,
        }
    }
}

impl RebalancingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_pct.is_finite() || self.threshold_pct <= 0.0 {
            return Err(BalancerError::InvalidConfig(format!(
                "threshold_pct must be a positive percentage, got {}",
                self.threshold_pct
            )));
        }
        if self.interval == 0 {
            return Err(BalancerError::InvalidConfig(
                "interval must be at least one dispatch".to_string(),
            ));
        }
        if self.history_size == 0 {
            return Err(BalancerError::InvalidConfig(
                "history_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebalancing_config_defaults() {
        let config = RebalancingConfig::default();
        assert_eq!(config.threshold_pct, 20.0);
        assert_eq!(config.interval, 5);
        assert_eq!(config.migration_limit, MigrationLimit::Unbounded);
        assert_eq!(config.history_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        for threshold_pct in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = RebalancingConfig {
                threshold_pct,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(BalancerError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_invalid_interval_and_history() {
        let config = RebalancingConfig {
            interval: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RebalancingConfig {
            history_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_migration_limit_serde_names() {
        let limit: MigrationLimit = serde_json::from_str("\"recipient_headroom\"").unwrap();
        assert_eq!(limit, MigrationLimit::RecipientHeadroom);

        let config: RebalancingConfig =
            serde_json::from_str(r#"{ "threshold_pct": 35.0 }"#).unwrap();
        assert_eq!(config.threshold_pct, 35.0);
        assert_eq!(config.interval, 5);
    }
}
