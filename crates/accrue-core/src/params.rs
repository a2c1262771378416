//! Distribution parameters and engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DELAYED_REWARD_UNIT_SECS, DEFAULT_MAX_DELAYED_INTERVAL, DEFAULT_MIN_DELAYED_PERIOD,
    DEFAULT_STAKE_TOLERANCE_UNITS,
};
use crate::dec::Dec;
use crate::error::{ConfigError, ParamsError};

/// Chain-level parameters read by every accounting step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Fraction of each minted validator reward held back for vesting.
    pub delayed_reward_proportion: Dec,
    /// Minimum vesting duration in ticks.
    pub min_delayed_period: u64,
    /// Extra ticks added at full concentration deviation.
    pub max_delayed_interval: u64,
    /// Bucket granularity (one tick) in seconds.
    pub delayed_reward_unit_secs: u64,
    pub withdraw_addr_enabled: bool,
    /// How many smallest decimal units a reconstructed delegation stake may
    /// exceed the live stake before the drift is treated as corruption.
    pub stake_tolerance_units: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            delayed_reward_proportion: Dec::from_raw(500_000_000_000_000_000),
            min_delayed_period: DEFAULT_MIN_DELAYED_PERIOD,
            max_delayed_interval: DEFAULT_MAX_DELAYED_INTERVAL,
            delayed_reward_unit_secs: DEFAULT_DELAYED_REWARD_UNIT_SECS,
            withdraw_addr_enabled: true,
            stake_tolerance_units: DEFAULT_STAKE_TOLERANCE_UNITS,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let proportion = self.delayed_reward_proportion;
        if proportion.is_negative() || proportion > Dec::ONE {
            return Err(ParamsError::InvalidDelayedProportion(proportion));
        }
        if self.delayed_reward_unit_secs == 0 {
            return Err(ParamsError::ZeroRewardUnit);
        }
        Ok(())
    }

    /// Reconciliation tolerance as a decimal amount.
    pub fn stake_tolerance(&self) -> Dec {
        Dec::from_raw(self.stake_tolerance_units as i128)
    }
}

/// Configuration for an engine instance backed by persistent storage.
#[derive(Debug, Clone)]
pub struct DistributionConfig {
    /// Root directory for persistent data.
    pub data_dir: PathBuf,
    pub params: Params,
    /// Log level filter string (e.g. "info", "accrue_distribution=debug").
    pub log_level: String,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accrue");

        Self {
            data_dir,
            params: Params::default(),
            log_level: "info".to_string(),
        }
    }
}

impl DistributionConfig {
    /// Path to the RocksDB distribution store.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("distribution")
    }

    /// Defaults overridden by `ACCRUE_DATA_DIR`, `ACCRUE_LOG_LEVEL`, and a
    /// JSON params file named by `ACCRUE_PARAMS_FILE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Ok(dir) = std::env::var("ACCRUE_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("ACCRUE_LOG_LEVEL") {
            cfg.log_level = level;
        }
        if let Ok(path) = std::env::var("ACCRUE_PARAMS_FILE") {
            let text = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
            cfg.params = serde_json::from_str(&text)?;
        }

        cfg.params.validate()?;
        Ok(cfg)
    }
}
