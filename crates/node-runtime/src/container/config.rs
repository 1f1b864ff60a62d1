//! # Node Configuration
//!
//! Unified configuration for the staking and incentive subsystems and the
//! runtime around them.
//!
//! ## Requirements
//!
//! - The covenant committee has no default; `covenant_pks` MUST be provided
//!   (in code or via `QC_COVENANT_PKS`) before `validate()` passes
//! - Every other value has a sane default with override capability

use qc_18_btc_staking::Params;
use qc_19_incentive::RemainderPolicy;
use shared_types::{Address, BtcPublicKey, Coins};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Staking configuration.
    pub staking: StakingConfig,
    /// Epoch configuration.
    pub epoch: EpochConfig,
    /// Incentive configuration.
    pub incentive: IncentiveConfig,
    /// Snapshot storage configuration.
    pub storage: StorageConfig,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    /// Defaults overridden by `QC_*` environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_COVENANT_PKS`: comma-separated hex x-only covenant keys
    /// - `QC_COVENANT_QUORUM`: covenant signatures required per spend path
    /// - `QC_MIN_COMMISSION_BPS`: minimum finality provider commission
    /// - `QC_FINALIZATION_TIMEOUT`: BTC blocks before end height at which delegations expire
    /// - `QC_EPOCH_INTERVAL`: blocks per epoch
    /// - `QC_REMAINDER_POLICY`: `accumulate` or `drop`
    /// - `QC_WITHDRAWAL_FEE`: fee charged per withdrawal, e.g. `10ubbn`
    /// - `QC_SNAPSHOT_RETENTION`: committed snapshots kept in the store
    /// - `QC_LOG_LEVEL`: log filter when `RUST_LOG` is unset
    /// - `QC_JSON_LOGS`: `true` for JSON log lines
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let params = &mut self.staking.genesis_params;
        if let Some(raw) = lookup("QC_COVENANT_PKS") {
            params.covenant_pks = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_var::<BtcPublicKey>("QC_COVENANT_PKS", s))
                .collect::<Result<_, _>>()?;
        }
        override_var(&lookup, "QC_COVENANT_QUORUM", &mut params.covenant_quorum)?;
        override_var(&lookup, "QC_MIN_COMMISSION_BPS", &mut params.min_commission_bps)?;
        override_var(
            &lookup,
            "QC_FINALIZATION_TIMEOUT",
            &mut params.finalization_timeout_blocks,
        )?;
        override_var(&lookup, "QC_EPOCH_INTERVAL", &mut self.epoch.epoch_interval)?;
        if let Some(raw) = lookup("QC_REMAINDER_POLICY") {
            self.incentive.remainder_policy = match raw.to_ascii_lowercase().as_str() {
                "accumulate" => RemainderPolicy::Accumulate,
                "drop" => RemainderPolicy::Drop,
                _ => return Err(ConfigError::invalid("QC_REMAINDER_POLICY", &raw)),
            };
        }
        override_var(&lookup, "QC_WITHDRAWAL_FEE", &mut self.incentive.withdrawal_fee)?;
        override_var(
            &lookup,
            "QC_SNAPSHOT_RETENTION",
            &mut self.storage.snapshot_retention,
        )?;
        if let Some(level) = lookup("QC_LOG_LEVEL") {
            self.telemetry.log_level = level;
        }
        override_var(&lookup, "QC_JSON_LOGS", &mut self.telemetry.json_logs)?;
        Ok(self)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.staking
            .genesis_params
            .validate()
            .map_err(|e| ConfigError::InvalidParams(e.to_string()))?;
        if self.epoch.epoch_interval == 0 {
            return Err(ConfigError::ZeroEpochInterval);
        }
        if self.incentive.module_account == self.incentive.fee_collector {
            return Err(ConfigError::SharedModuleAccount);
        }
        if self.storage.snapshot_retention == 0 {
            return Err(ConfigError::ZeroSnapshotRetention);
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, raw))
}

fn override_var<T, F>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = parse_var(key, &raw)?;
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Genesis staking parameters are invalid (e.g. no covenant committee).
    #[error("Invalid genesis staking params: {0}. Set QC_COVENANT_PKS or provide them in config.")]
    InvalidParams(String),

    #[error("Epoch interval must be positive")]
    ZeroEpochInterval,

    #[error("Incentive module account and fee collector must differ")]
    SharedModuleAccount,

    #[error("Snapshot retention must be positive")]
    ZeroSnapshotRetention,

    /// An environment override could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }
    }
}

/// Staking configuration.
#[derive(Debug, Clone, Default)]
pub struct StakingConfig {
    /// Params version 0, active from genesis.
    pub genesis_params: Params,
}

/// Epoch configuration.
#[derive(Debug, Clone)]
pub struct EpochConfig {
    /// Blocks per epoch; epoch `n` ends at height `n * epoch_interval`.
    pub epoch_interval: u64,
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self { epoch_interval: 10 }
    }
}

/// Incentive configuration.
#[derive(Debug, Clone)]
pub struct IncentiveConfig {
    /// What to do with truncation leftovers.
    pub remainder_policy: RemainderPolicy,
    /// Account holding rewards until they are withdrawn.
    pub module_account: Address,
    /// Account receiving withdrawal fees.
    pub fee_collector: Address,
    /// Fee deducted from each withdrawal.
    pub withdrawal_fee: Coins,
}

impl Default for IncentiveConfig {
    fn default() -> Self {
        Self {
            remainder_policy: RemainderPolicy::Accumulate,
            module_account: Address([0x19; 20]),
            fee_collector: Address([0xFE; 20]),
            withdrawal_fee: Coins::new(),
        }
    }
}

/// Snapshot storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Number of committed snapshots kept, newest first.
    pub snapshot_retention: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_retention: 16,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines instead of pretty output.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_18_btc_staking::test_utils::test_params;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.epoch.epoch_interval, 10);
        assert_eq!(config.incentive.remainder_policy, RemainderPolicy::Accumulate);
        assert!(config.incentive.withdrawal_fee.is_zero());
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_missing_covenant_committee() {
        let config = NodeConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidParams(_))));
    }

    #[test]
    fn test_validate_accepts_configured_committee() {
        let mut config = NodeConfig::default();
        config.staking.genesis_params = test_params(3, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_epoch_interval() {
        let mut config = NodeConfig::default();
        config.staking.genesis_params = test_params(3, 2);
        config.epoch.epoch_interval = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroEpochInterval));
    }

    #[test]
    fn test_overrides_applied() {
        let pks = test_params(2, 1)
            .covenant_pks
            .iter()
            .map(|pk| pk.to_hex())
            .collect::<Vec<_>>()
            .join(",");
        let config = NodeConfig::default()
            .with_overrides(lookup(&[
                ("QC_COVENANT_PKS", pks.as_str()),
                ("QC_COVENANT_QUORUM", "2"),
                ("QC_EPOCH_INTERVAL", "5"),
                ("QC_REMAINDER_POLICY", "drop"),
                ("QC_WITHDRAWAL_FEE", "10ubbn"),
                ("QC_JSON_LOGS", "true"),
            ]))
            .unwrap();

        assert_eq!(config.staking.genesis_params.covenant_pks.len(), 2);
        assert_eq!(config.staking.genesis_params.covenant_quorum, 2);
        assert_eq!(config.epoch.epoch_interval, 5);
        assert_eq!(config.incentive.remainder_policy, RemainderPolicy::Drop);
        assert_eq!(config.incentive.withdrawal_fee.amount_of("ubbn"), 10);
        assert!(config.telemetry.json_logs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = NodeConfig::default()
            .with_overrides(lookup(&[("QC_EPOCH_INTERVAL", "ten")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "QC_EPOCH_INTERVAL",
                value: "ten".to_string()
            }
        );
    }
}
