//! Versioned staking parameters
//!
//! Parameters are never mutated in place. Each update appends a new version
//! that takes effect from its activation height; a delegation records the
//! version it was created under and is always validated against it.

use crate::error::{StakingError, StakingResult};
use serde::{Deserialize, Serialize};
use shared_crypto::SchnorrPublicKey;
use shared_types::{BlockHeight, BtcPublicKey};
use std::collections::BTreeSet;

/// Maximum commission in basis points (100%).
pub const MAX_COMMISSION_BPS: u16 = 10_000;

/// Parameter set governing delegation creation and covenant quorum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Covenant committee keys (order as configured).
    pub covenant_pks: Vec<BtcPublicKey>,
    /// Distinct covenant signatures required per spend path.
    pub covenant_quorum: u32,
    /// Minimum staking output value.
    pub min_staking_value_sat: u64,
    /// Maximum staking output value.
    pub max_staking_value_sat: u64,
    /// Minimum staking timelock in BTC blocks.
    pub min_staking_time_blocks: u16,
    /// Maximum staking timelock in BTC blocks.
    pub max_staking_time_blocks: u16,
    /// Minimum unbonding timelock in BTC blocks.
    pub min_unbonding_time_blocks: u16,
    /// Minimum finality provider commission.
    pub min_commission_bps: u16,
    /// BTC blocks before `end_height` at which an active delegation expires.
    pub finalization_timeout_blocks: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            covenant_pks: Vec::new(),
            covenant_quorum: 1,
            min_staking_value_sat: 1,
            max_staking_value_sat: 10_000_000_000,
            min_staking_time_blocks: 1,
            max_staking_time_blocks: u16::MAX,
            min_unbonding_time_blocks: 1,
            min_commission_bps: 0,
            finalization_timeout_blocks: 10,
        }
    }
}

impl Params {
    /// Validate the parameter set.
    pub fn validate(&self) -> StakingResult<()> {
        if self.covenant_pks.is_empty() {
            return Err(invalid("covenant committee is empty"));
        }
        if self.covenant_quorum == 0 || self.covenant_quorum as usize > self.covenant_pks.len() {
            return Err(invalid(format!(
                "covenant quorum {} out of range 1..={}",
                self.covenant_quorum,
                self.covenant_pks.len()
            )));
        }
        let unique: BTreeSet<_> = self.covenant_pks.iter().collect();
        if unique.len() != self.covenant_pks.len() {
            return Err(invalid("duplicate covenant key"));
        }
        for pk in &self.covenant_pks {
            SchnorrPublicKey::from_bytes(pk.0)
                .map_err(|_| invalid(format!("covenant key {} is not a valid x-only key", pk)))?;
        }
        if self.min_staking_value_sat == 0 || self.min_staking_value_sat > self.max_staking_value_sat
        {
            return Err(invalid("staking value range is empty"));
        }
        if self.min_staking_time_blocks == 0
            || self.min_staking_time_blocks > self.max_staking_time_blocks
        {
            return Err(invalid("staking time range is empty"));
        }
        if self.min_unbonding_time_blocks == 0 {
            return Err(invalid("unbonding time must be positive"));
        }
        if self.min_commission_bps > MAX_COMMISSION_BPS {
            return Err(invalid("min commission above 100%"));
        }
        Ok(())
    }

    /// Whether `pk` is a covenant committee member.
    pub fn is_covenant_member(&self, pk: &BtcPublicKey) -> bool {
        self.covenant_pks.contains(pk)
    }

    /// Check a commission rate against the allowed range.
    pub fn check_commission(&self, commission_bps: u16) -> StakingResult<()> {
        if commission_bps < self.min_commission_bps || commission_bps > MAX_COMMISSION_BPS {
            return Err(StakingError::InvalidCommission {
                commission_bps,
                min_bps: self.min_commission_bps,
            });
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> StakingError {
    StakingError::InvalidParams {
        reason: reason.into(),
    }
}

/// A parameter set together with its version and activation height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedParams {
    pub version: u32,
    pub activation_height: BlockHeight,
    pub params: Params,
}

/// Append-only registry of parameter versions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamsRegistry {
    versions: Vec<VersionedParams>,
}

impl ParamsRegistry {
    /// Create a registry whose version 0 is active from genesis.
    pub fn new(genesis: Params) -> StakingResult<Self> {
        genesis.validate()?;
        Ok(Self {
            versions: vec![VersionedParams {
                version: 0,
                activation_height: 0,
                params: genesis,
            }],
        })
    }

    /// Append a new version taking effect at `activation_height`.
    pub fn update(&mut self, activation_height: BlockHeight, params: Params) -> StakingResult<u32> {
        params.validate()?;
        let latest = self.latest();
        if activation_height <= latest.activation_height {
            return Err(invalid(format!(
                "activation height {} not after {}",
                activation_height, latest.activation_height
            )));
        }
        let version = latest.version + 1;
        self.versions.push(VersionedParams {
            version,
            activation_height,
            params,
        });
        Ok(version)
    }

    /// Parameters in force at `height`.
    pub fn at_height(&self, height: BlockHeight) -> &VersionedParams {
        self.versions
            .iter()
            .rev()
            .find(|v| v.activation_height <= height)
            .unwrap_or(&self.versions[0])
    }

    /// Parameters by version number.
    pub fn get(&self, version: u32) -> Option<&Params> {
        self.versions.get(version as usize).map(|v| &v.params)
    }

    pub fn latest(&self) -> &VersionedParams {
        // never empty: constructed with genesis
        &self.versions[self.versions.len() - 1]
    }

    pub fn versions(&self) -> &[VersionedParams] {
        &self.versions
    }
}
