//! # Voting Power Distribution
//!
//! The snapshot of effective BTC voting power handed from the staking
//! subsystem to the incentive subsystem for one reward-bearing block.
//!
//! Per finality provider it carries the operator address and commission plus
//! the stake each delegator address has delegated to *that* provider, which
//! is exactly what the two-stage reward split needs.

use crate::entities::{Address, BlockHeight, BtcPublicKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Effective voting power of one finality provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalityProviderDistribution {
    pub btc_pk: BtcPublicKey,
    /// Account credited with the provider's commission.
    pub address: Address,
    /// Commission in basis points (10_000 = 100%).
    pub commission_bps: u16,
    /// Sum of delegated satoshis; equals the sum of `delegators` values.
    pub total_sat: u64,
    /// Stake per delegator address, delegated to this provider only.
    pub delegators: BTreeMap<Address, u64>,
}

impl FinalityProviderDistribution {
    pub fn new(btc_pk: BtcPublicKey, address: Address, commission_bps: u16) -> Self {
        Self {
            btc_pk,
            address,
            commission_bps,
            total_sat: 0,
            delegators: BTreeMap::new(),
        }
    }

    /// Add delegated stake from `delegator`.
    pub fn add_stake(&mut self, delegator: Address, sat: u64) {
        self.total_sat = self.total_sat.saturating_add(sat);
        let entry = self.delegators.entry(delegator).or_insert(0);
        *entry = entry.saturating_add(sat);
    }
}

/// Effective voting power of all finality providers at a height.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPowerDistribution {
    pub height: BlockHeight,
    /// Providers with nonzero power, ordered by BTC public key.
    pub finality_providers: Vec<FinalityProviderDistribution>,
}

impl VotingPowerDistribution {
    pub fn new(height: BlockHeight, finality_providers: Vec<FinalityProviderDistribution>) -> Self {
        Self {
            height,
            finality_providers,
        }
    }

    /// Total effective voting power.
    pub fn total_power(&self) -> u128 {
        self.finality_providers
            .iter()
            .map(|fp| fp.total_sat as u128)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_power() == 0
    }

    pub fn get(&self, btc_pk: &BtcPublicKey) -> Option<&FinalityProviderDistribution> {
        self.finality_providers.iter().find(|fp| &fp.btc_pk == btc_pk)
    }
}
