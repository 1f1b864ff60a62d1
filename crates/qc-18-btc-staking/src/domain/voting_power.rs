//! # Voting Power Aggregation
//!
//! A voting power table is a pure fold over active delegations:
//!
//! - each delegation adds its full value to **every** referenced provider
//!   that currently has voting power (multi-staking)
//! - each delegation adds its value **once** to its staker address
//!
//! All maps are ordered, so the same set of delegations always folds into
//! the same table regardless of the order they were activated in.

use crate::domain::delegation::BtcDelegation;
use crate::domain::finality_provider::FinalityProvider;
use serde::{Deserialize, Serialize};
use shared_types::{
    Address, BlockHeight, BtcPublicKey, FinalityProviderDistribution, Hash,
    VotingPowerDistribution,
};
use std::collections::{BTreeMap, BTreeSet};

/// Voting power at a height.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPowerTable {
    pub height: BlockHeight,
    pub finality_providers: BTreeMap<BtcPublicKey, FinalityProviderDistribution>,
    /// Stake per staker address, counted once per delegation.
    pub delegators: BTreeMap<Address, u64>,
    /// Delegations that contributed to this table.
    pub delegations: BTreeSet<Hash>,
}

impl VotingPowerTable {
    /// Fold `delegations` into a table. Non-active delegations and providers
    /// without voting power are skipped.
    pub fn compute<'a, I>(
        height: BlockHeight,
        delegations: I,
        finality_providers: &BTreeMap<BtcPublicKey, FinalityProvider>,
    ) -> Self
    where
        I: IntoIterator<Item = &'a BtcDelegation>,
    {
        let mut table = Self {
            height,
            ..Default::default()
        };

        for delegation in delegations.into_iter().filter(|d| d.is_active()) {
            let mut contributed = false;
            for fp_pk in &delegation.fp_btc_pks {
                let Some(fp) = finality_providers.get(fp_pk) else {
                    continue;
                };
                if !fp.has_voting_power() {
                    continue;
                }
                table
                    .finality_providers
                    .entry(*fp_pk)
                    .or_insert_with(|| {
                        FinalityProviderDistribution::new(*fp_pk, fp.address, fp.commission_bps)
                    })
                    .add_stake(delegation.staker_address, delegation.staking_value_sat);
                contributed = true;
            }

            if contributed {
                let power = table.delegators.entry(delegation.staker_address).or_insert(0);
                *power = power.saturating_add(delegation.staking_value_sat);
                table.delegations.insert(delegation.staking_tx_hash);
            }
        }
        table
    }

    pub fn total_power(&self) -> u128 {
        self.finality_providers
            .values()
            .map(|fp| fp.total_sat as u128)
            .sum()
    }

    pub fn finality_provider_power(&self, btc_pk: &BtcPublicKey) -> u64 {
        self.finality_providers
            .get(btc_pk)
            .map_or(0, |fp| fp.total_sat)
    }

    pub fn delegator_power(&self, address: &Address) -> u64 {
        self.delegators.get(address).copied().unwrap_or(0)
    }

    /// Snapshot handed to reward distribution.
    pub fn to_distribution(&self) -> VotingPowerDistribution {
        VotingPowerDistribution::new(
            self.height,
            self.finality_providers
                .values()
                .filter(|fp| fp.total_sat > 0)
                .cloned()
                .collect(),
        )
    }
}
