//! Committed chain state.

use crate::container::NodeConfig;
use crate::error::RuntimeResult;
use crate::wiring::epoch::EpochState;
use qc_18_btc_staking::{
    BtcStakingApi, BtcStakingService, DelegationInfo, Params, VotingPowerTable,
};
use qc_19_incentive::{IncentiveApi, IncentiveService, RewardGauge};
use serde::{Deserialize, Serialize};
use shared_types::{
    Address, BlockHeight, BtcPublicKey, Coins, StakeholderType, VotingPowerDistribution,
};
use std::collections::BTreeMap;

/// Everything committed at a block height.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainState {
    pub height: BlockHeight,
    pub staking: BtcStakingService,
    pub incentive: IncentiveService,
    pub epochs: EpochState,
}

impl ChainState {
    /// State at height 0.
    pub fn genesis(config: &NodeConfig) -> RuntimeResult<Self> {
        Ok(Self {
            height: 0,
            staking: BtcStakingService::new(config.staking.genesis_params.clone())?,
            incentive: IncentiveService::new(config.incentive.remainder_policy),
            epochs: EpochState::default(),
        })
    }

    /// Voting power rewards are paid against: the last finalized epoch's
    /// delegations that are still active. `None` below the activation height.
    pub fn effective_distribution(&self) -> Option<VotingPowerDistribution> {
        let activation = self.epochs.activation_height()?;
        if self.height < activation {
            return None;
        }
        let table = self
            .staking
            .voting_power_of(self.height, self.epochs.effective_delegations());
        Some(table.to_distribution())
    }

    pub fn delegations_by_finality_providers(
        &self,
        fp_btc_pks: &[BtcPublicKey],
    ) -> Vec<DelegationInfo> {
        self.staking.delegations_by_finality_providers(fp_btc_pks)
    }

    pub fn voting_power_at(&self, height: BlockHeight) -> Option<&VotingPowerTable> {
        self.staking.voting_power_at(height)
    }

    pub fn params(&self, version: u32) -> Option<&Params> {
        self.staking.params(version)
    }

    pub fn reward_gauge(
        &self,
        stakeholder_type: StakeholderType,
        address: &Address,
    ) -> Option<&RewardGauge> {
        self.incentive.reward_gauge(stakeholder_type, address)
    }

    pub fn reward_gauges(&self, address: &Address) -> BTreeMap<StakeholderType, RewardGauge> {
        self.incentive.reward_gauges(address)
    }

    pub fn undistributed(&self) -> &Coins {
        self.incentive.undistributed()
    }
}
