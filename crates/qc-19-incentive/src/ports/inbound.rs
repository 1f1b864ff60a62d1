//! Driving Ports (API - Inbound)

use crate::domain::{DistributionOutcome, RewardGauge};
use crate::error::IncentiveResult;
use crate::ports::outbound::BankGateway;
use shared_types::{Address, BlockHeight, Coins, StakeholderType, VotingPowerDistribution};
use std::collections::BTreeMap;

/// Primary incentive API.
pub trait IncentiveApi {
    /// Split `pool` over `distribution` and credit the resulting gauges.
    /// Nothing is credited if any credit would overflow.
    fn distribute_rewards(
        &mut self,
        height: BlockHeight,
        pool: &Coins,
        distribution: &VotingPowerDistribution,
    ) -> IncentiveResult<DistributionOutcome>;

    /// Pay out everything withdrawable from one gauge. Returns the amount
    /// sent, which is empty when there was nothing left to withdraw.
    fn withdraw_reward(
        &mut self,
        bank: &mut dyn BankGateway,
        stakeholder_type: StakeholderType,
        address: &Address,
    ) -> IncentiveResult<Coins>;

    // Queries

    fn reward_gauge(
        &self,
        stakeholder_type: StakeholderType,
        address: &Address,
    ) -> Option<&RewardGauge>;

    /// Every gauge held by `address`, by stakeholder type.
    fn reward_gauges(&self, address: &Address) -> BTreeMap<StakeholderType, RewardGauge>;

    /// Truncation leftovers kept by the module.
    fn undistributed(&self) -> &Coins;
}
