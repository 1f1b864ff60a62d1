//! Incentive Service - reward gauges and withdrawals
//!
//! Plain data (`Clone + Serialize`) like the staking service, so the node
//! runtime snapshots both together.

use crate::domain::{distribute, DistributionOutcome, GaugeKey, RemainderPolicy, RewardGauge};
use crate::error::{IncentiveError, IncentiveResult};
use crate::events::IncentiveEvent;
use crate::metrics;
use crate::ports::inbound::IncentiveApi;
use crate::ports::outbound::BankGateway;
use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeight, Coins, StakeholderType, VotingPowerDistribution};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Incentive state and operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncentiveService {
    remainder_policy: RemainderPolicy,
    gauges: BTreeMap<GaugeKey, RewardGauge>,
    /// Truncation leftovers under `RemainderPolicy::Accumulate`.
    undistributed: Coins,
    #[serde(skip)]
    events: Vec<IncentiveEvent>,
}

impl Default for IncentiveService {
    fn default() -> Self {
        Self::new(RemainderPolicy::default())
    }
}

impl IncentiveService {
    pub fn new(remainder_policy: RemainderPolicy) -> Self {
        Self {
            remainder_policy,
            gauges: BTreeMap::new(),
            undistributed: Coins::new(),
            events: Vec::new(),
        }
    }

    pub fn remainder_policy(&self) -> RemainderPolicy {
        self.remainder_policy
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<IncentiveEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn gauge_count(&self) -> usize {
        self.gauges.len()
    }

    fn distribute_inner(
        &mut self,
        height: BlockHeight,
        pool: &Coins,
        distribution: &VotingPowerDistribution,
    ) -> IncentiveResult<DistributionOutcome> {
        let outcome = distribute(pool, distribution)?;

        // Stage every credited gauge first so an overflow leaves all of them untouched.
        let mut staged = Vec::with_capacity(outcome.credits.len());
        for (key, amount) in &outcome.credits {
            let current = self.gauges.get(key).cloned().unwrap_or_default();
            staged.push((*key, current.credited(amount)?));
        }
        let undistributed = match self.remainder_policy {
            RemainderPolicy::Accumulate => self.undistributed.checked_add(&outcome.remainder)?,
            RemainderPolicy::Drop => self.undistributed.clone(),
        };

        self.gauges.extend(staged);
        self.undistributed = undistributed;

        debug!(
            height,
            pool = %pool,
            distributed = %outcome.distributed,
            remainder = %outcome.remainder,
            recipients = outcome.recipients(),
            "Distributed block rewards"
        );
        metrics::record_distribution(outcome.recipients());
        for (denom, amount) in self.undistributed.iter() {
            metrics::set_undistributed(denom, amount);
        }
        self.events.push(IncentiveEvent::RewardsDistributed {
            height,
            pool: pool.clone(),
            distributed: outcome.distributed.clone(),
            remainder: outcome.remainder.clone(),
            recipients: outcome.recipients(),
        });
        Ok(outcome)
    }

    fn withdraw_inner(
        &mut self,
        bank: &mut dyn BankGateway,
        stakeholder_type: StakeholderType,
        address: &Address,
    ) -> IncentiveResult<Coins> {
        let gauge = self.gauges.get_mut(&(stakeholder_type, *address)).ok_or(
            IncentiveError::InsufficientGaugeBalance {
                stakeholder_type,
                address: *address,
            },
        )?;

        let withdrawable = gauge.withdrawable();
        if withdrawable.is_zero() {
            debug!(%stakeholder_type, %address, "Nothing to withdraw");
            return Ok(withdrawable);
        }

        bank.send_from_module(address, &withdrawable)?;
        gauge.mark_withdrawn();

        info!(%stakeholder_type, %address, amount = %withdrawable, "Withdrew rewards");
        metrics::record_withdrawal(stakeholder_type.as_str());
        self.events.push(IncentiveEvent::RewardWithdrawn {
            stakeholder_type,
            address: *address,
            amount: withdrawable.clone(),
        });
        Ok(withdrawable)
    }
}

fn log_rejection(operation: &'static str) -> impl Fn(&IncentiveError) {
    move |err| warn!(operation, reason = err.kind(), error = %err, "Rejected incentive request")
}

impl IncentiveApi for IncentiveService {
    fn distribute_rewards(
        &mut self,
        height: BlockHeight,
        pool: &Coins,
        distribution: &VotingPowerDistribution,
    ) -> IncentiveResult<DistributionOutcome> {
        self.distribute_inner(height, pool, distribution)
            .inspect_err(log_rejection("distribute_rewards"))
    }

    fn withdraw_reward(
        &mut self,
        bank: &mut dyn BankGateway,
        stakeholder_type: StakeholderType,
        address: &Address,
    ) -> IncentiveResult<Coins> {
        self.withdraw_inner(bank, stakeholder_type, address)
            .inspect_err(log_rejection("withdraw_reward"))
    }

    fn reward_gauge(
        &self,
        stakeholder_type: StakeholderType,
        address: &Address,
    ) -> Option<&RewardGauge> {
        self.gauges.get(&(stakeholder_type, *address))
    }

    fn reward_gauges(&self, address: &Address) -> BTreeMap<StakeholderType, RewardGauge> {
        self.gauges
            .iter()
            .filter(|((_, owner), _)| owner == address)
            .map(|((stakeholder_type, _), gauge)| (*stakeholder_type, gauge.clone()))
            .collect()
    }

    fn undistributed(&self) -> &Coins {
        &self.undistributed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::BankError;
    use shared_types::{BtcPublicKey, FinalityProviderDistribution};

    /// Bank double that tracks balances and can be told to fail.
    #[derive(Default)]
    struct MockBank {
        module: Coins,
        balances: BTreeMap<Address, Coins>,
        fail_transfers: bool,
    }

    impl BankGateway for MockBank {
        fn fund_module(&mut self, amount: &Coins) -> Result<(), BankError> {
            self.module = self.module.checked_add(amount)?;
            Ok(())
        }

        fn send_from_module(
            &mut self,
            recipient: &Address,
            amount: &Coins,
        ) -> Result<(), BankError> {
            if self.fail_transfers {
                return Err(BankError::InsufficientFunds {
                    account: Address::default(),
                    needed: amount.clone(),
                    available: Coins::new(),
                });
            }
            self.module = self
                .module
                .checked_sub(amount)
                .ok_or_else(|| BankError::InsufficientFunds {
                    account: Address::default(),
                    needed: amount.clone(),
                    available: self.module.clone(),
                })?;
            let balance = self.balances.entry(*recipient).or_default();
            *balance = balance.checked_add(amount)?;
            Ok(())
        }

        fn balance(&self, account: &Address) -> Coins {
            self.balances.get(account).cloned().unwrap_or_default()
        }

        fn module_balance(&self) -> Coins {
            self.module.clone()
        }
    }

    fn coins(s: &str) -> Coins {
        s.parse().unwrap()
    }

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    /// fp 1 (10% commission) with delegators 10 and 11 staking 100 each.
    fn distribution() -> VotingPowerDistribution {
        let mut fp = FinalityProviderDistribution::new(BtcPublicKey([1u8; 32]), addr(1), 1_000);
        fp.add_stake(addr(10), 100);
        fp.add_stake(addr(11), 100);
        VotingPowerDistribution::new(5, vec![fp])
    }

    fn funded(pool: &Coins) -> (IncentiveService, MockBank) {
        let mut service = IncentiveService::default();
        let mut bank = MockBank::default();
        bank.fund_module(pool).unwrap();
        service.distribute_rewards(5, pool, &distribution()).unwrap();
        (service, bank)
    }

    #[test]
    fn test_distribute_credits_gauges() {
        let (service, _) = funded(&coins("1000ubbn"));

        let fp_gauge = service
            .reward_gauge(StakeholderType::FinalityProvider, &addr(1))
            .unwrap();
        assert_eq!(fp_gauge.coins, coins("100ubbn"));

        let del_gauge = service
            .reward_gauge(StakeholderType::BtcDelegation, &addr(10))
            .unwrap();
        assert_eq!(del_gauge.coins, coins("450ubbn"));
        assert!(del_gauge.withdrawn_coins.is_zero());
    }

    #[test]
    fn test_gauges_accumulate_across_blocks() {
        let (mut service, _) = funded(&coins("1000ubbn"));
        service
            .distribute_rewards(6, &coins("1000ubbn"), &distribution())
            .unwrap();
        let gauge = service
            .reward_gauge(StakeholderType::BtcDelegation, &addr(11))
            .unwrap();
        assert_eq!(gauge.coins, coins("900ubbn"));
    }

    #[test]
    fn test_remainder_accumulates_by_default() {
        let (service, _) = funded(&coins("1001ubbn"));
        // 1001 -> commission 100, portion 901 -> 450 + 450, 1 left over
        assert_eq!(service.undistributed(), &coins("1ubbn"));
    }

    #[test]
    fn test_remainder_dropped_when_configured() {
        let mut service = IncentiveService::new(RemainderPolicy::Drop);
        service
            .distribute_rewards(5, &coins("1001ubbn"), &distribution())
            .unwrap();
        assert!(service.undistributed().is_zero());
    }

    #[test]
    fn test_empty_distribution_keeps_whole_pool() {
        let mut service = IncentiveService::default();
        let outcome = service
            .distribute_rewards(5, &coins("1000ubbn"), &VotingPowerDistribution::default())
            .unwrap();
        assert!(outcome.credits.is_empty());
        assert_eq!(service.gauge_count(), 0);
        assert_eq!(service.undistributed(), &coins("1000ubbn"));
    }

    #[test]
    fn test_withdraw_transfers_and_marks_withdrawn() {
        let (mut service, mut bank) = funded(&coins("1000ubbn"));

        let sent = service
            .withdraw_reward(&mut bank, StakeholderType::BtcDelegation, &addr(10))
            .unwrap();
        assert_eq!(sent, coins("450ubbn"));
        assert_eq!(bank.balance(&addr(10)), coins("450ubbn"));

        let gauge = service
            .reward_gauge(StakeholderType::BtcDelegation, &addr(10))
            .unwrap();
        assert_eq!(gauge.withdrawn_coins, gauge.coins);
    }

    #[test]
    fn test_withdraw_twice_is_idempotent() {
        let (mut service, mut bank) = funded(&coins("1000ubbn"));
        service
            .withdraw_reward(&mut bank, StakeholderType::FinalityProvider, &addr(1))
            .unwrap();
        let second = service
            .withdraw_reward(&mut bank, StakeholderType::FinalityProvider, &addr(1))
            .unwrap();

        assert!(second.is_zero());
        assert_eq!(bank.balance(&addr(1)), coins("100ubbn"));
        assert_eq!(service.drain_events().len(), 2);
    }

    #[test]
    fn test_withdraw_without_gauge_rejected() {
        let mut service = IncentiveService::default();
        let mut bank = MockBank::default();
        let err = service
            .withdraw_reward(&mut bank, StakeholderType::BtcDelegation, &addr(99))
            .unwrap_err();
        assert!(matches!(err, IncentiveError::InsufficientGaugeBalance { .. }));
    }

    #[test]
    fn test_gauge_type_is_part_of_key() {
        let (mut service, mut bank) = funded(&coins("1000ubbn"));
        // addr(1) earned commission but no delegation rewards
        let err = service
            .withdraw_reward(&mut bank, StakeholderType::BtcDelegation, &addr(1))
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_gauge_balance");
    }

    #[test]
    fn test_failed_transfer_leaves_gauge_untouched() {
        let (mut service, mut bank) = funded(&coins("1000ubbn"));
        bank.fail_transfers = true;

        let err = service
            .withdraw_reward(&mut bank, StakeholderType::BtcDelegation, &addr(10))
            .unwrap_err();
        assert!(matches!(err, IncentiveError::Bank(_)));

        let gauge = service
            .reward_gauge(StakeholderType::BtcDelegation, &addr(10))
            .unwrap();
        assert_eq!(gauge.withdrawable(), coins("450ubbn"));
    }

    #[test]
    fn test_overflowing_credit_is_all_or_nothing() {
        let provider = |seed: u8, delegator: u8| {
            let mut fp =
                FinalityProviderDistribution::new(BtcPublicKey([seed; 32]), addr(seed), 0);
            fp.add_stake(addr(delegator), 100);
            fp
        };
        let huge = Coins::from_pairs([("ubbn", u128::MAX)]).unwrap();

        let mut service = IncentiveService::default();
        let solo = VotingPowerDistribution::new(1, vec![provider(2, 20)]);
        service.distribute_rewards(1, &huge, &solo).unwrap();

        // addr 10 sorts before addr 20, so its credit is staged before the overflow
        let mixed = VotingPowerDistribution::new(2, vec![provider(1, 10), provider(2, 20)]);
        let err = service.distribute_rewards(2, &huge, &mixed).unwrap_err();
        assert!(matches!(err, IncentiveError::Overflow(_)));
        assert!(service.reward_gauges(&addr(10)).is_empty());
        assert_eq!(
            service
                .reward_gauge(StakeholderType::BtcDelegation, &addr(20))
                .unwrap()
                .coins,
            huge
        );
    }

    #[test]
    fn test_reward_gauges_lists_every_type() {
        let mut fp = FinalityProviderDistribution::new(BtcPublicKey([1u8; 32]), addr(1), 5_000);
        fp.add_stake(addr(1), 100);
        let dist = VotingPowerDistribution::new(5, vec![fp]);

        let mut service = IncentiveService::default();
        service.distribute_rewards(5, &coins("1000ubbn"), &dist).unwrap();

        let gauges = service.reward_gauges(&addr(1));
        assert_eq!(gauges.len(), 2);
        assert_eq!(gauges[&StakeholderType::FinalityProvider].coins, coins("500ubbn"));
        assert_eq!(gauges[&StakeholderType::BtcDelegation].coins, coins("500ubbn"));
    }

    #[test]
    fn test_service_roundtrips_through_bincode() {
        let (service, _) = funded(&coins("1001ubbn"));
        let bytes = bincode::serialize(&service).unwrap();
        let restored: IncentiveService = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.reward_gauges(&addr(10)), service.reward_gauges(&addr(10)));
        assert_eq!(restored.undistributed(), service.undistributed());
    }
}
