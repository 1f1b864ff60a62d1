//! # Reward Distribution Walkthrough
//!
//! Two finality providers with 10% commission:
//!
//! | Delegation | Provider | Delegator | Units |
//! |------------|----------|-----------|-------|
//! | 1 | fp1 | del1 | 2 |
//! | 2 | fp1 | del2 | 4 |
//! | 3 | fp2 | del1 | 2 |
//! | 4 (later) | fp2 | del2 | 6 |
//!
//! Before delegation 4: fp1 earns 3x fp2, del1 and del2 earn the same.
//! After: fp1:fp2 = 6:8 and del1:del2 = 4:10.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{fp_address, fp_pk, pool, Harness, DENOM, POOL_PER_BLOCK};
    use qc_18_btc_staking::DelegationStatus;
    use qc_19_incentive::BankGateway;
    use shared_types::{Address, StakeholderType};

    const UNIT_SAT: u64 = 100_000;
    const COMMISSION_BPS: u16 = 1_000;
    const FP1: u8 = 1;
    const FP2: u8 = 2;
    const DEL1: Address = Address([0xD1; 20]);
    const DEL2: Address = Address([0xD2; 20]);
    const DEL1_SEED: u8 = 0x61;
    const DEL2_SEED: u8 = 0x62;
    const WINDOW: u64 = 3;

    #[derive(Debug, Clone, Copy)]
    struct Rewards {
        fp1: u128,
        fp2: u128,
        del1: u128,
        del2: u128,
    }

    fn credited(h: &Harness) -> Rewards {
        Rewards {
            fp1: h.credited(StakeholderType::FinalityProvider, &fp_address(FP1)),
            fp2: h.credited(StakeholderType::FinalityProvider, &fp_address(FP2)),
            del1: h.credited(StakeholderType::BtcDelegation, &DEL1),
            del2: h.credited(StakeholderType::BtcDelegation, &DEL2),
        }
    }

    /// Rewards earned over the next `blocks` blocks.
    fn earned_over(h: &mut Harness, blocks: u64) -> Rewards {
        let before = credited(h);
        h.advance(blocks);
        let after = credited(h);
        Rewards {
            fp1: after.fp1 - before.fp1,
            fp2: after.fp2 - before.fp2,
            del1: after.del1 - before.del1,
            del2: after.del2 - before.del2,
        }
    }

    fn assert_ratio(numerator: u128, denominator: u128, expected: f64) {
        let ratio = numerator as f64 / denominator as f64;
        let deviation = (ratio - expected).abs() / expected;
        assert!(
            deviation < 0.001,
            "ratio {numerator}/{denominator} = {ratio}, expected {expected}"
        );
    }

    fn register_providers(h: &mut Harness) {
        h.block(|chain| {
            for seed in [FP1, FP2] {
                chain
                    .register_finality_provider(fp_pk(seed), fp_address(seed), COMMISSION_BPS)
                    .unwrap();
            }
        });
    }

    /// Providers registered and delegations 1-3 earning rewards.
    fn initial_stake() -> Harness {
        let mut h = Harness::new(3, 2);
        register_providers(&mut h);
        h.stake(DEL1, DEL1_SEED, &[FP1], 2 * UNIT_SAT);
        h.stake(DEL2, DEL2_SEED, &[FP1], 4 * UNIT_SAT);
        h.stake(DEL1, DEL1_SEED, &[FP2], 2 * UNIT_SAT);
        h.advance_until_effective();
        h
    }

    #[test]
    fn test_initial_split_matches_stake() {
        let mut h = initial_stake();
        let earned = earned_over(&mut h, WINDOW);

        assert!(earned.fp2 > 0);
        assert_eq!(earned.fp1, 3 * earned.fp2);
        assert_eq!(earned.del1, earned.del2);
    }

    #[test]
    fn test_new_delegation_shifts_ratios() {
        let mut h = initial_stake();
        h.stake(DEL2, DEL2_SEED, &[FP2], 6 * UNIT_SAT);
        h.advance_until_effective();
        let earned = earned_over(&mut h, WINDOW);

        assert_ratio(earned.fp1, earned.fp2, 0.75);
        assert_ratio(earned.del1, earned.del2, 0.40);
    }

    #[test]
    fn test_new_delegation_earns_nothing_until_epoch_finalized() {
        let mut h = initial_stake();
        h.stake(DEL2, DEL2_SEED, &[FP2], 6 * UNIT_SAT);
        // the block finalizing its epoch still pays the old split
        let earned = earned_over(&mut h, 1);
        assert_eq!(earned.del1, earned.del2);
    }

    #[test]
    fn test_rewards_are_conserved() {
        let mut h = initial_stake();
        h.advance(WINDOW);

        let snapshot = h.chain.snapshot();
        let activation = snapshot.epochs.activation_height().unwrap();
        let blocks = (snapshot.height + 1 - activation) as u128;

        let gauges: u128 = [FP1, FP2]
            .iter()
            .map(|seed| h.credited(StakeholderType::FinalityProvider, &fp_address(*seed)))
            .chain(
                [DEL1, DEL2]
                    .iter()
                    .map(|addr| h.credited(StakeholderType::BtcDelegation, addr)),
            )
            .sum();
        let undistributed = snapshot.undistributed().amount_of(DENOM);

        assert_eq!(gauges + undistributed, blocks * POOL_PER_BLOCK);
        assert_eq!(
            h.chain.bank().module_balance().amount_of(DENOM),
            blocks * POOL_PER_BLOCK
        );
    }

    #[test]
    fn test_withdraw_drains_gauge_once() {
        let mut h = initial_stake();
        h.advance(WINDOW);

        let (first, second) = h.block(|chain| {
            let first = chain
                .withdraw_reward(StakeholderType::BtcDelegation, &DEL1)
                .unwrap();
            let second = chain
                .withdraw_reward(StakeholderType::BtcDelegation, &DEL1)
                .unwrap();
            (first, second)
        });

        assert_eq!(first.amount_of(DENOM), h.credited(StakeholderType::BtcDelegation, &DEL1));
        assert!(second.is_zero());
        assert_eq!(h.chain.bank().balance(&DEL1), first);

        let snapshot = h.chain.snapshot();
        let gauge = snapshot
            .reward_gauge(StakeholderType::BtcDelegation, &DEL1)
            .unwrap();
        assert!(gauge.withdrawable().is_zero());

        // credits keep flowing after a withdrawal
        h.advance(1);
        let snapshot = h.chain.snapshot();
        let gauge = snapshot
            .reward_gauge(StakeholderType::BtcDelegation, &DEL1)
            .unwrap();
        assert!(!gauge.withdrawable().is_zero());
    }

    #[test]
    fn test_slashed_provider_stops_earning_but_keeps_balance() {
        let mut h = initial_stake();
        h.advance(1);

        let slashed = h.block(|chain| chain.slash_finality_provider(fp_pk(FP2)).unwrap());
        assert_eq!(slashed.len(), 1);
        let snapshot = h.chain.snapshot();
        assert_eq!(
            snapshot.delegations_by_finality_providers(&[fp_pk(FP2)])[0].status,
            DelegationStatus::Slashed
        );

        let earned = earned_over(&mut h, WINDOW);
        assert_eq!(earned.fp2, 0);
        assert!(earned.fp1 > 0);
        // del1 keeps earning through fp1 only: 2 of fp1's 6 units
        assert_eq!(earned.del2, 2 * earned.del1);

        let paid = h.block(|chain| {
            chain
                .withdraw_reward(StakeholderType::FinalityProvider, &fp_address(FP2))
                .unwrap()
        });
        assert!(!paid.is_zero());
    }

    #[test]
    fn test_no_rewards_without_finalized_epoch() {
        let mut h = Harness::new(3, 2);
        register_providers(&mut h);
        h.stake(DEL1, DEL1_SEED, &[FP1], 2 * UNIT_SAT);

        // epoch 1 (heights 1-2) is finalized while processing block 3
        assert_eq!(h.height(), 2);
        assert_eq!(credited(&h).del1, 0);
        h.advance(1);
        assert_eq!(credited(&h).del1, 0);
        h.advance(1);
        assert_eq!(credited(&h).del1, pool().amount_of(DENOM) * 9 / 10);
    }

    #[test]
    fn test_activation_order_does_not_change_voting_power() {
        let stakes = [
            (DEL1, DEL1_SEED, FP1, 2 * UNIT_SAT),
            (DEL2, DEL2_SEED, FP1, 4 * UNIT_SAT),
            (DEL1, DEL1_SEED, FP2, 2 * UNIT_SAT),
        ];
        let run = |order: [usize; 3]| {
            let mut h = Harness::new(3, 2);
            register_providers(&mut h);
            for i in order {
                let (staker, seed, fp, value) = stakes[i];
                h.stake(staker, seed, &[fp], value);
            }
            let snapshot = h.chain.snapshot();
            let table = snapshot.voting_power_at(snapshot.height).unwrap().clone();
            (table.finality_providers, table.delegators)
        };

        assert_eq!(run([0, 1, 2]), run([2, 1, 0]));
    }
}
