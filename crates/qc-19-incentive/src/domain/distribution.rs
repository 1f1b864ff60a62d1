//! Two-stage reward split
//!
//! Stage 1 splits the block's pool among finality providers by voting power.
//! Stage 2 takes each provider's commission and splits the rest among the
//! stake delegated to that provider. Every split truncates, so the sum of
//! credits never exceeds the pool; the leftover is reported as `remainder`.

use crate::domain::gauge::GaugeKey;
use serde::{Deserialize, Serialize};
use shared_types::{
    Address, BtcPublicKey, Coins, StakeholderType, TypeError, VotingPowerDistribution,
};
use std::collections::BTreeMap;

/// Basis-point denominator for commissions.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// What happens to truncation leftovers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemainderPolicy {
    /// Keep leftovers in the module's undistributed ledger.
    #[default]
    Accumulate,
    /// Discard leftovers.
    Drop,
}

/// How one provider's stage-1 share was paid out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderShare {
    /// Stage-1 share of the pool.
    pub share: Coins,
    pub commission: Coins,
    /// Sum of the delegator credits taken from `share`.
    pub delegated: Coins,
}

impl ProviderShare {
    /// `commission + delegated`.
    pub fn paid(&self) -> Result<Coins, TypeError> {
        self.commission.checked_add(&self.delegated)
    }
}

/// Result of splitting one pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistributionOutcome {
    /// Credits per gauge, summed by address.
    pub credits: BTreeMap<GaugeKey, Coins>,
    /// Per-provider breakdown of stage 2.
    pub provider_shares: BTreeMap<BtcPublicKey, ProviderShare>,
    /// Sum of all credits.
    pub distributed: Coins,
    /// `pool - distributed`.
    pub remainder: Coins,
}

impl DistributionOutcome {
    fn undistributed(pool: &Coins) -> Self {
        Self {
            remainder: pool.clone(),
            ..Self::default()
        }
    }

    fn credit(&mut self, key: GaugeKey, amount: Coins) -> Result<(), TypeError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.distributed = self.distributed.checked_add(&amount)?;
        let entry = self.credits.entry(key).or_default();
        *entry = entry.checked_add(&amount)?;
        Ok(())
    }

    pub fn recipients(&self) -> usize {
        self.credits.len()
    }

    pub fn credit_for(&self, stakeholder_type: StakeholderType, address: &Address) -> Coins {
        self.credits
            .get(&(stakeholder_type, *address))
            .cloned()
            .unwrap_or_default()
    }
}

/// Split `pool` according to `distribution`.
///
/// An empty pool or a distribution with no power credits nothing and
/// returns the whole pool as remainder.
pub fn distribute(
    pool: &Coins,
    distribution: &VotingPowerDistribution,
) -> Result<DistributionOutcome, TypeError> {
    let total_power = distribution.total_power();
    if pool.is_zero() || total_power == 0 {
        return Ok(DistributionOutcome::undistributed(pool));
    }

    let mut outcome = DistributionOutcome::default();
    for fp in distribution
        .finality_providers
        .iter()
        .filter(|fp| fp.total_sat > 0)
    {
        let fp_power = fp.total_sat as u128;
        let fp_share = pool.mul_ratio_floor(fp_power, total_power);
        if fp_share.is_zero() {
            continue;
        }

        let bps = (fp.commission_bps as u128).min(BPS_DENOMINATOR);
        let commission = fp_share.mul_ratio_floor(bps, BPS_DENOMINATOR);
        // commission <= fp_share by construction
        let portion = fp_share.checked_sub(&commission).unwrap_or_default();
        outcome.credit((StakeholderType::FinalityProvider, fp.address), commission.clone())?;

        let mut delegated = Coins::new();
        for (delegator, stake) in &fp.delegators {
            let reward = portion.mul_ratio_floor(*stake as u128, fp_power);
            delegated = delegated.checked_add(&reward)?;
            outcome.credit((StakeholderType::BtcDelegation, *delegator), reward)?;
        }
        outcome.provider_shares.insert(
            fp.btc_pk,
            ProviderShare {
                share: fp_share,
                commission,
                delegated,
            },
        );
    }

    outcome.remainder = pool.checked_sub(&outcome.distributed).unwrap_or_default();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BtcPublicKey, FinalityProviderDistribution};

    fn coins(s: &str) -> Coins {
        s.parse().unwrap()
    }

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    fn fp(seed: u8, bps: u16, stakes: &[(u8, u64)]) -> FinalityProviderDistribution {
        let mut fp = FinalityProviderDistribution::new(BtcPublicKey([seed; 32]), addr(seed), bps);
        for (delegator, sat) in stakes {
            fp.add_stake(addr(*delegator), *sat);
        }
        fp
    }

    #[test]
    fn test_empty_distribution_returns_pool_as_remainder() {
        let pool = coins("1000ubbn");
        let outcome = distribute(&pool, &VotingPowerDistribution::default()).unwrap();
        assert!(outcome.credits.is_empty());
        assert_eq!(outcome.remainder, pool);
    }

    #[test]
    fn test_empty_pool_credits_nothing() {
        let dist = VotingPowerDistribution::new(1, vec![fp(1, 0, &[(10, 100)])]);
        let outcome = distribute(&Coins::new(), &dist).unwrap();
        assert!(outcome.credits.is_empty());
        assert!(outcome.remainder.is_zero());
    }

    #[test]
    fn test_split_proportional_to_power() {
        let dist = VotingPowerDistribution::new(
            1,
            vec![fp(1, 0, &[(10, 300)]), fp(2, 0, &[(11, 100)])],
        );
        let outcome = distribute(&coins("1000ubbn"), &dist).unwrap();

        assert_eq!(
            outcome.credit_for(StakeholderType::BtcDelegation, &addr(10)),
            coins("750ubbn")
        );
        assert_eq!(
            outcome.credit_for(StakeholderType::BtcDelegation, &addr(11)),
            coins("250ubbn")
        );
        assert!(outcome.remainder.is_zero());
    }

    #[test]
    fn test_commission_goes_to_provider_address() {
        let dist = VotingPowerDistribution::new(1, vec![fp(1, 1_000, &[(10, 50), (11, 50)])]);
        let outcome = distribute(&coins("1000ubbn"), &dist).unwrap();

        assert_eq!(
            outcome.credit_for(StakeholderType::FinalityProvider, &addr(1)),
            coins("100ubbn")
        );
        assert_eq!(
            outcome.credit_for(StakeholderType::BtcDelegation, &addr(10)),
            coins("450ubbn")
        );
        assert_eq!(
            outcome.credit_for(StakeholderType::BtcDelegation, &addr(11)),
            coins("450ubbn")
        );
    }

    #[test]
    fn test_delegator_credits_summed_across_providers() {
        let dist = VotingPowerDistribution::new(
            1,
            vec![fp(1, 0, &[(10, 100)]), fp(2, 0, &[(10, 100)])],
        );
        let outcome = distribute(&coins("1000ubbn"), &dist).unwrap();
        assert_eq!(outcome.recipients(), 1);
        assert_eq!(
            outcome.credit_for(StakeholderType::BtcDelegation, &addr(10)),
            coins("1000ubbn")
        );
    }

    #[test]
    fn test_truncation_is_conserved_in_remainder() {
        let dist = VotingPowerDistribution::new(
            1,
            vec![
                fp(1, 333, &[(10, 1), (11, 1), (12, 1)]),
                fp(2, 0, &[(13, 7)]),
            ],
        );
        let pool = coins("1001ubbn,17uatom");
        let outcome = distribute(&pool, &dist).unwrap();

        assert!(outcome.distributed.is_all_lte(&pool));
        assert_eq!(outcome.distributed.checked_add(&outcome.remainder).unwrap(), pool);
        assert!(!outcome.remainder.is_zero());

        let summed = outcome
            .credits
            .values()
            .try_fold(Coins::new(), |acc, c| acc.checked_add(c))
            .unwrap();
        assert_eq!(summed, outcome.distributed);
    }

    #[test]
    fn test_provider_payout_never_exceeds_its_share() {
        let mixes = vec![
            vec![fp(1, 333, &[(10, 1), (11, 1), (12, 1)]), fp(2, 0, &[(13, 7)])],
            vec![
                fp(1, 1_234, &[(10, 3), (11, 5), (12, 11)]),
                fp(2, 9_999, &[(10, 2), (13, 1)]),
                fp(3, 1, &[(14, 97)]),
            ],
            vec![fp(1, 500, &[(10, 1), (11, 2)]), fp(2, 7_777, &[(11, 13), (12, 17)])],
        ];
        for pool in ["1001ubbn,17uatom", "7ubbn", "999983ubbn"] {
            let pool = coins(pool);
            for providers in &mixes {
                let dist = VotingPowerDistribution::new(1, providers.clone());
                let outcome = distribute(&pool, &dist).unwrap();

                let mut shares = Coins::new();
                for (btc_pk, paid) in &outcome.provider_shares {
                    assert!(
                        paid.paid().unwrap().is_all_lte(&paid.share),
                        "provider {btc_pk:?} overpaid: {paid:?}"
                    );
                    shares = shares.checked_add(&paid.share).unwrap();
                }
                assert!(shares.is_all_lte(&pool));
            }
        }
    }

    #[test]
    fn test_provider_share_breakdown() {
        let dist = VotingPowerDistribution::new(1, vec![fp(1, 1_000, &[(10, 1), (11, 2)])]);
        let outcome = distribute(&coins("1000ubbn"), &dist).unwrap();

        let paid = &outcome.provider_shares[&BtcPublicKey([1; 32])];
        assert_eq!(paid.share, coins("1000ubbn"));
        assert_eq!(paid.commission, coins("100ubbn"));
        // 900 split 1:2 truncates to 300 + 600
        assert_eq!(paid.delegated, coins("900ubbn"));
    }

    #[test]
    fn test_full_commission_leaves_delegators_nothing() {
        let dist = VotingPowerDistribution::new(1, vec![fp(1, 10_000, &[(10, 100)])]);
        let outcome = distribute(&coins("500ubbn"), &dist).unwrap();
        assert_eq!(
            outcome.credit_for(StakeholderType::FinalityProvider, &addr(1)),
            coins("500ubbn")
        );
        assert!(outcome
            .credit_for(StakeholderType::BtcDelegation, &addr(10))
            .is_zero());
    }
}
