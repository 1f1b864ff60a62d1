//! Reward gauges
//!
//! A gauge is the running tally of rewards credited to one
//! `(StakeholderType, Address)` pair and how much of it has already been
//! paid out. Withdrawals always drain the full difference.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Coins, StakeholderType, TypeError};

/// Key a gauge is stored under.
pub type GaugeKey = (StakeholderType, Address);

/// Cumulative rewards of one stakeholder.
///
/// `withdrawn_coins` never exceeds `coins` in any denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardGauge {
    /// Total credited since the gauge was created.
    pub coins: Coins,
    /// Total already transferred out.
    pub withdrawn_coins: Coins,
}

impl RewardGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coins credited but not yet withdrawn.
    pub fn withdrawable(&self) -> Coins {
        self.coins
            .checked_sub(&self.withdrawn_coins)
            .unwrap_or_default()
    }

    /// Gauge with `amount` added to the credited total.
    pub fn credited(&self, amount: &Coins) -> Result<Self, TypeError> {
        Ok(Self {
            coins: self.coins.checked_add(amount)?,
            withdrawn_coins: self.withdrawn_coins.clone(),
        })
    }

    /// Record that everything credited so far has been paid out.
    pub fn mark_withdrawn(&mut self) {
        self.withdrawn_coins = self.coins.clone();
    }
}
