//! # Incentive Metrics
//!
//! Prometheus metrics for reward distribution and withdrawals, enabled with
//! the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `incentive_distributions_total` - Counter of blocks whose pool was split
//! - `incentive_reward_recipients` - Gauge of gauges credited in the last block
//! - `incentive_withdrawals_total` - Counter of withdrawals (by stakeholder type)
//! - `incentive_undistributed_amount` - Gauge of undistributed coins (by denom)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_gauge_vec, register_int_counter, register_int_gauge,
    CounterVec, GaugeVec, IntCounter, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref DISTRIBUTIONS: IntCounter = register_int_counter!(
        "incentive_distributions_total",
        "Total number of reward pools distributed"
    )
    .expect("Failed to create DISTRIBUTIONS metric");

    pub static ref REWARD_RECIPIENTS: IntGauge = register_int_gauge!(
        "incentive_reward_recipients",
        "Number of gauges credited by the last distribution"
    )
    .expect("Failed to create REWARD_RECIPIENTS metric");

    pub static ref WITHDRAWALS: CounterVec = register_counter_vec!(
        "incentive_withdrawals_total",
        "Total number of reward withdrawals",
        &["stakeholder_type"]
    )
    .expect("Failed to create WITHDRAWALS metric");

    pub static ref UNDISTRIBUTED: GaugeVec = register_gauge_vec!(
        "incentive_undistributed_amount",
        "Undistributed reward leftovers",
        &["denom"]
    )
    .expect("Failed to create UNDISTRIBUTED metric");
}

#[cfg(feature = "metrics")]
pub fn record_distribution(recipients: usize) {
    DISTRIBUTIONS.inc();
    REWARD_RECIPIENTS.set(recipients as i64);
}

#[cfg(feature = "metrics")]
pub fn record_withdrawal(stakeholder_type: &str) {
    WITHDRAWALS.with_label_values(&[stakeholder_type]).inc();
}

#[cfg(feature = "metrics")]
pub fn set_undistributed(denom: &str, amount: u128) {
    UNDISTRIBUTED.with_label_values(&[denom]).set(amount as f64);
}

#[cfg(not(feature = "metrics"))]
pub fn record_distribution(_recipients: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_withdrawal(_stakeholder_type: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn set_undistributed(_denom: &str, _amount: u128) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_distribution(4);
        record_withdrawal("btc_delegation");
        set_undistributed("ubbn", 3);
    }
}
