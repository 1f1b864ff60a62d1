//! # BTC Staking Metrics
//!
//! Prometheus metrics for delegation lifecycle and covenant co-signing.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-btc-staking = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `btc_staking_delegations_created_total` - Counter of accepted delegations
//! - `btc_staking_status_transitions_total` - Counter of transitions (by target status)
//! - `btc_staking_covenant_signatures_total` - Counter of recorded covenant signatures
//! - `btc_staking_requests_rejected_total` - Counter of rejected requests (by reason)
//! - `btc_staking_total_voting_power_sat` - Gauge of total voting power in the latest table

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, CounterVec, Gauge, IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total delegations created
    pub static ref DELEGATIONS_CREATED: IntCounter = register_int_counter!(
        "btc_staking_delegations_created_total",
        "Total number of BTC delegations created"
    )
    .expect("Failed to create DELEGATIONS_CREATED metric");

    /// Status transitions, labeled by target status
    pub static ref STATUS_TRANSITIONS: CounterVec = register_counter_vec!(
        "btc_staking_status_transitions_total",
        "Total number of delegation status transitions",
        &["status"]
    )
    .expect("Failed to create STATUS_TRANSITIONS metric");

    /// Covenant signatures recorded
    pub static ref COVENANT_SIGNATURES: IntCounter = register_int_counter!(
        "btc_staking_covenant_signatures_total",
        "Total number of covenant signatures recorded"
    )
    .expect("Failed to create COVENANT_SIGNATURES metric");

    /// Rejected requests, labeled by reason
    pub static ref REQUESTS_REJECTED: CounterVec = register_counter_vec!(
        "btc_staking_requests_rejected_total",
        "Total number of rejected staking requests",
        &["reason"]
    )
    .expect("Failed to create REQUESTS_REJECTED metric");

    /// Total voting power of the latest recorded table
    pub static ref TOTAL_VOTING_POWER: Gauge = register_gauge!(
        "btc_staking_total_voting_power_sat",
        "Total voting power in satoshis"
    )
    .expect("Failed to create TOTAL_VOTING_POWER metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_delegation_created() {
    DELEGATIONS_CREATED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_status_transition(status: &str) {
    STATUS_TRANSITIONS.with_label_values(&[status]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_covenant_signatures(count: u64) {
    COVENANT_SIGNATURES.inc_by(count);
}

#[cfg(feature = "metrics")]
pub fn record_rejection(reason: &str) {
    REQUESTS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn set_total_voting_power(sat: u128) {
    TOTAL_VOTING_POWER.set(sat as f64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_delegation_created() {}

#[cfg(not(feature = "metrics"))]
pub fn record_status_transition(_status: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_covenant_signatures(_count: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_rejection(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn set_total_voting_power(_sat: u128) {}
