//! Domain layer for the incentive subsystem

pub mod distribution;
pub mod gauge;

pub use distribution::{
    distribute, DistributionOutcome, ProviderShare, RemainderPolicy, BPS_DENOMINATOR,
};
pub use gauge::{GaugeKey, RewardGauge};
