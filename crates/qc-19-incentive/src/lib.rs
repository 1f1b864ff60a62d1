//! # qc-19-incentive
//!
//! Incentive subsystem: splits each block's reward pool over the effective
//! BTC voting power and keeps per-stakeholder reward gauges until they are
//! withdrawn.
//!
//! ## Reward Split
//!
//! ```text
//! pool ──power_i / Σpower──→ fp_share_i ──commission_bps──→ (FinalityProvider, fp address)
//!                                 │
//!                                 └── rest ──stake / power_i──→ (BtcDelegation, delegator)
//! ```
//!
//! Every division truncates. Leftovers go to the undistributed ledger
//! ([`RemainderPolicy::Accumulate`]) or are dropped.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qc_19_incentive::{IncentiveApi, IncentiveService};
//!
//! let mut incentive = IncentiveService::default();
//! incentive.distribute_rewards(height, &pool, &distribution)?;
//! let paid = incentive.withdraw_reward(&mut bank, StakeholderType::BtcDelegation, &address)?;
//! ```

pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

pub use domain::{
    distribute, DistributionOutcome, GaugeKey, ProviderShare, RemainderPolicy, RewardGauge,
};
pub use error::{IncentiveError, IncentiveResult};
pub use events::IncentiveEvent;
pub use ports::{BankError, BankGateway, IncentiveApi};
pub use service::IncentiveService;
