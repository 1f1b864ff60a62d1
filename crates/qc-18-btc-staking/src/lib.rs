//! # qc-18-btc-staking
//!
//! BTC staking subsystem: Bitcoin holders lock BTC in taproot outputs that a
//! covenant committee co-signs, and delegate the resulting voting power to
//! finality providers.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Covenant Co-Signing**: Adaptor signatures on both slashing paths and
//!   plain Schnorr signatures on the unbonding path, per committee member
//! - **Delegation Lifecycle**: Quorum-gated activation, unbonding, expiry
//!   and slashing
//! - **Voting Power**: Per-height tables folded from active delegations
//!
//! ## Architecture
//!
//! ```text
//! Staker ──CreateDelegationRequest──→ BTC Staking (18) [PENDING]
//! Covenant ──CovenantSignatureBatch──→ BTC Staking (18) [ACTIVE at quorum]
//!                                          │
//!                                          └── VotingPowerTable ──→ Incentive (19)
//! ```
//!
//! ## Spend Paths
//!
//! | Path | Covenant signature | Digest |
//! |------|--------------------|--------|
//! | staking slashing | adaptor, per fp key | slashing tx, staking slashing leaf |
//! | unbonding | BIP-340 | unbonding tx, staking unbonding leaf |
//! | unbonding slashing | adaptor, per fp key | unbonding slashing tx, unbonding slashing leaf |
//!
//! ## Example
//!
//! ```rust,ignore
//! use qc_18_btc_staking::{BtcStakingApi, BtcStakingService, Params};
//!
//! let mut staking = BtcStakingService::new(params)?;
//! staking.register_finality_provider(fp_pk, fp_address, 500, height)?;
//! let hash = staking.create_delegation(request, height)?;
//! staking.add_covenant_signatures(batch, height)?;
//! staking.record_voting_power(height);
//! ```

pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use domain::{
    BtcDelegation, CovenantSigOutcome, CovenantSignatureBatch, CovenantSignatureSet,
    DelegationStatus, FinalityProvider, FinalityProviderStatus, Params, ParamsRegistry,
    SpendDigests, SpendPath, VotingPowerTable,
};
pub use error::{StakingError, StakingResult};
pub use events::StakingEvent;
pub use ports::inbound::{BtcStakingApi, CreateDelegationRequest, DelegationInfo};
pub use service::BtcStakingService;
