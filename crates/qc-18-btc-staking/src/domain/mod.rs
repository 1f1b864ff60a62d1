//! Domain module for the BTC staking subsystem
//!
//! ## Core Modules
//! - params: Versioned parameter registry (covenant committee, quorum, limits)
//! - finality_provider: Finality provider registry entries
//! - scripts: Taproot script trees and spend path digests
//! - covenant: Covenant signature sets and quorum
//! - delegation: Delegation records and the status state machine
//! - voting_power: Voting power tables folded from active delegations

pub mod covenant;
pub mod delegation;
pub mod finality_provider;
pub mod params;
pub mod scripts;
pub mod voting_power;

pub use covenant::{CovenantSigOutcome, CovenantSignatureBatch, CovenantSignatureSet};
pub use delegation::{BtcDelegation, DelegationStatus};
pub use finality_provider::{FinalityProvider, FinalityProviderStatus};
pub use params::{Params, ParamsRegistry, VersionedParams, MAX_COMMISSION_BPS};
pub use scripts::{
    verify_staking_txs, SpendDigests, SpendPath, StakingInfo, StakingKeys, StakingTxBundle,
    UnbondingInfo, VerifiedStakingTxs,
};
pub use voting_power::VotingPowerTable;
