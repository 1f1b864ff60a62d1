//! Error types for the BTC staking subsystem

use crate::domain::{DelegationStatus, SpendPath};
use shared_crypto::CryptoError;
use shared_types::BtcPublicKey;
use thiserror::Error;

/// BTC staking errors.
///
/// Every variant is a per-request rejection; the state the request targeted
/// is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakingError {
    /// A covenant, staker or adaptor signature failed verification
    #[error("Invalid {path} signature from {signer}")]
    InvalidSignature {
        path: SpendPath,
        signer: BtcPublicKey,
    },

    /// No delegation with this staking transaction hash
    #[error("Unknown delegation: {}", hex::encode(.staking_tx_hash))]
    UnknownDelegation { staking_tx_hash: [u8; 32] },

    /// No registered finality provider with this key
    #[error("Unknown finality provider: {btc_pk}")]
    UnknownFinalityProvider { btc_pk: BtcPublicKey },

    /// Signer is not part of the delegation's covenant committee
    #[error("Unknown covenant member: {covenant_pk}")]
    UnknownCovenantMember { covenant_pk: BtcPublicKey },

    /// Batch carries a signature for a provider the delegation does not reference
    #[error("Finality provider {btc_pk} is not referenced by the delegation")]
    FinalityProviderNotReferenced { btc_pk: BtcPublicKey },

    /// A delegation with this staking transaction already exists
    #[error("Duplicate delegation: {}", hex::encode(.staking_tx_hash))]
    DuplicateDelegation { staking_tx_hash: [u8; 32] },

    /// A finality provider with this key is already registered
    #[error("Duplicate finality provider: {btc_pk}")]
    DuplicateFinalityProvider { btc_pk: BtcPublicKey },

    /// Finality provider is slashed and cannot receive new stake
    #[error("Finality provider {btc_pk} is slashed")]
    FinalityProviderSlashed { btc_pk: BtcPublicKey },

    /// Requested transition is not allowed from the current status
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        from: DelegationStatus,
        to: DelegationStatus,
    },

    /// Staking, unbonding or slashing transactions are malformed or inconsistent
    #[error("Invalid staking transaction: {reason}")]
    InvalidStakingTx { reason: String },

    /// Commission outside the allowed range
    #[error("Invalid commission: {commission_bps} bps (min {min_bps}, max 10000)")]
    InvalidCommission { commission_bps: u16, min_bps: u16 },

    /// Parameter set failed validation
    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },

    /// Script or taproot construction failed
    #[error("Script error: {reason}")]
    Script { reason: String },

    /// Key or signature decoding failed
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl StakingError {
    pub(crate) fn invalid_tx(reason: impl Into<String>) -> Self {
        StakingError::InvalidStakingTx {
            reason: reason.into(),
        }
    }

    pub(crate) fn script(reason: impl std::fmt::Display) -> Self {
        StakingError::Script {
            reason: reason.to_string(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StakingError::InvalidSignature { .. } => "invalid_signature",
            StakingError::UnknownDelegation { .. } => "unknown_delegation",
            StakingError::UnknownFinalityProvider { .. } => "unknown_finality_provider",
            StakingError::UnknownCovenantMember { .. } => "unknown_covenant_member",
            StakingError::FinalityProviderNotReferenced { .. } => "fp_not_referenced",
            StakingError::DuplicateDelegation { .. } => "duplicate_delegation",
            StakingError::DuplicateFinalityProvider { .. } => "duplicate_finality_provider",
            StakingError::FinalityProviderSlashed { .. } => "finality_provider_slashed",
            StakingError::InvalidStateTransition { .. } => "invalid_state_transition",
            StakingError::InvalidStakingTx { .. } => "invalid_staking_tx",
            StakingError::InvalidCommission { .. } => "invalid_commission",
            StakingError::InvalidParams { .. } => "invalid_params",
            StakingError::Script { .. } => "script",
            StakingError::Crypto(_) => "crypto",
        }
    }
}

/// Result type for BTC staking operations
pub type StakingResult<T> = Result<T, StakingError>;
