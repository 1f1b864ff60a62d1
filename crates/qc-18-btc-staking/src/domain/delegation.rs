//! BTC delegations and their lifecycle.
//!
//! ```text
//! [PENDING] ──quorum──→ [ACTIVE] ──unbond──→ [UNBONDING]
//!     │                    │
//!     │                    └──timelock──→ [EXPIRED]
//!     │
//!     └──────── any non-terminal ──slash──→ [SLASHED]
//! ```

use crate::domain::covenant::CovenantSignatureSet;
use crate::domain::scripts::SpendDigests;
use crate::error::{StakingError, StakingResult};
use serde::{Deserialize, Serialize};
use shared_crypto::SchnorrSignature;
use shared_types::{Address, BlockHeight, BtcPublicKey, Hash};
use std::fmt;

/// Delegation status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DelegationStatus {
    Pending,
    Active,
    Unbonding,
    Expired,
    Slashed,
}

impl DelegationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelegationStatus::Pending => "pending",
            DelegationStatus::Active => "active",
            DelegationStatus::Unbonding => "unbonding",
            DelegationStatus::Expired => "expired",
            DelegationStatus::Slashed => "slashed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DelegationStatus::Expired | DelegationStatus::Slashed)
    }

    /// Whether `self → to` is an allowed transition.
    pub fn can_transition_to(&self, to: DelegationStatus) -> bool {
        use DelegationStatus::*;
        matches!(
            (self, to),
            (Pending, Active)
                | (Active, Unbonding)
                | (Active, Expired)
                | (Pending, Slashed)
                | (Active, Slashed)
                | (Unbonding, Slashed)
        )
    }
}

impl fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A BTC delegation keyed by its staking transaction hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcDelegation {
    pub staking_tx_hash: Hash,
    pub staker_address: Address,
    pub staker_btc_pk: BtcPublicKey,
    pub fp_btc_pks: Vec<BtcPublicKey>,
    pub staking_value_sat: u64,
    /// BTC height the staking transaction was included at.
    pub start_height: u64,
    pub end_height: u64,
    pub staking_time: u16,
    pub unbonding_time: u16,
    pub unbonding_value_sat: u64,

    pub staking_tx: Vec<u8>,
    pub staking_output_index: u32,
    pub slashing_tx: Vec<u8>,
    pub delegator_slashing_sig: SchnorrSignature,
    pub unbonding_tx: Vec<u8>,
    pub unbonding_slashing_tx: Vec<u8>,
    pub delegator_unbonding_slashing_sig: SchnorrSignature,
    /// Staker signature on the unbonding path, set by an unbonding request.
    pub delegator_unbonding_sig: Option<SchnorrSignature>,

    pub digests: SpendDigests,
    pub covenant_sigs: CovenantSignatureSet,
    pub params_version: u32,

    pub status: DelegationStatus,
    pub created_height: BlockHeight,
    pub activated_height: Option<BlockHeight>,
    /// Height of the last status change.
    pub status_height: BlockHeight,
}

impl BtcDelegation {
    pub fn is_active(&self) -> bool {
        self.status == DelegationStatus::Active
    }

    pub fn references(&self, fp_pk: &BtcPublicKey) -> bool {
        self.fp_btc_pks.contains(fp_pk)
    }

    /// Move to `to` at `height`, enforcing the transition table.
    pub fn transition(&mut self, to: DelegationStatus, height: BlockHeight) -> StakingResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(StakingError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        if to == DelegationStatus::Active {
            self.activated_height = Some(height);
        }
        self.status = to;
        self.status_height = height;
        Ok(())
    }

    /// Whether the staking timelock is within `finalization_timeout` blocks of
    /// `btc_tip`.
    pub fn is_expired_at(&self, btc_tip: u64, finalization_timeout: u64) -> bool {
        btc_tip.saturating_add(finalization_timeout) >= self.end_height
    }
}
