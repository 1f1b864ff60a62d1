//! Epoch gating of voting power.
//!
//! Stake only counts for rewards once an epoch containing it has been
//! finalized. Removals (unbonding, slashing, expiry) are not gated: the
//! effective set is always filtered by current status.

use crate::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use shared_types::{BlockHeight, EpochNumber, Hash};
use std::collections::BTreeSet;

/// Last height of `epoch`.
pub fn epoch_boundary(epoch: EpochNumber, epoch_interval: u64) -> BlockHeight {
    epoch.saturating_mul(epoch_interval)
}

/// Sealing and finalization progress. Epochs are numbered from 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochState {
    last_sealed: EpochNumber,
    last_finalized: EpochNumber,
    /// First height that accrues rewards: the block after the one that
    /// processed the first finalization.
    activation_height: Option<BlockHeight>,
    /// Delegations in the voting power table at the last finalized boundary.
    effective_delegations: BTreeSet<Hash>,
}

impl EpochState {
    pub fn last_sealed(&self) -> EpochNumber {
        self.last_sealed
    }

    pub fn last_finalized(&self) -> EpochNumber {
        self.last_finalized
    }

    pub fn activation_height(&self) -> Option<BlockHeight> {
        self.activation_height
    }

    pub fn is_activated(&self) -> bool {
        self.activation_height.is_some()
    }

    pub fn effective_delegations(&self) -> &BTreeSet<Hash> {
        &self.effective_delegations
    }

    /// Mark `epoch` sealed while processing block `height`.
    ///
    /// The epoch's last block must already be committed. Returns its height.
    pub fn seal(
        &mut self,
        epoch: EpochNumber,
        epoch_interval: u64,
        height: BlockHeight,
    ) -> RuntimeResult<BlockHeight> {
        let expected = self.last_sealed + 1;
        if epoch != expected {
            return Err(RuntimeError::EpochOutOfOrder {
                expected,
                got: epoch,
            });
        }
        let boundary = epoch_boundary(epoch, epoch_interval);
        if boundary >= height {
            return Err(RuntimeError::EpochNotEnded {
                epoch,
                boundary,
                height,
            });
        }
        self.last_sealed = epoch;
        Ok(boundary)
    }

    /// Mark `epoch` finalized while processing block `height`.
    ///
    /// `delegations_at` yields the delegations recorded at a boundary height.
    /// Returns true if this finalization activated rewards.
    pub fn finalize<F>(
        &mut self,
        epoch: EpochNumber,
        epoch_interval: u64,
        height: BlockHeight,
        delegations_at: F,
    ) -> RuntimeResult<bool>
    where
        F: FnOnce(BlockHeight) -> BTreeSet<Hash>,
    {
        if epoch > self.last_sealed {
            return Err(RuntimeError::EpochNotSealed { epoch });
        }
        let expected = self.last_finalized + 1;
        if epoch != expected {
            return Err(RuntimeError::EpochOutOfOrder {
                expected,
                got: epoch,
            });
        }

        self.effective_delegations = delegations_at(epoch_boundary(epoch, epoch_interval));
        self.last_finalized = epoch;
        let activated = self.activation_height.is_none();
        if activated {
            // this block's pool was settled in begin_block already
            self.activation_height = Some(height + 1);
        }
        Ok(activated)
    }
}
