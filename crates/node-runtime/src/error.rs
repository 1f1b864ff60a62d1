//! Runtime error types

use crate::adapters::StorageError;
use crate::container::ConfigError;
use qc_18_btc_staking::StakingError;
use qc_19_incentive::{BankError, IncentiveError};
use shared_types::{BlockHeight, EpochNumber};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error(transparent)]
    Incentive(#[from] IncentiveError),

    /// Funding the module account with the block's pool failed
    #[error("Bank error: {0}")]
    Bank(#[from] BankError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Mutation issued outside `begin_block` / `end_block`
    #[error("No block in progress")]
    NoBlockInProgress,

    #[error("Block {height} is already in progress")]
    BlockInProgress { height: BlockHeight },

    #[error("Non-sequential block height: expected {expected}, got {got}")]
    NonSequentialHeight {
        expected: BlockHeight,
        got: BlockHeight,
    },

    /// Finalization reported for an epoch that was never sealed
    #[error("Epoch {epoch} has not been sealed")]
    EpochNotSealed { epoch: EpochNumber },

    #[error("Epoch out of order: expected {expected}, got {got}")]
    EpochOutOfOrder {
        expected: EpochNumber,
        got: EpochNumber,
    },

    /// Sealing reported before the epoch's last block was committed
    #[error("Epoch {epoch} ends at height {boundary}, not yet committed at height {height}")]
    EpochNotEnded {
        epoch: EpochNumber,
        boundary: BlockHeight,
        height: BlockHeight,
    },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
