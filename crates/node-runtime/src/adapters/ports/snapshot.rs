//! Snapshot persistence ports.

use crate::wiring::ChainState;
use shared_types::BlockHeight;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Snapshot storage error: {message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Encoded committed snapshots keyed by block height.
pub trait SnapshotStore {
    fn put(&mut self, height: BlockHeight, snapshot: Vec<u8>) -> Result<(), StorageError>;

    fn get(&self, height: BlockHeight) -> Result<Option<Vec<u8>>, StorageError>;

    /// Highest stored snapshot.
    fn latest(&self) -> Result<Option<(BlockHeight, Vec<u8>)>, StorageError>;

    fn heights(&self) -> Vec<BlockHeight>;
}

/// Encoding of `ChainState` for the store.
pub trait SnapshotSerializer {
    fn serialize(&self, state: &ChainState) -> Result<Vec<u8>, StorageError>;

    fn deserialize(&self, data: &[u8]) -> Result<ChainState, StorageError>;
}
