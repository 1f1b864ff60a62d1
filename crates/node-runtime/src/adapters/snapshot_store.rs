//! # Snapshot Store Adapters
//!
//! In-memory snapshot store with bounded retention and the bincode
//! serializer for committed `ChainState`.

use crate::adapters::ports::{SnapshotSerializer, SnapshotStore, StorageError};
use crate::wiring::ChainState;
use shared_types::BlockHeight;
use std::collections::BTreeMap;

/// Keeps the newest `retention` snapshots.
#[derive(Debug, Clone)]
pub struct InMemorySnapshotStore {
    snapshots: BTreeMap<BlockHeight, Vec<u8>>,
    retention: usize,
}

impl InMemorySnapshotStore {
    pub fn new(retention: usize) -> Self {
        Self {
            snapshots: BTreeMap::new(),
            retention: retention.max(1),
        }
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new(16)
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn put(&mut self, height: BlockHeight, snapshot: Vec<u8>) -> Result<(), StorageError> {
        self.snapshots.insert(height, snapshot);
        while self.snapshots.len() > self.retention {
            self.snapshots.pop_first();
        }
        Ok(())
    }

    fn get(&self, height: BlockHeight) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.snapshots.get(&height).cloned())
    }

    fn latest(&self) -> Result<Option<(BlockHeight, Vec<u8>)>, StorageError> {
        Ok(self
            .snapshots
            .last_key_value()
            .map(|(height, bytes)| (*height, bytes.clone())))
    }

    fn heights(&self) -> Vec<BlockHeight> {
        self.snapshots.keys().copied().collect()
    }
}

/// Default snapshot serializer using bincode.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSnapshotSerializer;

impl SnapshotSerializer for BincodeSnapshotSerializer {
    fn serialize(&self, state: &ChainState) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(state).map_err(|e| StorageError::new(e.to_string()))
    }

    fn deserialize(&self, data: &[u8]) -> Result<ChainState, StorageError> {
        bincode::deserialize(data).map_err(|e| StorageError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_drops_oldest() {
        let mut store = InMemorySnapshotStore::new(2);
        for height in 1..=3 {
            store.put(height, vec![height as u8]).unwrap();
        }
        assert_eq!(store.heights(), vec![2, 3]);
        assert_eq!(store.get(1).unwrap(), None);
        assert_eq!(store.latest().unwrap(), Some((3, vec![3])));
    }

    #[test]
    fn test_overwrite_same_height() {
        let mut store = InMemorySnapshotStore::default();
        store.put(5, vec![1]).unwrap();
        store.put(5, vec![2]).unwrap();
        assert_eq!(store.get(5).unwrap(), Some(vec![2]));
        assert_eq!(store.heights().len(), 1);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(BincodeSnapshotSerializer.deserialize(&[0xFF; 3]).is_err());
    }
}
