//! # Runtime Ports
//!
//! Outbound ports owned by the node runtime itself. The bank port is owned
//! by the incentive subsystem (`qc_19_incentive::BankGateway`).

pub mod snapshot;

pub use snapshot::{SnapshotSerializer, SnapshotStore, StorageError};
