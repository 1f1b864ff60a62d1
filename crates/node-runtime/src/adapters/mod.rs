//! # Adapter Implementations
//!
//! Concrete implementations of the outbound ports the runtime wires into
//! the subsystems.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 OUTER LAYER (Adapters)                       │
//! │      InMemoryBank, InMemorySnapshotStore, Bincode...         │
//! │                        ↑ implements ↑                        │
//! │                 MIDDLE LAYER (Ports)                         │
//! │   qc_19_incentive::BankGateway, SnapshotStore, Serializer    │
//! │                          ↑ uses ↑                            │
//! │                 INNER LAYER (Domain)                         │
//! │        BtcStakingService, IncentiveService (pure)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod bank;
pub mod ports;
pub mod snapshot_store;

pub use bank::InMemoryBank;
pub use ports::{SnapshotSerializer, SnapshotStore, StorageError};
pub use snapshot_store::{BincodeSnapshotSerializer, InMemorySnapshotStore};
