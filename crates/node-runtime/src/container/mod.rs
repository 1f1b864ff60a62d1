//! # Node Container
//!
//! Configuration for the node runtime.

pub mod config;

pub use config::{
    ConfigError, EpochConfig, IncentiveConfig, NodeConfig, StakingConfig, StorageConfig,
    TelemetryConfig,
};
