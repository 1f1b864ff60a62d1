//! # Node Runtime Library
//!
//! Runs the BTC staking (18) and incentive (19) subsystems as one
//! sequential block processor.
//!
//! ## Architectural Patterns
//!
//! - **Hexagonal Architecture**: Subsystems define ports, this crate
//!   provides the adapters (bank, snapshot store)
//! - **Copy-on-Commit**: Each block works on a clone of the committed state;
//!   readers hold an `Arc` of the last commit and never block the writer
//!
//! ## Example
//!
//! ```rust,ignore
//! use node_runtime::{NodeConfig, StakingChain};
//!
//! let config = NodeConfig::from_env()?;
//! node_runtime::telemetry::init_tracing(&config.telemetry)?;
//! let mut chain = StakingChain::new(config)?;
//!
//! chain.begin_block(1, &pool)?;
//! chain.register_finality_provider(fp_pk, fp_address, 500)?;
//! chain.end_block()?;
//! ```

pub mod adapters;
pub mod container;
pub mod error;
pub mod telemetry;
pub mod wiring;

pub use container::{ConfigError, NodeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use wiring::{ChainReader, ChainState, CommittedBlock, StakingChain};
