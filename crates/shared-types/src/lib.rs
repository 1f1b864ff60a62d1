//! # Shared Types Crate
//!
//! Domain entities exchanged between the staking subsystem (18), the
//! incentive subsystem (19) and the node runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every type that crosses a subsystem boundary
//!   is defined here, so neither subsystem depends on the other.
//! - **Deterministic Ordering**: All collections are ordered (`BTreeMap`) so
//!   that folds over them produce bit-identical results.
//! - **Exact Arithmetic**: Coin amounts are integers; proportional splits
//!   truncate toward zero and never exceed their input.

pub mod coins;
pub mod distribution;
pub mod entities;
pub mod errors;

pub use coins::{Coin, Coins};
pub use distribution::{FinalityProviderDistribution, VotingPowerDistribution};
pub use entities::*;
pub use errors::*;
