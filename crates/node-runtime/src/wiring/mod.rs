//! # Subsystem Wiring
//!
//! Connects the staking (18) and incentive (19) subsystems block by block.
//!
//! ```text
//! begin_block(h, pool)
//!   │  clone committed ChainState → working copy
//!   │  effective distribution (last finalized epoch, still active)
//!   │        └──→ Incentive (19): distribute_rewards → gauges
//!   ▼
//! operations (delegations, covenant sigs, tip, epochs, withdrawals)
//!   │        └──→ BTC Staking (18) / Incentive (19) on the working copy
//!   ▼
//! end_block()
//!      record_voting_power(h) → snapshot → swap committed Arc
//! ```

pub mod chain;
pub mod epoch;
pub mod state;

pub use chain::{ChainReader, CommittedBlock, StakingChain};
pub use epoch::{epoch_boundary, EpochState};
pub use state::ChainState;
