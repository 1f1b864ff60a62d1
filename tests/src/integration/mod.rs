//! Cross-subsystem integration scenarios.

pub mod harness;

mod covenant_cosigning;
mod reward_distribution;
