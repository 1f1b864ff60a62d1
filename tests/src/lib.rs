//! # Quantum-Chain BTC Staking Test Suite
//!
//! Cross-subsystem scenarios driven through the node runtime.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs               # Block driver with automatic epoch finalization
//!     ├── reward_distribution.rs   # Two-provider reward split walkthrough
//!     └── covenant_cosigning.rs    # Multi-provider covenant quorum and adaptor signatures
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests integration::
//! ```

#![allow(dead_code)]

pub mod integration;
