//! # Error Types
//!
//! Parsing and arithmetic errors for shared entities.

use thiserror::Error;

/// Errors raised while decoding or combining shared types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Input is not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded input has the wrong length.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Unknown stakeholder type name.
    #[error("Unknown stakeholder type: {0}")]
    UnknownStakeholderType(String),

    /// Malformed coin string.
    #[error("Invalid coin: {0}")]
    InvalidCoin(String),

    /// Coin arithmetic overflowed.
    #[error("Coin amount overflow for denom {denom}")]
    Overflow { denom: String },
}
