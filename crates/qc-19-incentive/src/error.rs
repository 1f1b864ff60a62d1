//! Error types for the incentive subsystem

use crate::ports::outbound::BankError;
use shared_types::{Address, StakeholderType, TypeError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncentiveError {
    /// No reward gauge exists for this stakeholder
    #[error("No rewards recorded for {stakeholder_type} {address}")]
    InsufficientGaugeBalance {
        stakeholder_type: StakeholderType,
        address: Address,
    },

    /// Bank transfer failed; the gauge is left untouched
    #[error("Bank error: {0}")]
    Bank(#[from] BankError),

    /// Coin arithmetic overflowed
    #[error("Reward overflow: {0}")]
    Overflow(#[from] TypeError),
}

impl IncentiveError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            IncentiveError::InsufficientGaugeBalance { .. } => "insufficient_gauge_balance",
            IncentiveError::Bank(_) => "bank",
            IncentiveError::Overflow(_) => "overflow",
        }
    }
}

pub type IncentiveResult<T> = Result<T, IncentiveError>;
