//! Driven Ports (SPI - Outbound Dependencies)

use shared_types::{Address, Coins, TypeError};
use thiserror::Error;

/// Bank errors surfaced to the incentive subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("Insufficient funds in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: Address,
        needed: Coins,
        available: Coins,
    },

    #[error("Transfer fee {fee} exceeds amount {amount}")]
    FeeExceedsAmount { amount: Coins, fee: Coins },

    #[error("Balance overflow: {0}")]
    Overflow(#[from] TypeError),
}

/// Account primitives the incentive module needs from the bank.
///
/// Rewards sit in the incentive module account from the moment the block's
/// pool is allocated until a stakeholder withdraws them.
pub trait BankGateway {
    /// Credit the block's reward pool to the module account.
    fn fund_module(&mut self, amount: &Coins) -> Result<(), BankError>;

    /// Move `amount` from the module account to `recipient`.
    ///
    /// Either the whole transfer happens or nothing does.
    fn send_from_module(&mut self, recipient: &Address, amount: &Coins) -> Result<(), BankError>;

    fn balance(&self, account: &Address) -> Coins;

    fn module_balance(&self) -> Coins;
}
