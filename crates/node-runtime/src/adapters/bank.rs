//! # In-Memory Bank
//!
//! Account balances kept in memory. Implements the incentive subsystem's
//! `BankGateway` port; withdrawals pay a flat fee to the fee collector.

use crate::container::IncentiveConfig;
use qc_19_incentive::{BankError, BankGateway};
use shared_types::{Address, Coins};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct InMemoryBank {
    module_account: Address,
    fee_collector: Address,
    withdrawal_fee: Coins,
    balances: BTreeMap<Address, Coins>,
}

impl InMemoryBank {
    pub fn new(module_account: Address, fee_collector: Address, withdrawal_fee: Coins) -> Self {
        Self {
            module_account,
            fee_collector,
            withdrawal_fee,
            balances: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &IncentiveConfig) -> Self {
        Self::new(
            config.module_account,
            config.fee_collector,
            config.withdrawal_fee.clone(),
        )
    }

    pub fn module_account(&self) -> Address {
        self.module_account
    }

    pub fn fee_collector(&self) -> Address {
        self.fee_collector
    }

    /// Split `amount` into what the recipient receives and the fee.
    pub fn deduct_fee(&self, amount: &Coins) -> Result<(Coins, Coins), BankError> {
        let net = amount
            .checked_sub(&self.withdrawal_fee)
            .ok_or_else(|| BankError::FeeExceedsAmount {
                amount: amount.clone(),
                fee: self.withdrawal_fee.clone(),
            })?;
        Ok((net, self.withdrawal_fee.clone()))
    }

    fn credit(&mut self, account: Address, amount: &Coins) -> Result<(), BankError> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self.balances.entry(account).or_default();
        *balance = balance.checked_add(amount)?;
        Ok(())
    }
}

impl BankGateway for InMemoryBank {
    fn fund_module(&mut self, amount: &Coins) -> Result<(), BankError> {
        self.credit(self.module_account, amount)
    }

    fn send_from_module(&mut self, recipient: &Address, amount: &Coins) -> Result<(), BankError> {
        let available = self.module_balance();
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| BankError::InsufficientFunds {
                account: self.module_account,
                needed: amount.clone(),
                available: available.clone(),
            })?;
        let (net, fee) = self.deduct_fee(amount)?;

        // Stage every balance change so a failed credit touches nothing.
        let mut staged = BTreeMap::from([(self.module_account, remaining)]);
        for (account, credit) in [(*recipient, &net), (self.fee_collector, &fee)] {
            let current = staged
                .get(&account)
                .cloned()
                .unwrap_or_else(|| self.balance(&account));
            staged.insert(account, current.checked_add(credit)?);
        }
        self.balances.extend(staged);
        debug!(%recipient, amount = %net, fee = %fee, "Transferred from module account");
        Ok(())
    }

    fn balance(&self, account: &Address) -> Coins {
        self.balances.get(account).cloned().unwrap_or_default()
    }

    fn module_balance(&self) -> Coins {
        self.balance(&self.module_account)
    }
}
