//! Retention ledger.
//!
//! Per-address balances held back because the intended recipient was unset
//! at distribution time. Balances grow only through [`RetentionLedger::credit`]
//! and shrink only through [`RetentionLedger::debit`] (a withdrawal by the
//! owning address). Entries persist at zero once fully withdrawn.
//!
//! `total` is maintained alongside the map so that the sum of all entries is
//! available without iteration; every mutation keeps the two in step.

use std::collections::BTreeMap;

use disburse_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::{DistributorError, Result};

/// Retained balance per address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionLedger {
    balances: BTreeMap<Address, Amount>,
    total: Amount,
}

impl RetentionLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted entries.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Overflow`] if the entries sum past `Amount::MAX`
    pub fn from_entries(entries: impl IntoIterator<Item = (Address, Amount)>) -> Result<Self> {
        let mut ledger = Self::new();
        for (account, amount) in entries {
            ledger.total = ledger
                .total
                .checked_add(amount)
                .ok_or(DistributorError::Overflow)?;
            ledger.balances.insert(account, amount);
        }
        Ok(ledger)
    }

    /// Retained balance of `account` (zero if never credited).
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Sum of every retained balance.
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Add `amount` to `account`'s retained balance.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::InvalidAddress`] if `account` is the null sentinel
    /// - [`DistributorError::Overflow`] if the balance or total would overflow
    pub fn credit(&mut self, account: Address, amount: Amount) -> Result<Amount> {
        if account.is_null() {
            return Err(DistributorError::InvalidAddress);
        }
        let total = self
            .total
            .checked_add(amount)
            .ok_or(DistributorError::Overflow)?;
        let balance = self
            .balance_of(&account)
            .checked_add(amount)
            .ok_or(DistributorError::Overflow)?;
        self.balances.insert(account, balance);
        self.total = total;
        Ok(balance)
    }

    /// Remove `amount` from `account`'s retained balance.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::AmountMustBePositive`] if `amount` is zero
    /// - [`DistributorError::InsufficientBalance`] if the balance is smaller
    pub fn debit(&mut self, account: Address, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(DistributorError::AmountMustBePositive);
        }
        let available = self.balance_of(&account);
        if available < amount {
            return Err(DistributorError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        let balance = available - amount;
        self.balances.insert(account, balance);
        // The total is at least as large as any single entry.
        self.total -= amount;
        Ok(balance)
    }

    /// All entries, including fully withdrawn ones.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }
}
