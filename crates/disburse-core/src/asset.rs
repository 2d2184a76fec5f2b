//! Asset ledger collaborator.
//!
//! The engine never custodies value itself; it instructs an external ledger
//! to move a fungible asset between accounts. All transfers produced by one
//! entry-point call are submitted as a single batch through
//! [`AssetLedger::execute`], which must apply every transfer or none.

use std::collections::{BTreeMap, BTreeSet};

use disburse_types::{Address, Amount};
use serde::{Deserialize, Serialize};

/// A single push of `amount` from `from` to `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Failures reported by an asset ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// Source account cannot cover the transfer.
    #[error("insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: Address,
        required: Amount,
        available: Amount,
    },

    /// Recipient refuses incoming transfers.
    #[error("recipient {0} rejected the transfer")]
    Rejected(Address),

    /// Recipient balance would overflow.
    #[error("balance overflow for {0}")]
    Overflow(Address),

    /// Storage or transport failure inside the ledger implementation.
    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// Value-transfer primitive the engine orchestrates on top of.
pub trait AssetLedger {
    /// Balance of `account` in `asset`.
    fn balance_of(&self, asset: &Address, account: &Address) -> Result<Amount, AssetError>;

    /// Apply `transfers` of `asset` in order, atomically.
    ///
    /// On error no transfer of the batch may remain applied.
    fn execute(&mut self, asset: &Address, transfers: &[Transfer]) -> Result<(), AssetError>;
}

/// In-process asset ledger keyed by `(asset, account)`.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssetLedger {
    balances: BTreeMap<(Address, Address), Amount>,
    blocked: BTreeSet<Address>,
}

impl MemoryAssetLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `asset` to `account` out of thin air.
    pub fn mint(&mut self, asset: Address, account: Address, amount: Amount) {
        let entry = self.balances.entry((asset, account)).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Make `account` reject every incoming transfer.
    pub fn block(&mut self, account: Address) {
        self.blocked.insert(account);
    }

    /// Lift a previous [`block`](Self::block).
    pub fn unblock(&mut self, account: &Address) {
        self.blocked.remove(account);
    }

    /// Balance lookup that cannot fail.
    pub fn balance(&self, asset: &Address, account: &Address) -> Amount {
        self.balances.get(&(*asset, *account)).copied().unwrap_or(0)
    }
}

impl AssetLedger for MemoryAssetLedger {
    fn balance_of(&self, asset: &Address, account: &Address) -> Result<Amount, AssetError> {
        Ok(self.balance(asset, account))
    }

    fn execute(&mut self, asset: &Address, transfers: &[Transfer]) -> Result<(), AssetError> {
        // Work on a scratch copy of the touched balances; publish only if
        // every transfer in the batch succeeds.
        let mut scratch: BTreeMap<Address, Amount> = BTreeMap::new();

        for t in transfers {
            if self.blocked.contains(&t.to) {
                return Err(AssetError::Rejected(t.to));
            }

            let available = *scratch
                .entry(t.from)
                .or_insert_with(|| self.balance(asset, &t.from));
            if available < t.amount {
                return Err(AssetError::InsufficientFunds {
                    account: t.from,
                    required: t.amount,
                    available,
                });
            }
            scratch.insert(t.from, available - t.amount);

            let received = *scratch
                .entry(t.to)
                .or_insert_with(|| self.balance(asset, &t.to));
            let updated = received
                .checked_add(t.amount)
                .ok_or(AssetError::Overflow(t.to))?;
            scratch.insert(t.to, updated);
        }

        for (account, amount) in scratch {
            self.balances.insert((*asset, account), amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSET: Address = Address::from_low_u64(0xa55e7);
    const POOL: Address = Address::from_low_u64(1);
    const ALICE: Address = Address::from_low_u64(2);
    const BOB: Address = Address::from_low_u64(3);

    fn funded() -> MemoryAssetLedger {
        let mut ledger = MemoryAssetLedger::new();
        ledger.mint(ASSET, POOL, 1_000);
        ledger
    }

    #[test]
    fn test_execute_moves_funds() {
        let mut ledger = funded();
        ledger
            .execute(
                &ASSET,
                &[
                    Transfer { from: POOL, to: ALICE, amount: 300 },
                    Transfer { from: POOL, to: BOB, amount: 700 },
                ],
            )
            .expect("execute");
        assert_eq!(ledger.balance(&ASSET, &POOL), 0);
        assert_eq!(ledger.balance(&ASSET, &ALICE), 300);
        assert_eq!(ledger.balance(&ASSET, &BOB), 700);
    }

    #[test]
    fn test_execute_is_all_or_nothing() {
        let mut ledger = funded();
        let err = ledger
            .execute(
                &ASSET,
                &[
                    Transfer { from: POOL, to: ALICE, amount: 600 },
                    Transfer { from: POOL, to: BOB, amount: 600 },
                ],
            )
            .expect_err("second transfer overdraws");
        assert!(matches!(err, AssetError::InsufficientFunds { available: 400, .. }));
        assert_eq!(ledger.balance(&ASSET, &POOL), 1_000);
        assert_eq!(ledger.balance(&ASSET, &ALICE), 0);
    }

    #[test]
    fn test_blocked_recipient_rejects() {
        let mut ledger = funded();
        ledger.block(BOB);
        let err = ledger
            .execute(
                &ASSET,
                &[
                    Transfer { from: POOL, to: ALICE, amount: 1 },
                    Transfer { from: POOL, to: BOB, amount: 1 },
                ],
            )
            .expect_err("bob is blocked");
        assert_eq!(err, AssetError::Rejected(BOB));
        assert_eq!(ledger.balance(&ASSET, &ALICE), 0);

        ledger.unblock(&BOB);
        ledger
            .execute(&ASSET, &[Transfer { from: POOL, to: BOB, amount: 1 }])
            .expect("unblocked");
    }

    #[test]
    fn test_assets_are_isolated() {
        let other = Address::from_low_u64(0xbeef);
        let mut ledger = funded();
        assert!(ledger
            .execute(&other, &[Transfer { from: POOL, to: ALICE, amount: 1 }])
            .is_err());
        assert_eq!(ledger.balance(&other, &ALICE), 0);
    }
}
