//! SQLite-backed asset ledger.
//!
//! Balances live in `asset_balances`. [`SqliteAssetLedger::execute`] wraps a
//! transfer batch in a SAVEPOINT so that it composes with whatever
//! transaction the caller already holds.

use disburse_core::{AssetError, AssetLedger, Transfer};
use disburse_types::{Address, Amount};
use rusqlite::{Connection, OptionalExtension};

use crate::{parse_amount, DbError, Result};

const SAVEPOINT: &str = "asset_batch";

/// Balance of `account` in `asset`; zero if never touched.
pub fn balance(conn: &Connection, asset: &Address, account: &Address) -> Result<Amount> {
    let amount: Option<String> = conn
        .query_row(
            "SELECT amount FROM asset_balances WHERE asset = ?1 AND account = ?2",
            [asset.to_string(), account.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    amount.as_deref().map(parse_amount).transpose().map(|a| a.unwrap_or(0))
}

/// Overwrite a balance.
pub fn set_balance(conn: &Connection, asset: &Address, account: &Address, amount: Amount) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO asset_balances (asset, account, amount) VALUES (?1, ?2, ?3)",
        rusqlite::params![asset.to_string(), account.to_string(), amount.to_string()],
    )?;
    Ok(())
}

/// Add `amount` to a balance (genesis allocations).
pub fn credit(conn: &Connection, asset: &Address, account: &Address, amount: Amount) -> Result<Amount> {
    let updated = balance(conn, asset, account)?
        .checked_add(amount)
        .ok_or_else(|| DbError::Serialization(format!("balance overflow for {account}")))?;
    set_balance(conn, asset, account, updated)?;
    Ok(updated)
}

/// [`AssetLedger`] over a borrowed connection.
pub struct SqliteAssetLedger<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteAssetLedger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn apply(&self, asset: &Address, transfers: &[Transfer]) -> std::result::Result<(), AssetError> {
        for t in transfers {
            let available = balance(self.conn, asset, &t.from).map_err(backend)?;
            if available < t.amount {
                return Err(AssetError::InsufficientFunds {
                    account: t.from,
                    required: t.amount,
                    available,
                });
            }
            set_balance(self.conn, asset, &t.from, available - t.amount).map_err(backend)?;

            let received = balance(self.conn, asset, &t.to).map_err(backend)?;
            let updated = received
                .checked_add(t.amount)
                .ok_or(AssetError::Overflow(t.to))?;
            set_balance(self.conn, asset, &t.to, updated).map_err(backend)?;
        }
        Ok(())
    }
}

fn backend(err: DbError) -> AssetError {
    AssetError::Backend(err.to_string())
}

impl AssetLedger for SqliteAssetLedger<'_> {
    fn balance_of(&self, asset: &Address, account: &Address) -> std::result::Result<Amount, AssetError> {
        balance(self.conn, asset, account).map_err(backend)
    }

    fn execute(&mut self, asset: &Address, transfers: &[Transfer]) -> std::result::Result<(), AssetError> {
        self.conn
            .execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))
            .map_err(|e| AssetError::Backend(e.to_string()))?;

        match self.apply(asset, transfers) {
            Ok(()) => self
                .conn
                .execute_batch(&format!("RELEASE {SAVEPOINT}"))
                .map_err(|e| AssetError::Backend(e.to_string())),
            Err(err) => {
                self.conn
                    .execute_batch(&format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT}"))
                    .map_err(|e| AssetError::Backend(e.to_string()))?;
                tracing::debug!(error = %err, "asset batch rolled back");
                Err(err)
            }
        }
    }
}
