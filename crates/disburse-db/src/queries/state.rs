//! Engine state persistence.
//!
//! The whole [`DistributorState`] is written after every committed call,
//! inside the caller's transaction.

use disburse_core::auth::AuthorizationGuard;
use disburse_core::registry::RoleRegistry;
use disburse_core::retention::RetentionLedger;
use disburse_core::DistributorState;
use disburse_types::{Address, Amount, Role};
use rusqlite::{Connection, OptionalExtension};

use crate::{parse_address, parse_amount, DbError, Result};

/// Load the persisted engine state, if one was ever saved.
pub fn load(conn: &Connection) -> Result<Option<DistributorState>> {
    let row = conn
        .query_row(
            "SELECT owner, pending_owner, operator, paused, funding_source, asset, custody
             FROM governance WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((owner, pending_owner, operator, paused, funding_source, asset, custody)) = row else {
        return Ok(None);
    };

    let guard = AuthorizationGuard::restore(
        parse_address(&owner)?,
        pending_owner.as_deref().map(parse_address).transpose()?,
        parse_address(&operator)?,
        paused,
    );

    let mut registry = RoleRegistry::new();
    {
        let mut stmt = conn.prepare("SELECT role, address FROM roles")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (role, address) in rows {
            let role: Role = role
                .parse()
                .map_err(|e: disburse_types::TypeError| DbError::Serialization(e.to_string()))?;
            let address = parse_address(&address)?;
            // A stored null Reserved means "never configured"; leave it unset.
            if role == Role::Reserved && address.is_null() {
                continue;
            }
            registry
                .set(role, address)
                .map_err(|e| DbError::Serialization(e.to_string()))?;
        }
    }

    let retention = {
        let mut stmt = conn.prepare("SELECT account, amount FROM retained_balances")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let entries = rows
            .iter()
            .map(|(account, amount)| Ok((parse_address(account)?, parse_amount(amount)?)))
            .collect::<Result<Vec<_>>>()?;
        RetentionLedger::from_entries(entries)
            .map_err(|e| DbError::Serialization(e.to_string()))?
    };

    Ok(Some(DistributorState::from_parts(
        guard,
        registry,
        retention,
        parse_address(&funding_source)?,
        parse_address(&asset)?,
        parse_address(&custody)?,
    )))
}

/// Persist the complete engine state.
pub fn save(conn: &Connection, state: &DistributorState, updated_at: u64) -> Result<()> {
    let guard = state.guard();
    conn.execute(
        "INSERT INTO governance
            (id, owner, pending_owner, operator, paused, funding_source, asset, custody, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            owner = excluded.owner,
            pending_owner = excluded.pending_owner,
            operator = excluded.operator,
            paused = excluded.paused,
            funding_source = excluded.funding_source,
            asset = excluded.asset,
            custody = excluded.custody,
            updated_at = excluded.updated_at",
        rusqlite::params![
            guard.owner().to_string(),
            guard.pending_owner().map(|a| a.to_string()),
            guard.operator().to_string(),
            guard.is_paused(),
            state.funding_source().to_string(),
            state.asset().to_string(),
            state.custody().to_string(),
            updated_at as i64,
        ],
    )?;

    let mut role_stmt =
        conn.prepare("INSERT OR REPLACE INTO roles (role, address) VALUES (?1, ?2)")?;
    for (role, address) in state.registry().iter() {
        role_stmt.execute(rusqlite::params![role.as_str(), address.to_string()])?;
    }

    let mut balance_stmt = conn
        .prepare("INSERT OR REPLACE INTO retained_balances (account, amount) VALUES (?1, ?2)")?;
    for (account, amount) in state.retention().iter() {
        balance_stmt.execute(rusqlite::params![account.to_string(), amount.to_string()])?;
    }

    Ok(())
}

/// Retained balance of one account straight from storage.
pub fn retained_balance(conn: &Connection, account: &Address) -> Result<Amount> {
    let amount: Option<String> = conn
        .query_row(
            "SELECT amount FROM retained_balances WHERE account = ?1",
            [account.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    amount.as_deref().map(parse_amount).transpose().map(|a| a.unwrap_or(0))
}
