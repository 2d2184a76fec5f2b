//! Engine sessions over the database.
//!
//! Every mutating call runs inside one SQLite transaction: load the engine
//! state, run the call against the SQLite asset ledger, save the state,
//! append the events, commit. Any failure drops the transaction, so
//! engine state, balances and the event log never diverge.

use std::sync::Arc;

use disburse_core::{Distributor, DistributorConfig, DistributorError};
use disburse_db::queries::{assets, events, state};
use disburse_db::DbError;
use rusqlite::Connection;
use tracing::info;

use crate::config::DaemonConfig;
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Create and persist the engine from config unless state is already stored.
///
/// Returns `true` when a new engine was created.
pub fn bootstrap(conn: &mut Connection, config: &DaemonConfig) -> anyhow::Result<bool> {
    if state::load(conn)?.is_some() {
        info!("Resuming stored engine state");
        return Ok(false);
    }

    let engine = &config.engine;
    let tx = conn.transaction()?;
    let mut distributor = Distributor::new(DistributorConfig {
        deployer: engine.deployer,
        asset: engine.asset,
        funding_source: engine.funding_source,
        custody: engine.custody,
    })?;

    let owner = engine.deployer;
    for (role, address) in engine.roles.bindings() {
        distributor.set_role_address(&owner, role, address)?;
    }
    if let Some(operator) = engine.operator {
        if operator != distributor.operator() {
            distributor.set_operator(&owner, operator)?;
        }
    }

    let now = unix_now();
    state::save(&tx, distributor.state(), now)?;
    for event in distributor.take_events() {
        events::append(&tx, &event, now)?;
    }
    for grant in &config.ledger.genesis {
        let asset = grant.asset.unwrap_or(engine.asset);
        let balance = assets::credit(&tx, &asset, &grant.account, grant.amount)?;
        info!(account = %grant.account, %asset, %balance, "genesis credit");
    }
    tx.commit()?;

    info!(owner = %owner, asset = %engine.asset, "Engine created");
    Ok(true)
}

/// Map a database failure to an internal RPC error.
pub fn db_error(err: DbError) -> RpcError {
    RpcError::internal_error(&format!("db error: {err}"))
}

/// Run a mutating engine call and publish its events after commit.
pub async fn execute<T, F>(daemon: &Arc<DaemonState>, call: F) -> Result<T, RpcError>
where
    F: FnOnce(&mut Distributor, &mut assets::SqliteAssetLedger<'_>) -> Result<T, DistributorError>,
{
    let mut db = daemon.db.lock().await;
    let tx = db.transaction().map_err(|e| db_error(e.into()))?;

    let stored = state::load(&tx)
        .map_err(db_error)?
        .ok_or_else(|| RpcError::internal_error("engine not initialized"))?;
    let mut distributor = Distributor::from_state(stored);

    let output = {
        let mut ledger = assets::SqliteAssetLedger::new(&tx);
        call(&mut distributor, &mut ledger).map_err(|e| RpcError::engine(&e))?
    };

    let now = unix_now();
    state::save(&tx, distributor.state(), now).map_err(db_error)?;
    let mut committed = Vec::new();
    for event in distributor.take_events() {
        let seq = events::append(&tx, &event, now).map_err(db_error)?;
        committed.push(Event::committed(seq, now, &event));
    }
    tx.commit().map_err(|e| db_error(e.into()))?;
    drop(db);

    for event in committed {
        daemon.event_bus.emit(event);
    }
    Ok(output)
}

/// Run a read-only query against the stored engine state.
pub async fn read<T, F>(daemon: &Arc<DaemonState>, query: F) -> Result<T, RpcError>
where
    F: FnOnce(&Connection, &Distributor) -> Result<T, RpcError>,
{
    let db = daemon.db.lock().await;
    let stored = state::load(&db)
        .map_err(db_error)?
        .ok_or_else(|| RpcError::internal_error("engine not initialized"))?;
    query(&db, &Distributor::from_state(stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisAllocation;
    use disburse_types::{Address, Role};

    fn test_config() -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.engine.deployer = Address::from_low_u64(0x100);
        config.engine.asset = Address::from_low_u64(0xa55e7);
        config.engine.funding_source = Address::from_low_u64(0x9001);
        config.engine.custody = Address::from_low_u64(0x9002);
        config.engine.operator = Some(Address::from_low_u64(0x200));
        config.engine.roles.reserved = Some(Address::from_low_u64(7));
        config.ledger.genesis.push(GenesisAllocation {
            account: Address::from_low_u64(0x9001),
            asset: None,
            amount: 1_000,
        });
        config
    }

    #[test]
    fn test_bootstrap_creates_engine_once() {
        let mut conn = disburse_db::open_memory().expect("open");
        let config = test_config();

        assert!(bootstrap(&mut conn, &config).expect("bootstrap"));
        let stored = state::load(&conn).expect("load").expect("state");
        let distributor = Distributor::from_state(stored);
        assert_eq!(distributor.owner(), Address::from_low_u64(0x100));
        assert_eq!(distributor.operator(), Address::from_low_u64(0x200));
        assert_eq!(
            distributor.role_address(Role::Reserved),
            Address::from_low_u64(7)
        );
        assert_eq!(
            assets::balance(&conn, &config.engine.asset, &config.engine.funding_source)
                .expect("balance"),
            1_000
        );
        // RoleAddressUpdated + OperatorUpdated
        assert_eq!(events::count(&conn).expect("count"), 2);

        // Second start leaves state and genesis untouched.
        assert!(!bootstrap(&mut conn, &config).expect("bootstrap"));
        assert_eq!(
            assets::balance(&conn, &config.engine.asset, &config.engine.funding_source)
                .expect("balance"),
            1_000
        );
    }

    #[test]
    fn test_bootstrap_rejects_null_deployer() {
        let mut conn = disburse_db::open_memory().expect("open");
        let mut config = test_config();
        config.engine.deployer = Address::NULL;

        assert!(bootstrap(&mut conn, &config).is_err());
        assert!(state::load(&conn).expect("load").is_none());
        assert_eq!(events::count(&conn).expect("count"), 0);
    }
}
