//! Retained balance and asset balance command handlers.

use std::sync::Arc;

use disburse_db::queries::assets;
use disburse_db::queries::state as retained;
use serde_json::Value;

use super::{address_param, amount_param};
use crate::engine;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Withdraw part of the caller's retained balance.
pub async fn withdraw_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let amount = amount_param(params, "amount")?;

    let remaining = engine::execute(state, |distributor, ledger| {
        distributor.withdraw_balance(ledger, &caller, amount)
    })
    .await?;

    Ok(serde_json::json!({
        "account": caller,
        "withdrawn": amount.to_string(),
        "remaining": remaining.to_string(),
    }))
}

/// Retained balance of one account.
pub async fn get_retained_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let account = address_param(params, "account")?;
    let db = state.db.lock().await;
    let balance = retained::retained_balance(&db, &account).map_err(engine::db_error)?;
    Ok(serde_json::json!({
        "account": account,
        "balance": balance.to_string(),
    }))
}

/// Sum of all retained balances.
pub async fn get_total_retained(state: &Arc<DaemonState>) -> Result {
    engine::read(state, |_, distributor| {
        Ok(serde_json::json!({
            "total": distributor.total_retained().to_string(),
        }))
    })
    .await
}

/// Balance held in the built-in asset ledger. `asset` defaults to the
/// distributed asset.
pub async fn get_asset_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let account = address_param(params, "account")?;
    let asset = match params.get("asset") {
        Some(_) => Some(address_param(params, "asset")?),
        None => None,
    };

    engine::read(state, |conn, distributor| {
        let asset = asset.unwrap_or_else(|| distributor.asset());
        let balance = assets::balance(conn, &asset, &account).map_err(engine::db_error)?;
        Ok(serde_json::json!({
            "asset": asset,
            "account": account,
            "balance": balance.to_string(),
        }))
    })
    .await
}
