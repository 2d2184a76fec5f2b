//! Administrative command handlers.

use std::sync::Arc;

use disburse_core::DistributorError;
use disburse_types::Role;
use serde_json::Value;

use super::{address_param, amount_param};
use crate::engine;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn updated() -> Value {
    serde_json::json!({"updated": true})
}

/// Bind a role slot. `role` is the snake_case role name.
pub async fn set_role_address(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let role: Role = params
        .get("role")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("role required"))?
        .parse()
        .map_err(|e: disburse_types::TypeError| RpcError::invalid_params(&e.to_string()))?;
    let address = address_param(params, "address")?;

    engine::execute(state, |distributor, _| {
        distributor.set_role_address(&caller, role, address)
    })
    .await?;
    Ok(updated())
}

pub async fn set_funding_source(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let address = address_param(params, "address")?;
    engine::execute(state, |distributor, _| {
        distributor.set_funding_source(&caller, address)
    })
    .await?;
    Ok(updated())
}

pub async fn set_asset(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let asset = address_param(params, "asset")?;
    engine::execute(state, |distributor, _| distributor.set_asset(&caller, asset)).await?;
    Ok(updated())
}

pub async fn set_operator(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let operator = address_param(params, "operator")?;
    engine::execute(state, |distributor, _| {
        distributor.set_operator(&caller, operator)
    })
    .await?;
    Ok(updated())
}

/// First step of the two-step ownership handover.
pub async fn transfer_ownership(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let new_owner = address_param(params, "new_owner")?;
    engine::execute(state, |distributor, _| {
        distributor.transfer_ownership(&caller, new_owner)
    })
    .await?;
    Ok(serde_json::json!({"pending_owner": new_owner}))
}

pub async fn accept_ownership(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    engine::execute(state, |distributor, _| distributor.accept_ownership(&caller)).await?;
    Ok(serde_json::json!({"owner": caller}))
}

pub async fn pause(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    engine::execute(state, |distributor, _| distributor.pause(&caller)).await?;
    Ok(serde_json::json!({"paused": true}))
}

pub async fn unpause(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    engine::execute(state, |distributor, _| distributor.unpause(&caller)).await?;
    Ok(serde_json::json!({"paused": false}))
}

/// Move an asset held in custody to the owner.
pub async fn recover_asset(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let asset = address_param(params, "asset")?;
    let amount = amount_param(params, "amount")?;
    engine::execute(state, |distributor, ledger| {
        distributor.recover_asset(ledger, &caller, asset, amount)
    })
    .await?;
    Ok(serde_json::json!({
        "asset": asset,
        "to": caller,
        "amount": amount.to_string(),
    }))
}

/// Stop the daemon. Owner only.
pub async fn shutdown(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    engine::read(state, |_, distributor| {
        if distributor.owner() != caller {
            return Err(RpcError::engine(&DistributorError::Unauthorized));
        }
        Ok(())
    })
    .await?;

    tracing::info!(by = %caller, "Shutdown requested over RPC");
    // No receiver only means shutdown is already under way.
    let _ = state.shutdown_tx.send(());
    Ok(serde_json::json!({"shutting_down": true}))
}
