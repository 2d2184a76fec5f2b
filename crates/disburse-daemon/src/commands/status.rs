//! Status and event log command handlers.

use std::sync::Arc;

use disburse_db::queries::events;
use disburse_types::Role;
use serde_json::Value;

use crate::engine;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Page size used when `limit` is omitted.
const DEFAULT_EVENT_PAGE: u32 = 100;
/// Largest page `get_events` returns.
const MAX_EVENT_PAGE: u32 = 1000;

/// Governance flags, role bindings and retention totals.
pub async fn get_status(state: &Arc<DaemonState>) -> Result {
    engine::read(state, |_, distributor| {
        let roles: serde_json::Map<String, Value> = Role::ALL
            .iter()
            .map(|role| {
                let address = distributor.role_address(*role);
                let value = if address.is_null() {
                    Value::Null
                } else {
                    Value::String(address.to_string())
                };
                (role.as_str().to_string(), value)
            })
            .collect();

        Ok(serde_json::json!({
            "owner": distributor.owner(),
            "pending_owner": distributor.pending_owner(),
            "operator": distributor.operator(),
            "paused": distributor.paused(),
            "asset": distributor.asset(),
            "funding_source": distributor.funding_source(),
            "custody": distributor.state().custody(),
            "total_retained": distributor.total_retained().to_string(),
            "roles": roles,
            "socket": state.config.socket_path(),
            "events_emitted": state.event_bus.sequence(),
            "version": env!("CARGO_PKG_VERSION"),
        }))
    })
    .await
}

/// One governance field (`owner`, `operator`, `pending_owner`, `paused`).
pub async fn governance(state: &Arc<DaemonState>, field: &'static str) -> Result {
    engine::read(state, |_, distributor| {
        let value = match field {
            "owner" => serde_json::json!(distributor.owner()),
            "operator" => serde_json::json!(distributor.operator()),
            "pending_owner" => serde_json::json!(distributor.pending_owner()),
            "paused" => serde_json::json!(distributor.paused()),
            other => return Err(RpcError::method_not_found(other)),
        };
        Ok(serde_json::json!({ field: value }))
    })
    .await
}

/// Address bound to one role; null when unset.
pub async fn get_role_address(state: &Arc<DaemonState>, params: &Value) -> Result {
    let role: Role = params
        .get("role")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("role required"))?
        .parse()
        .map_err(|e: disburse_types::TypeError| RpcError::invalid_params(&e.to_string()))?;

    engine::read(state, |_, distributor| {
        let address = distributor.role_address(role);
        Ok(serde_json::json!({
            "role": role,
            "address": address,
            "set": !address.is_null(),
        }))
    })
    .await
}

/// Page through the committed event log.
pub async fn get_events(state: &Arc<DaemonState>, params: &Value) -> Result {
    let after = params.get("after").and_then(|v| v.as_i64()).unwrap_or(0);
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|l| l.min(u64::from(MAX_EVENT_PAGE)) as u32)
        .unwrap_or(DEFAULT_EVENT_PAGE);

    let db = state.db.lock().await;
    let rows = events::list(&db, after, limit).map_err(engine::db_error)?;
    let total = events::count(&db).map_err(engine::db_error)?;

    let result: Vec<Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "seq": row.seq,
                "event_type": row.event.name(),
                "recorded_at": row.recorded_at,
                "event": row.event,
            })
        })
        .collect();

    Ok(serde_json::json!({
        "events": result,
        "total": total,
    }))
}
