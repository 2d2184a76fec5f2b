//! IPC command handlers.
//!
//! Each submodule implements the commands for one area. Mutating commands
//! take the acting account as `caller`; amounts are decimal strings (plain
//! JSON integers are accepted when they fit in `u64`).

pub mod account;
pub mod admin;
pub mod income;
pub mod status;

use disburse_core::{Distribution, Route};
use disburse_types::{Address, Amount};
use serde_json::Value;

use crate::rpc::RpcError;

/// Required address parameter.
pub(crate) fn address_param(params: &Value, key: &str) -> std::result::Result<Address, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?
        .parse()
        .map_err(|e: disburse_types::TypeError| RpcError::invalid_params(&format!("{key}: {e}")))
}

/// Required amount parameter.
pub(crate) fn amount_param(params: &Value, key: &str) -> std::result::Result<Amount, RpcError> {
    optional_amount_param(params, key)?
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Optional amount parameter.
pub(crate) fn optional_amount_param(
    params: &Value,
    key: &str,
) -> std::result::Result<Option<Amount>, RpcError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s
            .parse::<Amount>()
            .map(Some)
            .map_err(|_| RpcError::invalid_params(&format!("{key} must be a decimal amount"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|n| Some(Amount::from(n)))
            .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be a non-negative integer"))),
        Some(_) => Err(RpcError::invalid_params(&format!(
            "{key} must be a decimal amount"
        ))),
    }
}

/// Render a distribution receipt. Amounts are strings.
pub(crate) fn distribution_json(distribution: &Distribution) -> Value {
    let settlements: Vec<Value> = distribution
        .settlements
        .iter()
        .map(|s| {
            serde_json::json!({
                "role": s.role,
                "recipient": s.recipient,
                "amount": s.amount.to_string(),
                "route": match s.route {
                    Route::Transferred => "transferred",
                    Route::Retained => "retained",
                },
            })
        })
        .collect();

    serde_json::json!({
        "category": distribution.category.as_str(),
        "amount": distribution.amount.to_string(),
        "transferred": distribution.transferred().to_string(),
        "retained": distribution.retained().to_string(),
        "settlements": settlements,
    })
}
