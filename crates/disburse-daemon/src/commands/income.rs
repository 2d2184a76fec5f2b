//! Income deposit command handlers.

use std::sync::Arc;

use disburse_core::IncomeBatch;
use disburse_types::{Amount, Category};
use serde_json::Value;

use super::{address_param, amount_param, distribution_json, optional_amount_param};
use crate::engine;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Distribute one deposit of a fixed category.
async fn add_category_income(state: &Arc<DaemonState>, params: &Value, category: Category) -> Result {
    let caller = address_param(params, "caller")?;
    let amount = amount_param(params, "amount")?;

    let distribution = engine::execute(state, |distributor, ledger| {
        distributor.add_category_income(ledger, &caller, category, amount)
    })
    .await?;

    Ok(distribution_json(&distribution))
}

pub async fn add_proxy_income(state: &Arc<DaemonState>, params: &Value) -> Result {
    add_category_income(state, params, Category::Proxy).await
}

pub async fn add_standard_income(state: &Arc<DaemonState>, params: &Value) -> Result {
    add_category_income(state, params, Category::Standard).await
}

pub async fn add_extra_income(state: &Arc<DaemonState>, params: &Value) -> Result {
    add_category_income(state, params, Category::Extra).await
}

pub async fn add_natural_income(state: &Arc<DaemonState>, params: &Value) -> Result {
    add_category_income(state, params, Category::Natural).await
}

pub async fn add_base_income(state: &Arc<DaemonState>, params: &Value) -> Result {
    add_category_income(state, params, Category::Base).await
}

/// Distribute one deposit keyed by integer category code.
///
/// An out-of-range code is an engine error (`INVALID_CATEGORY`), not a
/// parameter error, so it is reported after the caller checks.
pub async fn add_income(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let code = params
        .get("category")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("category required"))?;
    let amount = amount_param(params, "amount")?;

    let Ok(narrow) = u8::try_from(code) else {
        engine::read(state, |_, distributor| {
            distributor
                .state()
                .guard()
                .require_income_caller(&caller)
                .map_err(|e| RpcError::engine(&e))
        })
        .await?;
        return Err(RpcError::invalid_category(code));
    };

    let distribution = engine::execute(state, |distributor, ledger| {
        distributor.add_income(ledger, &caller, narrow, amount)
    })
    .await?;

    Ok(distribution_json(&distribution))
}

/// Distribute several categories atomically. Omitted categories count as 0.
pub async fn add_multiple_incomes(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let amount = |key: &str| -> std::result::Result<Amount, RpcError> {
        Ok(optional_amount_param(params, key)?.unwrap_or(0))
    };
    let batch = IncomeBatch {
        proxy: amount("proxy")?,
        standard: amount("standard")?,
        extra: amount("extra")?,
        natural: amount("natural")?,
        base: amount("base")?,
    };

    let receipt = engine::execute(state, |distributor, ledger| {
        distributor.add_multiple_incomes(ledger, &caller, batch)
    })
    .await?;

    let distributions: Vec<Value> = receipt.distributions.iter().map(distribution_json).collect();
    Ok(serde_json::json!({ "distributions": distributions }))
}

/// Compute a split against the current role bindings without moving funds.
pub async fn preview_income(state: &Arc<DaemonState>, params: &Value) -> Result {
    let code = params
        .get("category")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("category required"))?;
    let category = u8::try_from(code)
        .ok()
        .and_then(|c| Category::try_from(c).ok())
        .ok_or_else(|| RpcError::invalid_params(&format!("unknown category {code}")))?;
    let amount = amount_param(params, "amount")?;

    engine::read(state, |_, distributor| {
        distributor
            .preview(category, amount)
            .map(|d| distribution_json(&d))
            .map_err(|e| RpcError::engine(&e))
    })
    .await
}
