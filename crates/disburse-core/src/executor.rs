//! Distribution executor.
//!
//! Routing happens in two phases so that ledger effects are settled before
//! any transfer is issued:
//!
//! 1. [`route`] resolves each non-zero portion against the role registry
//!    (pure; also backs previews).
//! 2. [`apply`] credits retained portions to the retention ledger and stages
//!    direct transfers for the caller to submit as one batch.

use disburse_types::{Address, Amount, Category};
use serde::{Deserialize, Serialize};

use crate::asset::Transfer;
use crate::policy::{self, Portion};
use crate::registry::RoleRegistry;
use crate::retention::RetentionLedger;
use crate::{DistributorError, Result};

/// How a portion reaches its recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Pushed from the funding source to the role's address.
    Transferred,
    /// Credited to the Reserved address's retained balance.
    Retained,
}

/// A routed portion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub role: disburse_types::Role,
    /// Transfer target, or the Reserved address for retained portions.
    pub recipient: Address,
    pub amount: Amount,
    pub route: Route,
}

/// Receipt for one distributed deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub category: Category,
    pub amount: Amount,
    /// One entry per non-zero portion, in split order.
    pub settlements: Vec<Settlement>,
}

impl Distribution {
    /// Sum of the retained settlements.
    pub fn retained(&self) -> Amount {
        self.settlements
            .iter()
            .filter(|s| s.route == Route::Retained)
            .map(|s| s.amount)
            .sum()
    }

    /// Sum of the transferred settlements.
    pub fn transferred(&self) -> Amount {
        self.settlements
            .iter()
            .filter(|s| s.route == Route::Transferred)
            .map(|s| s.amount)
            .sum()
    }
}

/// Resolve `portions` against `registry`. Zero portions are dropped.
///
/// # Errors
///
/// - [`DistributorError::ReserveNotConfigured`] if a portion must be
///   retained (or is owed to `Reserved`) while `Reserved` is unset
pub fn route(registry: &RoleRegistry, portions: &[Portion]) -> Result<Vec<Settlement>> {
    let mut settlements = Vec::with_capacity(portions.len());
    for portion in portions.iter().filter(|p| p.amount > 0) {
        let settlement = match registry.resolve(portion.role) {
            Some(recipient) => Settlement {
                role: portion.role,
                recipient,
                amount: portion.amount,
                route: Route::Transferred,
            },
            None => Settlement {
                role: portion.role,
                recipient: registry
                    .reserve()
                    .ok_or(DistributorError::ReserveNotConfigured)?,
                amount: portion.amount,
                route: Route::Retained,
            },
        };
        settlements.push(settlement);
    }
    Ok(settlements)
}

/// Compute and route a deposit without side effects.
pub fn plan(registry: &RoleRegistry, category: Category, amount: Amount) -> Result<Distribution> {
    let portions = policy::split(category, amount)?;
    Ok(Distribution {
        category,
        amount,
        settlements: route(registry, &portions)?,
    })
}

/// Credit retained settlements and stage transfers from `funding_source`.
pub fn apply(
    distribution: &Distribution,
    retention: &mut RetentionLedger,
    funding_source: Address,
    transfers: &mut Vec<Transfer>,
) -> Result<()> {
    for s in &distribution.settlements {
        match s.route {
            Route::Retained => {
                let balance = retention.credit(s.recipient, s.amount)?;
                tracing::debug!(
                    role = %s.role,
                    beneficiary = %s.recipient,
                    amount = %s.amount,
                    balance = %balance,
                    "portion retained"
                );
            }
            Route::Transferred => {
                tracing::debug!(
                    role = %s.role,
                    to = %s.recipient,
                    amount = %s.amount,
                    "portion staged for transfer"
                );
                transfers.push(Transfer {
                    from: funding_source,
                    to: s.recipient,
                    amount: s.amount,
                });
            }
        }
    }
    Ok(())
}
