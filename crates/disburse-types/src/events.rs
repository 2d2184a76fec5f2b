//! Events emitted by the distribution engine.
//!
//! Events are buffered per call and only released once the call commits;
//! a failed call emits nothing. Amounts serialize as decimal strings so
//! that values above `u64::MAX` survive JSON transports.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{Address, Amount, Category, Role};

/// A committed state change.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DistributorEvent {
    /// An income deposit of `category` was fully distributed.
    IncomeAdded {
        category: Category,
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
    OperatorUpdated {
        previous: Address,
        new: Address,
    },
    RoleAddressUpdated {
        role: Role,
        previous: Address,
        new: Address,
    },
    OwnershipTransferStarted {
        owner: Address,
        pending_owner: Address,
    },
    OwnershipTransferred {
        previous: Address,
        new: Address,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
    FundingSourceUpdated {
        previous: Address,
        new: Address,
    },
    AssetUpdated {
        previous: Address,
        new: Address,
    },
    BalanceWithdrawn {
        account: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
    AssetRecovered {
        asset: Address,
        to: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
}

impl DistributorEvent {
    /// Event name as written to the event log.
    pub fn name(&self) -> &'static str {
        match self {
            DistributorEvent::IncomeAdded { .. } => "income_added",
            DistributorEvent::OperatorUpdated { .. } => "operator_updated",
            DistributorEvent::RoleAddressUpdated { .. } => "role_address_updated",
            DistributorEvent::OwnershipTransferStarted { .. } => "ownership_transfer_started",
            DistributorEvent::OwnershipTransferred { .. } => "ownership_transferred",
            DistributorEvent::Paused { .. } => "paused",
            DistributorEvent::Unpaused { .. } => "unpaused",
            DistributorEvent::FundingSourceUpdated { .. } => "funding_source_updated",
            DistributorEvent::AssetUpdated { .. } => "asset_updated",
            DistributorEvent::BalanceWithdrawn { .. } => "balance_withdrawn",
            DistributorEvent::AssetRecovered { .. } => "asset_recovered",
        }
    }
}
