//! # disburse-core
//!
//! Revenue distribution and retention engine.
//!
//! Each income deposit is tagged with a [`Category`](disburse_types::Category)
//! and split among role-holding addresses. Portions whose role is unset are
//! credited to the retained balance of the `Reserved` address instead of
//! being transferred, so every unit deposited is either pushed out or
//! withdrawable later.
//!
//! ## Modules
//!
//! - [`asset`]: collaborator contract for the underlying asset ledger
//! - [`registry`]: role slot → address bindings
//! - [`retention`]: retained (withdrawable) balances
//! - [`auth`]: owner / operator / pending owner / pause gate
//! - [`policy`]: per-category split arithmetic
//! - [`executor`]: routes portions to transfers or retention credits
//! - [`distributor`]: entry points with all-or-nothing commit

pub mod asset;
pub mod auth;
pub mod distributor;
pub mod executor;
pub mod policy;
pub mod registry;
pub mod retention;

pub use asset::{AssetError, AssetLedger, MemoryAssetLedger, Transfer};
pub use distributor::{BatchReceipt, Distributor, DistributorConfig, DistributorState, IncomeBatch};
pub use executor::{Distribution, Route, Settlement};
pub use policy::Portion;

use disburse_types::{Amount, TypeError};

/// Error types for distribution operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributorError {
    /// Caller lacks the owner / operator / pending-owner privilege.
    #[error("unauthorized")]
    Unauthorized,

    /// Income-mutating call while paused.
    #[error("distribution is paused")]
    Paused,

    /// Null sentinel (or a self-referential value) where one is not allowed.
    #[error("invalid address")]
    InvalidAddress,

    /// Update would leave the value unchanged.
    #[error("value unchanged")]
    NoOp,

    /// Amount is zero.
    #[error("amount must be greater than 0")]
    AmountMustBePositive,

    /// Batch call with every amount zero.
    #[error("at least one amount must be greater than 0")]
    AllAmountsZero,

    /// Withdrawal exceeds the caller's retained balance.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The amount asked for.
        requested: Amount,
        /// The retained balance.
        available: Amount,
    },

    /// Category discriminant outside the enumerated range.
    #[error("invalid category: {0}")]
    InvalidCategory(u8),

    /// A portion needs the Reserved address but it was never configured.
    #[error("reserved address is not configured")]
    ReserveNotConfigured,

    /// Recovery would touch funds backing retained balances.
    #[error("recovery exceeds recoverable amount: requested {requested}, available {available}")]
    ExceedsRecoverable {
        /// The amount asked for.
        requested: Amount,
        /// What may be recovered without touching retained funds.
        available: Amount,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in distribution")]
    Overflow,

    /// The asset ledger rejected the transfer batch.
    #[error("transfer failed: {0}")]
    Transfer(#[from] AssetError),
}

impl From<TypeError> for DistributorError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidCategory(code) => DistributorError::InvalidCategory(code),
            TypeError::InvalidAddress(_) | TypeError::UnknownRole(_) => {
                DistributorError::InvalidAddress
            }
        }
    }
}

/// Convenience result type for distribution operations.
pub type Result<T> = std::result::Result<T, DistributorError>;
