//! # disburse-types
//!
//! Shared domain types used across the disburse workspace: account
//! addresses, recipient roles, income categories and the events the
//! distribution engine emits.

pub mod address;
pub mod category;
pub mod events;
pub mod role;

pub use address::Address;
pub use category::Category;
pub use events::DistributorEvent;
pub use role::Role;

/// Quantity of the distributed asset, in its smallest unit.
pub type Amount = u128;

/// Denominator of every split percentage.
pub const PERCENT_DENOMINATOR: Amount = 100;

/// Errors raised while parsing domain types from external input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// Address text is not 20 hex-encoded bytes.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Category discriminant outside the enumerated range.
    #[error("invalid category: {0}")]
    InvalidCategory(u8),

    /// Unknown role name.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}
