//! Recipient roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypeError;

/// Number of role slots.
pub const ROLE_COUNT: usize = 7;

/// A named recipient slot bound to one address in the role registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Proxy,
    ARole,
    BRole,
    CRole,
    Partner,
    BaseFee,
    /// Retention sink; unroutable portions are credited to its address.
    Reserved,
}

impl Role {
    /// Every role, in registry order.
    pub const ALL: [Role; ROLE_COUNT] = [
        Role::Proxy,
        Role::ARole,
        Role::BRole,
        Role::CRole,
        Role::Partner,
        Role::BaseFee,
        Role::Reserved,
    ];

    /// Stable snake_case name used in config files, RPC and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Proxy => "proxy",
            Role::ARole => "a_role",
            Role::BRole => "b_role",
            Role::CRole => "c_role",
            Role::Partner => "partner",
            Role::BaseFee => "base_fee",
            Role::Reserved => "reserved",
        }
    }

    /// Position in [`Role::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| TypeError::UnknownRole(s.to_string()))
    }
}
