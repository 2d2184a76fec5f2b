//! Role registry.
//!
//! Every [`Role`] maps to exactly one address. Writing the null sentinel is
//! how a recipient slot is disabled: its portions are then retained instead
//! of transferred. Validity is checked at distribution time, not here. The
//! one exception is `Reserved`, the retention sink, which may never be set
//! back to null once the engine is running.

use disburse_types::role::ROLE_COUNT;
use disburse_types::{Address, Role};
use serde::{Deserialize, Serialize};

use crate::{DistributorError, Result};

/// Current address of each role slot. All slots start unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistry {
    slots: [Address; ROLE_COUNT],
}

impl RoleRegistry {
    /// Registry with every role unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Address currently bound to `role` (possibly the null sentinel).
    pub fn get(&self, role: Role) -> Address {
        self.slots[role.index()]
    }

    /// Bind `role` to `address`, returning the previous binding.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::InvalidAddress`] if `role` is `Reserved` and
    ///   `address` is the null sentinel
    pub fn set(&mut self, role: Role, address: Address) -> Result<Address> {
        if role == Role::Reserved && address.is_null() {
            return Err(DistributorError::InvalidAddress);
        }
        let previous = std::mem::replace(&mut self.slots[role.index()], address);
        Ok(previous)
    }

    /// `Some(address)` if `role` is bound to a valid address.
    pub fn resolve(&self, role: Role) -> Option<Address> {
        self.get(role).valid()
    }

    /// Address that receives retention credits, if configured.
    pub fn reserve(&self) -> Option<Address> {
        self.resolve(Role::Reserved)
    }

    /// All `(role, address)` bindings in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, Address)> + '_ {
        Role::ALL.into_iter().map(move |role| (role, self.get(role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unset() {
        let registry = RoleRegistry::new();
        for (_, address) in registry.iter() {
            assert!(address.is_null());
        }
        assert_eq!(registry.reserve(), None);
    }

    #[test]
    fn test_set_returns_previous() {
        let mut registry = RoleRegistry::new();
        let a = Address::from_low_u64(10);
        let b = Address::from_low_u64(11);
        assert_eq!(registry.set(Role::Partner, a).expect("set"), Address::NULL);
        assert_eq!(registry.set(Role::Partner, b).expect("set"), a);
        assert_eq!(registry.resolve(Role::Partner), Some(b));
    }

    #[test]
    fn test_null_disables_slot() {
        let mut registry = RoleRegistry::new();
        registry
            .set(Role::BRole, Address::from_low_u64(3))
            .expect("set");
        registry.set(Role::BRole, Address::NULL).expect("disable");
        assert_eq!(registry.resolve(Role::BRole), None);
    }

    #[test]
    fn test_reserved_rejects_null() {
        let mut registry = RoleRegistry::new();
        assert_eq!(
            registry.set(Role::Reserved, Address::NULL),
            Err(DistributorError::InvalidAddress)
        );
    }

    #[test]
    fn test_roles_may_share_address() {
        let mut registry = RoleRegistry::new();
        let shared = Address::from_low_u64(42);
        registry.set(Role::ARole, shared).expect("set a");
        registry.set(Role::CRole, shared).expect("set c");
        assert_eq!(registry.get(Role::ARole), registry.get(Role::CRole));
    }
}
