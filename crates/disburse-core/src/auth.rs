//! Authorization guard.
//!
//! Tracks the owner, the optional pending owner of a two-step transfer, the
//! operator and the pause flag. Owner and operator may both add income; only
//! the owner administers. The pause flag gates income-mutating calls only,
//! never withdrawals or administration.

use disburse_types::{Address, DistributorEvent};
use serde::{Deserialize, Serialize};

use crate::{DistributorError, Result};

/// Owner / operator / pause state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGuard {
    owner: Address,
    pending_owner: Option<Address>,
    operator: Address,
    paused: bool,
}

impl AuthorizationGuard {
    /// The deployer becomes both owner and operator.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::InvalidAddress`] if `deployer` is the null sentinel
    pub fn new(deployer: Address) -> Result<Self> {
        if deployer.is_null() {
            return Err(DistributorError::InvalidAddress);
        }
        Ok(Self {
            owner: deployer,
            pending_owner: None,
            operator: deployer,
            paused: false,
        })
    }

    /// Rebuild a guard from persisted fields.
    pub fn restore(
        owner: Address,
        pending_owner: Option<Address>,
        operator: Address,
        paused: bool,
    ) -> Self {
        Self {
            owner,
            pending_owner,
            operator,
            paused,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.pending_owner
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Caller must be the owner.
    pub fn require_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(DistributorError::Unauthorized);
        }
        Ok(())
    }

    /// Caller must be the operator or the owner.
    pub fn require_operator_or_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.operator && *caller != self.owner {
            return Err(DistributorError::Unauthorized);
        }
        Ok(())
    }

    /// Fails with [`DistributorError::Paused`] while paused.
    pub fn require_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(DistributorError::Paused);
        }
        Ok(())
    }

    /// Combined gate for every income-mutating entry point.
    pub fn require_income_caller(&self, caller: &Address) -> Result<()> {
        self.require_operator_or_owner(caller)?;
        self.require_not_paused()
    }

    /// Step one of an ownership transfer: record `new_owner` as pending.
    ///
    /// A second call replaces the pending owner.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] if `caller` is not the owner
    /// - [`DistributorError::InvalidAddress`] if `new_owner` is null or the
    ///   current owner
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<DistributorEvent> {
        self.require_owner(caller)?;
        if new_owner.is_null() || new_owner == self.owner {
            return Err(DistributorError::InvalidAddress);
        }
        self.pending_owner = Some(new_owner);
        tracing::info!(owner = %self.owner, pending = %new_owner, "ownership transfer started");
        Ok(DistributorEvent::OwnershipTransferStarted {
            owner: self.owner,
            pending_owner: new_owner,
        })
    }

    /// Step two: the pending owner takes over.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] unless `caller` is the pending owner
    pub fn accept_ownership(&mut self, caller: &Address) -> Result<DistributorEvent> {
        match self.pending_owner {
            Some(pending) if pending == *caller => {
                let previous = std::mem::replace(&mut self.owner, pending);
                self.pending_owner = None;
                tracing::info!(%previous, new = %pending, "ownership transferred");
                Ok(DistributorEvent::OwnershipTransferred {
                    previous,
                    new: pending,
                })
            }
            _ => Err(DistributorError::Unauthorized),
        }
    }

    /// Replace the operator.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] if `caller` is not the owner
    /// - [`DistributorError::InvalidAddress`] if `new_operator` is null
    /// - [`DistributorError::NoOp`] if `new_operator` is already the operator
    pub fn set_operator(
        &mut self,
        caller: &Address,
        new_operator: Address,
    ) -> Result<DistributorEvent> {
        self.require_owner(caller)?;
        if new_operator.is_null() {
            return Err(DistributorError::InvalidAddress);
        }
        if new_operator == self.operator {
            return Err(DistributorError::NoOp);
        }
        let previous = std::mem::replace(&mut self.operator, new_operator);
        tracing::info!(%previous, new = %new_operator, "operator updated");
        Ok(DistributorEvent::OperatorUpdated {
            previous,
            new: new_operator,
        })
    }

    /// Set the pause flag.
    pub fn pause(&mut self, caller: &Address) -> Result<DistributorEvent> {
        self.require_owner(caller)?;
        if self.paused {
            return Err(DistributorError::NoOp);
        }
        self.paused = true;
        tracing::warn!(by = %caller, "distribution paused");
        Ok(DistributorEvent::Paused { by: *caller })
    }

    /// Clear the pause flag.
    pub fn unpause(&mut self, caller: &Address) -> Result<DistributorEvent> {
        self.require_owner(caller)?;
        if !self.paused {
            return Err(DistributorError::NoOp);
        }
        self.paused = false;
        tracing::info!(by = %caller, "distribution unpaused");
        Ok(DistributorEvent::Unpaused { by: *caller })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address::from_low_u64(1);
    const OPERATOR: Address = Address::from_low_u64(2);
    const STRANGER: Address = Address::from_low_u64(3);

    fn guard() -> AuthorizationGuard {
        AuthorizationGuard::new(OWNER).expect("guard")
    }

    #[test]
    fn test_deployer_is_owner_and_operator() {
        let g = guard();
        assert_eq!(g.owner(), OWNER);
        assert_eq!(g.operator(), OWNER);
        assert_eq!(g.pending_owner(), None);
        assert!(!g.is_paused());
        assert!(AuthorizationGuard::new(Address::NULL).is_err());
    }

    #[test]
    fn test_operator_gate() {
        let mut g = guard();
        g.set_operator(&OWNER, OPERATOR).expect("set operator");
        g.require_operator_or_owner(&OWNER).expect("owner allowed");
        g.require_operator_or_owner(&OPERATOR).expect("operator allowed");
        assert_eq!(
            g.require_operator_or_owner(&STRANGER),
            Err(DistributorError::Unauthorized)
        );
        // Operator is not an administrator.
        assert_eq!(g.require_owner(&OPERATOR), Err(DistributorError::Unauthorized));
    }

    #[test]
    fn test_set_operator_validation() {
        let mut g = guard();
        assert_eq!(
            g.set_operator(&STRANGER, OPERATOR),
            Err(DistributorError::Unauthorized)
        );
        assert_eq!(
            g.set_operator(&OWNER, Address::NULL),
            Err(DistributorError::InvalidAddress)
        );
        assert_eq!(g.set_operator(&OWNER, OWNER), Err(DistributorError::NoOp));
        assert_eq!(
            g.set_operator(&OWNER, OPERATOR).expect("set"),
            DistributorEvent::OperatorUpdated {
                previous: OWNER,
                new: OPERATOR
            }
        );
    }

    #[test]
    fn test_two_step_ownership() {
        let mut g = guard();
        g.transfer_ownership(&OWNER, OPERATOR).expect("start");
        assert_eq!(g.owner(), OWNER);
        assert_eq!(g.pending_owner(), Some(OPERATOR));

        assert_eq!(g.accept_ownership(&STRANGER), Err(DistributorError::Unauthorized));
        assert_eq!(g.accept_ownership(&OWNER), Err(DistributorError::Unauthorized));

        g.accept_ownership(&OPERATOR).expect("accept");
        assert_eq!(g.owner(), OPERATOR);
        assert_eq!(g.pending_owner(), None);
        // Old owner lost its privileges.
        assert_eq!(g.require_owner(&OWNER), Err(DistributorError::Unauthorized));
    }

    #[test]
    fn test_transfer_ownership_validation() {
        let mut g = guard();
        assert_eq!(
            g.transfer_ownership(&STRANGER, STRANGER),
            Err(DistributorError::Unauthorized)
        );
        assert_eq!(
            g.transfer_ownership(&OWNER, Address::NULL),
            Err(DistributorError::InvalidAddress)
        );
        assert_eq!(
            g.transfer_ownership(&OWNER, OWNER),
            Err(DistributorError::InvalidAddress)
        );
        assert_eq!(g.accept_ownership(&OWNER), Err(DistributorError::Unauthorized));
    }

    #[test]
    fn test_pause_gate() {
        let mut g = guard();
        assert_eq!(g.pause(&STRANGER), Err(DistributorError::Unauthorized));
        g.pause(&OWNER).expect("pause");
        assert_eq!(g.require_income_caller(&OWNER), Err(DistributorError::Paused));
        // Authorization is checked before the pause flag.
        assert_eq!(
            g.require_income_caller(&STRANGER),
            Err(DistributorError::Unauthorized)
        );
        assert_eq!(g.pause(&OWNER), Err(DistributorError::NoOp));
        g.unpause(&OWNER).expect("unpause");
        g.require_income_caller(&OWNER).expect("unpaused");
    }
}
