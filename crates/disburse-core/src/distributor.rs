//! Entry points.
//!
//! [`Distributor`] owns the complete engine state. Every mutating call runs
//! against a staged copy of that state: checks and ledger effects are applied
//! to the copy, the resulting transfers are submitted to the asset ledger as
//! one batch, and only if the batch succeeds is the copy committed together
//! with the call's events. Any failure leaves the engine exactly as it was.
//!
//! Calls take `&mut self`, so an asset ledger cannot reach back into the
//! engine while a batch executes.

use disburse_types::{Address, Amount, Category, DistributorEvent, Role};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::asset::{AssetLedger, Transfer};
use crate::auth::AuthorizationGuard;
use crate::executor::{self, Distribution};
use crate::registry::RoleRegistry;
use crate::retention::RetentionLedger;
use crate::{DistributorError, Result};

/// Construction parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// Becomes owner and operator.
    pub deployer: Address,
    /// Identifier of the distributed asset.
    pub asset: Address,
    /// Pre-approved account every distribution and withdrawal is paid from.
    pub funding_source: Address,
    /// The engine's own account; source of emergency recoveries.
    pub custody: Address,
}

/// Complete engine state; the unit of persistence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorState {
    guard: AuthorizationGuard,
    registry: RoleRegistry,
    retention: RetentionLedger,
    funding_source: Address,
    asset: Address,
    custody: Address,
}

impl DistributorState {
    /// Reassemble state loaded from storage.
    pub fn from_parts(
        guard: AuthorizationGuard,
        registry: RoleRegistry,
        retention: RetentionLedger,
        funding_source: Address,
        asset: Address,
        custody: Address,
    ) -> Self {
        Self {
            guard,
            registry,
            retention,
            funding_source,
            asset,
            custody,
        }
    }

    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn retention(&self) -> &RetentionLedger {
        &self.retention
    }

    pub fn funding_source(&self) -> Address {
        self.funding_source
    }

    pub fn asset(&self) -> Address {
        self.asset
    }

    pub fn custody(&self) -> Address {
        self.custody
    }
}

/// Amounts for [`Distributor::add_multiple_incomes`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeBatch {
    pub proxy: Amount,
    pub standard: Amount,
    pub extra: Amount,
    pub natural: Amount,
    pub base: Amount,
}

impl IncomeBatch {
    /// `(category, amount)` pairs in fixed processing order.
    pub fn entries(&self) -> [(Category, Amount); 5] {
        [
            (Category::Proxy, self.proxy),
            (Category::Standard, self.standard),
            (Category::Extra, self.extra),
            (Category::Natural, self.natural),
            (Category::Base, self.base),
        ]
    }
}

/// Result of a batch call: one distribution per non-zero category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub distributions: Vec<Distribution>,
}

impl BatchReceipt {
    /// Distribution for `category`, if it was processed.
    pub fn get(&self, category: Category) -> Option<&Distribution> {
        self.distributions.iter().find(|d| d.category == category)
    }
}

/// Working copy for one call.
struct Staged {
    state: DistributorState,
    asset: Address,
    transfers: Vec<Transfer>,
    events: Vec<DistributorEvent>,
}

/// The revenue distribution engine.
#[derive(Clone, Debug)]
pub struct Distributor {
    state: DistributorState,
    events: Vec<DistributorEvent>,
}

impl Distributor {
    /// Fresh engine: deployer is owner and operator, all roles unset.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::InvalidAddress`] if any configured address is null
    pub fn new(config: DistributorConfig) -> Result<Self> {
        if config.asset.is_null() || config.funding_source.is_null() || config.custody.is_null() {
            return Err(DistributorError::InvalidAddress);
        }
        let state = DistributorState {
            guard: AuthorizationGuard::new(config.deployer)?,
            registry: RoleRegistry::new(),
            retention: RetentionLedger::new(),
            funding_source: config.funding_source,
            asset: config.asset,
            custody: config.custody,
        };
        info!(owner = %config.deployer, asset = %config.asset, "distributor created");
        Ok(Self::from_state(state))
    }

    /// Resume from persisted state.
    pub fn from_state(state: DistributorState) -> Self {
        Self {
            state,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &DistributorState {
        &self.state
    }

    pub fn into_state(self) -> DistributorState {
        self.state
    }

    /// Events committed since the last [`take_events`](Self::take_events).
    pub fn events(&self) -> &[DistributorEvent] {
        &self.events
    }

    /// Drain the committed events.
    pub fn take_events(&mut self) -> Vec<DistributorEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn owner(&self) -> Address {
        self.state.guard.owner()
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.state.guard.pending_owner()
    }

    pub fn operator(&self) -> Address {
        self.state.guard.operator()
    }

    pub fn paused(&self) -> bool {
        self.state.guard.is_paused()
    }

    pub fn role_address(&self, role: Role) -> Address {
        self.state.registry.get(role)
    }

    pub fn funding_source(&self) -> Address {
        self.state.funding_source
    }

    pub fn asset(&self) -> Address {
        self.state.asset
    }

    /// Retained balance withdrawable by `account`.
    pub fn retained_balance(&self, account: &Address) -> Amount {
        self.state.retention.balance_of(account)
    }

    /// Sum of all retained balances.
    pub fn total_retained(&self) -> Amount {
        self.state.retention.total()
    }

    /// The settlements a deposit would produce right now. Moves nothing.
    pub fn preview(&self, category: Category, amount: Amount) -> Result<Distribution> {
        executor::plan(&self.state.registry, category, amount)
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Bind `role` to `address`. The null sentinel disables the role,
    /// except for `Reserved`, which must stay valid.
    pub fn set_role_address(&mut self, caller: &Address, role: Role, address: Address) -> Result<()> {
        self.update("set_role_address", |state| {
            state.guard.require_owner(caller)?;
            let previous = state.registry.set(role, address)?;
            info!(%role, %previous, new = %address, "role address updated");
            Ok(DistributorEvent::RoleAddressUpdated {
                role,
                previous,
                new: address,
            })
        })
    }

    pub fn set_proxy_address(&mut self, caller: &Address, address: Address) -> Result<()> {
        self.set_role_address(caller, Role::Proxy, address)
    }

    pub fn set_a_role_address(&mut self, caller: &Address, address: Address) -> Result<()> {
        self.set_role_address(caller, Role::ARole, address)
    }

    pub fn set_b_role_address(&mut self, caller: &Address, address: Address) -> Result<()> {
        self.set_role_address(caller, Role::BRole, address)
    }

    pub fn set_c_role_address(&mut self, caller: &Address, address: Address) -> Result<()> {
        self.set_role_address(caller, Role::CRole, address)
    }

    pub fn set_partner_address(&mut self, caller: &Address, address: Address) -> Result<()> {
        self.set_role_address(caller, Role::Partner, address)
    }

    pub fn set_base_fee_address(&mut self, caller: &Address, address: Address) -> Result<()> {
        self.set_role_address(caller, Role::BaseFee, address)
    }

    pub fn set_reserved_address(&mut self, caller: &Address, address: Address) -> Result<()> {
        self.set_role_address(caller, Role::Reserved, address)
    }

    /// Replace the account distributions and withdrawals are paid from.
    pub fn set_funding_source(&mut self, caller: &Address, address: Address) -> Result<()> {
        self.update("set_funding_source", |state| {
            state.guard.require_owner(caller)?;
            if address.is_null() {
                return Err(DistributorError::InvalidAddress);
            }
            let previous = std::mem::replace(&mut state.funding_source, address);
            info!(%previous, new = %address, "funding source updated");
            Ok(DistributorEvent::FundingSourceUpdated {
                previous,
                new: address,
            })
        })
    }

    /// Replace the distributed asset identifier.
    pub fn set_asset(&mut self, caller: &Address, asset: Address) -> Result<()> {
        self.update("set_asset", |state| {
            state.guard.require_owner(caller)?;
            if asset.is_null() {
                return Err(DistributorError::InvalidAddress);
            }
            let previous = std::mem::replace(&mut state.asset, asset);
            info!(%previous, new = %asset, "asset updated");
            Ok(DistributorEvent::AssetUpdated {
                previous,
                new: asset,
            })
        })
    }

    pub fn set_operator(&mut self, caller: &Address, operator: Address) -> Result<()> {
        self.update("set_operator", |state| state.guard.set_operator(caller, operator))
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.update("transfer_ownership", |state| {
            state.guard.transfer_ownership(caller, new_owner)
        })
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> Result<()> {
        self.update("accept_ownership", |state| state.guard.accept_ownership(caller))
    }

    pub fn pause(&mut self, caller: &Address) -> Result<()> {
        self.update("pause", |state| state.guard.pause(caller))
    }

    pub fn unpause(&mut self, caller: &Address) -> Result<()> {
        self.update("unpause", |state| state.guard.unpause(caller))
    }

    // ------------------------------------------------------------------
    // Income
    // ------------------------------------------------------------------

    pub fn add_proxy_income<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
    ) -> Result<Distribution> {
        self.add_category_income(ledger, caller, Category::Proxy, amount)
    }

    pub fn add_standard_income<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
    ) -> Result<Distribution> {
        self.add_category_income(ledger, caller, Category::Standard, amount)
    }

    pub fn add_extra_income<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
    ) -> Result<Distribution> {
        self.add_category_income(ledger, caller, Category::Extra, amount)
    }

    pub fn add_natural_income<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
    ) -> Result<Distribution> {
        self.add_category_income(ledger, caller, Category::Natural, amount)
    }

    pub fn add_base_income<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
    ) -> Result<Distribution> {
        self.add_category_income(ledger, caller, Category::Base, amount)
    }

    /// Unified entry point keyed by the category's integer code.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::InvalidCategory`] if `code` is not `0..=4`
    /// - plus everything the single-category calls can return
    pub fn add_income<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        code: u8,
        amount: Amount,
    ) -> Result<Distribution> {
        self.commit(ledger, "add_income", |staged| {
            staged.state.guard.require_income_caller(caller)?;
            let category = Category::try_from(code)?;
            distribute_into(staged, category, amount)
        })
    }

    /// Distribute one income of `category`.
    pub fn add_category_income<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        category: Category,
        amount: Amount,
    ) -> Result<Distribution> {
        self.commit(ledger, category.as_str(), |staged| {
            staged.state.guard.require_income_caller(caller)?;
            distribute_into(staged, category, amount)
        })
    }

    /// Distribute several categories as one atomic unit.
    ///
    /// Categories are processed in fixed order; zero amounts are skipped
    /// without distribution or event.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::AllAmountsZero`] if every amount is zero
    /// - any failure of any category aborts the whole batch
    pub fn add_multiple_incomes<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        batch: IncomeBatch,
    ) -> Result<BatchReceipt> {
        self.commit(ledger, "add_multiple_incomes", |staged| {
            staged.state.guard.require_income_caller(caller)?;
            if batch.entries().iter().all(|(_, amount)| *amount == 0) {
                return Err(DistributorError::AllAmountsZero);
            }
            let mut receipt = BatchReceipt::default();
            for (category, amount) in batch.entries() {
                if amount == 0 {
                    continue;
                }
                receipt
                    .distributions
                    .push(distribute_into(staged, category, amount)?);
            }
            Ok(receipt)
        })
    }

    // ------------------------------------------------------------------
    // Withdrawal and recovery
    // ------------------------------------------------------------------

    /// Withdraw part of the caller's retained balance. Returns the balance
    /// left. Not gated by the pause flag.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::AmountMustBePositive`] if `amount` is zero
    /// - [`DistributorError::InsufficientBalance`] if `amount` exceeds the
    ///   caller's retained balance
    pub fn withdraw_balance<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
    ) -> Result<Amount> {
        self.commit(ledger, "withdraw_balance", |staged| {
            // Debit before the transfer is staged.
            let remaining = staged.state.retention.debit(*caller, amount)?;
            staged.transfers.push(Transfer {
                from: staged.state.funding_source,
                to: *caller,
                amount,
            });
            staged.events.push(DistributorEvent::BalanceWithdrawn {
                account: *caller,
                amount,
            });
            info!(account = %caller, %amount, %remaining, "retained balance withdrawn");
            Ok(remaining)
        })
    }

    /// Move `amount` of `asset` held in custody to the owner.
    ///
    /// For the distributed asset, when custody doubles as the funding source,
    /// the part backing retained balances cannot be recovered.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] if `caller` is not the owner
    /// - [`DistributorError::InvalidAddress`] if `asset` is null
    /// - [`DistributorError::AmountMustBePositive`] if `amount` is zero
    /// - [`DistributorError::ExceedsRecoverable`] if `amount` is larger than
    ///   the recoverable custody balance
    pub fn recover_asset<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        asset: Address,
        amount: Amount,
    ) -> Result<()> {
        self.state.guard.require_owner(caller)?;
        let custody = self.state.custody;
        let held = ledger.balance_of(&asset, &custody)?;
        self.commit(ledger, "recover_asset", |staged| {
            staged.state.guard.require_owner(caller)?;
            if asset.is_null() {
                return Err(DistributorError::InvalidAddress);
            }
            if amount == 0 {
                return Err(DistributorError::AmountMustBePositive);
            }
            let encumbered = if asset == staged.state.asset && custody == staged.state.funding_source
            {
                staged.state.retention.total()
            } else {
                0
            };
            let available = held.saturating_sub(encumbered);
            if amount > available {
                return Err(DistributorError::ExceedsRecoverable {
                    requested: amount,
                    available,
                });
            }
            let owner = staged.state.guard.owner();
            staged.asset = asset;
            staged.transfers.push(Transfer {
                from: custody,
                to: owner,
                amount,
            });
            staged.events.push(DistributorEvent::AssetRecovered {
                asset,
                to: owner,
                amount,
            });
            warn!(%asset, to = %owner, %amount, "asset recovered from custody");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Commit machinery
    // ------------------------------------------------------------------

    /// Run `f` against a staged copy, submit its transfers, then commit.
    fn commit<L, T, F>(&mut self, ledger: &mut L, op: &'static str, f: F) -> Result<T>
    where
        L: AssetLedger + ?Sized,
        F: FnOnce(&mut Staged) -> Result<T>,
    {
        let mut staged = Staged {
            state: self.state.clone(),
            asset: self.state.asset,
            transfers: Vec::new(),
            events: Vec::new(),
        };

        let output = f(&mut staged).inspect_err(|e| {
            warn!(op, error = %e, "call rejected");
        })?;

        if !staged.transfers.is_empty() {
            ledger
                .execute(&staged.asset, &staged.transfers)
                .inspect_err(|e| {
                    warn!(op, error = %e, transfers = staged.transfers.len(), "transfer batch failed; call aborted");
                })?;
        }

        self.state = staged.state;
        self.events.extend(staged.events);
        Ok(output)
    }

    /// Commit a ledger-free state change producing one event.
    fn update<F>(&mut self, op: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&mut DistributorState) -> Result<DistributorEvent>,
    {
        let mut state = self.state.clone();
        let event = f(&mut state).inspect_err(|e| {
            warn!(op, error = %e, "call rejected");
        })?;
        self.state = state;
        self.events.push(event);
        Ok(())
    }
}

/// Split, route and apply one deposit inside a staged call.
fn distribute_into(staged: &mut Staged, category: Category, amount: Amount) -> Result<Distribution> {
    let distribution = executor::plan(&staged.state.registry, category, amount)?;
    executor::apply(
        &distribution,
        &mut staged.state.retention,
        staged.state.funding_source,
        &mut staged.transfers,
    )?;
    staged
        .events
        .push(DistributorEvent::IncomeAdded { category, amount });
    info!(
        %category,
        %amount,
        transferred = %distribution.transferred(),
        retained = %distribution.retained(),
        "income distributed"
    );
    Ok(distribution)
}
