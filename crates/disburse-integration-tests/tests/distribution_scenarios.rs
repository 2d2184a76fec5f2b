//! Integration test: end-to-end distribution scenarios.
//!
//! Drives the engine through the in-memory asset ledger:
//! 1. Standard split with every role configured
//! 2. Standard split with a disabled role
//! 3. Batch ordering and skipped categories
//! 4. Empty batch rejection
//! 5. Two-step ownership handover
//! 6. Access control and the pause gate
//! 7. Retention withdrawal round trip

use disburse_core::{
    Distributor, DistributorConfig, DistributorError, IncomeBatch, MemoryAssetLedger, Route,
};
use disburse_types::{Address, Amount, Category, DistributorEvent, Role};

const OWNER: Address = Address::from_low_u64(0x100);
const OPERATOR: Address = Address::from_low_u64(0x101);
const STRANGER: Address = Address::from_low_u64(0x102);
const NEW_OWNER: Address = Address::from_low_u64(0x103);
const ASSET: Address = Address::from_low_u64(0xa55e7);
const POOL: Address = Address::from_low_u64(0x9001);
const CUSTODY: Address = Address::from_low_u64(0x9002);

const PROXY: Address = Address::from_low_u64(1);
const A: Address = Address::from_low_u64(2);
const B: Address = Address::from_low_u64(3);
const C: Address = Address::from_low_u64(4);
const PARTNER: Address = Address::from_low_u64(5);
const BASE_FEE: Address = Address::from_low_u64(6);
const RESERVE: Address = Address::from_low_u64(7);

const POOL_FUNDS: Amount = 1_000_000_000_000_000_000_000;

/// Helper: engine with every role bound and a funded pool.
fn configured_engine() -> (Distributor, MemoryAssetLedger) {
    let mut engine = Distributor::new(DistributorConfig {
        deployer: OWNER,
        asset: ASSET,
        funding_source: POOL,
        custody: CUSTODY,
    })
    .expect("engine should be created");

    for (role, address) in [
        (Role::Proxy, PROXY),
        (Role::ARole, A),
        (Role::BRole, B),
        (Role::CRole, C),
        (Role::Partner, PARTNER),
        (Role::BaseFee, BASE_FEE),
        (Role::Reserved, RESERVE),
    ] {
        engine
            .set_role_address(&OWNER, role, address)
            .expect("owner may bind roles");
    }
    engine
        .set_operator(&OWNER, OPERATOR)
        .expect("owner may set operator");
    engine.take_events();

    let mut ledger = MemoryAssetLedger::new();
    ledger.mint(ASSET, POOL, POOL_FUNDS);
    (engine, ledger)
}

#[test]
fn standard_split_all_roles_configured() {
    let (mut engine, mut ledger) = configured_engine();

    let distribution = engine
        .add_standard_income(&mut ledger, &OPERATOR, 1000)
        .expect("standard income should distribute");

    assert_eq!(ledger.balance(&ASSET, &A), 300);
    assert_eq!(ledger.balance(&ASSET, &B), 300);
    assert_eq!(ledger.balance(&ASSET, &C), 400);
    assert_eq!(ledger.balance(&ASSET, &POOL), POOL_FUNDS - 1000);
    assert_eq!(distribution.transferred(), 1000);
    assert_eq!(engine.total_retained(), 0);
    assert_eq!(
        engine.events(),
        &[DistributorEvent::IncomeAdded {
            category: Category::Standard,
            amount: 1000,
        }]
    );
}

#[test]
fn standard_split_with_disabled_role() {
    let (mut engine, mut ledger) = configured_engine();
    engine
        .set_b_role_address(&OWNER, Address::NULL)
        .expect("null disables a role");

    let distribution = engine
        .add_standard_income(&mut ledger, &OPERATOR, 1000)
        .expect("standard income should distribute");

    assert_eq!(ledger.balance(&ASSET, &A), 300);
    assert_eq!(ledger.balance(&ASSET, &B), 0);
    assert_eq!(ledger.balance(&ASSET, &C), 400);
    assert_eq!(engine.retained_balance(&RESERVE), 300);
    assert_eq!(distribution.retained(), 300);

    // The retained portion stays in the funding source.
    assert_eq!(ledger.balance(&ASSET, &POOL), POOL_FUNDS - 700);

    let retained: Vec<_> = distribution
        .settlements
        .iter()
        .filter(|s| s.route == Route::Retained)
        .collect();
    assert_eq!(retained.len(), 1);
    assert_eq!(retained[0].role, Role::BRole);
    assert_eq!(retained[0].recipient, RESERVE);
}

#[test]
fn batch_emits_one_event_per_nonzero_category_in_order() {
    let (mut engine, mut ledger) = configured_engine();

    let receipt = engine
        .add_multiple_incomes(
            &mut ledger,
            &OWNER,
            IncomeBatch {
                proxy: 100,
                standard: 0,
                extra: 300,
                natural: 0,
                base: 500,
            },
        )
        .expect("batch should distribute");

    assert_eq!(
        engine.events(),
        &[
            DistributorEvent::IncomeAdded {
                category: Category::Proxy,
                amount: 100,
            },
            DistributorEvent::IncomeAdded {
                category: Category::Extra,
                amount: 300,
            },
            DistributorEvent::IncomeAdded {
                category: Category::Base,
                amount: 500,
            },
        ]
    );
    assert_eq!(receipt.distributions.len(), 3);
    assert!(receipt.get(Category::Standard).is_none());
    assert!(receipt.get(Category::Natural).is_none());

    assert_eq!(ledger.balance(&ASSET, &PROXY), 100);
    assert_eq!(ledger.balance(&ASSET, &PARTNER), 210);
    assert_eq!(ledger.balance(&ASSET, &RESERVE), 90);
    assert_eq!(ledger.balance(&ASSET, &BASE_FEE), 500);
    assert_eq!(ledger.balance(&ASSET, &A), 0);
}

#[test]
fn empty_batch_is_rejected() {
    let (mut engine, mut ledger) = configured_engine();

    let result = engine.add_multiple_incomes(&mut ledger, &OWNER, IncomeBatch::default());

    assert_eq!(result, Err(DistributorError::AllAmountsZero));
    assert!(engine.events().is_empty());
    assert_eq!(ledger.balance(&ASSET, &POOL), POOL_FUNDS);
}

#[test]
fn batch_failure_leaves_no_partial_effect() {
    let (mut engine, mut ledger) = configured_engine();
    engine
        .set_proxy_address(&OWNER, Address::NULL)
        .expect("disable proxy");
    engine.take_events();
    ledger.block(BASE_FEE);

    let result = engine.add_multiple_incomes(
        &mut ledger,
        &OWNER,
        IncomeBatch {
            proxy: 100,
            standard: 1000,
            extra: 0,
            natural: 0,
            base: 50,
        },
    );

    assert!(matches!(result, Err(DistributorError::Transfer(_))));
    assert!(engine.events().is_empty());
    assert_eq!(engine.retained_balance(&RESERVE), 0);
    assert_eq!(ledger.balance(&ASSET, &A), 0);
    assert_eq!(ledger.balance(&ASSET, &POOL), POOL_FUNDS);
}

#[test]
fn two_step_ownership_handover() {
    let (mut engine, _ledger) = configured_engine();

    engine
        .transfer_ownership(&OWNER, NEW_OWNER)
        .expect("owner starts transfer");
    assert_eq!(engine.owner(), OWNER);
    assert_eq!(engine.pending_owner(), Some(NEW_OWNER));

    assert_eq!(
        engine.accept_ownership(&STRANGER),
        Err(DistributorError::Unauthorized)
    );
    assert_eq!(engine.owner(), OWNER);

    engine
        .accept_ownership(&NEW_OWNER)
        .expect("pending owner accepts");
    assert_eq!(engine.owner(), NEW_OWNER);
    assert_eq!(engine.pending_owner(), None);

    // The previous owner lost admin rights.
    assert_eq!(
        engine.set_a_role_address(&OWNER, STRANGER),
        Err(DistributorError::Unauthorized)
    );
    engine
        .set_a_role_address(&NEW_OWNER, STRANGER)
        .expect("new owner administers roles");
}

#[test]
fn access_control_and_pause_gate() {
    let (mut engine, mut ledger) = configured_engine();

    for category in Category::ALL {
        assert_eq!(
            engine.add_category_income(&mut ledger, &STRANGER, category, 10),
            Err(DistributorError::Unauthorized)
        );
    }
    assert_eq!(
        engine.set_operator(&OPERATOR, STRANGER),
        Err(DistributorError::Unauthorized)
    );
    assert_eq!(engine.pause(&STRANGER), Err(DistributorError::Unauthorized));

    engine.pause(&OWNER).expect("owner pauses");
    assert!(engine.paused());
    for category in Category::ALL {
        assert_eq!(
            engine.add_category_income(&mut ledger, &OPERATOR, category, 10),
            Err(DistributorError::Paused)
        );
    }
    assert_eq!(
        engine.add_income(&mut ledger, &OWNER, Category::Base.code(), 10),
        Err(DistributorError::Paused)
    );
    assert_eq!(
        engine.add_multiple_incomes(
            &mut ledger,
            &OWNER,
            IncomeBatch {
                base: 10,
                ..IncomeBatch::default()
            },
        ),
        Err(DistributorError::Paused)
    );

    // Administration stays available while paused.
    engine
        .set_partner_address(&OWNER, STRANGER)
        .expect("admin works while paused");

    engine.unpause(&OWNER).expect("owner unpauses");
    for category in Category::ALL {
        engine
            .add_category_income(&mut ledger, &OPERATOR, category, 10)
            .expect("income flows after unpause");
    }
}

#[test]
fn retention_withdrawal_round_trip() {
    let (mut engine, mut ledger) = configured_engine();
    engine
        .set_c_role_address(&OWNER, Address::NULL)
        .expect("disable c");

    engine
        .add_standard_income(&mut ledger, &OPERATOR, 1_000_000_000_000_000_001)
        .expect("distribute");
    // C takes the remainder: 10^18 + 1 - 2 * 3 * 10^17
    let expected = 400_000_000_000_000_001;
    assert_eq!(engine.retained_balance(&RESERVE), expected);

    // Withdrawal is not gated by the pause flag.
    engine.pause(&OWNER).expect("pause");
    assert_eq!(
        engine.withdraw_balance(&mut ledger, &RESERVE, expected + 1),
        Err(DistributorError::InsufficientBalance {
            requested: expected + 1,
            available: expected,
        })
    );
    assert_eq!(engine.retained_balance(&RESERVE), expected);

    let remaining = engine
        .withdraw_balance(&mut ledger, &RESERVE, expected)
        .expect("withdraw all");
    assert_eq!(remaining, 0);
    assert_eq!(ledger.balance(&ASSET, &RESERVE), expected);
    assert_eq!(engine.total_retained(), 0);
    assert_eq!(
        engine.withdraw_balance(&mut ledger, &RESERVE, 0),
        Err(DistributorError::AmountMustBePositive)
    );
}

#[test]
fn unified_entry_point_matches_legacy_entry_points() {
    let (mut legacy, mut legacy_ledger) = configured_engine();
    let (mut unified, mut unified_ledger) = configured_engine();

    for category in Category::ALL {
        let a = legacy
            .add_category_income(&mut legacy_ledger, &OWNER, category, 12_345)
            .expect("legacy");
        let b = unified
            .add_income(&mut unified_ledger, &OWNER, category.code(), 12_345)
            .expect("unified");
        assert_eq!(a, b);
    }
    assert_eq!(legacy.events(), unified.events());
    assert_eq!(
        unified.add_income(&mut unified_ledger, &OWNER, 5, 1),
        Err(DistributorError::InvalidCategory(5))
    );
}
