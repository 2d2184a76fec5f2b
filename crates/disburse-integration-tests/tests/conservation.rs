//! Integration test: conservation under randomized load.
//!
//! Exercises deposits of random categories and amounts while role bindings
//! are toggled between valid addresses and the null sentinel, with
//! interleaved withdrawals. After every call the units paid out of the
//! funding source plus the outstanding retained total must equal the sum
//! of all deposits.

use disburse_core::{policy, Distributor, DistributorConfig, IncomeBatch, MemoryAssetLedger};
use disburse_types::{Address, Amount, Category, Role};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const OWNER: Address = Address::from_low_u64(0x100);
const ASSET: Address = Address::from_low_u64(0xa55e7);
const POOL: Address = Address::from_low_u64(0x9001);
const CUSTODY: Address = Address::from_low_u64(0x9002);
const RESERVE: Address = Address::from_low_u64(7);

const POOL_FUNDS: Amount = u64::MAX as Amount * 1_000_000;

/// Recipient addresses a role may be bound to, besides the null sentinel.
const RECIPIENTS: [Address; 4] = [
    Address::from_low_u64(1),
    Address::from_low_u64(2),
    Address::from_low_u64(3),
    RESERVE,
];

fn new_engine() -> (Distributor, MemoryAssetLedger) {
    let mut engine = Distributor::new(DistributorConfig {
        deployer: OWNER,
        asset: ASSET,
        funding_source: POOL,
        custody: CUSTODY,
    })
    .expect("engine");
    engine
        .set_reserved_address(&OWNER, RESERVE)
        .expect("reserved");

    let mut ledger = MemoryAssetLedger::new();
    ledger.mint(ASSET, POOL, POOL_FUNDS);
    (engine, ledger)
}

/// Bind a random non-Reserved role to a random recipient or to null.
fn shuffle_role(engine: &mut Distributor, rng: &mut StdRng) {
    let role = Role::ALL[rng.gen_range(0..Role::ALL.len() - 1)];
    let address = if rng.gen_bool(0.4) {
        Address::NULL
    } else {
        RECIPIENTS[rng.gen_range(0..RECIPIENTS.len())]
    };
    engine
        .set_role_address(&OWNER, role, address)
        .expect("owner rebinds roles");
}

fn random_amount(rng: &mut StdRng) -> Amount {
    match rng.gen_range(0..3) {
        0 => rng.gen_range(1..100),
        1 => rng.gen_range(1..1_000_000_000),
        _ => Amount::from(rng.gen::<u64>()) + 1,
    }
}

fn assert_conserved(engine: &Distributor, ledger: &MemoryAssetLedger, deposited: Amount) {
    let paid_out = POOL_FUNDS - ledger.balance(&ASSET, &POOL);
    let received: Amount = RECIPIENTS
        .iter()
        .map(|addr| ledger.balance(&ASSET, addr))
        .sum();
    assert_eq!(paid_out, received, "every unit leaving the pool lands at a recipient");
    assert_eq!(
        paid_out + engine.total_retained(),
        deposited,
        "paid out + retained must equal deposits"
    );
}

#[test]
fn split_portions_always_sum_to_amount() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..2_000 {
        let category = Category::ALL[rng.gen_range(0..Category::ALL.len())];
        let amount = random_amount(&mut rng);
        let portions = policy::split(category, amount).expect("split");
        let total: Amount = portions.iter().map(|p| p.amount).sum();
        assert_eq!(total, amount, "{category} split of {amount} lost units");
    }
}

#[test]
fn random_deposits_conserve_value() {
    let mut rng = StdRng::seed_from_u64(42);
    let (mut engine, mut ledger) = new_engine();
    let mut deposited: Amount = 0;

    for _ in 0..500 {
        match rng.gen_range(0..10) {
            0..=1 => shuffle_role(&mut engine, &mut rng),
            2 => {
                let batch = IncomeBatch {
                    proxy: if rng.gen_bool(0.5) { random_amount(&mut rng) } else { 0 },
                    standard: if rng.gen_bool(0.5) { random_amount(&mut rng) } else { 0 },
                    extra: if rng.gen_bool(0.5) { random_amount(&mut rng) } else { 0 },
                    natural: if rng.gen_bool(0.5) { random_amount(&mut rng) } else { 0 },
                    base: random_amount(&mut rng),
                };
                let receipt = engine
                    .add_multiple_incomes(&mut ledger, &OWNER, batch)
                    .expect("batch");
                let batch_total: Amount = batch.entries().iter().map(|(_, a)| *a).sum();
                let receipt_total: Amount = receipt.distributions.iter().map(|d| d.amount).sum();
                assert_eq!(receipt_total, batch_total);
                deposited += batch_total;
            }
            3 => {
                let retained = engine.retained_balance(&RESERVE);
                if retained > 0 {
                    let amount = rng.gen_range(1..=retained);
                    let before = engine.total_retained();
                    engine
                        .withdraw_balance(&mut ledger, &RESERVE, amount)
                        .expect("withdraw");
                    assert_eq!(engine.total_retained(), before - amount);
                }
            }
            _ => {
                let category = Category::ALL[rng.gen_range(0..Category::ALL.len())];
                let amount = random_amount(&mut rng);
                let before = engine.total_retained();
                let distribution = engine
                    .add_income(&mut ledger, &OWNER, category.code(), amount)
                    .expect("income");
                assert_eq!(distribution.transferred() + distribution.retained(), amount);
                assert_eq!(engine.total_retained(), before + distribution.retained());
                deposited += amount;
            }
        }
        assert_conserved(&engine, &ledger, deposited);
    }

    // Drain the reserve and confirm the pool's outflow equals every deposit.
    let outstanding = engine.retained_balance(&RESERVE);
    if outstanding > 0 {
        engine
            .withdraw_balance(&mut ledger, &RESERVE, outstanding)
            .expect("final withdraw");
    }
    assert_eq!(engine.total_retained(), 0);
    assert_eq!(POOL_FUNDS - ledger.balance(&ASSET, &POOL), deposited);
}
