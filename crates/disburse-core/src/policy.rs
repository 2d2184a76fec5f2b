//! Per-category split policies.
//!
//! | Category | Split |
//! |----------|-------|
//! | Proxy    | 100% Proxy |
//! | Standard | 30% ARole, 30% BRole, remainder CRole |
//! | Extra    | 70% Partner, remainder Reserved |
//! | Natural  | 100% Reserved |
//! | Base     | 100% BaseFee |
//!
//! Every fixed share is computed with truncating division; the last portion
//! is `amount` minus the fixed shares, so the portions always sum to the
//! deposited amount exactly.

use disburse_types::{Amount, Category, Role, PERCENT_DENOMINATOR};
use serde::{Deserialize, Serialize};

use crate::{DistributorError, Result};

/// Standard income share of role A.
pub const STANDARD_A_PCT: u8 = 30;

/// Standard income share of role B.
pub const STANDARD_B_PCT: u8 = 30;

/// Extra income share of the partner.
pub const EXTRA_PARTNER_PCT: u8 = 70;

/// A fixed percentage share of a deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Share {
    pub role: Role,
    pub pct: u8,
}

/// How one category is divided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitRule {
    /// Truncated percentage shares, computed first.
    pub shares: &'static [Share],
    /// Receives whatever the fixed shares leave over.
    pub remainder: Role,
}

pub const PROXY_RULE: SplitRule = SplitRule {
    shares: &[],
    remainder: Role::Proxy,
};

pub const STANDARD_RULE: SplitRule = SplitRule {
    shares: &[
        Share {
            role: Role::ARole,
            pct: STANDARD_A_PCT,
        },
        Share {
            role: Role::BRole,
            pct: STANDARD_B_PCT,
        },
    ],
    remainder: Role::CRole,
};

pub const EXTRA_RULE: SplitRule = SplitRule {
    shares: &[Share {
        role: Role::Partner,
        pct: EXTRA_PARTNER_PCT,
    }],
    remainder: Role::Reserved,
};

pub const NATURAL_RULE: SplitRule = SplitRule {
    shares: &[],
    remainder: Role::Reserved,
};

pub const BASE_RULE: SplitRule = SplitRule {
    shares: &[],
    remainder: Role::BaseFee,
};

/// A computed slice of a deposit attributed to one role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portion {
    pub role: Role,
    pub amount: Amount,
}

/// The split rule for `category`.
pub fn rule(category: Category) -> &'static SplitRule {
    match category {
        Category::Proxy => &PROXY_RULE,
        Category::Standard => &STANDARD_RULE,
        Category::Extra => &EXTRA_RULE,
        Category::Natural => &NATURAL_RULE,
        Category::Base => &BASE_RULE,
    }
}

/// Check that a rule's fixed shares leave a non-negative remainder.
///
/// Returns the remainder percentage.
pub fn validate_rule(rule: &SplitRule) -> Result<u8> {
    let fixed: u16 = rule.shares.iter().map(|s| u16::from(s.pct)).sum();
    if fixed > PERCENT_DENOMINATOR as u16 {
        return Err(DistributorError::Overflow);
    }
    Ok((PERCENT_DENOMINATOR as u16 - fixed) as u8)
}

/// Split `amount` of `category` into per-role portions.
///
/// Portions are returned in rule order, remainder last. Zero portions are
/// kept so that the result always sums to `amount`.
///
/// # Errors
///
/// - [`DistributorError::AmountMustBePositive`] if `amount` is zero
pub fn split(category: Category, amount: Amount) -> Result<Vec<Portion>> {
    if amount == 0 {
        return Err(DistributorError::AmountMustBePositive);
    }
    let rule = rule(category);

    let mut portions = Vec::with_capacity(rule.shares.len() + 1);
    let mut assigned: Amount = 0;
    for share in rule.shares {
        let portion = percent_of(amount, share.pct);
        assigned += portion;
        portions.push(Portion {
            role: share.role,
            amount: portion,
        });
    }

    // Remainder absorbs the rounding loss of the truncated shares.
    portions.push(Portion {
        role: rule.remainder,
        amount: amount - assigned,
    });

    Ok(portions)
}

/// `floor(amount * pct / 100)` for any `amount`, without widening.
fn percent_of(amount: Amount, pct: u8) -> Amount {
    let pct = Amount::from(pct);
    (amount / PERCENT_DENOMINATOR) * pct + (amount % PERCENT_DENOMINATOR) * pct / PERCENT_DENOMINATOR
}
