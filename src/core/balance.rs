//! Expense balance arithmetic.
//!
//! A balance is positive when the member is owed money and negative when the
//! member owes money. For a closed set of participants the balances always
//! sum to zero.

use crate::core::constants::SETTLED_EPSILON;
use crate::core::errors::DenError;
use crate::core::models::Member;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use utoipa::ToSchema;

pub type Balances = BTreeMap<String, Decimal>;

/// A suggested payment that moves `amount` from a debtor to a creditor.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

/// How a den divides its expenses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitMode {
    Equal(Vec<String>),
    Weighted(BTreeMap<String, Decimal>),
}

impl SplitMode {
    /// Weighted when every member carries a percentage, equal otherwise.
    pub fn for_members(members: &[Member]) -> Self {
        let all_weighted = !members.is_empty() && members.iter().all(|m| m.split_percentage.is_some());
        if all_weighted {
            SplitMode::Weighted(
                members
                    .iter()
                    .filter_map(|m| m.split_percentage.map(|p| (m.user_id.clone(), p)))
                    .collect(),
            )
        } else {
            SplitMode::Equal(members.iter().map(|m| m.user_id.clone()).collect())
        }
    }

    pub fn balances(&self, expenses: &[(Decimal, &str)]) -> Balances {
        match self {
            SplitMode::Equal(participants) => equal_split(expenses, participants),
            SplitMode::Weighted(percentages) => weighted_split(expenses, percentages),
        }
    }

    /// Each participant's portion of a single amount.
    pub fn shares(&self, amount: Decimal) -> Balances {
        match self {
            SplitMode::Equal(participants) => {
                let unique: BTreeSet<&str> = participants.iter().map(String::as_str).collect();
                if unique.is_empty() {
                    return Balances::new();
                }
                let share = amount / Decimal::from(unique.len());
                unique.into_iter().map(|p| (p.to_string(), share)).collect()
            }
            SplitMode::Weighted(percentages) => percentages
                .iter()
                .map(|(p, pct)| (p.clone(), percent_of(amount, *pct)))
                .collect(),
        }
    }
}

// Amounts saturate at `Decimal::MAX` instead of panicking; conservation only
// holds below that bound.
fn total_of(expenses: &[(Decimal, &str)], counts: impl Fn(&str) -> bool) -> Decimal {
    expenses
        .iter()
        .filter(|(_, payer)| counts(payer))
        .fold(Decimal::ZERO, |acc, (amount, _)| acc.saturating_add(*amount))
}

fn paid_by<'a>(expenses: &[(Decimal, &'a str)]) -> BTreeMap<&'a str, Decimal> {
    let mut paid: BTreeMap<&'a str, Decimal> = BTreeMap::new();
    for (amount, payer) in expenses {
        let entry = paid.entry(*payer).or_insert(Decimal::ZERO);
        *entry = entry.saturating_add(*amount);
    }
    paid
}

fn percent_of(amount: Decimal, pct: Decimal) -> Decimal {
    match amount.checked_mul(pct) {
        Some(product) => product / Decimal::ONE_HUNDRED,
        None => (amount / Decimal::ONE_HUNDRED).saturating_mul(pct),
    }
}

/// Everyone owes `total / participants`. Payers outside the set are ignored
/// in both the keys and the total.
pub fn equal_split(expenses: &[(Decimal, &str)], participants: &[String]) -> Balances {
    let unique: BTreeSet<&str> = participants.iter().map(String::as_str).collect();
    if unique.len() < 2 {
        return Balances::new();
    }

    let total = total_of(expenses, |payer| unique.contains(payer));
    let fair_share = total / Decimal::from(unique.len());
    let paid = paid_by(expenses);
    unique
        .into_iter()
        .map(|p| {
            let contributed = paid.get(p).copied().unwrap_or(Decimal::ZERO);
            (p.to_string(), contributed.saturating_sub(fair_share))
        })
        .collect()
}

/// Everyone owes `total * percentage / 100`, over expenses paid by someone
/// holding a percentage.
pub fn weighted_split(expenses: &[(Decimal, &str)], percentages: &BTreeMap<String, Decimal>) -> Balances {
    if percentages.len() < 2 {
        return Balances::new();
    }

    let total = total_of(expenses, |payer| percentages.contains_key(payer));
    let paid = paid_by(expenses);
    percentages
        .iter()
        .map(|(p, pct)| {
            let owed = percent_of(total, *pct);
            let contributed = paid.get(p.as_str()).copied().unwrap_or(Decimal::ZERO);
            (p.clone(), contributed.saturating_sub(owed))
        })
        .collect()
}

/// Rounds for display; the unrounded map is what satisfies conservation.
pub fn round_balances(balances: &Balances) -> Balances {
    balances.iter().map(|(k, v)| (k.clone(), v.round_dp(2))).collect()
}

/// Percentages must be non-negative and add up to exactly 100.
pub fn validate_percentages(percentages: &BTreeMap<String, Decimal>) -> Result<(), DenError> {
    if let Some((user_id, _)) = percentages.iter().find(|(_, p)| p.is_sign_negative()) {
        return Err(DenError::InvalidSplitUser(user_id.clone()));
    }
    let sum = percentages
        .values()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(*p));
    let Some(sum) = sum else {
        return Err(DenError::InvalidSplitPercentages("overflow".to_string()));
    };
    if sum != Decimal::ONE_HUNDRED {
        return Err(DenError::InvalidSplitPercentages(sum.to_string()));
    }
    Ok(())
}

/// Greedy settle-up: the largest debtor pays the largest creditor until every
/// residual is below one cent.
pub fn suggest_transfers(balances: &Balances) -> Vec<Transfer> {
    let mut creditors: Vec<(String, Decimal)> = balances
        .iter()
        .filter(|(_, amount)| **amount >= SETTLED_EPSILON)
        .map(|(id, amount)| (id.clone(), *amount))
        .collect();
    let mut debtors: Vec<(String, Decimal)> = balances
        .iter()
        .filter(|(_, amount)| **amount <= -SETTLED_EPSILON)
        .map(|(id, amount)| (id.clone(), -*amount))
        .collect();

    let mut transfers = Vec::new();
    loop {
        creditors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        debtors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let (Some(creditor), Some(debtor)) = (creditors.first_mut(), debtors.first_mut()) else {
            break;
        };

        let amount = creditor.1.min(debtor.1);
        if amount >= SETTLED_EPSILON {
            transfers.push(Transfer {
                from: debtor.0.clone(),
                to: creditor.0.clone(),
                amount: amount.round_dp(2),
            });
        }
        creditor.1 -= amount;
        debtor.1 -= amount;

        creditors.retain(|(_, left)| *left >= SETTLED_EPSILON);
        debtors.retain(|(_, left)| *left >= SETTLED_EPSILON);
    }

    transfers
}
