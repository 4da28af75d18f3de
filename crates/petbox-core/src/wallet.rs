//! # Wallet
//!
//! The derived budget view of a draft.
//!
//! ```text
//!   budget ─────────────────────────────┐
//!                                       ▼
//!   Σ(locked_price × quantity) ──► spent ──► remaining = budget − spent
//!                                       │
//!                                       └──► can_add_more = spent < budget
//! ```
//!
//! The wallet is never stored. It is recomputed from the current lines on
//! every read, so it cannot drift from them. `remaining` may go negative:
//! adds are not capped by the budget.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::DraftLine;

/// Budget/spent/remaining view of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub budget: Money,
    pub spent: Money,
    pub remaining: Money,
    pub can_add_more: bool,
}

impl Wallet {
    /// Builds a wallet from `(unit_price, quantity)` pairs.
    pub fn from_lines<I>(budget: Money, lines: I) -> Self
    where
        I: IntoIterator<Item = (Money, i64)>,
    {
        let spent: Money = lines
            .into_iter()
            .map(|(price, qty)| price.multiply_quantity(qty))
            .sum();

        Wallet {
            budget,
            spent,
            remaining: budget - spent,
            can_add_more: spent < budget,
        }
    }

    /// Builds a wallet from a draft's locked lines.
    pub fn calculate(budget: Money, lines: &[DraftLine]) -> Self {
        Self::from_lines(
            budget,
            lines.iter().map(|l| (l.locked_price(), l.quantity)),
        )
    }

    /// Wallet of a draft with no lines.
    pub fn empty(budget: Money) -> Self {
        Self::from_lines(budget, std::iter::empty())
    }
}
