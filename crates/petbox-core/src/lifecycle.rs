//! # Lifecycle
//!
//! Plan state machine, draft commit guards, bundle pricing and billing
//! cycle keys.
//!
//! ## Plan States
//! ```text
//!                    pause
//!        ┌────────┐ ──────► ┌────────┐
//!        │ active │         │ paused │
//!        └────────┘ ◄────── └────────┘
//!             │      resume      │
//!      cancel │                  │ cancel
//!             ▼                  ▼
//!        ┌─────────────────────────────┐
//!        │   cancelled (terminal)      │
//!        └─────────────────────────────┘
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Draft, DraftLine, DraftMode, PlanStatus};
use crate::{DEFAULT_BUNDLE_DISCOUNT_BPS, DEFAULT_BUNDLE_MIN_LINES};

// =============================================================================
// Plan Transitions
// =============================================================================

/// A user-initiated plan status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Pause,
    Resume,
    Cancel,
}

impl PlanAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PlanAction::Pause => "pause",
            PlanAction::Resume => "resume",
            PlanAction::Cancel => "cancel",
        }
    }

    /// Returns the status this action leads to from `from`.
    ///
    /// ## Errors
    /// `InvalidTransition` for pausing a paused plan, resuming an active one,
    /// or touching a cancelled one.
    pub fn apply(&self, from: PlanStatus) -> CoreResult<PlanStatus> {
        use PlanStatus::*;

        match (self, from) {
            (PlanAction::Pause, Active) => Ok(Paused),
            (PlanAction::Resume, Paused) => Ok(Active),
            (PlanAction::Cancel, Active | Paused) => Ok(Cancelled),
            _ => Err(CoreError::InvalidTransition {
                from: from.to_string(),
                action: self.as_str().to_string(),
            }),
        }
    }
}

// =============================================================================
// Draft Commit Guards
// =============================================================================

/// Checks that a draft can be committed through the `expected` path.
///
/// A non-draft status reads as NotFound, the same as a missing draft.
pub fn ensure_committable(draft: &Draft, expected: DraftMode, lines: &[DraftLine]) -> CoreResult<()> {
    if !draft.is_mutable() {
        return Err(CoreError::not_found("Draft", &draft.id));
    }

    if draft.mode != expected {
        return Err(CoreError::WrongMode {
            expected: expected.to_string(),
            actual: draft.mode.to_string(),
        });
    }

    if lines.is_empty() {
        return Err(CoreError::EmptySelection(draft.id.clone()));
    }

    Ok(())
}

// =============================================================================
// Bundle Pricing
// =============================================================================

/// Flat percentage discount for bundles with enough distinct lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDiscount {
    /// Minimum number of distinct lines before the discount applies.
    pub min_lines: usize,
    /// Discount in basis points (1000 = 10%).
    pub discount_bps: u32,
}

impl Default for BundleDiscount {
    fn default() -> Self {
        Self {
            min_lines: DEFAULT_BUNDLE_MIN_LINES,
            discount_bps: DEFAULT_BUNDLE_DISCOUNT_BPS,
        }
    }
}

/// Totals of a bundle checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BundlePricing {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

impl BundleDiscount {
    /// Prices a bundle from its locked lines.
    ///
    /// ## Example
    /// ```rust
    /// use petbox_core::lifecycle::BundleDiscount;
    /// use petbox_core::Money;
    ///
    /// let pricing = BundleDiscount::default().price_amounts(3, Money::from_minor(150_000));
    /// assert_eq!(pricing.discount.minor(), 15_000);
    /// assert_eq!(pricing.total.minor(), 135_000);
    /// ```
    pub fn price(&self, lines: &[DraftLine]) -> BundlePricing {
        let subtotal: Money = lines.iter().map(DraftLine::line_total).sum();
        self.price_amounts(lines.len(), subtotal)
    }

    /// Prices a bundle from a line count and subtotal.
    pub fn price_amounts(&self, line_count: usize, subtotal: Money) -> BundlePricing {
        let discount = if line_count >= self.min_lines {
            subtotal.percentage(self.discount_bps)
        } else {
            Money::zero()
        };

        BundlePricing {
            subtotal,
            discount,
            total: subtotal - discount,
        }
    }
}

// =============================================================================
// Billing Cycles
// =============================================================================

/// Key identifying the billing period containing `date` (`YYYY-MM`).
pub fn cycle_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Checks whether a plan billing on `billing_day` is due on `date`.
///
/// Days 29-31 never match a valid billing day.
pub fn is_billing_day(billing_day: u32, date: NaiveDate) -> bool {
    date.day() == billing_day
}

// =============================================================================
// Unit Tests
// =============================================================================
