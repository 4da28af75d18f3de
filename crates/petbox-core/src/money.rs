//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Budgets, locked prices and discounts are all whole paise (i64).       │
//! │                                                                         │
//! │    ₹2000.00 budget   → 200000                                          │
//! │    ₹500.00 variant   → 50000                                           │
//! │    10% bundle off    → (subtotal * 1000 + 5000) / 10000                │
//! │                                                                         │
//! │  No floating point ever touches a wallet figure.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use petbox_core::money::Money;
//!
//! let price = Money::from_minor(50_000); // ₹500.00
//! let line_total = price * 3_i64;        // ₹1500.00
//! assert_eq!(line_total.minor(), 150_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: a wallet's remaining figure may go negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Transparent serde**: serialized as a plain integer on the wire
///
/// ## Where Money Flows
/// ```text
/// Variant.price_minor ──► DraftLine.locked_price ──► Wallet.spent
///                                                         │
/// Draft.budget ───────────────────────────────────────────┴──► Wallet.remaining
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (paise).
    ///
    /// ## Example
    /// ```rust
    /// use petbox_core::money::Money;
    ///
    /// let price = Money::from_minor(1099); // ₹10.99
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (rupee) portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use petbox_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(50_000);
    /// assert_eq!(unit_price.multiply_quantity(2).minor(), 100_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount, rounded half-up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so
    /// large subtotals cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use petbox_core::money::Money;
    ///
    /// let subtotal = Money::from_minor(12_345);
    /// // 10% of ₹123.45 = ₹12.345 → ₹12.35
    /// assert_eq!(subtotal.percentage(1000).minor(), 1235);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let amount = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_minor(amount as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Arguments
    /// * `discount_bps` - Discount in basis points (1000 = 10%)
    ///
    /// ## Example
    /// ```rust
    /// use petbox_core::money::Money;
    ///
    /// let subtotal = Money::from_minor(10_000);
    /// assert_eq!(subtotal.apply_percentage_discount(1000).minor(), 9_000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        *self - self.percentage(discount_bps)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows rupees for logs; clients format for their locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(200_050);
        assert_eq!(money.minor(), 200_050);
        assert_eq!(money.major(), 2000);
        assert_eq!(money.minor_part(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(200_000).to_string(), "₹2000.00");
        assert_eq!(Money::from_minor(505).to_string(), "₹5.05");
        assert_eq!(Money::from_minor(-550).to_string(), "-₹5.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((b - a).minor(), -500);
        assert_eq!((a * 3_i64).minor(), 3000);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650].into_iter().map(Money::from_minor).sum();
        assert_eq!(total.minor(), 1000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 10% of 45 paise = 4.5 → 5
        assert_eq!(Money::from_minor(45).percentage(1000).minor(), 5);
        // 10% of 44 paise = 4.4 → 4
        assert_eq!(Money::from_minor(44).percentage(1000).minor(), 4);
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::from_minor(150_000);
        assert_eq!(subtotal.apply_percentage_discount(1000).minor(), 135_000);
        assert_eq!(subtotal.apply_percentage_discount(0), subtotal);
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Money::from_minor(42)).unwrap();
        assert_eq!(json, "42");
    }
}
