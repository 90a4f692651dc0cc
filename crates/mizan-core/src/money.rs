//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Extracting 15% VAT from a tax-inclusive 100.00 with floats:            │
//! │    100 - 100 / 1.15 = 13.043478260869563   → which way does it round?   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (halalas / cents)                    │
//! │    10000 × 1500 / 11500 = 1304.34...  → half-up → 1304 (13.04)          │
//! │    Every intermediate is an exact rational, rounded once per step.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mizan_core::money::Money;
//!
//! let price = Money::from_cents(3000); // 30.00
//! let line = price.checked_mul_quantity(2).unwrap();
//! assert_eq!(line.to_string(), "60.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Basis points in 100%.
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator / denominator`, rounding half away from zero.
///
/// This is the "standard" half-up rounding a receipt uses: 0.005 → 0.01.
/// `denominator` must be positive.
///
/// ```rust
/// use mizan_core::money::div_round_half_up;
///
/// assert_eq!(div_round_half_up(13_043_478, 1_000_000), 13);
/// assert_eq!(div_round_half_up(25, 10), 3);
/// assert_eq!(div_round_half_up(-25, 10), -3);
/// ```
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    let magnitude = (numerator.abs() * 2 + denominator) / (denominator * 2);
    if numerator < 0 {
        -magnitude
    } else {
        magnitude
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (halalas for SAR, cents
/// for USD).
///
/// ## Where Money Flows
/// ```text
/// LineItem.unit_price ──► line total ──► TaxCalculator ──► Invoice.total
///                                                              │
///                     DocumentModel "109.00" ◄── QR payload ◄──┘
/// ```
///
/// Persisted invoices store the cents value directly; nothing downstream of
/// the tax calculator ever re-derives a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ```rust
    /// use mizan_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (riyals, dollars).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Tax on top of a tax-exclusive amount, rounded half-up.
    ///
    /// `(amount × bps) / 10000`, e.g. 60.00 at 15% = 9.00.
    ///
    /// ```rust
    /// use mizan_core::money::Money;
    /// use mizan_core::types::TaxRate;
    ///
    /// let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
    /// assert_eq!(tax.cents(), 83); // 0.825 → 0.83
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let cents = div_round_half_up(self.0 as i128 * rate.bps() as i128, BPS_SCALE);
        Money(cents as i64)
    }

    /// Tax contained in a tax-inclusive amount, rounded half-up.
    ///
    /// Equivalent to `amount − amount / (1 + rate)`, evaluated exactly as
    /// `amount × bps / (10000 + bps)`.
    ///
    /// ```rust
    /// use mizan_core::money::Money;
    /// use mizan_core::types::TaxRate;
    ///
    /// let tax = Money::from_cents(10000).extract_inclusive_tax(TaxRate::from_bps(1500));
    /// assert_eq!(tax.cents(), 1304); // 100.00 - 100.00 / 1.15 = 13.04
    /// ```
    pub fn extract_inclusive_tax(&self, rate: TaxRate) -> Money {
        let bps = rate.bps() as i128;
        let cents = div_round_half_up(self.0 as i128 * bps, BPS_SCALE + bps);
        Money(cents as i64)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Renders the amount with exactly two decimal places and no symbol.
    ///
    /// Same as `Display`; kept as a named method for document code.
    pub fn to_decimal_string(&self) -> String {
        self.to_string()
    }

    /// Renders `"SAR 109.00"` style strings.
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        format!("{} {}", symbol, self)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Two decimal places, no currency symbol: `109.00`, `-5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display_always_two_decimals() {
        assert_eq!(Money::from_cents(10900).to_string(), "109.00");
        assert_eq!(Money::from_cents(1304).to_string(), "13.04");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_format_with_symbol() {
        assert_eq!(Money::from_cents(10900).format_with_symbol("SAR"), "SAR 109.00");
    }

    #[test]
    fn test_half_up_rounding() {
        assert_eq!(div_round_half_up(5, 10), 1);
        assert_eq!(div_round_half_up(4, 10), 0);
        assert_eq!(div_round_half_up(15, 10), 2);
        assert_eq!(div_round_half_up(25, 10), 3);
        assert_eq!(div_round_half_up(-15, 10), -2);
        assert_eq!(div_round_half_up(0, 7), 0);
    }

    #[test]
    fn test_exclusive_tax() {
        // 60.00 at 15% = 9.00
        let tax = Money::from_cents(6000).calculate_tax(TaxRate::from_bps(1500));
        assert_eq!(tax.cents(), 900);

        // 0.825 → 0.83
        let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);
    }

    #[test]
    fn test_inclusive_tax_extraction() {
        let rate = TaxRate::from_bps(1500);
        assert_eq!(Money::from_cents(10000).extract_inclusive_tax(rate).cents(), 1304);
        assert_eq!(Money::from_cents(11500).extract_inclusive_tax(rate).cents(), 1500);
        assert_eq!(Money::zero().extract_inclusive_tax(rate).cents(), 0);
        assert_eq!(
            Money::from_cents(10000).extract_inclusive_tax(TaxRate::zero()).cents(),
            0
        );
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(
            Money::from_cents(299).checked_mul_quantity(3),
            Some(Money::from_cents(897))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn test_clamp_and_sum() {
        assert_eq!(Money::from_cents(-1).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_cents(7).clamp_non_negative().cents(), 7);

        let total: Money = [100, 250, 5].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 355);
        assert_eq!((-total).cents(), -355);
    }
}
