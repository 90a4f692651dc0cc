//! # Tax Calculator
//!
//! Computes subtotal, VAT, discount and total for a cart.
//!
//! ## Two Pricing Regimes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TAX-EXCLUSIVE (prices before VAT)                                      │
//! │                                                                         │
//! │    subtotal   = Σ price × qty                  (all items)              │
//! │    tax        = round(Σ taxable × rate)        (taxable items only)     │
//! │    discount   = pct × (subtotal + tax)  |  fixed                        │
//! │    total      = round(max(0, subtotal + tax − discount))                │
//! │                                                                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  TAX-INCLUSIVE (menu prices already contain VAT)                        │
//! │                                                                         │
//! │    with_tax   = Σ price × qty                  (all items)              │
//! │    tax        = round(with_tax − with_tax / (1 + rate))                 │
//! │    subtotal   = with_tax − tax                                          │
//! │    discount   = pct × with_tax  |  fixed                                │
//! │    total      = round(max(0, with_tax − discount))                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding is half-up to whole cents and happens at each labeled step, so
//! totals match a receipt printed line by line. All intermediates are `i128`.
//!
//! The inclusive path does NOT look at `LineItem::taxable`: every price is
//! treated as VAT-inclusive. Whether non-taxable items on an inclusive menu
//! should be excluded is an open product decision; this module keeps the
//! established behavior.
//!
//! ## Example
//! ```rust
//! use mizan_core::money::Money;
//! use mizan_core::tax::compute_invoice_amounts;
//! use mizan_core::types::{DiscountSpec, LineItem, TaxRate};
//!
//! let items = vec![
//!     LineItem::new("p-1", "Mandi", Money::from_cents(3000), 2),
//!     LineItem::new("p-2", "Water", Money::from_cents(4000), 1).non_taxable(),
//! ];
//! let amounts = compute_invoice_amounts(
//!     &items,
//!     TaxRate::from_bps(1500),
//!     &DiscountSpec::none(),
//!     false,
//! )
//! .unwrap();
//!
//! assert_eq!(amounts.subtotal.cents(), 10000);
//! assert_eq!(amounts.tax_amount.cents(), 900);
//! assert_eq!(amounts.total.cents(), 10900);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{div_round_half_up, Money, BPS_SCALE};
use crate::types::{DiscountSpec, LineItem, TaxConfig, TaxRate};
use crate::validation::{validate_discount, validate_line_items, validate_tax_rate, ValidationResult};

/// Financial summary of one cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceAmounts {
    pub subtotal: Money,
    pub tax_amount: Money,
    /// What the discount actually removed (after clamping).
    pub discount_amount: Money,
    pub total: Money,
}

/// Computes invoice amounts for `items`.
///
/// ## Errors
/// `ValidationError` for negative prices, non-positive quantities, a
/// percentage above 100%, a negative fixed discount, a rate above 100%, or
/// amounts too large to represent. An empty cart is all zeros.
pub fn compute_invoice_amounts(
    items: &[LineItem],
    tax_rate: TaxRate,
    discount: &DiscountSpec,
    tax_included: bool,
) -> ValidationResult<InvoiceAmounts> {
    validate_line_items(items)?;
    validate_discount(discount)?;
    validate_tax_rate(tax_rate)?;

    let all_lines = sum_lines(items.iter())?;
    let bps = tax_rate.bps() as i128;

    let (subtotal, tax_amount, base) = if tax_included {
        let tax = div_round_half_up(all_lines * bps, BPS_SCALE + bps);
        (all_lines - tax, tax, all_lines)
    } else {
        let taxable = sum_lines(items.iter().filter(|item| item.taxable))?;
        let tax = div_round_half_up(taxable * bps, BPS_SCALE);
        (all_lines, tax, all_lines + tax)
    };

    let total = apply_discount(base, discount);

    Ok(InvoiceAmounts {
        subtotal: to_money(subtotal, "subtotal")?,
        tax_amount: to_money(tax_amount, "tax_amount")?,
        discount_amount: to_money(base - total, "discount_amount")?,
        total: to_money(total, "total")?,
    })
}

/// [`compute_invoice_amounts`] driven by a [`TaxConfig`].
pub fn compute_with_config(
    items: &[LineItem],
    config: &TaxConfig,
    discount: &DiscountSpec,
) -> ValidationResult<InvoiceAmounts> {
    compute_invoice_amounts(items, config.rate, discount, config.inclusive)
}

/// `round(max(0, base − discount))` for a non-negative `base` in cents.
fn apply_discount(base: i128, discount: &DiscountSpec) -> i128 {
    match discount {
        DiscountSpec::Percentage(bps) => {
            let keep = BPS_SCALE - (*bps as i128).min(BPS_SCALE);
            div_round_half_up(base * keep, BPS_SCALE).max(0)
        }
        DiscountSpec::Fixed(amount) => (base - amount.cents() as i128).max(0),
    }
}

fn sum_lines<'a>(mut items: impl Iterator<Item = &'a LineItem>) -> ValidationResult<i128> {
    items.try_fold(0i128, |acc, item| {
        let line = item
            .line_total()
            .ok_or_else(|| ValidationError::overflow("line_total"))?;
        Ok(acc + line.cents() as i128)
    })
}

fn to_money(cents: i128, field: &str) -> ValidationResult<Money> {
    i64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| ValidationError::overflow(field))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(price: i64, qty: i64, taxable: bool) -> LineItem {
        let item = LineItem::new("p", "Item", Money::from_cents(price), qty);
        if taxable {
            item
        } else {
            item.non_taxable()
        }
    }

    fn scenario_items() -> Vec<LineItem> {
        vec![line(3000, 2, true), line(4000, 1, false)]
    }

    const VAT: TaxRate = TaxRate::from_bps(1500);

    #[test]
    fn test_exclusive_scenario() {
        let a = compute_invoice_amounts(&scenario_items(), VAT, &DiscountSpec::none(), false).unwrap();
        assert_eq!(a.subtotal.cents(), 10000);
        assert_eq!(a.tax_amount.cents(), 900);
        assert_eq!(a.discount_amount.cents(), 0);
        assert_eq!(a.total.cents(), 10900);
    }

    #[test]
    fn test_inclusive_scenario_ignores_taxable_flag() {
        let a = compute_invoice_amounts(&scenario_items(), VAT, &DiscountSpec::none(), true).unwrap();
        assert_eq!(a.tax_amount.cents(), 1304);
        assert_eq!(a.subtotal.cents(), 8696);
        assert_eq!(a.total.cents(), 10000);
    }

    #[test]
    fn test_fixed_discount_clamps_to_zero() {
        let items = vec![line(5000, 1, false)];
        let a = compute_invoice_amounts(
            &items,
            VAT,
            &DiscountSpec::Fixed(Money::from_cents(10000)),
            false,
        )
        .unwrap();
        assert_eq!(a.total, Money::zero());
        assert_eq!(a.discount_amount.cents(), 5000);
    }

    #[test]
    fn test_percentage_discount_applies_after_tax() {
        // (100.00 + 9.00) × 10% = 10.90 off
        let a = compute_invoice_amounts(&scenario_items(), VAT, &DiscountSpec::Percentage(1000), false)
            .unwrap();
        assert_eq!(a.total.cents(), 9810);
        assert_eq!(a.discount_amount.cents(), 1090);
        // Subtotal and tax are reported before discount
        assert_eq!(a.subtotal.cents(), 10000);
        assert_eq!(a.tax_amount.cents(), 900);
    }

    #[test]
    fn test_percentage_discount_inclusive_uses_total_with_tax() {
        let a = compute_invoice_amounts(&scenario_items(), VAT, &DiscountSpec::Percentage(2500), true)
            .unwrap();
        assert_eq!(a.total.cents(), 7500);
        assert_eq!(a.tax_amount.cents(), 1304);
    }

    #[test]
    fn test_percentage_discount_rounds_half_up() {
        // 0.99 × 50% = 0.495 → 0.50
        let a = compute_invoice_amounts(
            &[line(99, 1, false)],
            TaxRate::zero(),
            &DiscountSpec::Percentage(5000),
            false,
        )
        .unwrap();
        assert_eq!(a.total.cents(), 50);
    }

    #[test]
    fn test_empty_cart_is_zero() {
        let a = compute_invoice_amounts(&[], VAT, &DiscountSpec::Fixed(Money::from_cents(500)), false)
            .unwrap();
        assert_eq!(a, InvoiceAmounts::default());
    }

    #[test]
    fn test_rejects_negative_inputs() {
        assert!(matches!(
            compute_invoice_amounts(&[line(-100, 1, true)], VAT, &DiscountSpec::none(), false),
            Err(ValidationError::Negative { .. })
        ));
        assert!(matches!(
            compute_invoice_amounts(&[line(100, -3, true)], VAT, &DiscountSpec::none(), true),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(compute_invoice_amounts(
            &[line(100, 1, true)],
            VAT,
            &DiscountSpec::Fixed(Money::from_cents(-1)),
            false
        )
        .is_err());
    }

    #[test]
    fn test_rejects_overflowing_line() {
        let err = compute_invoice_amounts(&[line(i64::MAX, 2, true)], VAT, &DiscountSpec::none(), false)
            .unwrap_err();
        assert_eq!(err, ValidationError::overflow("line_total"));
    }

    #[test]
    fn test_compute_with_config() {
        let config = TaxConfig::inclusive(VAT);
        let a = compute_with_config(&scenario_items(), &config, &DiscountSpec::none()).unwrap();
        assert_eq!(a.tax_amount.cents(), 1304);
    }

    fn arb_items() -> impl Strategy<Value = Vec<LineItem>> {
        prop::collection::vec((0i64..100_000, 1i64..50, any::<bool>()), 0..20)
            .prop_map(|rows| rows.into_iter().map(|(p, q, t)| line(p, q, t)).collect())
    }

    proptest! {
        #[test]
        fn prop_exclusive_tax_only_on_taxable(items in arb_items(), bps in 0u32..=10_000, fixed in 0i64..5_000_000) {
            let rate = TaxRate::from_bps(bps);
            let a = compute_invoice_amounts(&items, rate, &DiscountSpec::Fixed(Money::from_cents(fixed)), false).unwrap();

            let s: i64 = items.iter().map(|i| i.unit_price.cents() * i.quantity).sum();
            let st: i64 = items.iter().filter(|i| i.taxable).map(|i| i.unit_price.cents() * i.quantity).sum();

            prop_assert_eq!(a.subtotal.cents(), s);
            prop_assert_eq!(a.tax_amount, Money::from_cents(st).calculate_tax(rate));
            prop_assert_eq!(a.total.cents(), (s + a.tax_amount.cents() - fixed).max(0));
        }

        #[test]
        fn prop_inclusive_round_trip(items in arb_items(), bps in 0u32..=10_000) {
            let a = compute_invoice_amounts(&items, TaxRate::from_bps(bps), &DiscountSpec::none(), true).unwrap();
            let t: i64 = items.iter().map(|i| i.unit_price.cents() * i.quantity).sum();

            prop_assert_eq!(a.subtotal.cents() + a.tax_amount.cents(), t);
            prop_assert_eq!(a.total.cents(), t);
        }

        #[test]
        fn prop_total_never_negative(
            items in arb_items(),
            bps in 0u32..=10_000,
            inclusive in any::<bool>(),
            pct in 0u32..=10_000,
            fixed in 0i64..i64::MAX / 4,
            use_pct in any::<bool>(),
        ) {
            let discount = if use_pct {
                DiscountSpec::Percentage(pct)
            } else {
                DiscountSpec::Fixed(Money::from_cents(fixed))
            };
            let a = compute_invoice_amounts(&items, TaxRate::from_bps(bps), &discount, inclusive).unwrap();
            prop_assert!(a.total.cents() >= 0);
            prop_assert!(a.discount_amount.cents() >= 0);
        }
    }
}
