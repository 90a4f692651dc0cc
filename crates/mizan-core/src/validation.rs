//! # Validation Module
//!
//! Input validation for carts, discounts, rates and payments.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (POS screen, API)                                     │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Negative prices / quantities rejected, never clamped              │
//! │  └── Discount and rate bounds                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK / NOT NULL constraints                                      │
//! │  └── UNIQUE(invoice number)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use mizan_core::money::Money;
//! use mizan_core::types::LineItem;
//! use mizan_core::validation::validate_line_item;
//!
//! let item = LineItem::new("p-1", "Falafel Wrap", Money::from_cents(1200), 1);
//! assert!(validate_line_item(&item).is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{DiscountSpec, LineItem, TaxRate};
use crate::{MAX_INVOICE_LINES, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Non-empty after trimming, at most `max` characters.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Line Items
// =============================================================================

/// Validates one line item.
///
/// ## Rules
/// - `product_id` and `name` present
/// - `quantity` in `1..=MAX_ITEM_QUANTITY`
/// - `unit_price` not negative (zero is a complimentary item)
pub fn validate_line_item(item: &LineItem) -> ValidationResult<()> {
    validate_required_text("product_id", &item.product_id, 64)?;
    validate_required_text("name", &item.name, 200)?;
    validate_quantity(item.quantity)?;
    validate_price(item.unit_price)?;
    Ok(())
}

/// Validates every line of a cart.
///
/// An empty cart is valid here; it computes to zero.
pub fn validate_line_items(items: &[LineItem]) -> ValidationResult<()> {
    if items.len() > MAX_INVOICE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 0,
            max: MAX_INVOICE_LINES as i64,
        });
    }
    items.iter().try_for_each(validate_line_item)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// ```rust
/// use mizan_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-2).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: "unit_price".to_string(),
        });
    }
    Ok(())
}

/// Percentages are capped at 100%; fixed amounts must not be negative.
///
/// A fixed amount larger than the bill is fine: the total clamps to zero.
pub fn validate_discount(discount: &DiscountSpec) -> ValidationResult<()> {
    match discount {
        DiscountSpec::Percentage(bps) if *bps > 10_000 => Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 10_000,
        }),
        DiscountSpec::Fixed(amount) if amount.is_negative() => Err(ValidationError::Negative {
            field: "discount".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Tax rate in basis points, `0..=10000`.
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

/// Parses a percentage such as `15` or `8.25` into a [`TaxRate`].
///
/// ```rust
/// use mizan_core::validation::validate_tax_rate_percent;
///
/// assert_eq!(validate_tax_rate_percent(15.0).unwrap().bps(), 1500);
/// assert!(validate_tax_rate_percent(f64::NAN).is_err());
/// assert!(validate_tax_rate_percent(-5.0).is_err());
/// ```
pub fn validate_tax_rate_percent(pct: f64) -> ValidationResult<TaxRate> {
    if !pct.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "tax_rate".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(TaxRate::from_percentage(pct))
}

pub fn validate_paid_amount(paid: Money) -> ValidationResult<()> {
    if paid.is_negative() {
        return Err(ValidationError::Negative {
            field: "paid_amount".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64, qty: i64) -> LineItem {
        LineItem::new("p-1", "Kabsa", Money::from_cents(price), qty)
    }

    #[test]
    fn test_validate_line_item() {
        assert!(validate_line_item(&item(2500, 1)).is_ok());
        assert!(validate_line_item(&item(0, 1)).is_ok());

        assert_eq!(
            validate_line_item(&item(-1, 1)),
            Err(ValidationError::Negative {
                field: "unit_price".to_string()
            })
        );
        assert!(matches!(
            validate_line_item(&item(100, -1)),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_line_item(&item(100, MAX_ITEM_QUANTITY + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_line_item_requires_name() {
        let mut blank = item(100, 1);
        blank.name = "   ".to_string();
        assert_eq!(validate_line_item(&blank), Err(ValidationError::required("name")));
    }

    #[test]
    fn test_validate_line_items_limit() {
        assert!(validate_line_items(&[]).is_ok());
        let too_many = vec![item(100, 1); MAX_INVOICE_LINES + 1];
        assert!(validate_line_items(&too_many).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(&DiscountSpec::Percentage(10_000)).is_ok());
        assert!(validate_discount(&DiscountSpec::Percentage(10_001)).is_err());
        assert!(validate_discount(&DiscountSpec::Fixed(Money::from_cents(1_000_000))).is_ok());
        assert!(validate_discount(&DiscountSpec::Fixed(Money::from_cents(-1))).is_err());
    }

    #[test]
    fn test_validate_tax_rate() {
        assert!(validate_tax_rate(TaxRate::from_bps(1500)).is_ok());
        assert!(validate_tax_rate(TaxRate::from_bps(10_001)).is_err());
        assert_eq!(validate_tax_rate_percent(8.25).unwrap().bps(), 825);
        assert!(validate_tax_rate_percent(100.5).is_err());
    }

    #[test]
    fn test_validate_paid_amount() {
        assert!(validate_paid_amount(Money::zero()).is_ok());
        assert!(validate_paid_amount(Money::from_cents(-100)).is_err());
    }
}
