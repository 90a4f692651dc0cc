//! # Domain Types
//!
//! Core domain types for the invoice engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐     ┌──────────────┐     ┌──────────────────────┐    │
//! │  │   LineItem   │────►│   Invoice    │────►│  PurchaseInvoice     │    │
//! │  │              │     │              │     │  (supplier side,     │    │
//! │  │ product_id   │     │ number       │     │   VAT input)         │    │
//! │  │ unit_price   │     │ subtotal     │     └──────────────────────┘    │
//! │  │ quantity     │     │ tax_amount   │                                  │
//! │  │ taxable      │     │ total        │                                  │
//! │  └──────────────┘     │ status ◄──── only mutable field                │
//! │                       └──────────────┘                                  │
//! │                                                                         │
//! │  Value objects: TaxRate (bps), TaxConfig, DiscountSpec, CustomerRef     │
//! │  Enums: InvoiceStatus, PaymentMethod, OrderType                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Line items copy the product name, size and price at checkout time, and the
//! invoice keeps the VAT rate it was priced at. A menu price or rate change
//! later never alters an issued invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate stored as basis points (1500 = 15.00%).
///
/// ```text
/// 1 basis point = 0.01%
/// 1500 bps      = 15.00%  (Saudi VAT)
/// 825 bps       = 8.25%
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (15.0 = 15%).
    ///
    /// Non-finite or negative percentages map to zero; use
    /// [`crate::validation::validate_tax_rate_percent`] on untrusted input.
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return TaxRate(0);
        }
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Human label without trailing zeros: `15%`, `8.25%`, `0.5%`.
    pub fn label(&self) -> String {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            format!("{}%", whole)
        } else if frac % 10 == 0 {
            format!("{}.{}%", whole, frac / 10)
        } else {
            format!("{}.{:02}%", whole, frac)
        }
    }
}

/// Saudi VAT standard rate.
impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(1500)
    }
}

// =============================================================================
// Tax Configuration
// =============================================================================

/// Tax settings applied to one calculation.
///
/// The invoice keeps `rate` alongside the resolved `tax_amount`; the
/// pricing regime is not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxConfig {
    pub rate: TaxRate,
    /// Menu prices already include VAT.
    pub inclusive: bool,
}

impl TaxConfig {
    pub const fn exclusive(rate: TaxRate) -> Self {
        TaxConfig { rate, inclusive: false }
    }

    pub const fn inclusive(rate: TaxRate) -> Self {
        TaxConfig { rate, inclusive: true }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product-variant-quantity entry of a cart or invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    pub variant_id: Option<String>,
    /// Product name at time of sale.
    pub name: String,
    /// Variant label ("Large", "330ml").
    pub size: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    pub taxable: bool,
}

impl LineItem {
    /// A taxable line with no variant.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> Self {
        LineItem {
            product_id: product_id.into(),
            variant_id: None,
            name: name.into(),
            size: None,
            unit_price,
            quantity,
            taxable: true,
        }
    }

    pub fn with_variant(mut self, variant_id: impl Into<String>, size: impl Into<String>) -> Self {
        self.variant_id = Some(variant_id.into());
        self.size = Some(size.into());
        self
    }

    pub fn non_taxable(mut self) -> Self {
        self.taxable = false;
        self
    }

    /// `unit_price × quantity`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul_quantity(self.quantity)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Discount requested at checkout.
///
/// Serialized as `{ "kind": "percentage", "value": 1000 }` (basis points) or
/// `{ "kind": "fixed", "value": 500 }` (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DiscountSpec {
    /// Percentage in basis points, applied to the taxed total.
    Percentage(u32),
    /// Absolute amount.
    Fixed(Money),
}

impl DiscountSpec {
    pub const fn none() -> Self {
        DiscountSpec::Fixed(Money::zero())
    }

    pub const fn is_none(&self) -> bool {
        match self {
            DiscountSpec::Percentage(bps) => *bps == 0,
            DiscountSpec::Fixed(amount) => amount.is_zero(),
        }
    }

    /// Storage tag: `percentage` or `fixed`.
    pub const fn kind(&self) -> &'static str {
        match self {
            DiscountSpec::Percentage(_) => "percentage",
            DiscountSpec::Fixed(_) => "fixed",
        }
    }

    /// Raw value: basis points or cents.
    pub fn raw_value(&self) -> i64 {
        match self {
            DiscountSpec::Percentage(bps) => *bps as i64,
            DiscountSpec::Fixed(amount) => amount.cents(),
        }
    }

    /// Rebuilds a discount from its storage columns.
    pub fn from_parts(kind: &str, value: i64) -> Result<Self, ValidationError> {
        match kind {
            "percentage" => u32::try_from(value)
                .map(DiscountSpec::Percentage)
                .map_err(|_| ValidationError::OutOfRange {
                    field: "discount".to_string(),
                    min: 0,
                    max: u32::MAX as i64,
                }),
            "fixed" => Ok(DiscountSpec::Fixed(Money::from_cents(value))),
            other => Err(ValidationError::InvalidFormat {
                field: "discount_type".to_string(),
                reason: format!("unknown discount kind '{}'", other),
            }),
        }
    }
}

impl Default for DiscountSpec {
    fn default() -> Self {
        DiscountSpec::none()
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Lifecycle state of an invoice.
///
/// ```text
///   pending ──► completed ──► refunded
///      │                         ▲
///      ├─────────────────────────┘
///      └──► cancelled
/// ```
/// See [`crate::lifecycle`] for the transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued but not settled (unpaid, awaiting kitchen, on account).
    Pending,
    /// Settled sale. Inventory has been consumed.
    Completed,
    /// Voided before completion. Terminal.
    Cancelled,
    /// Reversed. Terminal.
    Refunded,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Completed => "completed",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Refunded => "refunded",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Cancelled | InvoiceStatus::Refunded)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "completed" => Ok(InvoiceStatus::Completed),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            "refunded" => Ok(InvoiceStatus::Refunded),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ["pending", "completed", "cancelled", "refunded"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Part cash, part card.
    Mixed,
    /// Customer account; usually leaves a remaining amount.
    Credit,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mixed => "mixed",
            PaymentMethod::Credit => "credit",
        }
    }
}

// =============================================================================
// Order Type
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    DineIn,
    Takeaway,
    Delivery,
}

impl OrderType {
    /// Label printed on receipts and kitchen tickets.
    pub const fn label(&self) -> &'static str {
        match self {
            OrderType::DineIn => "Dine In",
            OrderType::Takeaway => "Takeaway",
            OrderType::Delivery => "Delivery",
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Customer attached to an invoice (B2B invoices carry a tax number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerRef {
    pub id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub tax_number: Option<String>,
}

// =============================================================================
// Invoice
// =============================================================================

/// A sales invoice.
///
/// Created once by checkout. Only `status` changes afterwards; the amounts
/// are the tax calculator's output at creation time and are never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    /// UUID v4.
    pub id: String,
    /// Sequential, unique.
    pub number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax_amount: Money,
    /// Rate `tax_amount` was computed at.
    #[serde(default)]
    pub tax_rate: TaxRate,
    /// Discount as requested.
    pub discount: DiscountSpec,
    /// Amount the discount actually removed.
    pub discount_amount: Money,
    pub total: Money,
    pub paid_amount: Money,
    /// `total − paid_amount`, present only when positive.
    pub remaining_amount: Option<Money>,
    pub payment_method: PaymentMethod,
    pub cashier_id: String,
    pub cashier_name: String,
    pub customer: Option<CustomerRef>,
    pub status: InvoiceStatus,
    pub order_type: OrderType,
    pub table_number: Option<String>,
}

impl Invoice {
    /// Remaining balance, zero when settled.
    pub fn outstanding(&self) -> Money {
        self.remaining_amount.unwrap_or_default()
    }

    /// Calendar date (UTC) used for VAT period matching.
    pub fn business_date(&self) -> chrono::NaiveDate {
        self.date.date_naive()
    }
}

/// `total − paid`, or `None` when nothing is owed.
pub fn remaining_after(total: Money, paid: Money) -> Option<Money> {
    let remaining = total - paid;
    remaining.is_positive().then_some(remaining)
}

// =============================================================================
// Purchase Invoice
// =============================================================================

/// A supplier invoice. Feeds the input-tax side of the VAT report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseInvoice {
    pub id: String,
    pub number: String,
    pub supplier_name: String,
    pub supplier_tax_number: Option<String>,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total: Money,
    pub notes: Option<String>,
}

impl PurchaseInvoice {
    pub fn business_date(&self) -> chrono::NaiveDate {
        self.date.date_naive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
