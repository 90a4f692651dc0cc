//! # VAT Report Aggregation
//!
//! Output VAT (sales) minus input VAT (purchases) for a period.
//!
//! ```text
//!  invoices in [start, end]          purchases in [start, end]
//!  except refunded / cancelled
//!        │                                   │
//!        ▼                                   ▼
//!  total_sales_before_tax = Σ subtotal   total_purchases_before_tax
//!  sales_tax              = Σ tax        purchases_tax
//!        │                                   │
//!        └──────────► net_tax_due = sales_tax − purchases_tax
//! ```
//!
//! Reports are derived data: the engine caches them per period and marks
//! them stale whenever an invoice in the period changes.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, PurchaseInvoice};
use crate::validation::ValidationResult;

// =============================================================================
// Period
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Monthly,
    Quarterly,
    Annual,
    Custom,
}

/// Inclusive calendar date range (UTC dates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatPeriod {
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub kind: PeriodKind,
}

fn invalid_period(reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "period".to_string(),
        reason: reason.to_string(),
    }
}

fn last_day_of_month(year: i32, month: u32) -> ValidationResult<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| invalid_period("date out of range"))
}

impl VatPeriod {
    pub fn monthly(year: i32, month: u32) -> ValidationResult<Self> {
        let start_date =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid_period("month must be 1-12"))?;
        Ok(VatPeriod {
            start_date,
            end_date: last_day_of_month(year, month)?,
            kind: PeriodKind::Monthly,
        })
    }

    /// `quarter` is 1-4.
    pub fn quarterly(year: i32, quarter: u32) -> ValidationResult<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(invalid_period("quarter must be 1-4"));
        }
        let first_month = (quarter - 1) * 3 + 1;
        let start_date =
            NaiveDate::from_ymd_opt(year, first_month, 1).ok_or_else(|| invalid_period("date out of range"))?;
        Ok(VatPeriod {
            start_date,
            end_date: last_day_of_month(year, first_month + 2)?,
            kind: PeriodKind::Quarterly,
        })
    }

    pub fn annual(year: i32) -> ValidationResult<Self> {
        let start_date = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| invalid_period("date out of range"))?;
        let end_date = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| invalid_period("date out of range"))?;
        Ok(VatPeriod {
            start_date,
            end_date,
            kind: PeriodKind::Annual,
        })
    }

    pub fn custom(start_date: NaiveDate, end_date: NaiveDate) -> ValidationResult<Self> {
        if start_date > end_date {
            return Err(invalid_period("start date must not be after end date"));
        }
        Ok(VatPeriod {
            start_date,
            end_date,
            kind: PeriodKind::Custom,
        })
    }

    /// The month containing `date`.
    pub fn month_of(date: NaiveDate) -> ValidationResult<Self> {
        Self::monthly(date.year(), date.month())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatReport {
    pub period: VatPeriod,
    pub total_sales_before_tax: Money,
    pub sales_tax: Money,
    pub total_purchases_before_tax: Money,
    pub purchases_tax: Money,
    /// Negative when input VAT exceeds output VAT (refund position).
    pub net_tax_due: Money,
    pub invoice_count: u32,
    pub purchase_count: u32,
}

/// Whether an invoice contributes to output VAT.
///
/// Refunded invoices are reversed sales; cancelled ones never became sales.
pub fn counts_as_sale(status: InvoiceStatus) -> bool {
    !matches!(status, InvoiceStatus::Refunded | InvoiceStatus::Cancelled)
}

/// Aggregates the report for `period`. Records outside the period are
/// ignored, so callers may pass a superset.
pub fn aggregate_vat_report(
    period: VatPeriod,
    invoices: &[Invoice],
    purchases: &[PurchaseInvoice],
) -> VatReport {
    let sales: Vec<&Invoice> = invoices
        .iter()
        .filter(|inv| counts_as_sale(inv.status) && period.contains(inv.business_date()))
        .collect();
    let bought: Vec<&PurchaseInvoice> = purchases
        .iter()
        .filter(|p| period.contains(p.business_date()))
        .collect();

    let sales_tax: Money = sales.iter().map(|inv| inv.tax_amount).sum();
    let purchases_tax: Money = bought.iter().map(|p| p.tax_amount).sum();

    VatReport {
        period,
        total_sales_before_tax: sales.iter().map(|inv| inv.subtotal).sum(),
        sales_tax,
        total_purchases_before_tax: bought.iter().map(|p| p.subtotal).sum(),
        purchases_tax,
        net_tax_due: sales_tax - purchases_tax,
        invoice_count: sales.len() as u32,
        purchase_count: bought.len() as u32,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountSpec, OrderType, PaymentMethod};
    use chrono::{TimeZone, Utc};

    fn invoice(number: &str, day: u32, status: InvoiceStatus, subtotal: i64, tax: i64) -> Invoice {
        Invoice {
            id: format!("id-{number}"),
            number: number.to_string(),
            date: Utc.with_ymd_and_hms(2024, 2, day, 10, 0, 0).unwrap(),
            items: vec![],
            subtotal: Money::from_cents(subtotal),
            tax_amount: Money::from_cents(tax),
            tax_rate: crate::types::TaxRate::default(),
            discount: DiscountSpec::none(),
            discount_amount: Money::zero(),
            total: Money::from_cents(subtotal + tax),
            paid_amount: Money::from_cents(subtotal + tax),
            remaining_amount: None,
            payment_method: PaymentMethod::Cash,
            cashier_id: "u".to_string(),
            cashier_name: "U".to_string(),
            customer: None,
            status,
            order_type: OrderType::Takeaway,
            table_number: None,
        }
    }

    fn purchase(day: u32, subtotal: i64, tax: i64) -> PurchaseInvoice {
        PurchaseInvoice {
            id: format!("po-{day}"),
            number: format!("PO-{day}"),
            supplier_name: "Fresh Farms".to_string(),
            supplier_tax_number: None,
            date: Utc.with_ymd_and_hms(2024, 2, day, 8, 0, 0).unwrap(),
            subtotal: Money::from_cents(subtotal),
            tax_amount: Money::from_cents(tax),
            total: Money::from_cents(subtotal + tax),
            notes: None,
        }
    }

    #[test]
    fn test_period_constructors() {
        let feb = VatPeriod::monthly(2024, 2).unwrap();
        assert_eq!(feb.end_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let q4 = VatPeriod::quarterly(2023, 4).unwrap();
        assert_eq!(q4.start_date, NaiveDate::from_ymd_opt(2023, 10, 1).unwrap());
        assert_eq!(q4.end_date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        assert!(VatPeriod::monthly(2024, 13).is_err());
        assert!(VatPeriod::quarterly(2024, 0).is_err());
        assert!(VatPeriod::custom(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        )
        .is_err());
        assert_eq!(VatPeriod::annual(2024).unwrap().kind, PeriodKind::Annual);
    }

    #[test]
    fn test_refunded_and_cancelled_excluded() {
        let period = VatPeriod::monthly(2024, 2).unwrap();
        let invoices = vec![
            invoice("1", 1, InvoiceStatus::Completed, 10000, 900),
            invoice("2", 2, InvoiceStatus::Refunded, 5000, 750),
            invoice("3", 3, InvoiceStatus::Cancelled, 4000, 600),
            invoice("4", 4, InvoiceStatus::Pending, 2000, 300),
        ];

        let report = aggregate_vat_report(period, &invoices, &[]);
        assert_eq!(report.total_sales_before_tax.cents(), 12000);
        assert_eq!(report.sales_tax.cents(), 1200);
        assert_eq!(report.invoice_count, 2);
    }

    #[test]
    fn test_net_tax_due_and_period_filter() {
        let period = VatPeriod::custom(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
        )
        .unwrap();
        let invoices = vec![
            invoice("1", 10, InvoiceStatus::Completed, 10000, 1500),
            invoice("2", 11, InvoiceStatus::Completed, 10000, 1500),
        ];
        let purchases = vec![purchase(5, 4000, 600), purchase(20, 9000, 1350)];

        let report = aggregate_vat_report(period, &invoices, &purchases);
        assert_eq!(report.sales_tax.cents(), 1500);
        assert_eq!(report.purchases_tax.cents(), 600);
        assert_eq!(report.total_purchases_before_tax.cents(), 4000);
        assert_eq!(report.net_tax_due.cents(), 900);
        assert_eq!(report.purchase_count, 1);
    }

    #[test]
    fn test_empty_period() {
        let report = aggregate_vat_report(VatPeriod::monthly(2024, 2).unwrap(), &[], &[]);
        assert_eq!(report.net_tax_due, Money::zero());
        assert_eq!(report.invoice_count, 0);
    }
}
