//! # Invoice Document Composer
//!
//! Turns a persisted invoice into a renderer-independent document model.
//!
//! ## Section Layout
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header     business, logo, VAT no.   │
//! ├──────────────────────────────────────┤
//! │ Details    number, date, cashier,    │
//! │            order type, customer      │
//! ├──────────────────────────────────────┤
//! │ ItemsTable # | name | price | qty |  │
//! │            line total                │
//! ├──────────────────────────────────────┤
//! │ Summary    subtotal, VAT (15%),      │
//! │            [discount], total, paid,  │
//! │            [remaining]               │
//! ├──────────────────────────────────────┤
//! │ QrBlock    QR payload + amount code  │
//! ├──────────────────────────────────────┤
//! │ Footer     notes, generated-by       │
//! └──────────────────────────────────────┘
//!      + REFUNDED watermark when refunded
//! ```
//!
//! The composer formats persisted amounts; it never recomputes subtotal, tax
//! or total. Line totals in the items table are display values of
//! `unit_price × quantity` and do not feed back into the summary.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::qr::{amount_payload, build_qr_payload, RenderTarget};
use crate::settings::BusinessSettings;
use crate::types::{CustomerRef, Invoice, InvoiceStatus, TaxRate};
use crate::validation::ValidationResult;

// =============================================================================
// Document Model
// =============================================================================

/// Structured invoice document handed to a print or PDF renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentModel {
    pub target: RenderTarget,
    pub watermark: Option<Watermark>,
    pub sections: Vec<Section>,
}

impl DocumentModel {
    pub fn summary_line(&self, kind: SummaryLineKind) -> Option<&SummaryLine> {
        self.sections.iter().find_map(|section| match section {
            Section::Summary { lines } => lines.iter().find(|line| line.kind == kind),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Watermark {
    Refunded,
}

/// One document section, in render order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum Section {
    Header {
        business_name: String,
        logo_url: Option<String>,
        tax_number: String,
        address: Option<String>,
        phone: Option<String>,
        email: Option<String>,
    },
    Details {
        invoice_number: String,
        date: String,
        cashier_name: String,
        order_type: String,
        table_number: Option<String>,
        customer: Option<CustomerBlock>,
    },
    ItemsTable {
        rows: Vec<ItemRow>,
    },
    Summary {
        lines: Vec<SummaryLine>,
    },
    QrBlock {
        payload: String,
        amount_payload: String,
        qr_size_px: u32,
        barcode_width_px: u32,
        barcode_height_px: u32,
    },
    Footer {
        notes: Option<String>,
        generated_by: String,
    },
}

impl Section {
    pub const fn name(&self) -> &'static str {
        match self {
            Section::Header { .. } => "header",
            Section::Details { .. } => "details",
            Section::ItemsTable { .. } => "items_table",
            Section::Summary { .. } => "summary",
            Section::QrBlock { .. } => "qr_block",
            Section::Footer { .. } => "footer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerBlock {
    pub name: String,
    pub phone: Option<String>,
    pub tax_number: Option<String>,
}

impl From<&CustomerRef> for CustomerBlock {
    fn from(customer: &CustomerRef) -> Self {
        CustomerBlock {
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            tax_number: customer.tax_number.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemRow {
    /// 1-based.
    pub index: u32,
    pub name: String,
    pub size: Option<String>,
    pub unit_price: String,
    pub quantity: i64,
    pub line_total: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SummaryLineKind {
    Subtotal,
    Tax,
    Discount,
    Total,
    Paid,
    Remaining,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SummaryLine {
    pub kind: SummaryLineKind,
    pub label: String,
    /// Exactly two decimals.
    pub amount: String,
}

impl SummaryLine {
    fn new(kind: SummaryLineKind, label: impl Into<String>, amount: Money) -> Self {
        SummaryLine {
            kind,
            label: label.into(),
            amount: amount.to_decimal_string(),
        }
    }
}

// =============================================================================
// Composer
// =============================================================================

/// Builds the document for `invoice`.
///
/// `tax_rate` only labels the tax line. For a stored invoice pass
/// `invoice.tax_rate` so a reprint matches its `tax_amount`.
///
/// ## Errors
/// `ValidationError` when the settings lack a business name or VAT number.
pub fn compose_document(
    invoice: &Invoice,
    settings: &BusinessSettings,
    tax_rate: TaxRate,
    target: RenderTarget,
) -> ValidationResult<DocumentModel> {
    let qr = build_qr_payload(invoice, settings)?;
    let (barcode_width_px, barcode_height_px) = target.barcode_size_px();

    let sections = vec![
        Section::Header {
            business_name: settings.business_name.clone(),
            logo_url: settings.logo_url.clone(),
            tax_number: settings.tax_number.clone(),
            address: settings.address.clone(),
            phone: settings.phone.clone(),
            email: settings.email.clone(),
        },
        Section::Details {
            invoice_number: invoice.number.clone(),
            date: invoice.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            cashier_name: invoice.cashier_name.clone(),
            order_type: invoice.order_type.label().to_string(),
            table_number: invoice.table_number.clone(),
            customer: invoice.customer.as_ref().map(CustomerBlock::from),
        },
        Section::ItemsTable {
            rows: item_rows(invoice)?,
        },
        Section::Summary {
            lines: summary_lines(invoice, tax_rate),
        },
        Section::QrBlock {
            payload: qr.to_json().map_err(|e| ValidationError::InvalidFormat {
                field: "qr_payload".to_string(),
                reason: e.to_string(),
            })?,
            amount_payload: amount_payload(invoice),
            qr_size_px: target.qr_size_px(),
            barcode_width_px,
            barcode_height_px,
        },
        Section::Footer {
            notes: settings.invoice_notes.clone(),
            generated_by: settings.generated_by.clone(),
        },
    ];

    Ok(DocumentModel {
        target,
        watermark: (invoice.status == InvoiceStatus::Refunded).then_some(Watermark::Refunded),
        sections,
    })
}

fn item_rows(invoice: &Invoice) -> ValidationResult<Vec<ItemRow>> {
    invoice
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let line_total = item
                .line_total()
                .ok_or_else(|| ValidationError::overflow("line_total"))?;
            Ok(ItemRow {
                index: i as u32 + 1,
                name: item.name.clone(),
                size: item.size.clone(),
                unit_price: item.unit_price.to_decimal_string(),
                quantity: item.quantity,
                line_total: line_total.to_decimal_string(),
            })
        })
        .collect()
}

fn summary_lines(invoice: &Invoice, tax_rate: TaxRate) -> Vec<SummaryLine> {
    let mut lines = vec![
        SummaryLine::new(SummaryLineKind::Subtotal, "Subtotal", invoice.subtotal),
        SummaryLine::new(
            SummaryLineKind::Tax,
            format!("VAT ({})", tax_rate.label()),
            invoice.tax_amount,
        ),
    ];

    if invoice.discount_amount.is_positive() {
        lines.push(SummaryLine::new(
            SummaryLineKind::Discount,
            "Discount",
            invoice.discount_amount,
        ));
    }

    lines.push(SummaryLine::new(SummaryLineKind::Total, "Total", invoice.total));
    lines.push(SummaryLine::new(SummaryLineKind::Paid, "Paid", invoice.paid_amount));

    if let Some(remaining) = invoice.remaining_amount.filter(Money::is_positive) {
        lines.push(SummaryLine::new(SummaryLineKind::Remaining, "Remaining", remaining));
    }

    lines
}

// =============================================================================
// Unit Tests
// =============================================================================
