//! # mizan-core: Pure Invoice Logic for Mizan POS
//!
//! This crate is the financial heart of the Mizan restaurant POS. It holds
//! every calculation and business rule of the invoice pipeline as pure
//! functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mizan POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           POS screens / print & PDF renderers (external)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   mizan-engine: checkout, lifecycle manager, VAT reports        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mizan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌───────────┐ ┌────────┐ ┌──────────┐ ┌───────┐  │   │
//! │  │   │   tax   │ │ numbering │ │   qr   │ │ document │ │  vat  │  │   │
//! │  │   └─────────┘ └───────────┘ └────────┘ └──────────┘ └───────┘  │   │
//! │  │   ┌───────────┐ ┌───────────┐ ┌─────────┐ ┌────────────────┐   │   │
//! │  │   │ lifecycle │ │ inventory │ │ kitchen │ │ money / types  │   │   │
//! │  │   └───────────┘ └───────────┘ └─────────┘ └────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mizan-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`tax`] - Subtotal / VAT / discount / total under both pricing regimes
//! - [`numbering`] - Next sequential invoice number
//! - [`qr`] - QR and amount-barcode payloads
//! - [`document`] - Renderer-independent invoice document
//! - [`lifecycle`] - Status graph, roles, transition side effects
//! - [`inventory`] - Recipe-driven ingredient movements
//! - [`kitchen`] - Kitchen tickets
//! - [`vat`] - VAT periods and report aggregation
//! - [`settings`] - Business identity value object
//! - [`money`], [`types`], [`validation`], [`error`]
//!
//! ## Example
//!
//! ```rust
//! use mizan_core::{compute_invoice_amounts, DiscountSpec, LineItem, Money, TaxRate};
//!
//! let items = vec![LineItem::new("p-1", "Mandi", Money::from_cents(10000), 1)];
//! let amounts =
//!     compute_invoice_amounts(&items, TaxRate::from_bps(1500), &DiscountSpec::none(), true).unwrap();
//!
//! assert_eq!(amounts.tax_amount.to_string(), "13.04");
//! assert_eq!(amounts.subtotal.to_string(), "86.96");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod inventory;
pub mod kitchen;
pub mod lifecycle;
pub mod money;
pub mod numbering;
pub mod qr;
pub mod settings;
pub mod tax;
pub mod types;
pub mod validation;
pub mod vat;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use document::{compose_document, DocumentModel, Section};
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{InventoryItem, Measure, RecipeComponent, StockAdjustment};
pub use kitchen::{KitchenItemStatus, KitchenOrder, KitchenOrderItem};
pub use lifecycle::{authorize_transition, ActorPermissions, InventoryEffect, Role, SideEffects};
pub use money::Money;
pub use numbering::next_invoice_number;
pub use qr::{build_qr_payload, QrPayload, RenderTarget};
pub use settings::BusinessSettings;
pub use tax::{compute_invoice_amounts, InvoiceAmounts};
pub use types::*;
pub use vat::{aggregate_vat_report, PeriodKind, VatPeriod, VatReport};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items on one invoice.
pub const MAX_INVOICE_LINES: usize = 200;

/// Maximum quantity of a single line.
///
/// Catches keying mistakes (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
