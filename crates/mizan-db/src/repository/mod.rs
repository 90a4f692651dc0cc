//! # Repository Module
//!
//! Database repositories for Mizan POS.
//!
//! ## Two Entry Points per Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Standalone call                     Inside an engine transaction       │
//! │                                                                         │
//! │  db.invoices().get(id)               let mut tx = db.begin_write()      │
//! │       │                                  .await?;                       │
//! │       │                              InvoiceRepository::insert_in(      │
//! │       │  &SqlitePool                     &mut tx, &invoice)             │
//! │       ▼                              InventoryRepository::              │
//! │  InvoiceRepository                   adjust_ingredient_quantities_in(…) │
//! │                                      tx.commit().await?;                │
//! │                                             │                           │
//! │                                             │  &mut SqliteConnection    │
//! │                                             ▼                           │
//! │                          SQLite Database                                │
//! │                                                                         │
//! │  Pool methods are thin wrappers that begin, call the `_in` function,   │
//! │  and commit. The engine composes `_in` functions so that an invoice,   │
//! │  its stock movements and its kitchen ticket commit together.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`] - Sales invoices and their line items
//! - [`InventoryRepository`] - Ingredients and recipes
//! - [`PurchaseRepository`] - Supplier invoices
//! - [`VatReportRepository`] - Cached VAT reports with stale flag
//! - [`KitchenRepository`] - Kitchen tickets

pub mod inventory;
pub mod invoice;
pub mod kitchen;
pub mod purchase;
pub mod vat_report;

pub use inventory::InventoryRepository;
pub use invoice::InvoiceRepository;
pub use kitchen::KitchenRepository;
pub use purchase::PurchaseRepository;
pub use vat_report::{CachedVatReport, VatReportRepository};
