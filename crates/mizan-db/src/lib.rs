//! # mizan-db: Persistence for Mizan POS
//!
//! SQLite storage for invoices, ingredient stock, purchases, the VAT report
//! cache and kitchen tickets. Uses sqlx with runtime-checked queries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mizan POS Data Flow                              │
//! │                                                                         │
//! │  mizan-engine (checkout / lifecycle / VAT report)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     mizan-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo    │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo  │    │ 002_stock…   │  │   │
//! │  │   │ begin() → tx  │    │ PurchaseRepo   │    │              │  │   │
//! │  │   │               │    │ VatReportRepo  │    │              │  │   │
//! │  │   │               │    │ KitchenRepo    │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mizan_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./mizan.db")).await?;
//!
//! let low = db.inventory().low_stock().await?;
//! let invoice = db.invoices().get("f3a1…").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    CachedVatReport, InventoryRepository, InvoiceRepository, KitchenRepository, PurchaseRepository,
    VatReportRepository,
};
