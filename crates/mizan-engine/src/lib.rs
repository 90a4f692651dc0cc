//! # mizan-engine: Invoice Services for Mizan POS
//!
//! Composes the pure rules of `mizan-core` and the repositories of
//! `mizan-db` into the operations a till performs: check out a cart, move
//! an invoice through its lifecycle, read a VAT report, print a receipt.
//!
//! ## Engine Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Engine                                     │
//! │                                                                         │
//! │  EngineConfig ──► Database (sqlx pool)        EventBus (broadcast)      │
//! │                        │                            ▲                   │
//! │        ┌───────────────┼───────────────┬────────────┤                   │
//! │        ▼               ▼               ▼            │                   │
//! │  CheckoutService  InvoiceLifecycle  VatReport   publish after commit    │
//! │  + number         Manager           Service                             │
//! │    allocator                                                            │
//! │        │               │                                                │
//! │        └──── side_effects::apply (stock, kitchen, VAT staleness) ────  │
//! │                                                                         │
//! │  KitchenBoard      DocumentService                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! use mizan_engine::{CheckoutRequest, Engine, EngineConfig};
//!
//! let engine = Engine::open(EngineConfig::load(None)?).await?;
//! let mut events = engine.subscribe();
//!
//! let invoice = engine.checkout(CheckoutRequest::new(cart, "u-1", "Saad")).await?;
//! let receipt = engine.compose_document(&invoice.id, RenderTarget::Receipt).await?;
//! ```

pub mod allocator;
pub mod checkout;
pub mod config;
pub mod documents;
pub mod error;
pub mod events;
pub mod kitchen;
pub mod lifecycle;
pub mod reports;
mod side_effects;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use checkout::{CheckoutRequest, CheckoutService};
pub use config::EngineConfig;
pub use documents::DocumentService;
pub use error::{EngineError, EngineResult};
pub use events::{EventBus, InvoiceEvent};
pub use kitchen::KitchenBoard;
pub use lifecycle::InvoiceLifecycleManager;
pub use reports::VatReportService;
pub use telemetry::init_tracing;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use mizan_core::{
    ActorPermissions, DiscountSpec, DocumentModel, Invoice, InvoiceAmounts, InvoiceStatus, LineItem,
    RenderTarget, VatPeriod, VatReport,
};
use mizan_db::Database;

/// All invoice services over one database and one event channel.
///
/// Cloning is cheap and clones share the numbering lock, so every clone
/// may check out concurrently.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    db: Database,
    events: EventBus,
    checkout: CheckoutService,
    lifecycle: InvoiceLifecycleManager,
    reports: VatReportService,
    kitchen: KitchenBoard,
    documents: DocumentService,
}

impl Engine {
    /// Validates `config`, opens the database and runs migrations.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database.path.display(), "Invoice engine ready");
        Ok(Self::with_database(config, db))
    }

    /// Builds the services over an already open database.
    pub fn with_database(config: EngineConfig, db: Database) -> Self {
        let events = EventBus::new(config.events.channel_capacity);

        Engine {
            checkout: CheckoutService::new(db.clone(), config.tax_config(), events.clone()),
            lifecycle: InvoiceLifecycleManager::new(db.clone(), events.clone()),
            reports: VatReportService::new(db.clone()),
            kitchen: KitchenBoard::new(db.clone()),
            documents: DocumentService::new(db.clone(), config.business.clone()),
            config: Arc::new(config),
            db,
            events,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub fn preview(&self, items: &[LineItem], discount: &DiscountSpec) -> EngineResult<InvoiceAmounts> {
        self.checkout.preview(items, discount)
    }

    pub async fn checkout(&self, request: CheckoutRequest) -> EngineResult<Invoice> {
        self.checkout.checkout(request).await
    }

    pub async fn transition(
        &self,
        invoice_id: &str,
        new_status: InvoiceStatus,
        actor: &ActorPermissions,
    ) -> EngineResult<Invoice> {
        self.lifecycle.transition(invoice_id, new_status, actor).await
    }

    pub async fn vat_report(&self, period: VatPeriod) -> EngineResult<VatReport> {
        self.reports.report(period).await
    }

    pub async fn compose_document(
        &self,
        invoice_id: &str,
        target: RenderTarget,
    ) -> EngineResult<DocumentModel> {
        self.documents.compose(invoice_id, target).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvoiceEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn lifecycle(&self) -> &InvoiceLifecycleManager {
        &self.lifecycle
    }

    pub fn reports(&self) -> &VatReportService {
        &self.reports
    }

    pub fn kitchen(&self) -> &KitchenBoard {
        &self.kitchen
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
