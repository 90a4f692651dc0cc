//! # Invoice Events
//!
//! Fan-out of committed invoice changes to whoever is listening: the POS
//! screen, a kitchen display, a receipt printer queue.
//!
//! ```text
//!   checkout / lifecycle ──commit──► EventBus::publish
//!                                          │
//!                                  broadcast::Sender
//!                                   ┌──────┼──────┐
//!                                   ▼      ▼      ▼
//!                               screen  kitchen  printer
//! ```
//!
//! Events are published only after the transaction commits, so a
//! subscriber never sees a change that was rolled back. Publishing with no
//! subscribers is not an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use mizan_core::{InvoiceStatus, Money, StockAdjustment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum InvoiceEvent {
    InvoiceCreated {
        invoice_id: String,
        number: String,
        status: InvoiceStatus,
        total: Money,
    },
    StatusChanged {
        invoice_id: String,
        number: String,
        from: InvoiceStatus,
        to: InvoiceStatus,
        actor_id: String,
    },
    /// Net ingredient movement caused by one invoice.
    InventoryAdjusted {
        invoice_id: String,
        adjustments: Vec<StockAdjustment>,
    },
    KitchenOrderCreated {
        order_id: String,
        invoice_id: String,
        invoice_number: String,
    },
    /// Cached VAT reports covering `date` must be recomputed.
    VatReportsInvalidated { date: NaiveDate, reports: u64 },
}

impl InvoiceEvent {
    pub const fn kind(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated { .. } => "invoice_created",
            InvoiceEvent::StatusChanged { .. } => "status_changed",
            InvoiceEvent::InventoryAdjusted { .. } => "inventory_adjusted",
            InvoiceEvent::KitchenOrderCreated { .. } => "kitchen_order_created",
            InvoiceEvent::VatReportsInvalidated { .. } => "vat_reports_invalidated",
        }
    }
}

/// Cloneable handle to the broadcast channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<InvoiceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// A receiver sees every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<InvoiceEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: InvoiceEvent) {
        debug!(kind = event.kind(), "Publishing invoice event");
        let _ = self.tx.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = InvoiceEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(256)
    }
}
