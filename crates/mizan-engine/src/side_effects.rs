//! Applies [`SideEffects`] inside the caller's transaction.
//!
//! Shared by checkout (creation effects) and the lifecycle manager
//! (transition effects). Returns the events to publish once the caller
//! commits.
//!
//! Every stock movement is also written to the invoice's movement ledger,
//! and a restock reverses that ledger.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::EngineResult;
use crate::events::InvoiceEvent;
use mizan_core::inventory::{reversal_of, stock_adjustments};
use mizan_core::{InventoryEffect, Invoice, KitchenOrder, SideEffects};
use mizan_db::{InventoryRepository, KitchenRepository, VatReportRepository};

pub(crate) async fn apply(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    effects: SideEffects,
) -> EngineResult<Vec<InvoiceEvent>> {
    let mut events = Vec::new();

    let adjustments = match effects.inventory {
        InventoryEffect::None => Vec::new(),
        InventoryEffect::Consume => {
            let product_ids: Vec<&str> = invoice.items.iter().map(|i| i.product_id.as_str()).collect();
            let recipes = InventoryRepository::recipe_for_products_in(&mut *conn, &product_ids).await?;
            stock_adjustments(&invoice.items, &recipes, InventoryEffect::Consume)?
        }
        // What the sale recorded, not what the recipe says today.
        InventoryEffect::Restock => {
            let recorded = InventoryRepository::movements_for_invoice_in(&mut *conn, &invoice.id).await?;
            reversal_of(&recorded)?
        }
    };

    if !adjustments.is_empty() {
        InventoryRepository::adjust_ingredient_quantities_in(&mut *conn, &adjustments).await?;
        InventoryRepository::record_movements_in(&mut *conn, &invoice.id, &adjustments).await?;
        debug!(
            invoice_id = %invoice.id,
            effect = ?effects.inventory,
            ingredients = adjustments.len(),
            "Inventory adjusted"
        );
        events.push(InvoiceEvent::InventoryAdjusted {
            invoice_id: invoice.id.clone(),
            adjustments,
        });
    }

    if effects.create_kitchen_order {
        let order = KitchenOrder::for_invoice(invoice, Utc::now());
        KitchenRepository::create_order_in(&mut *conn, &order).await?;
        events.push(InvoiceEvent::KitchenOrderCreated {
            order_id: order.id,
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.number.clone(),
        });
    }

    if effects.cancel_kitchen_items {
        KitchenRepository::cancel_open_items_for_invoice_in(&mut *conn, &invoice.id).await?;
    }

    if effects.invalidate_vat {
        let date = invoice.business_date();
        let reports = VatReportRepository::invalidate_periods_containing_in(&mut *conn, date).await?;
        if reports > 0 {
            events.push(InvoiceEvent::VatReportsInvalidated { date, reports });
        }
    }

    Ok(events)
}
