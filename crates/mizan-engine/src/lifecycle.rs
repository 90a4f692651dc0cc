//! # Invoice Lifecycle Manager
//!
//! Moves a stored invoice along the status graph and applies what the move
//! implies, all in one transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     transition(id, to, actor)                           │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. load invoice                       ── missing ──► NotFound        │
//! │   2. authorize_transition(from, to)     ── role    ──► PermissionDenied│
//! │                                         ── graph   ──► InvalidTransition│
//! │   3. UPDATE … WHERE status = from       ── 0 rows  ──► InvalidTransition│
//! │   4. side effects                                                       │
//! │        pending   → completed   consume stock, open kitchen ticket      │
//! │        completed → refunded    restock, cancel unserved kitchen lines  │
//! │        pending   → cancelled   -                                       │
//! │        pending   → refunded    -                                       │
//! │        always                  VAT reports for the date go stale       │
//! │  COMMIT                                                                 │
//! │   5. publish StatusChanged (+ side-effect events)                      │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: status, stock and      │
//! │  kitchen ticket are left exactly as they were.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::events::{EventBus, InvoiceEvent};
use crate::side_effects;
use mizan_core::{authorize_transition, ActorPermissions, Invoice, InvoiceStatus, SideEffects};
use mizan_db::{Database, InvoiceRepository};

#[derive(Debug, Clone)]
pub struct InvoiceLifecycleManager {
    db: Database,
    events: EventBus,
}

impl InvoiceLifecycleManager {
    pub fn new(db: Database, events: EventBus) -> Self {
        InvoiceLifecycleManager { db, events }
    }

    /// Moves invoice `invoice_id` to `new_status` on behalf of `actor`.
    ///
    /// ## Returns
    /// The invoice as stored after the transition.
    pub async fn transition(
        &self,
        invoice_id: &str,
        new_status: InvoiceStatus,
        actor: &ActorPermissions,
    ) -> EngineResult<Invoice> {
        let mut tx = self.db.begin_write().await?;

        let mut invoice = InvoiceRepository::get_in(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Invoice", invoice_id))?;
        let from = invoice.status;

        authorize_transition(from, new_status, actor)?;

        if !InvoiceRepository::update_invoice_status_in(&mut tx, invoice_id, from, new_status).await? {
            return Err(EngineError::InvalidTransition {
                from,
                to: new_status,
            });
        }
        invoice.status = new_status;

        let side_events =
            side_effects::apply(&mut tx, &invoice, SideEffects::for_transition(from, new_status)).await?;

        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            from = %from,
            to = %new_status,
            actor = %actor.actor_id,
            "Invoice status changed"
        );

        self.events.publish(InvoiceEvent::StatusChanged {
            invoice_id: invoice.id.clone(),
            number: invoice.number.clone(),
            from,
            to: new_status,
            actor_id: actor.actor_id.clone(),
        });
        self.events.publish_all(side_events);

        Ok(invoice)
    }

    pub async fn complete(&self, invoice_id: &str, actor: &ActorPermissions) -> EngineResult<Invoice> {
        self.transition(invoice_id, InvoiceStatus::Completed, actor).await
    }

    pub async fn cancel(&self, invoice_id: &str, actor: &ActorPermissions) -> EngineResult<Invoice> {
        self.transition(invoice_id, InvoiceStatus::Cancelled, actor).await
    }

    pub async fn refund(&self, invoice_id: &str, actor: &ActorPermissions) -> EngineResult<Invoice> {
        self.transition(invoice_id, InvoiceStatus::Refunded, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cashier, checkout_request, engine, file_engine, manager, stock};
    use chrono::Utc;
    use mizan_core::{KitchenItemStatus, KitchenOrder, Measure, RecipeComponent, Role};
    use mizan_db::DbError;

    #[tokio::test]
    async fn test_refund_restores_inventory() {
        let engine = engine().await;
        let before = (stock(&engine, "chicken").await, stock(&engine, "rice").await);

        let invoice = engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap();
        assert_ne!(stock(&engine, "chicken").await, before.0);

        let refunded = engine.transition(&invoice.id, InvoiceStatus::Refunded, &manager()).await.unwrap();
        assert_eq!(refunded.status, InvoiceStatus::Refunded);
        assert_eq!((stock(&engine, "chicken").await, stock(&engine, "rice").await), before);

        let ticket = engine.database().kitchen().get_for_invoice(&invoice.id).await.unwrap().unwrap();
        assert!(ticket.items.iter().all(|i| i.status == KitchenItemStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_completing_pending_consumes_once() {
        let engine = engine().await;
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Pending)).await.unwrap();
        assert_eq!(stock(&engine, "chicken").await, 10_000_000);

        let mut rx = engine.subscribe();
        engine.lifecycle().complete(&invoice.id, &cashier()).await.unwrap();
        assert_eq!(stock(&engine, "chicken").await, 9_000_000);
        assert!(engine.database().kitchen().get_for_invoice(&invoice.id).await.unwrap().is_some());

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first,
            InvoiceEvent::StatusChanged { from: InvoiceStatus::Pending, to: InvoiceStatus::Completed, .. }
        ));

        // A second completion is not an edge and changes nothing.
        let err = engine.lifecycle().complete(&invoice.id, &cashier()).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(stock(&engine, "chicken").await, 9_000_000);
    }

    #[tokio::test]
    async fn test_cancel_pending_moves_no_stock() {
        let engine = engine().await;
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Pending)).await.unwrap();

        engine.lifecycle().cancel(&invoice.id, &manager()).await.unwrap();

        assert_eq!(stock(&engine, "chicken").await, 10_000_000);
        let stored = engine.database().invoices().get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cashier_cannot_refund() {
        let engine = engine().await;
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap();
        let consumed = stock(&engine, "chicken").await;

        let err = engine.transition(&invoice.id, InvoiceStatus::Refunded, &cashier()).await.unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");

        let stored = engine.database().invoices().get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Completed);
        assert_eq!(stock(&engine, "chicken").await, consumed);
    }

    #[tokio::test]
    async fn test_terminal_states_reject_everything() {
        let engine = engine().await;
        let admin = ActorPermissions::new("u-0", Role::Admin);
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap();
        engine.lifecycle().refund(&invoice.id, &admin).await.unwrap();

        for target in [InvoiceStatus::Pending, InvoiceStatus::Completed, InvoiceStatus::Cancelled, InvoiceStatus::Refunded] {
            let err = engine.transition(&invoice.id, target, &admin).await.unwrap_err();
            assert!(matches!(err, EngineError::InvalidTransition { from: InvoiceStatus::Refunded, .. }));
        }
    }

    #[tokio::test]
    async fn test_unknown_invoice() {
        let engine = engine().await;
        let err = engine.transition("missing", InvoiceStatus::Completed, &manager()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_refund_returns_what_the_sale_took_after_recipe_change() {
        let engine = engine().await;
        let before = (stock(&engine, "chicken").await, stock(&engine, "rice").await);
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap();

        // Bigger portions from now on, and rice dropped from the dish.
        engine
            .database()
            .inventory()
            .set_recipe(
                "mandi",
                &[RecipeComponent {
                    product_id: "mandi".to_string(),
                    ingredient_id: "chicken".to_string(),
                    amount_per_unit: Measure::from_units(800),
                }],
            )
            .await
            .unwrap();

        engine.lifecycle().refund(&invoice.id, &manager()).await.unwrap();
        assert_eq!((stock(&engine, "chicken").await, stock(&engine, "rice").await), before);

        // The ledger for the invoice now nets to zero.
        let ledger = engine.database().inventory().movements_for_invoice(&invoice.id).await.unwrap();
        assert_eq!(ledger.len(), 4);
        assert!(mizan_core::inventory::reversal_of(&ledger).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_completion_leaves_invoice_pending() {
        let engine = engine().await;
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Pending)).await.unwrap();

        // A ticket already exists, so opening one during completion fails
        // after the status update and the stock movement.
        engine
            .database()
            .kitchen()
            .create_order(&KitchenOrder::for_invoice(&invoice, Utc::now()))
            .await
            .unwrap();

        let err = engine.lifecycle().complete(&invoice.id, &cashier()).await.unwrap_err();
        assert_eq!(err.code(), "DATABASE_ERROR");

        let stored = engine.database().invoices().get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Pending);
        assert_eq!(stock(&engine, "chicken").await, 10_000_000);
        assert!(engine.database().inventory().movements_for_invoice(&invoice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refund_leaves_invoice_completed() {
        let engine = engine().await;
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap();
        let chicken = stock(&engine, "chicken").await;

        sqlx::query("DELETE FROM inventory_items WHERE id = 'rice'")
            .execute(engine.database().pool())
            .await
            .unwrap();

        let err = engine.lifecycle().refund(&invoice.id, &manager()).await.unwrap_err();
        assert!(matches!(err, EngineError::Persistence(DbError::NotFound { .. })), "got {err:?}");

        let stored = engine.database().invoices().get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Completed);
        assert_eq!(stock(&engine, "chicken").await, chicken);
        let ticket = engine.database().kitchen().get_for_invoice(&invoice.id).await.unwrap().unwrap();
        assert!(ticket.items.iter().all(|i| i.status == KitchenItemStatus::Pending));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_and_refunds_on_file_database() {
        let (engine, dir) = file_engine().await;

        let mut sold = Vec::new();
        for _ in 0..4 {
            sold.push(engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap());
        }

        let mut tasks = Vec::new();
        for invoice in sold {
            let refund_engine = engine.clone();
            tasks.push(tokio::spawn(async move {
                refund_engine.lifecycle().refund(&invoice.id, &manager()).await.map(|i| i.number)
            }));
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move {
                engine.checkout(checkout_request(InvoiceStatus::Completed)).await.map(|i| i.number)
            }));
        }

        let mut numbers = Vec::new();
        for task in tasks {
            numbers.push(task.await.unwrap().unwrap());
        }
        numbers.sort_by_key(|n| n.parse::<u32>().unwrap());
        numbers.dedup();
        assert_eq!(numbers.len(), 8);

        // Four refunded, four still sold: 4 × 2 × 500 g chicken consumed.
        assert_eq!(stock(&engine, "chicken").await, 10_000_000 - 4_000_000);
        assert_eq!(stock(&engine, "rice").await, 5_000_000 - 2_000_000);

        engine.close().await;
        std::fs::remove_dir_all(dir).unwrap();
    }
}
