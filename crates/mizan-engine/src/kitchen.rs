//! Kitchen display operations: open tickets and per-line progress.

use tracing::info;

use crate::error::{EngineError, EngineResult};
use mizan_core::{KitchenItemStatus, KitchenOrder};
use mizan_db::Database;

#[derive(Debug, Clone)]
pub struct KitchenBoard {
    db: Database,
}

impl KitchenBoard {
    pub fn new(db: Database) -> Self {
        KitchenBoard { db }
    }

    /// Tickets with at least one line not yet served, oldest first.
    pub async fn active_orders(&self) -> EngineResult<Vec<KitchenOrder>> {
        Ok(self.db.kitchen().list_active().await?)
    }

    pub async fn order_for_invoice(&self, invoice_id: &str) -> EngineResult<Option<KitchenOrder>> {
        Ok(self.db.kitchen().get_for_invoice(invoice_id).await?)
    }

    /// Moves one ticket line to `target`.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown line
    /// - `InvalidKitchenTransition` when the line cannot move to `target`,
    ///   including when another screen moved it first
    pub async fn advance_item(
        &self,
        item_id: &str,
        target: KitchenItemStatus,
    ) -> EngineResult<KitchenItemStatus> {
        let repo = self.db.kitchen();
        let current = repo
            .get_item_status(item_id)
            .await?
            .ok_or_else(|| EngineError::not_found("KitchenOrderItem", item_id))?;

        let next = current.transition_to(target)?;
        if !repo.update_item_status(item_id, current, next).await? {
            return Err(EngineError::InvalidKitchenTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        info!(item_id = %item_id, from = %current, to = %next, "Kitchen item advanced");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{checkout_request, engine};
    use mizan_core::InvoiceStatus;

    #[tokio::test]
    async fn test_line_walks_to_served() {
        let engine = engine().await;
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap();
        let board = engine.kitchen();

        let ticket = board.order_for_invoice(&invoice.id).await.unwrap().unwrap();
        for (id, item) in ticket.items.iter().map(|i| (&i.id, i)) {
            assert_eq!(item.status, KitchenItemStatus::Pending);
            for target in [KitchenItemStatus::Preparing, KitchenItemStatus::Ready, KitchenItemStatus::Served] {
                assert_eq!(board.advance_item(id, target).await.unwrap(), target);
            }
        }

        assert!(board.active_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skipping_ahead_is_rejected() {
        let engine = engine().await;
        let invoice = engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap();
        let board = engine.kitchen();
        let ticket = board.order_for_invoice(&invoice.id).await.unwrap().unwrap();

        let err = board.advance_item(&ticket.items[0].id, KitchenItemStatus::Served).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidKitchenTransition { .. }));
        assert_eq!(board.active_orders().await.unwrap().len(), 1);

        let err = board.advance_item("nope", KitchenItemStatus::Preparing).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
