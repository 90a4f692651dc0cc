//! # Checkout
//!
//! Turns a cart into a persisted invoice.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Checkout Flow                                 │
//! │                                                                         │
//! │  CheckoutRequest                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate cart, discount, paid amount, initial status                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute amounts (configured rate + pricing regime)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  acquire number permit ─────────────────────────────┐                  │
//! │       │                                              │ duplicate       │
//! │       ▼                                              │ number:         │
//! │  BEGIN                                               │ retry (max 3)   │
//! │    number = max(existing) + 1                        │                  │
//! │    INSERT invoice + lines ───────────────────────────┘                  │
//! │    completed? consume recipe stock, open kitchen ticket                │
//! │    mark VAT reports for the invoice date stale                         │
//! │  COMMIT                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  publish InvoiceCreated (+ side-effect events)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocator::{AllocationPermit, InvoiceNumberAllocator, MAX_ALLOCATION_ATTEMPTS};
use crate::error::EngineResult;
use crate::events::{EventBus, InvoiceEvent};
use crate::side_effects;
use mizan_core::tax::compute_with_config;
use mizan_core::validation::{validate_discount, validate_line_items, validate_paid_amount};
use mizan_core::{
    remaining_after, CustomerRef, DiscountSpec, Invoice, InvoiceAmounts, InvoiceStatus, LineItem,
    Money, OrderType, PaymentMethod, SideEffects, TaxConfig, ValidationError,
};
use mizan_db::{Database, InvoiceRepository};

/// A cart ready to be invoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<LineItem>,
    pub discount: DiscountSpec,
    pub paid_amount: Money,
    pub payment_method: PaymentMethod,
    pub cashier_id: String,
    pub cashier_name: String,
    pub customer: Option<CustomerRef>,
    pub order_type: OrderType,
    pub table_number: Option<String>,
    /// `Completed` for a settled sale, `Pending` for an open tab.
    pub status: InvoiceStatus,
    /// Defaults to now. Set when back-entering a paper invoice.
    pub date: Option<DateTime<Utc>>,
}

impl CheckoutRequest {
    /// A settled cash sale with no discount; adjust fields as needed.
    pub fn new(
        items: Vec<LineItem>,
        cashier_id: impl Into<String>,
        cashier_name: impl Into<String>,
    ) -> Self {
        CheckoutRequest {
            items,
            discount: DiscountSpec::none(),
            paid_amount: Money::zero(),
            payment_method: PaymentMethod::Cash,
            cashier_id: cashier_id.into(),
            cashier_name: cashier_name.into(),
            customer: None,
            order_type: OrderType::default(),
            table_number: None,
            status: InvoiceStatus::Completed,
            date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::required("items"));
        }
        validate_line_items(&self.items)?;
        validate_discount(&self.discount)?;
        validate_paid_amount(self.paid_amount)?;

        if !matches!(self.status, InvoiceStatus::Pending | InvoiceStatus::Completed) {
            return Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    InvoiceStatus::Pending.to_string(),
                    InvoiceStatus::Completed.to_string(),
                ],
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    tax: TaxConfig,
    allocator: Arc<InvoiceNumberAllocator>,
    events: EventBus,
}

impl CheckoutService {
    pub fn new(db: Database, tax: TaxConfig, events: EventBus) -> Self {
        CheckoutService {
            db,
            tax,
            allocator: Arc::new(InvoiceNumberAllocator::new()),
            events,
        }
    }

    /// Totals for a cart on screen, nothing persisted.
    pub fn preview(&self, items: &[LineItem], discount: &DiscountSpec) -> EngineResult<InvoiceAmounts> {
        validate_line_items(items)?;
        validate_discount(discount)?;
        Ok(compute_with_config(items, &self.tax, discount)?)
    }

    /// Validates, prices, numbers and stores the cart as one invoice.
    ///
    /// ## Errors
    /// - `Validation` for a malformed cart; nothing is written
    /// - `Persistence` when the database fails; the transaction rolls back
    pub async fn checkout(&self, request: CheckoutRequest) -> EngineResult<Invoice> {
        request.validate()?;
        let amounts = compute_with_config(&request.items, &self.tax, &request.discount)?;

        let permit = self.allocator.acquire().await;
        let mut attempt = 1;
        let (invoice, side_events) = loop {
            match self.insert(&permit, &request, &amounts).await {
                Err(e) if e.is_duplicate_number() && attempt < MAX_ALLOCATION_ATTEMPTS => {
                    warn!(attempt, "Invoice number taken by another writer, retrying");
                    attempt += 1;
                }
                result => break result?,
            }
        };
        drop(permit);

        info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            status = %invoice.status,
            total = %invoice.total,
            "Invoice created"
        );

        self.events.publish(InvoiceEvent::InvoiceCreated {
            invoice_id: invoice.id.clone(),
            number: invoice.number.clone(),
            status: invoice.status,
            total: invoice.total,
        });
        self.events.publish_all(side_events);

        Ok(invoice)
    }

    async fn insert(
        &self,
        permit: &AllocationPermit<'_>,
        request: &CheckoutRequest,
        amounts: &InvoiceAmounts,
    ) -> EngineResult<(Invoice, Vec<InvoiceEvent>)> {
        let mut tx = self.db.begin_write().await?;

        let number = permit.next_number(&mut tx).await?;
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            number,
            date: request.date.unwrap_or_else(Utc::now),
            items: request.items.clone(),
            subtotal: amounts.subtotal,
            tax_amount: amounts.tax_amount,
            tax_rate: self.tax.rate,
            discount: request.discount,
            discount_amount: amounts.discount_amount,
            total: amounts.total,
            paid_amount: request.paid_amount,
            remaining_amount: remaining_after(amounts.total, request.paid_amount),
            payment_method: request.payment_method,
            cashier_id: request.cashier_id.clone(),
            cashier_name: request.cashier_name.clone(),
            customer: request.customer.clone(),
            status: request.status,
            order_type: request.order_type,
            table_number: request.table_number.clone(),
        };

        InvoiceRepository::insert_in(&mut tx, &invoice).await?;
        let events =
            side_effects::apply(&mut tx, &invoice, SideEffects::for_creation(invoice.status)).await?;

        tx.commit().await?;
        Ok((invoice, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::testing::{cart, checkout_request, engine, stock, stored_invoice};
    use mizan_core::KitchenItemStatus;

    #[tokio::test]
    async fn test_completed_checkout_consumes_stock_and_opens_ticket() {
        let engine = engine().await;
        let mut rx = engine.subscribe();

        let invoice = engine.checkout(checkout_request(InvoiceStatus::Completed)).await.unwrap();

        assert_eq!(invoice.number, "1");
        // 2 × 40.00 + 3.00 at 15% exclusive
        assert_eq!(invoice.subtotal.cents(), 8300);
        assert_eq!(invoice.tax_amount.cents(), 1245);
        assert_eq!(invoice.total.cents(), 9545);
        assert!(invoice.remaining_amount.is_none());

        // Two mandi: 2 × 500 g chicken, 2 × 250 g rice
        assert_eq!(stock(&engine, "chicken").await, 10_000_000 - 1_000_000);
        assert_eq!(stock(&engine, "rice").await, 5_000_000 - 500_000);

        let ticket = engine.database().kitchen().get_for_invoice(&invoice.id).await.unwrap().unwrap();
        assert_eq!(ticket.items.len(), 2);
        assert!(ticket.items.iter().all(|i| i.status == KitchenItemStatus::Pending));

        let stored = engine.database().invoices().get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored, invoice);

        assert_eq!(rx.recv().await.unwrap().kind(), "invoice_created");
        assert_eq!(rx.recv().await.unwrap().kind(), "inventory_adjusted");
        assert_eq!(rx.recv().await.unwrap().kind(), "kitchen_order_created");
    }

    #[tokio::test]
    async fn test_pending_checkout_leaves_stock_alone() {
        let engine = engine().await;

        let mut request = checkout_request(InvoiceStatus::Pending);
        request.paid_amount = Money::zero();
        let invoice = engine.checkout(request).await.unwrap();

        assert_eq!(invoice.remaining_amount, Some(invoice.total));
        assert_eq!(stock(&engine, "chicken").await, 10_000_000);
        assert!(engine.database().kitchen().get_for_invoice(&invoice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_numbers_are_sequential() {
        let engine = engine().await;
        let mut numbers = Vec::new();
        for _ in 0..3 {
            numbers.push(engine.checkout(checkout_request(InvoiceStatus::Pending)).await.unwrap().number);
        }
        assert_eq!(numbers, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_get_distinct_numbers() {
        let engine = engine().await;

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.checkout(checkout_request(InvoiceStatus::Pending)).await.unwrap().number
                })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().parse::<u64>().unwrap());
        }
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_numbering_skips_non_numeric() {
        let engine = engine().await;
        for number in ["1", "3", "abc", "5"] {
            engine.database().invoices().create_invoice(&stored_invoice(number)).await.unwrap();
        }

        let next = engine.checkout(checkout_request(InvoiceStatus::Pending)).await.unwrap();
        assert_eq!(next.number, "6");
    }

    #[tokio::test]
    async fn test_invalid_cart_writes_nothing() {
        let engine = engine().await;

        let empty = CheckoutRequest::new(Vec::new(), "u-1", "Saad");
        assert!(matches!(
            engine.checkout(empty).await,
            Err(EngineError::Validation(ValidationError::Required { .. }))
        ));

        let mut refunded = checkout_request(InvoiceStatus::Refunded);
        refunded.items = cart();
        assert!(matches!(
            engine.checkout(refunded).await,
            Err(EngineError::Validation(ValidationError::NotAllowed { .. }))
        ));

        let mut negative = checkout_request(InvoiceStatus::Completed);
        negative.discount = DiscountSpec::Fixed(Money::from_cents(-100));
        assert!(engine.checkout(negative).await.is_err());

        assert_eq!(engine.database().invoices().count().await.unwrap(), 0);
        assert_eq!(stock(&engine, "chicken").await, 10_000_000);
    }

    #[tokio::test]
    async fn test_preview_matches_checkout() {
        let engine = engine().await;
        let request = checkout_request(InvoiceStatus::Completed);

        let preview = engine.preview(&request.items, &request.discount).unwrap();
        let invoice = engine.checkout(request).await.unwrap();

        assert_eq!(preview.total, invoice.total);
        assert_eq!(preview.tax_amount, invoice.tax_amount);
    }
}
