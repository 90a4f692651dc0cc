//! Kitchen tickets derived from completed invoices.
//!
//! One ticket per invoice, one line per invoice line item. Lines move
//! `pending → preparing → ready → served`; unserved lines are cancelled when
//! the invoice is refunded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{Invoice, OrderType};

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum KitchenItemStatus {
    Pending,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl KitchenItemStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            KitchenItemStatus::Pending => "pending",
            KitchenItemStatus::Preparing => "preparing",
            KitchenItemStatus::Ready => "ready",
            KitchenItemStatus::Served => "served",
            KitchenItemStatus::Cancelled => "cancelled",
        }
    }

    /// Still on the kitchen screen.
    pub const fn is_open(&self) -> bool {
        matches!(
            self,
            KitchenItemStatus::Pending | KitchenItemStatus::Preparing | KitchenItemStatus::Ready
        )
    }

    pub const fn can_transition_to(&self, target: KitchenItemStatus) -> bool {
        use KitchenItemStatus::*;
        matches!(
            (self, target),
            (Pending, Preparing)
                | (Preparing, Ready)
                | (Ready, Served)
                | (Pending, Cancelled)
                | (Preparing, Cancelled)
                | (Ready, Cancelled)
        )
    }

    pub fn transition_to(&self, target: KitchenItemStatus) -> CoreResult<KitchenItemStatus> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(CoreError::InvalidKitchenTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }
}

impl fmt::Display for KitchenItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KitchenOrderItem {
    pub id: String,
    pub name: String,
    pub size: Option<String>,
    pub quantity: i64,
    pub status: KitchenItemStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KitchenOrder {
    pub id: String,
    pub invoice_id: String,
    pub invoice_number: String,
    pub order_type: OrderType,
    pub table_number: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub items: Vec<KitchenOrderItem>,
}

impl KitchenOrder {
    /// New ticket for `invoice`, every line pending.
    pub fn for_invoice(invoice: &Invoice, created_at: DateTime<Utc>) -> Self {
        KitchenOrder {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.number.clone(),
            order_type: invoice.order_type,
            table_number: invoice.table_number.clone(),
            created_at,
            items: invoice
                .items
                .iter()
                .map(|item| KitchenOrderItem {
                    id: Uuid::new_v4().to_string(),
                    name: item.name.clone(),
                    size: item.size.clone(),
                    quantity: item.quantity,
                    status: KitchenItemStatus::Pending,
                })
                .collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.items.iter().any(|item| item.status.is_open())
    }
}
