//! # Kitchen Repository
//!
//! Kitchen tickets and their per-line status.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use mizan_core::{KitchenItemStatus, KitchenOrder, KitchenOrderItem, OrderType};

#[derive(Debug, sqlx::FromRow)]
struct KitchenOrderRow {
    id: String,
    invoice_id: String,
    invoice_number: String,
    order_type: OrderType,
    table_number: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct KitchenItemRow {
    id: String,
    order_id: String,
    name: String,
    size: Option<String>,
    quantity: i64,
    status: KitchenItemStatus,
}

#[derive(Debug, Clone)]
pub struct KitchenRepository {
    pool: SqlitePool,
}

impl KitchenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        KitchenRepository { pool }
    }

    pub async fn create_order(&self, order: &KitchenOrder) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::create_order_in(&mut tx, order).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_for_invoice(&self, invoice_id: &str) -> DbResult<Option<KitchenOrder>> {
        let row: Option<KitchenOrderRow> = sqlx::query_as(
            r#"
            SELECT id, invoice_id, invoice_number, order_type, table_number, created_at
            FROM kitchen_orders
            WHERE invoice_id = ?1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let mut orders = Self::attach_items(&mut conn, row.into_iter().collect()).await?;
        Ok(orders.pop())
    }

    /// Tickets with at least one line still pending, preparing or ready,
    /// oldest first.
    pub async fn list_active(&self) -> DbResult<Vec<KitchenOrder>> {
        let rows: Vec<KitchenOrderRow> = sqlx::query_as(
            r#"
            SELECT o.id, o.invoice_id, o.invoice_number, o.order_type, o.table_number, o.created_at
            FROM kitchen_orders o
            WHERE EXISTS (
                SELECT 1 FROM kitchen_order_items i
                WHERE i.order_id = o.id AND i.status IN ('pending', 'preparing', 'ready')
            )
            ORDER BY o.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        Self::attach_items(&mut conn, rows).await
    }

    pub async fn get_item_status(&self, item_id: &str) -> DbResult<Option<KitchenItemStatus>> {
        let status: Option<KitchenItemStatus> =
            sqlx::query_scalar("SELECT status FROM kitchen_order_items WHERE id = ?1")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(status)
    }

    /// Moves one line from `from` to `to`.
    ///
    /// The caller checks the transition with
    /// [`KitchenItemStatus::transition_to`]; this only guards against a
    /// concurrent change. Returns `false` if the line was no longer in `from`.
    pub async fn update_item_status(
        &self,
        item_id: &str,
        from: KitchenItemStatus,
        to: KitchenItemStatus,
    ) -> DbResult<bool> {
        debug!(item_id = %item_id, from = %from, to = %to, "Updating kitchen item");

        let result = sqlx::query(
            "UPDATE kitchen_order_items SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(to)
        .bind(Utc::now())
        .bind(item_id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn cancel_open_items_for_invoice(&self, invoice_id: &str) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::cancel_open_items_for_invoice_in(&mut conn, invoice_id).await
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    pub async fn create_order_in(conn: &mut SqliteConnection, order: &KitchenOrder) -> DbResult<()> {
        debug!(
            id = %order.id,
            invoice_number = %order.invoice_number,
            items = order.items.len(),
            "Creating kitchen order"
        );

        sqlx::query(
            r#"
            INSERT INTO kitchen_orders (
                id, invoice_id, invoice_number, order_type, table_number, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order.id)
        .bind(&order.invoice_id)
        .bind(&order.invoice_number)
        .bind(order.order_type)
        .bind(order.table_number.as_deref())
        .bind(order.created_at)
        .execute(&mut *conn)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO kitchen_order_items (
                    id, order_id, position, name, size, quantity, status, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(position as i64)
            .bind(&item.name)
            .bind(item.size.as_deref())
            .bind(item.quantity)
            .bind(item.status)
            .bind(order.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Cancels every line of the invoice's ticket that has not been served.
    ///
    /// ## Returns
    /// Number of lines cancelled (0 when the invoice has no ticket).
    pub async fn cancel_open_items_for_invoice_in(
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE kitchen_order_items
            SET status = 'cancelled', updated_at = ?1
            WHERE status IN ('pending', 'preparing', 'ready')
              AND order_id IN (SELECT id FROM kitchen_orders WHERE invoice_id = ?2)
            "#,
        )
        .bind(Utc::now())
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

        debug!(invoice_id = %invoice_id, cancelled = result.rows_affected(), "Kitchen items cancelled");
        Ok(result.rows_affected())
    }

    async fn attach_items(
        conn: &mut SqliteConnection,
        rows: Vec<KitchenOrderRow>,
    ) -> DbResult<Vec<KitchenOrder>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, order_id, name, size, quantity, status \
             FROM kitchen_order_items WHERE order_id IN (",
        );
        let mut ids = builder.separated(", ");
        for row in &rows {
            ids.push_bind(row.id.clone());
        }
        ids.push_unseparated(") ORDER BY order_id, position");

        let item_rows: Vec<KitchenItemRow> = builder.build_query_as().fetch_all(&mut *conn).await?;

        let mut by_order: HashMap<String, Vec<KitchenOrderItem>> = HashMap::new();
        for item in item_rows {
            by_order.entry(item.order_id).or_default().push(KitchenOrderItem {
                id: item.id,
                name: item.name,
                size: item.size,
                quantity: item.quantity,
                status: item.status,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| KitchenOrder {
                items: by_order.remove(&row.id).unwrap_or_default(),
                id: row.id,
                invoice_id: row.invoice_id,
                invoice_number: row.invoice_number,
                order_type: row.order_type,
                table_number: row.table_number,
                created_at: row.created_at,
            })
            .collect())
    }
}
