//! # Inventory Repository
//!
//! Ingredient stock lines, product recipes and the stock movements applied
//! for each invoice.
//!
//! Stock is only moved through [`InventoryRepository::adjust_ingredient_quantities_in`],
//! which applies signed deltas computed by `mizan_core::inventory::stock_adjustments`.
//! Quantities may go negative: a sale is never refused for stock.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use mizan_core::{InventoryItem, Measure, RecipeComponent, StockAdjustment};

#[derive(Debug, sqlx::FromRow)]
struct InventoryItemRow {
    id: String,
    name: String,
    unit: String,
    quantity_milli: i64,
    low_stock_threshold_milli: i64,
    last_updated: DateTime<Utc>,
}

impl From<InventoryItemRow> for InventoryItem {
    fn from(row: InventoryItemRow) -> Self {
        InventoryItem {
            id: row.id,
            name: row.name,
            unit: row.unit,
            quantity: Measure::from_milli(row.quantity_milli),
            low_stock_threshold: Measure::from_milli(row.low_stock_threshold_milli),
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecipeRow {
    product_id: String,
    ingredient_id: String,
    amount_per_unit_milli: i64,
}

impl From<RecipeRow> for RecipeComponent {
    fn from(row: RecipeRow) -> Self {
        RecipeComponent {
            product_id: row.product_id,
            ingredient_id: row.ingredient_id,
            amount_per_unit: Measure::from_milli(row.amount_per_unit_milli),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    ingredient_id: String,
    delta_milli: i64,
}

impl From<MovementRow> for StockAdjustment {
    fn from(row: MovementRow) -> Self {
        StockAdjustment {
            ingredient_id: row.ingredient_id,
            delta: Measure::from_milli(row.delta_milli),
        }
    }
}

/// Repository for ingredients, recipes and the per-invoice movement ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    // =========================================================================
    // Ingredients
    // =========================================================================

    pub async fn create_item(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, quantity = %item.quantity, "Creating inventory item");

        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, name, unit, quantity_milli, low_stock_threshold_milli, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.unit)
        .bind(item.quantity.milli())
        .bind(item.low_stock_threshold.milli())
        .bind(item.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_item(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let row: Option<InventoryItemRow> = sqlx::query_as(
            r#"
            SELECT id, name, unit, quantity_milli, low_stock_threshold_milli, last_updated
            FROM inventory_items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(InventoryItem::from))
    }

    pub async fn list_items(&self) -> DbResult<Vec<InventoryItem>> {
        let rows: Vec<InventoryItemRow> = sqlx::query_as(
            r#"
            SELECT id, name, unit, quantity_milli, low_stock_threshold_milli, last_updated
            FROM inventory_items
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    /// Items at or below their threshold, lowest stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<InventoryItem>> {
        let rows: Vec<InventoryItemRow> = sqlx::query_as(
            r#"
            SELECT id, name, unit, quantity_milli, low_stock_threshold_milli, last_updated
            FROM inventory_items
            WHERE quantity_milli <= low_stock_threshold_milli
            ORDER BY quantity_milli ASC, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    pub async fn count_items(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Applies signed deltas outside any wider transaction (goods received,
    /// stock count corrections).
    pub async fn adjust_ingredient_quantities(&self, adjustments: &[StockAdjustment]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::adjust_ingredient_quantities_in(&mut tx, adjustments).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Adds each delta to its ingredient's quantity.
    ///
    /// ## Errors
    /// `DbError::NotFound` if an ingredient row is missing. The caller's
    /// transaction should then be dropped so no partial movement persists.
    pub async fn adjust_ingredient_quantities_in(
        conn: &mut SqliteConnection,
        adjustments: &[StockAdjustment],
    ) -> DbResult<()> {
        let now = Utc::now();

        for adjustment in adjustments {
            debug!(
                ingredient_id = %adjustment.ingredient_id,
                delta = %adjustment.delta,
                "Adjusting ingredient quantity"
            );

            let result = sqlx::query(
                r#"
                UPDATE inventory_items
                SET quantity_milli = quantity_milli + ?1, last_updated = ?2
                WHERE id = ?3
                "#,
            )
            .bind(adjustment.delta.milli())
            .bind(now)
            .bind(&adjustment.ingredient_id)
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() == 0 {
                warn!(ingredient_id = %adjustment.ingredient_id, "Adjustment for unknown ingredient");
                return Err(DbError::not_found("InventoryItem", &adjustment.ingredient_id));
            }
        }

        Ok(())
    }

    // =========================================================================
    // Invoice movement ledger
    // =========================================================================

    pub async fn movements_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<StockAdjustment>> {
        let mut conn = self.pool.acquire().await?;
        Self::movements_for_invoice_in(&mut conn, invoice_id).await
    }

    /// Records `adjustments` as applied on behalf of `invoice_id`.
    ///
    /// Call in the same transaction as
    /// [`Self::adjust_ingredient_quantities_in`] so the ledger and the stock
    /// never disagree.
    pub async fn record_movements_in(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        adjustments: &[StockAdjustment],
    ) -> DbResult<()> {
        let now = Utc::now();

        for adjustment in adjustments {
            sqlx::query(
                r#"
                INSERT INTO invoice_stock_movements (invoice_id, ingredient_id, delta_milli, created_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(invoice_id)
            .bind(&adjustment.ingredient_id)
            .bind(adjustment.delta.milli())
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Movements recorded for `invoice_id`, in the order applied.
    pub async fn movements_for_invoice_in(
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DbResult<Vec<StockAdjustment>> {
        let rows: Vec<MovementRow> = sqlx::query_as(
            r#"
            SELECT ingredient_id, delta_milli
            FROM invoice_stock_movements
            WHERE invoice_id = ?1
            ORDER BY id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(StockAdjustment::from).collect())
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    /// Replaces the recipe of `product_id` with `components`.
    ///
    /// Components for other products are rejected.
    pub async fn set_recipe(&self, product_id: &str, components: &[RecipeComponent]) -> DbResult<()> {
        if let Some(stray) = components.iter().find(|c| c.product_id != product_id) {
            return Err(DbError::InvalidData(format!(
                "recipe component for '{}' passed to recipe of '{}'",
                stray.product_id, product_id
            )));
        }

        debug!(product_id = %product_id, components = components.len(), "Setting recipe");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM recipe_components WHERE product_id = ?1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        for component in components {
            sqlx::query(
                r#"
                INSERT INTO recipe_components (product_id, ingredient_id, amount_per_unit_milli)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(product_id)
            .bind(&component.ingredient_id)
            .bind(component.amount_per_unit.milli())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn recipe_for_products(&self, product_ids: &[&str]) -> DbResult<Vec<RecipeComponent>> {
        let mut conn = self.pool.acquire().await?;
        Self::recipe_for_products_in(&mut conn, product_ids).await
    }

    /// Recipe components for every product in `product_ids`.
    pub async fn recipe_for_products_in(
        conn: &mut SqliteConnection,
        product_ids: &[&str],
    ) -> DbResult<Vec<RecipeComponent>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT product_id, ingredient_id, amount_per_unit_milli \
             FROM recipe_components WHERE product_id IN (",
        );
        let mut ids = builder.separated(", ");
        for id in product_ids {
            ids.push_bind(id.to_string());
        }
        ids.push_unseparated(") ORDER BY product_id, ingredient_id");

        let rows: Vec<RecipeRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
        Ok(rows.into_iter().map(RecipeComponent::from).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
