//! # Invoice Repository
//!
//! Sales invoices and their line items.
//!
//! ## Write Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_in        invoice row + one invoice_items row per line         │
//! │                   (UNIQUE number: a racing duplicate fails here)       │
//! │                                                                         │
//! │  update_invoice_status_in                                               │
//! │                   UPDATE … SET status = to WHERE id = ? AND status =   │
//! │                   from. Returns false when another writer moved the    │
//! │                   invoice first.                                       │
//! │                                                                         │
//! │  Amounts, items and number are never updated after insert.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::begin_immediate;
use crate::repository::VatReportRepository;
use mizan_core::{
    CustomerRef, DiscountSpec, Invoice, InvoiceStatus, LineItem, Money, OrderType, PaymentMethod,
    TaxRate,
};

const INVOICE_COLUMNS: &str = r#"
    id, number, date,
    subtotal_cents, tax_cents, tax_rate_bps,
    discount_type, discount_value, discount_cents,
    total_cents, paid_cents, remaining_cents,
    payment_method, cashier_id, cashier_name,
    customer_id, customer_name, customer_phone, customer_tax_number,
    status, order_type, table_number
"#;

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    number: String,
    date: DateTime<Utc>,
    subtotal_cents: i64,
    tax_cents: i64,
    tax_rate_bps: i64,
    discount_type: String,
    discount_value: i64,
    discount_cents: i64,
    total_cents: i64,
    paid_cents: i64,
    remaining_cents: Option<i64>,
    payment_method: PaymentMethod,
    cashier_id: String,
    cashier_name: String,
    customer_id: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_tax_number: Option<String>,
    status: InvoiceStatus,
    order_type: OrderType,
    table_number: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceItemRow {
    invoice_id: String,
    product_id: String,
    variant_id: Option<String>,
    name: String,
    size: Option<String>,
    unit_price_cents: i64,
    quantity: i64,
    taxable: bool,
}

impl InvoiceItemRow {
    fn into_line_item(self) -> LineItem {
        LineItem {
            product_id: self.product_id,
            variant_id: self.variant_id,
            name: self.name,
            size: self.size,
            unit_price: Money::from_cents(self.unit_price_cents),
            quantity: self.quantity,
            taxable: self.taxable,
        }
    }
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<LineItem>) -> DbResult<Invoice> {
        let discount = DiscountSpec::from_parts(&self.discount_type, self.discount_value)?;
        let customer = self.customer_name.map(|name| CustomerRef {
            id: self.customer_id,
            name,
            phone: self.customer_phone,
            tax_number: self.customer_tax_number,
        });

        Ok(Invoice {
            id: self.id,
            number: self.number,
            date: self.date,
            items,
            subtotal: Money::from_cents(self.subtotal_cents),
            tax_amount: Money::from_cents(self.tax_cents),
            tax_rate: TaxRate::from_bps(self.tax_rate_bps.clamp(0, u32::MAX as i64) as u32),
            discount,
            discount_amount: Money::from_cents(self.discount_cents),
            total: Money::from_cents(self.total_cents),
            paid_amount: Money::from_cents(self.paid_cents),
            remaining_amount: self.remaining_cents.map(Money::from_cents),
            payment_method: self.payment_method,
            cashier_id: self.cashier_id,
            cashier_name: self.cashier_name,
            customer,
            status: self.status,
            order_type: self.order_type,
            table_number: self.table_number,
        })
    }
}

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    // =========================================================================
    // Pool-level operations
    // =========================================================================

    /// Gets an invoice with its items.
    pub async fn get(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE number = ?1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let mut invoices = Self::attach_items(&mut conn, row.into_iter().collect()).await?;
        Ok(invoices.pop())
    }

    /// Inserts an invoice outside any wider transaction and marks the
    /// cached VAT reports covering its date stale.
    ///
    /// Moves no stock and opens no kitchen ticket; checkout does that.
    pub async fn create_invoice(&self, invoice: &Invoice) -> DbResult<()> {
        let mut tx = begin_immediate(&self.pool).await?;
        Self::insert_in(&mut tx, invoice).await?;
        VatReportRepository::invalidate_periods_containing_in(&mut tx, invoice.business_date()).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Every stored invoice number.
    pub async fn list_numbers(&self) -> DbResult<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_numbers_in(&mut conn).await
    }

    /// Invoices whose business date falls in `[start, end]`, oldest first.
    pub async fn list_in_range(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_in_range_in(&mut conn, start, end).await
    }

    /// Most recent invoices first.
    pub async fn list_invoices(&self, limit: u32) -> DbResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY date DESC, CAST(number AS INTEGER) DESC LIMIT ?1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        Self::attach_items(&mut conn, rows).await
    }

    pub async fn list_by_status(&self, status: InvoiceStatus) -> DbResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE status = ?1 ORDER BY date ASC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        Self::attach_items(&mut conn, rows).await
    }

    /// See [`Self::update_invoice_status_in`]. On success the cached VAT
    /// reports covering the invoice's date are marked stale in the same
    /// transaction.
    pub async fn update_invoice_status(
        &self,
        id: &str,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> DbResult<bool> {
        let mut tx = begin_immediate(&self.pool).await?;
        if !Self::update_invoice_status_in(&mut tx, id, from, to).await? {
            return Ok(false);
        }

        let business_date: NaiveDate =
            sqlx::query_scalar("SELECT business_date FROM invoices WHERE id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        VatReportRepository::invalidate_periods_containing_in(&mut tx, business_date).await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let mut invoices = Self::attach_items(conn, row.into_iter().collect()).await?;
        Ok(invoices.pop())
    }

    /// Inserts the invoice row and its line items.
    ///
    /// A duplicate number surfaces as
    /// `DbError::UniqueViolation { field: "invoices.number", .. }`.
    pub async fn insert_in(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, number = %invoice.number, status = %invoice.status, "Inserting invoice");

        let now = Utc::now();
        let customer = invoice.customer.as_ref();

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, number, date, business_date,
                subtotal_cents, tax_cents, tax_rate_bps,
                discount_type, discount_value, discount_cents,
                total_cents, paid_cents, remaining_cents,
                payment_method, cashier_id, cashier_name,
                customer_id, customer_name, customer_phone, customer_tax_number,
                status, order_type, table_number,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16,
                ?17, ?18, ?19, ?20,
                ?21, ?22, ?23,
                ?24, ?24
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.number)
        .bind(invoice.date)
        .bind(invoice.business_date())
        .bind(invoice.subtotal.cents())
        .bind(invoice.tax_amount.cents())
        .bind(invoice.tax_rate.bps() as i64)
        .bind(invoice.discount.kind())
        .bind(invoice.discount.raw_value())
        .bind(invoice.discount_amount.cents())
        .bind(invoice.total.cents())
        .bind(invoice.paid_amount.cents())
        .bind(invoice.remaining_amount.map(|m| m.cents()))
        .bind(invoice.payment_method)
        .bind(&invoice.cashier_id)
        .bind(&invoice.cashier_name)
        .bind(customer.and_then(|c| c.id.as_deref()))
        .bind(customer.map(|c| c.name.as_str()))
        .bind(customer.and_then(|c| c.phone.as_deref()))
        .bind(customer.and_then(|c| c.tax_number.as_deref()))
        .bind(invoice.status)
        .bind(invoice.order_type)
        .bind(invoice.table_number.as_deref())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        for (position, item) in invoice.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    invoice_id, position, product_id, variant_id,
                    name, size, unit_price_cents, quantity, taxable
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&invoice.id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(item.variant_id.as_deref())
            .bind(&item.name)
            .bind(item.size.as_deref())
            .bind(item.unit_price.cents())
            .bind(item.quantity)
            .bind(item.taxable)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    pub async fn list_numbers_in(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
        let numbers: Vec<String> = sqlx::query_scalar("SELECT number FROM invoices")
            .fetch_all(&mut *conn)
            .await?;
        Ok(numbers)
    }

    /// Compare-and-set on status.
    ///
    /// ## Returns
    /// * `true` - the row was in `from` and is now in `to`
    /// * `false` - the row was missing or no longer in `from`
    pub async fn update_invoice_status_in(
        conn: &mut SqliteConnection,
        id: &str,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> DbResult<bool> {
        debug!(id = %id, from = %from, to = %to, "Updating invoice status");

        let result = sqlx::query(
            "UPDATE invoices SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .bind(from)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list_in_range_in(
        conn: &mut SqliteConnection,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE business_date >= ?1 AND business_date <= ?2 \
             ORDER BY date ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;

        Self::attach_items(conn, rows).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Loads items for `rows` in one query and builds the invoices, keeping
    /// row order.
    async fn attach_items(
        conn: &mut SqliteConnection,
        rows: Vec<InvoiceRow>,
    ) -> DbResult<Vec<Invoice>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT invoice_id, product_id, variant_id, name, size, unit_price_cents, quantity, taxable \
             FROM invoice_items WHERE invoice_id IN (",
        );
        let mut ids = builder.separated(", ");
        for row in &rows {
            ids.push_bind(row.id.clone());
        }
        ids.push_unseparated(") ORDER BY invoice_id, position");

        let item_rows: Vec<InvoiceItemRow> = builder.build_query_as().fetch_all(&mut *conn).await?;

        let mut by_invoice: HashMap<String, Vec<LineItem>> = HashMap::new();
        for item in item_rows {
            by_invoice
                .entry(item.invoice_id.clone())
                .or_default()
                .push(item.into_line_item());
        }

        rows.into_iter()
            .map(|row| {
                let items = by_invoice.remove(&row.id).unwrap_or_default();
                row.into_invoice(items)
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
