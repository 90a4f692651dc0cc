//! # Purchase Repository
//!
//! Supplier invoices. Their tax is the input side of the VAT report.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::begin_immediate;
use crate::repository::VatReportRepository;
use mizan_core::{Money, PurchaseInvoice};

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: String,
    number: String,
    supplier_name: String,
    supplier_tax_number: Option<String>,
    date: DateTime<Utc>,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    notes: Option<String>,
}

impl From<PurchaseRow> for PurchaseInvoice {
    fn from(row: PurchaseRow) -> Self {
        PurchaseInvoice {
            id: row.id,
            number: row.number,
            supplier_name: row.supplier_name,
            supplier_tax_number: row.supplier_tax_number,
            date: row.date,
            subtotal: Money::from_cents(row.subtotal_cents),
            tax_amount: Money::from_cents(row.tax_cents),
            total: Money::from_cents(row.total_cents),
            notes: row.notes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Records `purchase` and marks the cached VAT reports covering its
    /// date stale, in one transaction.
    pub async fn create(&self, purchase: &PurchaseInvoice) -> DbResult<()> {
        let mut tx = begin_immediate(&self.pool).await?;
        Self::create_in(&mut tx, purchase).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Inserts `purchase` and invalidates the VAT reports whose period
    /// covers it.
    ///
    /// ## Returns
    /// Number of cached reports marked stale.
    pub async fn create_in(conn: &mut SqliteConnection, purchase: &PurchaseInvoice) -> DbResult<u64> {
        debug!(
            id = %purchase.id,
            supplier = %purchase.supplier_name,
            total = %purchase.total,
            "Recording purchase invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO purchase_invoices (
                id, number, supplier_name, supplier_tax_number,
                date, business_date,
                subtotal_cents, tax_cents, total_cents,
                notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.number)
        .bind(&purchase.supplier_name)
        .bind(purchase.supplier_tax_number.as_deref())
        .bind(purchase.date)
        .bind(purchase.business_date())
        .bind(purchase.subtotal.cents())
        .bind(purchase.tax_amount.cents())
        .bind(purchase.total.cents())
        .bind(purchase.notes.as_deref())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        VatReportRepository::invalidate_periods_containing_in(conn, purchase.business_date()).await
    }

    pub async fn list_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<PurchaseInvoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_in_range_in(&mut conn, start, end).await
    }

    /// Purchases whose business date falls in `[start, end]`, oldest first.
    pub async fn list_in_range_in(
        conn: &mut SqliteConnection,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<PurchaseInvoice>> {
        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, number, supplier_name, supplier_tax_number, date,
                   subtotal_cents, tax_cents, total_cents, notes
            FROM purchase_invoices
            WHERE business_date >= ?1 AND business_date <= ?2
            ORDER BY date ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(PurchaseInvoice::from).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use mizan_core::{aggregate_vat_report, VatPeriod};

    fn purchase(id: &str, day: u32, subtotal: i64) -> PurchaseInvoice {
        let subtotal = Money::from_cents(subtotal);
        let tax = subtotal.calculate_tax(mizan_core::TaxRate::default());
        PurchaseInvoice {
            id: id.to_string(),
            number: format!("SUP-{id}"),
            supplier_name: "Riyadh Poultry".to_string(),
            supplier_tax_number: Some("310000000000003".to_string()),
            date: Utc.with_ymd_and_hms(2024, 4, day, 9, 0, 0).unwrap(),
            subtotal,
            tax_amount: tax,
            total: subtotal + tax,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_in_range() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.purchases();
        repo.create(&purchase("a", 1, 20000)).await.unwrap();
        repo.create(&purchase("b", 15, 10000)).await.unwrap();
        repo.create(&purchase("c", 30, 5000)).await.unwrap();

        let first_half = repo
            .list_in_range(
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(first_half.len(), 2);
        assert_eq!(first_half[0].id, "a");
        assert_eq!(first_half[0].tax_amount.cents(), 3000);
        assert_eq!(first_half[1], purchase("b", 15, 10000));
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_marks_covering_reports_stale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let april = VatPeriod::monthly(2024, 4).unwrap();
        let may = VatPeriod::monthly(2024, 5).unwrap();
        for period in [april, may] {
            db.vat_reports()
                .upsert(&aggregate_vat_report(period, &[], &[]))
                .await
                .unwrap();
        }

        db.purchases().create(&purchase("a", 20, 20000)).await.unwrap();

        assert!(db.vat_reports().get_cached(&april).await.unwrap().unwrap().stale);
        assert!(!db.vat_reports().get_cached(&may).await.unwrap().unwrap().stale);
    }
}
