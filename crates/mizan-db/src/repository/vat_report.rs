//! # VAT Report Repository
//!
//! Cache of computed VAT reports, keyed by period.
//!
//! ```text
//!   report(period) ──► get_cached ──► fresh? ──yes──► return cached
//!                                       │
//!                                       no / missing
//!                                       ▼
//!                         aggregate from invoices + purchases
//!                                       │
//!                                       ▼
//!                              upsert (stale = 0)
//!
//!   any sales or purchase invoice write on date D
//!        ──► invalidate_periods_containing(D)
//!            (stale = 1 on every cached period whose range covers D)
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use mizan_core::{Money, PeriodKind, VatPeriod, VatReport};

/// A stored report with its freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVatReport {
    pub report: VatReport,
    /// A sales or purchase invoice in the period changed after `computed_at`.
    pub stale: bool,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct VatReportRow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    kind: PeriodKind,
    total_sales_cents: i64,
    sales_tax_cents: i64,
    total_purchases_cents: i64,
    purchases_tax_cents: i64,
    net_tax_due_cents: i64,
    invoice_count: i64,
    purchase_count: i64,
    stale: bool,
    computed_at: DateTime<Utc>,
}

impl From<VatReportRow> for CachedVatReport {
    fn from(row: VatReportRow) -> Self {
        CachedVatReport {
            report: VatReport {
                period: VatPeriod {
                    start_date: row.start_date,
                    end_date: row.end_date,
                    kind: row.kind,
                },
                total_sales_before_tax: Money::from_cents(row.total_sales_cents),
                sales_tax: Money::from_cents(row.sales_tax_cents),
                total_purchases_before_tax: Money::from_cents(row.total_purchases_cents),
                purchases_tax: Money::from_cents(row.purchases_tax_cents),
                net_tax_due: Money::from_cents(row.net_tax_due_cents),
                invoice_count: row.invoice_count.max(0) as u32,
                purchase_count: row.purchase_count.max(0) as u32,
            },
            stale: row.stale,
            computed_at: row.computed_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VatReportRepository {
    pool: SqlitePool,
}

impl VatReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VatReportRepository { pool }
    }

    pub async fn get_cached(&self, period: &VatPeriod) -> DbResult<Option<CachedVatReport>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_cached_in(&mut conn, period).await
    }

    pub async fn upsert(&self, report: &VatReport) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_in(&mut conn, report, Utc::now()).await
    }

    pub async fn invalidate_periods_containing(&self, date: NaiveDate) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::invalidate_periods_containing_in(&mut conn, date).await
    }

    /// All cached reports, newest period first.
    pub async fn list_cached(&self) -> DbResult<Vec<CachedVatReport>> {
        let rows: Vec<VatReportRow> = sqlx::query_as(
            r#"
            SELECT start_date, end_date, kind,
                   total_sales_cents, sales_tax_cents,
                   total_purchases_cents, purchases_tax_cents,
                   net_tax_due_cents, invoice_count, purchase_count,
                   stale, computed_at
            FROM vat_reports
            ORDER BY start_date DESC, end_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CachedVatReport::from).collect())
    }

    pub async fn get_cached_in(
        conn: &mut SqliteConnection,
        period: &VatPeriod,
    ) -> DbResult<Option<CachedVatReport>> {
        let row: Option<VatReportRow> = sqlx::query_as(
            r#"
            SELECT start_date, end_date, kind,
                   total_sales_cents, sales_tax_cents,
                   total_purchases_cents, purchases_tax_cents,
                   net_tax_due_cents, invoice_count, purchase_count,
                   stale, computed_at
            FROM vat_reports
            WHERE start_date = ?1 AND end_date = ?2 AND kind = ?3
            "#,
        )
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(period.kind)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(CachedVatReport::from))
    }

    /// Stores `report` as fresh.
    pub async fn upsert_in(
        conn: &mut SqliteConnection,
        report: &VatReport,
        computed_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(
            start = %report.period.start_date,
            end = %report.period.end_date,
            net_tax_due = %report.net_tax_due,
            "Caching VAT report"
        );

        sqlx::query(
            r#"
            INSERT INTO vat_reports (
                start_date, end_date, kind,
                total_sales_cents, sales_tax_cents,
                total_purchases_cents, purchases_tax_cents,
                net_tax_due_cents, invoice_count, purchase_count,
                stale, computed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)
            ON CONFLICT (start_date, end_date, kind) DO UPDATE SET
                total_sales_cents     = excluded.total_sales_cents,
                sales_tax_cents       = excluded.sales_tax_cents,
                total_purchases_cents = excluded.total_purchases_cents,
                purchases_tax_cents   = excluded.purchases_tax_cents,
                net_tax_due_cents     = excluded.net_tax_due_cents,
                invoice_count         = excluded.invoice_count,
                purchase_count        = excluded.purchase_count,
                stale                 = 0,
                computed_at           = excluded.computed_at
            "#,
        )
        .bind(report.period.start_date)
        .bind(report.period.end_date)
        .bind(report.period.kind)
        .bind(report.total_sales_before_tax.cents())
        .bind(report.sales_tax.cents())
        .bind(report.total_purchases_before_tax.cents())
        .bind(report.purchases_tax.cents())
        .bind(report.net_tax_due.cents())
        .bind(report.invoice_count as i64)
        .bind(report.purchase_count as i64)
        .bind(computed_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Marks every cached period covering `date` stale.
    ///
    /// ## Returns
    /// Number of cached reports affected.
    pub async fn invalidate_periods_containing_in(
        conn: &mut SqliteConnection,
        date: NaiveDate,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE vat_reports SET stale = 1 WHERE start_date <= ?1 AND end_date >= ?1 AND stale = 0",
        )
        .bind(date)
        .execute(&mut *conn)
        .await?;

        let affected = result.rows_affected();
        if affected > 0 {
            debug!(date = %date, affected, "VAT reports marked stale");
        }
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn report(period: VatPeriod, sales_tax: i64) -> VatReport {
        VatReport {
            period,
            total_sales_before_tax: Money::from_cents(sales_tax * 100 / 15),
            sales_tax: Money::from_cents(sales_tax),
            total_purchases_before_tax: Money::zero(),
            purchases_tax: Money::zero(),
            net_tax_due: Money::from_cents(sales_tax),
            invoice_count: 3,
            purchase_count: 0,
        }
    }

    #[tokio::test]
    async fn test_upsert_then_get_is_fresh() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.vat_reports();
        let march = VatPeriod::monthly(2024, 3).unwrap();

        assert!(repo.get_cached(&march).await.unwrap().is_none());

        repo.upsert(&report(march, 1500)).await.unwrap();
        let cached = repo.get_cached(&march).await.unwrap().unwrap();
        assert!(!cached.stale);
        assert_eq!(cached.report, report(march, 1500));

        repo.upsert(&report(march, 4500)).await.unwrap();
        let cached = repo.get_cached(&march).await.unwrap().unwrap();
        assert_eq!(cached.report.sales_tax.cents(), 4500);
        assert_eq!(repo.list_cached().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_marks_overlapping_periods_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.vat_reports();
        let march = VatPeriod::monthly(2024, 3).unwrap();
        let april = VatPeriod::monthly(2024, 4).unwrap();
        let q1 = VatPeriod::quarterly(2024, 1).unwrap();
        for period in [march, april, q1] {
            repo.upsert(&report(period, 100)).await.unwrap();
        }

        let affected = repo
            .invalidate_periods_containing(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())
            .await
            .unwrap();
        assert_eq!(affected, 2);

        assert!(repo.get_cached(&march).await.unwrap().unwrap().stale);
        assert!(repo.get_cached(&q1).await.unwrap().unwrap().stale);
        assert!(!repo.get_cached(&april).await.unwrap().unwrap().stale);

        // Recompute clears the flag
        repo.upsert(&report(march, 200)).await.unwrap();
        assert!(!repo.get_cached(&march).await.unwrap().unwrap().stale);
    }
}
