//! # VAT Report Service
//!
//! Reports are cached per period and recomputed on read once any sales or
//! purchase invoice in the period changes. Those writes only flip the stale
//! flag; the aggregation cost is paid by whoever asks for the report next.

use chrono::Utc;
use tracing::debug;

use crate::error::EngineResult;
use mizan_core::{aggregate_vat_report, VatPeriod, VatReport};
use mizan_db::{CachedVatReport, Database, InvoiceRepository, PurchaseRepository, VatReportRepository};

#[derive(Debug, Clone)]
pub struct VatReportService {
    db: Database,
}

impl VatReportService {
    pub fn new(db: Database) -> Self {
        VatReportService { db }
    }

    /// Report for `period`, served from cache when still fresh.
    pub async fn report(&self, period: VatPeriod) -> EngineResult<VatReport> {
        let mut conn = self.db.pool().acquire().await?;

        if let Some(cached) = VatReportRepository::get_cached_in(&mut conn, &period).await? {
            if !cached.stale {
                debug!(start = %period.start_date, end = %period.end_date, "VAT report cache hit");
                return Ok(cached.report);
            }
        }
        drop(conn);

        self.refresh(period).await
    }

    /// Recomputes `period` from invoices and purchases and caches the result.
    ///
    /// Reads and the cache write share a transaction, so an invoice change
    /// committed meanwhile cannot be overwritten by a fresh flag.
    pub async fn refresh(&self, period: VatPeriod) -> EngineResult<VatReport> {
        let mut tx = self.db.begin_write().await?;

        let invoices =
            InvoiceRepository::list_in_range_in(&mut tx, period.start_date, period.end_date).await?;
        let purchases =
            PurchaseRepository::list_in_range_in(&mut tx, period.start_date, period.end_date).await?;

        let report = aggregate_vat_report(period, &invoices, &purchases);
        VatReportRepository::upsert_in(&mut tx, &report, Utc::now()).await?;
        tx.commit().await?;

        debug!(
            start = %period.start_date,
            end = %period.end_date,
            invoices = report.invoice_count,
            net_tax_due = %report.net_tax_due,
            "VAT report recomputed"
        );
        Ok(report)
    }

    pub async fn monthly(&self, year: i32, month: u32) -> EngineResult<VatReport> {
        self.report(VatPeriod::monthly(year, month)?).await
    }

    pub async fn quarterly(&self, year: i32, quarter: u32) -> EngineResult<VatReport> {
        self.report(VatPeriod::quarterly(year, quarter)?).await
    }

    /// Every cached report with its freshness, newest period first.
    pub async fn cached(&self) -> EngineResult<Vec<CachedVatReport>> {
        Ok(self.db.vat_reports().list_cached().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{checkout_request, engine, manager, on_day};
    use chrono::Datelike;
    use mizan_core::{InvoiceStatus, Money, PurchaseInvoice};

    #[tokio::test]
    async fn test_refund_drops_vat_contribution() {
        let engine = engine().await;
        let mut request = checkout_request(InvoiceStatus::Completed);
        request.date = Some(on_day(2024, 3, 10));
        let kept = engine.checkout(request.clone()).await.unwrap();
        let refunded = engine.checkout(request).await.unwrap();

        let march = VatPeriod::monthly(2024, 3).unwrap();
        let report = engine.vat_report(march).await.unwrap();
        assert_eq!(report.invoice_count, 2);
        assert_eq!(report.sales_tax, kept.tax_amount + refunded.tax_amount);

        engine.transition(&refunded.id, InvoiceStatus::Refunded, &manager()).await.unwrap();
        assert!(engine.reports().cached().await.unwrap()[0].stale);

        let report = engine.vat_report(march).await.unwrap();
        assert_eq!(report.invoice_count, 1);
        assert_eq!(report.sales_tax, kept.tax_amount);
        assert_eq!(report.total_sales_before_tax, kept.subtotal);
        assert!(!engine.reports().cached().await.unwrap()[0].stale);
    }

    #[tokio::test]
    async fn test_purchases_offset_sales_tax() {
        let engine = engine().await;
        let mut request = checkout_request(InvoiceStatus::Completed);
        request.date = Some(on_day(2024, 5, 2));
        let sale = engine.checkout(request).await.unwrap();

        let subtotal = Money::from_cents(2000);
        engine
            .database()
            .purchases()
            .create(&PurchaseInvoice {
                id: "p-1".to_string(),
                number: "SUP-1".to_string(),
                supplier_name: "Al Wadi Grains".to_string(),
                supplier_tax_number: None,
                date: on_day(2024, 5, 20),
                subtotal,
                tax_amount: Money::from_cents(300),
                total: Money::from_cents(2300),
                notes: None,
            })
            .await
            .unwrap();

        let report = engine.reports().monthly(2024, 5).await.unwrap();
        assert_eq!(report.purchases_tax.cents(), 300);
        assert_eq!(report.net_tax_due, sale.tax_amount - Money::from_cents(300));

        let quarter = engine.reports().quarterly(2024, 2).await.unwrap();
        assert_eq!(quarter.net_tax_due, report.net_tax_due);
        assert_eq!(quarter.period.start_date.month(), 4);
    }

    #[tokio::test]
    async fn test_cache_served_until_invalidated() {
        let engine = engine().await;
        let april = VatPeriod::monthly(2024, 4).unwrap();

        let empty = engine.vat_report(april).await.unwrap();
        assert_eq!(empty.invoice_count, 0);

        // A sale outside April leaves the April report fresh.
        let mut request = checkout_request(InvoiceStatus::Completed);
        request.date = Some(on_day(2024, 6, 1));
        engine.checkout(request).await.unwrap();
        let cached = engine.database().vat_reports().get_cached(&april).await.unwrap().unwrap();
        assert!(!cached.stale);

        let mut request = checkout_request(InvoiceStatus::Completed);
        request.date = Some(on_day(2024, 4, 30));
        engine.checkout(request).await.unwrap();
        let cached = engine.database().vat_reports().get_cached(&april).await.unwrap().unwrap();
        assert!(cached.stale);

        assert_eq!(engine.vat_report(april).await.unwrap().invoice_count, 1);
    }

    #[tokio::test]
    async fn test_purchase_after_read_refreshes_report() {
        let engine = engine().await;
        let may = VatPeriod::monthly(2024, 5).unwrap();
        let mut request = checkout_request(InvoiceStatus::Completed);
        request.date = Some(on_day(2024, 5, 2));
        let sale = engine.checkout(request).await.unwrap();

        let before = engine.vat_report(may).await.unwrap();
        assert_eq!(before.purchases_tax, Money::zero());

        engine
            .database()
            .purchases()
            .create(&PurchaseInvoice {
                id: "p-2".to_string(),
                number: "SUP-2".to_string(),
                supplier_name: "Al Wadi Grains".to_string(),
                supplier_tax_number: None,
                date: on_day(2024, 5, 20),
                subtotal: Money::from_cents(2000),
                tax_amount: Money::from_cents(300),
                total: Money::from_cents(2300),
                notes: None,
            })
            .await
            .unwrap();

        let after = engine.vat_report(may).await.unwrap();
        assert_eq!(after.purchases_tax.cents(), 300);
        assert_eq!(after.purchase_count, 1);
        assert_eq!(after.net_tax_due, sale.tax_amount - Money::from_cents(300));
    }
}
