//! Document and QR composition for stored invoices, using the configured
//! business identity. The VAT line is labelled with the rate each invoice
//! was priced at.

use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use mizan_core::qr::qr_image_url;
use mizan_core::{
    build_qr_payload, compose_document, BusinessSettings, DocumentModel, Invoice, QrPayload,
    RenderTarget, ValidationError,
};
use mizan_db::Database;

/// Public QR image endpoint used when the caller has none of its own.
pub const DEFAULT_QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";

#[derive(Debug, Clone)]
pub struct DocumentService {
    db: Database,
    settings: Arc<BusinessSettings>,
}

impl DocumentService {
    pub fn new(db: Database, settings: BusinessSettings) -> Self {
        DocumentService {
            db,
            settings: Arc::new(settings),
        }
    }

    pub async fn compose(&self, invoice_id: &str, target: RenderTarget) -> EngineResult<DocumentModel> {
        let invoice = self.load(invoice_id).await?;
        Ok(compose_document(&invoice, &self.settings, invoice.tax_rate, target)?)
    }

    pub async fn qr_payload(&self, invoice_id: &str) -> EngineResult<QrPayload> {
        let invoice = self.load(invoice_id).await?;
        Ok(build_qr_payload(&invoice, &self.settings)?)
    }

    /// Image URL for the invoice's QR code, sized for `target`.
    pub async fn qr_url(&self, invoice_id: &str, target: RenderTarget) -> EngineResult<String> {
        let payload = self.qr_payload(invoice_id).await?;
        qr_image_url(DEFAULT_QR_ENDPOINT, &payload, target.qr_size_px()).map_err(|e| {
            EngineError::Validation(ValidationError::InvalidFormat {
                field: "qr_payload".to_string(),
                reason: e.to_string(),
            })
        })
    }

    async fn load(&self, invoice_id: &str) -> EngineResult<Invoice> {
        self.db
            .invoices()
            .get(invoice_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Invoice", invoice_id))
    }
}
