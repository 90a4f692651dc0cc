//! # QR Payload Builder
//!
//! Builds the data embedded in an invoice's QR code and amount barcode.
//!
//! ```text
//! Invoice + BusinessSettings
//!      │
//!      ▼
//! {"invoiceNumber":"42","total":"109.00","date":"2024-03-01T12:00:00Z",
//!  "businessName":"Al Baik","taxNumber":"300000000000003"}
//!      │                                   │
//!      ▼                                   ▼
//! QR image request (url-encoded)     amount barcode: "109.00"
//! ```
//!
//! Image generation is outside this crate. The renderer receives the payload
//! strings and the pixel sizes of [`RenderTarget`].

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::settings::BusinessSettings;
use crate::types::Invoice;
use crate::validation::ValidationResult;

// =============================================================================
// Render Target
// =============================================================================

/// Where a document is rendered. Only affects sizes, never content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RenderTarget {
    /// 80mm thermal receipt.
    #[default]
    Receipt,
    /// A4 PDF.
    Pdf,
}

impl RenderTarget {
    pub const fn qr_size_px(&self) -> u32 {
        match self {
            RenderTarget::Receipt => 150,
            RenderTarget::Pdf => 100,
        }
    }

    /// Barcode `(width, height)` in pixels.
    pub const fn barcode_size_px(&self) -> (u32, u32) {
        match self {
            RenderTarget::Receipt => (200, 50),
            RenderTarget::Pdf => (150, 40),
        }
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Canonical invoice summary carried by the QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub invoice_number: String,
    /// Two-decimal string, e.g. `"109.00"`.
    pub total: String,
    /// RFC 3339, UTC, second precision.
    pub date: String,
    pub business_name: String,
    pub tax_number: String,
}

impl QrPayload {
    /// JSON string handed to the QR renderer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Form-encoded JSON for an image request query string.
    pub fn url_encoded(&self) -> Result<String, serde_json::Error> {
        let json = self.to_json()?;
        Ok(url::form_urlencoded::byte_serialize(json.as_bytes()).collect())
    }
}

/// Builds the QR payload for `invoice`.
///
/// ## Errors
/// `ValidationError::Required` when the business name or VAT number is
/// missing; a compliant QR code cannot be produced without them.
pub fn build_qr_payload(invoice: &Invoice, settings: &BusinessSettings) -> ValidationResult<QrPayload> {
    settings.validate()?;

    if invoice.number.trim().is_empty() {
        return Err(ValidationError::required("invoice_number"));
    }

    Ok(QrPayload {
        invoice_number: invoice.number.clone(),
        total: invoice.total.to_decimal_string(),
        date: invoice.date.to_rfc3339_opts(SecondsFormat::Secs, true),
        business_name: settings.business_name.trim().to_string(),
        tax_number: settings.tax_number.trim().to_string(),
    })
}

/// Payload of the secondary barcode: the total alone.
pub fn amount_payload(invoice: &Invoice) -> String {
    invoice.total.to_decimal_string()
}

/// URL for a QR image service, e.g.
/// `https://api.qrserver.com/v1/create-qr-code/?size=150x150&data=...`.
pub fn qr_image_url(
    endpoint: &str,
    payload: &QrPayload,
    size_px: u32,
) -> Result<String, serde_json::Error> {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{}{}size={}x{}&data={}",
        endpoint,
        separator,
        size_px,
        size_px,
        payload.url_encoded()?
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================
