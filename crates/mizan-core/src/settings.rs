//! Business identity printed on invoices and embedded in QR payloads.
//!
//! Optional fields default at deserialization time, so a settings file that
//! only names the business and its VAT number is complete.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::validation::{validate_required_text, ValidationResult};

fn default_currency_symbol() -> String {
    "SAR".to_string()
}

fn default_generated_by() -> String {
    "Mizan POS".to_string()
}

/// Merchant settings, resolved once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BusinessSettings {
    #[serde(default)]
    pub business_name: String,

    /// VAT registration number.
    #[serde(default)]
    pub tax_number: String,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub logo_url: Option<String>,

    /// Free text printed in the invoice footer.
    #[serde(default)]
    pub invoice_notes: Option<String>,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Footer stamp.
    #[serde(default = "default_generated_by")]
    pub generated_by: String,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        Self {
            business_name: String::new(),
            tax_number: String::new(),
            address: None,
            phone: None,
            email: None,
            logo_url: None,
            invoice_notes: None,
            currency_symbol: default_currency_symbol(),
            generated_by: default_generated_by(),
        }
    }
}

impl BusinessSettings {
    pub fn new(business_name: impl Into<String>, tax_number: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            tax_number: tax_number.into(),
            ..Default::default()
        }
    }

    /// Business name and VAT number must be present.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required_text("business_name", &self.business_name, 200)?;
        validate_required_text("tax_number", &self.tax_number, 32)?;
        Ok(())
    }

    /// Blank optional strings collapse to `None`.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.address,
            &mut self.phone,
            &mut self.email,
            &mut self.logo_url,
            &mut self.invoice_notes,
        ] {
            if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *field = None;
            }
        }
        self.business_name = self.business_name.trim().to_string();
        self.tax_number = self.tax_number.trim().to_string();
        self
    }
}
