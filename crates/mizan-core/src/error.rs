//! # Error Types
//!
//! Domain-specific error types for mizan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mizan-core errors (this file)                                         │
//! │  ├── CoreError        - Lifecycle and permission failures              │
//! │  └── ValidationError  - Malformed input or settings                    │
//! │                                                                         │
//! │  mizan-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  mizan-engine errors                                                   │
//! │  └── EngineError      - What callers of checkout/transition see        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::InvoiceStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The actor's role does not allow the requested action.
    ///
    /// ## When This Occurs
    /// ```text
    /// Cashier presses "Refund"
    ///      │
    ///      ▼
    /// authorize_transition(completed → refunded, Cashier)
    ///      │
    ///      ▼
    /// PermissionDenied { role: "cashier", action: "refund invoice" }
    /// ```
    #[error("Permission denied: {role} cannot {action}")]
    PermissionDenied { role: String, action: String },

    /// The status graph does not allow `from → to`.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    /// A kitchen ticket line cannot move to the requested state.
    #[error("Kitchen item cannot move from {from} to {to}")]
    InvalidKitchenTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Malformed line items, discounts, rates and settings end up here. Pure
/// components return these instead of producing a wrong number.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    Negative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Arithmetic left the representable range.
    #[error("{field} overflowed")]
    Overflow { field: String },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub fn overflow(field: &str) -> Self {
        ValidationError::Overflow {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidTransition {
            from: InvoiceStatus::Refunded,
            to: InvoiceStatus::Completed,
        };
        assert_eq!(err.to_string(), "Invalid transition from refunded to completed");

        let err = CoreError::PermissionDenied {
            role: "cashier".to_string(),
            action: "refund invoice".to_string(),
        };
        assert_eq!(err.to_string(), "Permission denied: cashier cannot refund invoice");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("tax_number").to_string(), "tax_number is required");

        let err = ValidationError::Negative {
            field: "unit_price".to_string(),
        };
        assert_eq!(err.to_string(), "unit_price must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("business_name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
