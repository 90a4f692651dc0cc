//! # Engine Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Caller input  │  │  Business rule  │  │     Infrastructure      │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  PermissionDen. │  │  Persistence(DbError)   │ │
//! │  │  NotFound       │  │  InvalidTrans.  │  │  Config                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Only a duplicate invoice number is retried (by the allocator).        │
//! │  Everything else propagates; the open transaction rolls back.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mizan_core::{CoreError, InvoiceStatus, ValidationError};
use mizan_db::DbError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Permission denied: {role} cannot {action}")]
    PermissionDenied { role: String, action: String },

    /// Not an edge of the status graph, or the stored status moved while
    /// the transition was in flight.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    /// Kitchen ticket line cannot take the requested state.
    #[error("Kitchen item cannot move from {from} to {to}")]
    InvalidKitchenTransition { from: String, to: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable code for a UI layer.
    pub const fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::PermissionDenied { .. } => "PERMISSION_DENIED",
            EngineError::InvalidTransition { .. } | EngineError::InvalidKitchenTransition { .. } => {
                "INVALID_TRANSITION"
            }
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::Persistence(_) => "DATABASE_ERROR",
            EngineError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Another writer took the invoice number first.
    pub fn is_duplicate_number(&self) -> bool {
        matches!(self, EngineError::Persistence(db) if db.is_unique_violation_on("invoices.number"))
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PermissionDenied { role, action } => EngineError::PermissionDenied { role, action },
            CoreError::InvalidTransition { from, to } => EngineError::InvalidTransition { from, to },
            CoreError::InvalidKitchenTransition { from, to } => {
                EngineError::InvalidKitchenTransition { from, to }
            }
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Persistence(err.into())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}
