//! Unified error handling for PharmStock services
//!
//! This module provides a comprehensive error system that all services can use,
//! eliminating the need for service-specific error types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// ErrorInfo - API error response type
// ============================================================================

/// Standard error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code (HTTP status or custom)
    pub code: u16,
    /// Error message
    pub message: String,
    /// Detailed error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Field-specific errors for validation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_errors: HashMap<String, Vec<String>>,
}

impl ErrorInfo {
    /// Create a new ErrorInfo with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 500,
            message: message.into(),
            details: None,
            field_errors: HashMap::new(),
        }
    }

    /// Set the error code
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Add details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Add a field error
    pub fn add_field_error(mut self, field: impl Into<String>, error: impl Into<String>) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(error.into());
        self
    }
}

// ============================================================================
// StockError - Main error type
// ============================================================================

/// Main error type for all PharmStock services
#[derive(Debug, Error)]
pub enum StockError {
    // ======================================
    // Validation Errors
    // ======================================
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid sheet URL: {0}")]
    InvalidSheetUrl(String),

    #[error("Missing required field '{field}' in row {row}")]
    MissingField { row: usize, field: String },

    #[error("Invalid parameter: {param}: {reason}")]
    InvalidParameter { param: String, reason: String },

    // ======================================
    // Configuration Errors
    // ======================================
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // ======================================
    // Not Found Errors
    // ======================================
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("Tab {tab_id} not found in spreadsheet {spreadsheet_id}")]
    TabNotFound { spreadsheet_id: String, tab_id: i64 },

    #[error("Warehouse not found: {0}")]
    WarehouseNotFound(i64),

    // ======================================
    // Conflict Errors
    // ======================================
    #[error("Tab {tab_id} of spreadsheet {spreadsheet_id} is already bound to warehouse {warehouse_id}")]
    TabBound {
        spreadsheet_id: String,
        tab_id: i64,
        warehouse_id: i64,
    },

    #[error("Conflict: {resource} already exists")]
    Conflict { resource: String },

    // ======================================
    // Spreadsheet API Errors
    // ======================================
    #[error("Spreadsheet API rate limit exceeded")]
    RateLimited,

    #[error("Spreadsheet API error: {operation}: {message}")]
    SheetApi { operation: String, message: String },

    #[error("Timeout waiting for response from {0}")]
    Timeout(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    // ======================================
    // Database & I/O Errors
    // ======================================
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ======================================
    // Catch-all for other errors
    // ======================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using StockError
pub type StockResult<T> = Result<T, StockError>;

impl StockError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::Validation(_)
            | Self::InvalidSheetUrl(_)
            | Self::MissingField { .. }
            | Self::InvalidParameter { .. } => 400,

            // 404 Not Found
            Self::NotFound { .. }
            | Self::SpreadsheetNotFound(_)
            | Self::TabNotFound { .. }
            | Self::WarehouseNotFound(_) => 404,

            // 409 Conflict
            Self::TabBound { .. } | Self::Conflict { .. } => 409,

            // 429 Too Many Requests
            Self::RateLimited => 429,

            // 500 Internal Server Error
            Self::InvalidConfig { .. }
            | Self::MissingConfig(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,

            // 502 Bad Gateway
            Self::SheetApi { .. } => 502,

            // 504 Gateway Timeout
            Self::Timeout(_) | Self::Cancelled(_) => 504,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::SheetApi { .. } | Self::Timeout(_)
        )
    }

    /// Convert to API ErrorInfo for HTTP responses
    pub fn to_error_info(&self) -> ErrorInfo {
        let mut error_info = ErrorInfo::new(self.to_string()).with_code(self.status_code());

        // Add details for specific error types
        match self {
            Self::InvalidParameter { param, reason } => {
                error_info = error_info.add_field_error(param, reason);
            },
            Self::MissingField { field, .. } => {
                error_info = error_info.add_field_error(field, "required field is empty");
            },
            Self::Validation(msg) => {
                error_info = error_info.with_details(msg.clone());
            },
            _ => {},
        }

        error_info
    }
}

// Conversion traits for common error types
impl From<serde_json::Error> for StockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for StockError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::num::ParseIntError> for StockError {
    fn from(err: std::num::ParseIntError) -> Self {
        Self::Validation(format!("Invalid integer: {}", err))
    }
}

// Helper macros for creating errors
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::StockError::Validation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::StockError::Validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::StockError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::StockError::Internal(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! sheet_api_error {
    ($operation:expr, $msg:expr) => {
        $crate::StockError::SheetApi {
            operation: $operation.to_string(),
            message: $msg.to_string(),
        }
    };
}

// ============================================================================
// StockError implements StockErrorTrait
// ============================================================================

impl StockErrorTrait for StockError {
    fn error_code(&self) -> &'static str {
        match self {
            // Validation
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidSheetUrl(_) => "INVALID_SHEET_URL",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",

            // Configuration
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::MissingConfig(_) => "MISSING_CONFIG",

            // Not Found
            Self::NotFound { .. } => "NOT_FOUND",
            Self::SpreadsheetNotFound(_) => "SPREADSHEET_NOT_FOUND",
            Self::TabNotFound { .. } => "TAB_NOT_FOUND",
            Self::WarehouseNotFound(_) => "WAREHOUSE_NOT_FOUND",

            // Conflict
            Self::TabBound { .. } => "TAB_BOUND",
            Self::Conflict { .. } => "CONFLICT",

            // Spreadsheet API
            Self::RateLimited => "RATE_LIMITED",
            Self::SheetApi { .. } => "SHEET_API_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Cancelled(_) => "CANCELLED",

            // Database & I/O
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",

            // Other
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "OTHER_ERROR",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_)
            | Self::InvalidSheetUrl(_)
            | Self::MissingField { .. }
            | Self::InvalidParameter { .. } => ErrorCategory::Validation,

            Self::InvalidConfig { .. } | Self::MissingConfig(_) => ErrorCategory::Configuration,

            Self::NotFound { .. }
            | Self::SpreadsheetNotFound(_)
            | Self::TabNotFound { .. }
            | Self::WarehouseNotFound(_) => ErrorCategory::NotFound,

            Self::TabBound { .. } | Self::Conflict { .. } => ErrorCategory::Conflict,

            Self::RateLimited => ErrorCategory::ResourceExhausted,
            Self::SheetApi { .. } => ErrorCategory::Network,
            Self::Timeout(_) | Self::Cancelled(_) => ErrorCategory::Timeout,

            Self::Database(_) => ErrorCategory::Database,
            Self::Io(_) | Self::Serialization(_) => ErrorCategory::Internal,

            Self::Internal(_) => ErrorCategory::Internal,
            Self::Other(_) => ErrorCategory::Unknown,
        }
    }
}

// ============================================================================
// PharmStock Error Trait - Architectural layer
// ============================================================================

/// Error category enum - used for classification and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    // Infrastructure layer
    Configuration,
    Database,
    Network,
    Timeout,

    // Business logic layer
    Validation,
    NotFound,
    Conflict,

    // System level
    Internal,
    ResourceExhausted,

    // Others
    Unknown,
}

/// PharmStock error capability trait
///
/// Defines a unified interface that all PharmStock service error types should
/// implement. A service can keep its own domain-specific error type and gain a
/// common outward-facing interface by implementing this trait.
pub trait StockErrorTrait: std::error::Error + Send + Sync + 'static {
    /// Get error code (for API, logs, monitoring)
    fn error_code(&self) -> &'static str;

    /// Get error category (for classification/metrics)
    fn category(&self) -> ErrorCategory;

    /// Whether the error is retryable (default implementation is category-based)
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Timeout | ErrorCategory::ResourceExhausted
        )
    }

    /// Get log level
    fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.category() {
            ErrorCategory::Internal | ErrorCategory::Database => Level::ERROR,
            ErrorCategory::Network | ErrorCategory::Timeout => Level::WARN,
            ErrorCategory::Validation | ErrorCategory::NotFound => Level::INFO,
            _ => Level::WARN,
        }
    }
}

// Tests
#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            StockError::InvalidSheetUrl("no gid".into()).status_code(),
            400
        );
        assert_eq!(
            StockError::SpreadsheetNotFound("abc".into()).status_code(),
            404
        );
        assert_eq!(
            StockError::TabBound {
                spreadsheet_id: "abc".into(),
                tab_id: 7,
                warehouse_id: 1,
            }
            .status_code(),
            409
        );
        assert_eq!(StockError::RateLimited.status_code(), 429);
        assert_eq!(StockError::Internal("test".into()).status_code(), 500);
        assert_eq!(
            StockError::SheetApi {
                operation: "update_cells".into(),
                message: "backend error".into(),
            }
            .status_code(),
            502
        );
    }

    #[test]
    fn test_error_retryable() {
        assert!(StockError::RateLimited.is_retryable());
        assert!(StockError::Timeout("sheets".into()).is_retryable());
        assert!(!StockError::Validation("test".into()).is_retryable());
        assert!(!StockError::TabBound {
            spreadsheet_id: "abc".into(),
            tab_id: 7,
            warehouse_id: 1,
        }
        .is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            StockError::TabNotFound {
                spreadsheet_id: "abc".into(),
                tab_id: 0,
            }
            .error_code(),
            "TAB_NOT_FOUND"
        );
        assert_eq!(StockError::RateLimited.error_code(), "RATE_LIMITED");
    }

    #[test]
    fn test_error_info() {
        let error = StockError::MissingField {
            row: 3,
            field: "address".into(),
        };
        let info = error.to_error_info();
        assert_eq!(info.code, 400);
        assert!(info.field_errors.contains_key("address"));
    }

    #[test]
    fn test_validation_macro() {
        let err = validation_error!("row {} is bad", 7);
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("row 7"));
    }
}
