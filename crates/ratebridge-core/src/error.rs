//! Error types for the RateBridge core library
//!
//! This module defines the error handling system for RateBridge, using
//! thiserror for error definitions and anyhow for flexible error contexts.
//! Errors fall into three families: configuration errors (missing pipeline,
//! system or table, malformed records), data errors (missing required field,
//! unparseable value, unsafe expression) and transport errors (outbound call
//! failures).

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

use crate::expression::ExpressionError;
use crate::http::HttpError;
use crate::transform::TransformationError;

/// Main error type for RateBridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or inconsistent configuration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// No pipeline with the given id exists
    #[error("Pipeline not found: {pipeline_id}")]
    PipelineNotFound { pipeline_id: String },

    /// The pipeline exists but is not active
    #[error("Pipeline is inactive: {pipeline_id}")]
    PipelineInactive { pipeline_id: String },

    /// Routing produced no candidate pipeline
    #[error("No pipeline routes product line {product_line:?}, source system {source_system:?}, transaction type {transaction_type:?}")]
    RouteNotFound {
        product_line: Option<String>,
        source_system: Option<String>,
        transaction_type: Option<String>,
    },

    /// External system is not registered
    #[error("External system not found: {code}")]
    SystemNotFound { code: String },

    /// External system is registered but disabled
    #[error("External system is inactive: {code}")]
    SystemInactive { code: String },

    /// Lookup table is not known to the resolver
    #[error("Lookup table not found: {table}")]
    LookupTableNotFound { table: String },

    /// A required field had no value and no default
    #[error("Required field missing: {path}")]
    RequiredField { path: String },

    /// Field transformation errors
    #[error("Transformation failed: {message}")]
    Transformation {
        message: String,
        #[source]
        source: TransformationError,
    },

    /// Expression parsing, safety or evaluation errors
    #[error("Expression error: {source}")]
    Expression {
        #[source]
        source: ExpressionError,
    },

    /// Wire format encoding or decoding errors
    #[error("{format} format error: {message}")]
    Format { format: String, message: String },

    /// HTTP/Network related errors
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<HttpError>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Family of this error, used when reporting step failures
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration { .. }
            | Error::PipelineNotFound { .. }
            | Error::PipelineInactive { .. }
            | Error::RouteNotFound { .. }
            | Error::SystemNotFound { .. }
            | Error::SystemInactive { .. }
            | Error::LookupTableNotFound { .. } => ErrorCategory::Configuration,
            Error::RequiredField { .. }
            | Error::Transformation { .. }
            | Error::Expression { .. } => ErrorCategory::Data,
            Error::Format { .. } | Error::Http { .. } => ErrorCategory::Transport,
            Error::Json { .. } | Error::Yaml { .. } | Error::Io { .. } | Error::Internal { .. } => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Error families from the error-handling taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing pipeline/system/table or malformed configuration
    Configuration,
    /// Missing required data, unparseable values, unsafe expressions
    Data,
    /// Outbound call or wire format failures
    Transport,
    /// Anything else
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<ExpressionError> for Error {
    fn from(err: ExpressionError) -> Self {
        Error::Expression { source: err }
    }
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Error::Http {
            message: err.to_string(),
            status_code: err.status_code,
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::configuration("missing tableKey");
        assert_eq!(err.to_string(), "Configuration error: missing tableKey");

        let err = Error::SystemNotFound { code: "rater".to_string() };
        assert_eq!(err.to_string(), "External system not found: rater");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::LookupTableNotFound { table: "t".into() }.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            Error::RequiredField { path: "a".into() }.category(),
            ErrorCategory::Data
        );
        assert_eq!(
            Error::Format { format: "xml".into(), message: "bad".into() }.category(),
            ErrorCategory::Transport
        );
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Transport.to_string(), "transport");
    }
}
