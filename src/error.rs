//! Error types for stackcost
//!
//! This module defines the error handling strategy for stackcost. There are two
//! error types: `StackcostError` (main error enum) and `ConfigError` (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `StackcostError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling. The conversion
//! happens at the CLI boundary using `anyhow::Error::from` to preserve error chains.
//!
//! ## Error Severity
//!
//! The analysis pipeline distinguishes three severities:
//!
//! - **Fatal** (`Parse`, `EmptyTemplate`): the template could not be turned into
//!   resources, so no partial analysis exists. These abort the call.
//! - **Per-resource** (`Pricing`, `PriceNotFound`, `PricingSource`): one resource
//!   could not be priced. The analyzer records these in `TemplateAnalysis::errors`
//!   and keeps going; they never fail the call as a whole.
//! - **Absorbed** (cache I/O): the price cache treats every read failure as a
//!   miss and every write failure as a no-op. Cache errors are logged but never
//!   constructed as `StackcostError` values.
//!
//! ## Retry Awareness
//!
//! Errors implement `IsRetryable` to indicate whether an operation should be
//! retried. The `RetryPolicy` in `src/retry.rs` uses this when talking to the
//! network-bound pricing source. Only `PricingSource` and `Io` are retryable;
//! a `PriceNotFound` will not become found by asking again.

use thiserror::Error;

/// Main error type for stackcost
#[derive(Error, Debug)]
pub enum StackcostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template parse error: {0}")]
    Parse(String),

    #[error("Template declares no resources")]
    EmptyTemplate,

    #[error("Pricing error for {logical_id} ({resource_type}): {message}")]
    Pricing {
        resource_type: String,
        logical_id: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No priced product matches {service}/{product_family} in {region}")]
    PriceNotFound {
        service: String,
        product_family: String,
        region: String,
    },

    #[error("Pricing source error: {0}")]
    PricingSource(String),

    #[error("Retryable error (attempt {attempt}/{max_attempts}): {reason}")]
    Retryable {
        attempt: u32,
        max_attempts: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StackcostError>;

/// Trait for determining if an error is retryable
///
/// Used by `RetryPolicy` implementations to decide whether a pricing-source
/// call should be attempted again.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for StackcostError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StackcostError::Retryable { .. }
                | StackcostError::PricingSource(_)
                | StackcostError::Io(_)
        )
    }
}
