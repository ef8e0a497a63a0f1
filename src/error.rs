//! Error types for ChartQL.
//!
//! Defines the pipeline error taxonomy. Transient generation failures are a
//! distinct variant so the generator service can route them to the offline
//! fallback instead of surfacing them to the caller.

use thiserror::Error;

/// Main error type for ChartQL operations.
#[derive(Error, Debug)]
pub enum ChartqlError {
    /// Fatal SQL generation errors (bad request, auth, malformed response).
    #[error("Generation error: {0}")]
    Generation(String),

    /// Network/timeout/rate-limit generation failures, eligible for fallback.
    #[error("Transient generation error: {0}")]
    TransientGeneration(String),

    /// Generated SQL rejected by the safety validator.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query execution errors (syntax errors, missing tables, timeouts).
    #[error("Execution error: {0}")]
    Execution(String),

    /// Schema metadata errors (missing file, malformed JSON, duplicate tables).
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration errors (invalid config file, bad connection string).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChartqlError {
    /// Creates a fatal generation error with the given message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Creates a transient generation error with the given message.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientGeneration(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a schema error with the given message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if this error should trigger the fallback generator.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientGeneration(_))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Generation(_) => "Generation Error",
            Self::TransientGeneration(_) => "Transient Generation Error",
            Self::Validation(_) => "Validation Error",
            Self::Execution(_) => "Execution Error",
            Self::Schema(_) => "Schema Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using ChartqlError.
pub type Result<T> = std::result::Result<T, ChartqlError>;
