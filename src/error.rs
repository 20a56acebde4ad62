//! Error types for the toolkit
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the toolkit.
///
/// Only precondition violations are errors. Capacity rejection is a plain
/// `false` return and misuse of a settled `Deferred` is logged, not raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Options overlay could not be parsed or has out-of-range values
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A tokio scheduler was requested outside of a runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

// == Result Type Alias ==
/// Convenience Result type for the toolkit.
pub type Result<T> = std::result::Result<T, CacheError>;
