//! Error types for the mentor assistant
//!
//! Crates above this one work in `anyhow::Result`; these variants are the
//! typed causes callers downcast to when the kind of failure matters.

use thiserror::Error;

/// Main error type for mentor operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Substrings that identify a provider quota / rate-limit failure.
pub const QUOTA_SIGNATURES: &[&str] = &["quota", "429", "exceeded"];

/// Check free-form error text against the quota signatures.
pub fn is_quota_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    QUOTA_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

impl Error {
    /// Create a language model error
    pub fn llm(msg: impl Into<String>) -> Self {
        Error::Llm(msg.into())
    }

    /// Create a quota error
    pub fn quota(msg: impl Into<String>) -> Self {
        Error::QuotaExceeded(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Whether this error represents an exhausted language-model quota
    pub fn is_quota(&self) -> bool {
        match self {
            Error::QuotaExceeded(_) => true,
            Error::Llm(msg) => is_quota_message(msg),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_detection() {
        assert!(Error::quota("daily limit").is_quota());
        assert!(Error::llm("Gemini API error 429 Too Many Requests").is_quota());
        assert!(Error::llm("Resource has been EXHAUSTED: Quota").is_quota());
        assert!(!Error::llm("connection reset").is_quota());
        assert!(!Error::timeout("quota check exceeded 30s").is_quota());
    }

    #[test]
    fn test_display() {
        let err = Error::not_found("Gmail");
        assert_eq!(err.to_string(), "Not found: Gmail");
        assert_eq!(Error::config("no key").to_string(), "Configuration error: no key");
    }
}
