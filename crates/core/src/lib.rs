//! Shared primitives for all Rust crates in Stackforge.

#![forbid(unsafe_code)]

/// Deployment target identity shared across declarations.
pub mod environment;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use environment::{DeploymentEnvironment, EnvValue, PseudoParameter};

/// Result type used across Stackforge crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Creates a validated non-empty string, naming the rejected field on failure.
    pub fn named(field: &str, value: impl Into<String>) -> AppResult<Self> {
        Self::new(value)
            .map_err(|_| AppError::Validation(format!("{field} must not be empty or whitespace")))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested declaration or template does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Declaration conflicts with an existing one in the same scope.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn named_rejection_mentions_field() {
        let result = NonEmptyString::named("source_code_bucket_name", "");
        assert!(matches!(
            result,
            Err(AppError::Validation(message)) if message.contains("source_code_bucket_name")
        ));
    }

    #[test]
    fn non_empty_string_keeps_value_verbatim() {
        let value = NonEmptyString::new(" padded ").unwrap_or_else(|_| unreachable!());
        assert_eq!(value.as_str(), " padded ");
    }
}
