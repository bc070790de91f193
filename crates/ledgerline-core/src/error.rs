//! # Error Types
//!
//! The error taxonomy every repository reports through.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Propagation                               │
//! │                                                                         │
//! │  sqlx::Error / cache failure / bad filter                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreFault (ledgerline-db) ← classified once at the store boundary     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Error (this module) ← kind + hint + reportable details                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller matches on `kind()`, shows `hint()`                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Every failure carries a machine-checkable [`ErrorKind`]
//! 2. Every failure carries a human hint
//! 3. Reportable details (offending ids, keys, fields) travel as a map
//! 4. Raw store errors only ever appear as the `source()` of an [`Error`]

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entity absent for the tenant/environment scope, or a guarded update
    /// matched no row.
    NotFound,

    /// Unique-constraint violation (duplicate code, key, number...).
    AlreadyExists,

    /// Malformed filter or unresolved DSL field name.
    Validation,

    /// Any other store failure.
    Database,

    /// Unexpected failure outside the store (encoding, invariants).
    Internal,
}

impl ErrorKind {
    /// Stable snake_case name, used in logs and span fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Validation => "validation",
            ErrorKind::Database => "database",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Error
// =============================================================================

/// A classified failure with a hint and reportable details.
///
/// ## Example
/// ```rust
/// use ledgerline_core::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::NotFound, "tax rate not found")
///     .with_hint("Tax rate with ID txr_1 was not found")
///     .with_detail("tax_rate_id", "txr_1");
///
/// assert!(err.is_not_found());
/// assert_eq!(err.hint(), "Tax rate with ID txr_1 was not found");
/// assert_eq!(err.details()["tax_rate_id"], "txr_1");
/// ```
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    hint: Option<String>,
    details: BTreeMap<String, String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Creates a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            hint: None,
            details: BTreeMap::new(),
            source: None,
        }
    }

    /// Wraps an underlying error, marking it with `kind`.
    ///
    /// The wrapped error's message becomes this error's message; the source
    /// stays reachable through `source()`.
    pub fn wrap<E>(source: E, kind: ErrorKind) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error {
            kind,
            message: source.to_string(),
            hint: None,
            details: BTreeMap::new(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a [`ErrorKind::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for a [`ErrorKind::Validation`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Validation, message)
    }

    /// Shorthand for a [`ErrorKind::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Internal, message)
    }

    /// Attaches a human-readable hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attaches one reportable detail.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// Re-marks the error with a different kind.
    pub fn mark(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The hint, falling back to the message when none was attached.
    pub fn hint(&self) -> &str {
        self.hint.as_deref().unwrap_or(&self.message)
    }

    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind == ErrorKind::AlreadyExists
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with [`Error`].
pub type CoreResult<T> = Result<T, Error>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct Underlying;

    #[test]
    fn test_error_display_includes_kind() {
        let err = Error::new(ErrorKind::AlreadyExists, "duplicate code");
        assert_eq!(err.to_string(), "already_exists: duplicate code");
    }

    #[test]
    fn test_hint_falls_back_to_message() {
        let err = Error::validation("bad limit");
        assert_eq!(err.hint(), "bad limit");

        let err = err.with_hint("Limit must be positive");
        assert_eq!(err.hint(), "Limit must be positive");
    }

    #[test]
    fn test_wrap_keeps_source() {
        let err = Error::wrap(Underlying, ErrorKind::Database).with_detail("task_id", "tsk_1");

        assert_eq!(err.kind(), ErrorKind::Database);
        assert_eq!(err.message(), "disk on fire");
        assert!(err.source().is_some());
        assert_eq!(err.details().get("task_id").map(String::as_str), Some("tsk_1"));
    }

    #[test]
    fn test_mark_changes_kind() {
        let err = Error::internal("oops").mark(ErrorKind::NotFound);
        assert!(err.is_not_found());
    }
}
