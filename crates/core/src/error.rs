//! Engine error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the engine crates.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error.
///
/// Only batch-fatal conditions surface through this type (an unusable catalog
/// snapshot, a rejected configuration). Faults tied to a single price-list row
/// are captured as [`RowError`] and recorded in the import report instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The catalog snapshot is missing or empty; no matching is possible.
    #[error("candidate index unavailable: {0}")]
    IndexUnavailable(String),

    /// Configuration could not be parsed or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// A requested catalog entry was not found.
    #[error("not found")]
    NotFound,
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn index_unavailable(msg: impl Into<String>) -> Self {
        Self::IndexUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Classification of a per-row processing fault.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    /// The normalizer could not extract any usable key (no ISBN, no title).
    MalformedRow,
    /// The price field is missing, unparseable or negative.
    InvalidPrice,
    /// The currency field is present but not a valid currency code.
    InvalidCurrency,
}

/// A recoverable fault attached to one price-list row (1-based `row`).
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("row {row}: {message}")]
pub struct RowError {
    pub row: usize,
    pub kind: RowErrorKind,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, kind: RowErrorKind, message: impl Into<String>) -> Self {
        Self {
            row,
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(row: usize, message: impl Into<String>) -> Self {
        Self::new(row, RowErrorKind::MalformedRow, message)
    }

    pub fn invalid_price(row: usize, message: impl Into<String>) -> Self {
        Self::new(row, RowErrorKind::InvalidPrice, message)
    }

    pub fn invalid_currency(row: usize, message: impl Into<String>) -> Self {
        Self::new(row, RowErrorKind::InvalidCurrency, message)
    }
}
