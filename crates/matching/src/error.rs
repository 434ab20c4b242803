use thiserror::Error;

use pricesync_core::RowError;

/// Failure to derive any usable comparison key from a row.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("row {row}: neither a valid ISBN nor a title is present")]
    MissingKey { row: usize },
}

impl From<NormalizeError> for RowError {
    fn from(value: NormalizeError) -> Self {
        match value {
            NormalizeError::MissingKey { row } => {
                RowError::malformed(row, "neither a valid ISBN nor a title is present")
            }
        }
    }
}
