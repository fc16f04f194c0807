//! Error taxonomy for the ship catalog.

use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// How a transport should surface an error to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    BadRequest,
    NotFound,
    Internal,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A create draft failed validation
    #[error("Invalid ship: bad or missing field '{field}'")]
    InvalidRecord { field: &'static str },

    /// A present patch field failed validation
    #[error("Invalid patch: bad value for field '{field}'")]
    InvalidPatch { field: &'static str },

    #[error("Ship {0} not found")]
    NotFound(u64),

    /// Null, non-numeric or non-positive identifier at the boundary
    #[error("Invalid ship id: '{0}'")]
    InvalidIdentifier(String),

    /// Malformed request at the transport boundary
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rating undefined for production year {year}")]
    RatingUndefined { year: i32 },

    #[error("Timestamp {0} is outside the representable calendar")]
    InvalidTimestamp(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Corrupt log entry: {0}")]
    Corrupt(String),

    #[error("Poisoned lock")]
    Poisoned,

    /// The segment handle no longer points at the live file
    #[error("Segment {0} is sealed, writes are refused until restart")]
    SegmentSealed(String),
}

impl CatalogError {
    pub fn status(&self) -> ErrorStatus {
        match self {
            CatalogError::InvalidRecord { .. }
            | CatalogError::InvalidPatch { .. }
            | CatalogError::InvalidIdentifier(_)
            | CatalogError::InvalidRequest(_) => ErrorStatus::BadRequest,

            CatalogError::NotFound(_) => ErrorStatus::NotFound,

            CatalogError::RatingUndefined { .. }
            | CatalogError::InvalidTimestamp(_)
            | CatalogError::Storage(_)
            | CatalogError::Corrupt(_)
            | CatalogError::Poisoned
            | CatalogError::SegmentSealed(_) => ErrorStatus::Internal,
        }
    }
}
