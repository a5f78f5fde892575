//! Error types for catalog operations
//!
//! Every variant is recoverable: the store rejects the offending operation,
//! leaves its prior state untouched and hands the error back for the caller
//! to surface as a message.

use std::path::PathBuf;
use thiserror::Error;

use crate::state::session::SessionState;

/// Result alias used throughout the catalog core
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// One or more required fields were missing or blank
    #[error("{} required", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// Another non-deleted record already uses this customer + part number
    #[error("duplicate part number {part_no:?} for customer {customer:?}")]
    Duplicate { customer: String, part_no: String },

    /// No record with this id
    #[error("no part with id {0:?}")]
    NotFound(String),

    /// The JSON document was not an array of record objects
    #[error("invalid catalog document: {0}")]
    Format(String),

    /// Reading or writing a data file failed
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The session cannot run this command in its current state
    #[error("cannot {command} while session is {state:?}")]
    InvalidState {
        state: SessionState,
        command: &'static str,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Format(err.to_string())
    }
}
