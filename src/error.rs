//! Error types for every layer of the ledger.
//!
//! Storage and codec failures are kept in their own enums so callers that only
//! touch one layer do not have to match on the whole taxonomy. The service
//! layer folds them into [`ServiceError`], which is what the HTTP daemon maps
//! to status codes.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reading, parsing or rewriting the backing table file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file is missing or could not be read as CSV.
    #[error("inventory file {path} unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// The file was read but does not describe a rectangular table.
    #[error("inventory file {path} malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// The replacement file could not be written or moved into place.
    #[error("inventory file {path} unwritable: {reason}")]
    Unwritable { path: PathBuf, reason: String },
}

impl StorageError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Unreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unwritable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Unwritable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A lookup against the table that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("Bin not found")]
    Bin(String),
    #[error("SKU not found")]
    Sku(String),
}

/// Why a single cell could not be decremented.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// The cell holds text that is neither blank nor a whole quantity.
    #[error("bin {bin:?} sku {sku:?} holds {value:?}, not a whole quantity")]
    NotAQuantity {
        bin: String,
        sku: String,
        value: String,
    },
}

/// Failures turning a mutation request into a scannable artifact.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid scan base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to render QR code: {0}")]
    RenderFailure(String),
}

/// Failures reconstructing a mutation request from scanned fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid amount {0:?}: expected a positive integer")]
    InvalidAmount(String),
}

/// Everything the inventory service can report to its callers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
