//! Error taxonomy shared by every corpus operation.
//!
//! Each [`CorpusError`] variant maps to exactly one [`StatusClass`], which
//! the request layer turns into a transport status code.

use thiserror::Error;

use crate::models::VectorField;

/// Result alias used throughout the corpus operations.
pub type CorpusResult<T> = std::result::Result<T, CorpusError>;

#[derive(Debug, Error)]
pub enum CorpusError {
    /// The cache holds no record for the version (never existed or failed to load).
    #[error("version '{0}' not found or not loaded")]
    VersionNotFound(String),

    /// The operation name is in none of the allow-lists.
    #[error("attribute or operation '{0}' is not allowed or does not exist")]
    OperationNotFound(String),

    #[error("paragraph {ordinal} does not exist in version '{version}'")]
    ParagraphNotFound { version: String, ordinal: i64 },

    /// A request is malformed for the entry point it reached.
    #[error("{0}")]
    Validation(String),

    /// A stored vector could not be decoded.
    #[error("could not parse {field} for paragraph {ordinal} in version '{version}': {reason}")]
    Parse {
        version: String,
        ordinal: i64,
        field: VectorField,
        reason: String,
    },

    /// A batch retrieval produced zero usable rows.
    #[error("no valid {field} vectors found for version '{version}'")]
    NoData { version: String, field: VectorField },

    /// Tokenization produced no words.
    #[error("no valid words found after cleaning")]
    EmptyCorpus,

    /// The caller's deadline or shutdown interrupted a long scan.
    #[error("operation cancelled before completion")]
    Cancelled,

    /// Connectivity or query failure in the store adapter.
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Coarse failure class exposed to the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    NotFound,
    BadRequest,
    Timeout,
    Internal,
}

impl StatusClass {
    /// HTTP status code for this class.
    pub fn http_status(self) -> u16 {
        match self {
            StatusClass::NotFound => 404,
            StatusClass::BadRequest => 400,
            StatusClass::Timeout => 408,
            StatusClass::Internal => 500,
        }
    }
}

impl CorpusError {
    pub fn status_class(&self) -> StatusClass {
        match self {
            CorpusError::VersionNotFound(_)
            | CorpusError::OperationNotFound(_)
            | CorpusError::ParagraphNotFound { .. } => StatusClass::NotFound,
            CorpusError::Validation(_) => StatusClass::BadRequest,
            CorpusError::Cancelled => StatusClass::Timeout,
            CorpusError::Parse { .. }
            | CorpusError::NoData { .. }
            | CorpusError::EmptyCorpus
            | CorpusError::Store(_) => StatusClass::Internal,
        }
    }
}
