//! Error types for molgraph-index
//!
//! Every failure belongs to one of three classes. Configuration errors are
//! raised before any state changes. Storage errors abort the running
//! operation and leave the last operational index in place. Consistency
//! errors mean the bookkeeping inside an index cannot be trusted.
//!
//! An update with nothing to do is not an error; see
//! [`UpdateOutcome`](crate::features::lifecycle::UpdateOutcome).

use molgraph_storage::StorageError;
use tantivy::TantivyError;
use thiserror::Error;

use crate::config::ConfigError;

/// Broad class of an [`FtsError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Storage,
    Consistency,
}

/// Main error type for index operations
#[derive(Debug, Error)]
pub enum FtsError {
    // ═══════════════════════════════════════════════════════════════════════
    // Configuration
    // ═══════════════════════════════════════════════════════════════════════
    #[error("Invalid index name '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidIndexName(String),

    #[error("Graph store is read-only")]
    ReadOnly,

    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Unknown analyzer '{0}'")]
    UnknownAnalyzer(String),

    #[error("Unknown scorer '{0}'")]
    UnknownScorer(String),

    #[error("Malformed list for '{param}': {message}")]
    MalformedList { param: String, message: String },

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Invalid value '{value}' for parameter '{param}'")]
    InvalidParameter { param: String, value: String },

    #[error("Unknown entity {0}")]
    UnknownEntity(u64),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // ═══════════════════════════════════════════════════════════════════════
    // Storage
    // ═══════════════════════════════════════════════════════════════════════
    #[error("Index '{0}' not found")]
    IndexNotFound(String),

    #[error("Index corrupted: {0}")]
    Corrupted(String),

    #[error("Index locked: {0}")]
    Locked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search engine error: {0}")]
    Engine(String),

    #[error("Adjacency storage error: {0}")]
    Adjacency(#[from] StorageError),

    #[error("Index controller has been shut down")]
    ShutDown,

    // ═══════════════════════════════════════════════════════════════════════
    // Consistency
    // ═══════════════════════════════════════════════════════════════════════
    #[error("Missing bookkeeping document '{0}'")]
    MissingBookkeeping(&'static str),

    #[error("Expected one bookkeeping document '{key}', found {count}")]
    DuplicateBookkeeping { key: &'static str, count: usize },

    #[error("Corrupted configuration snapshot: {0}")]
    CorruptedSnapshot(String),
}

impl FtsError {
    pub fn class(&self) -> ErrorClass {
        match self {
            FtsError::InvalidIndexName(_)
            | FtsError::ReadOnly
            | FtsError::InvalidPattern { .. }
            | FtsError::UnknownAnalyzer(_)
            | FtsError::UnknownScorer(_)
            | FtsError::MalformedList { .. }
            | FtsError::UnknownParameter(_)
            | FtsError::InvalidParameter { .. }
            | FtsError::UnknownEntity(_)
            | FtsError::InvalidQuery(_)
            | FtsError::Config(_) => ErrorClass::Configuration,

            FtsError::IndexNotFound(_)
            | FtsError::Corrupted(_)
            | FtsError::Locked(_)
            | FtsError::Io(_)
            | FtsError::Engine(_)
            | FtsError::Adjacency(_)
            | FtsError::ShutDown => ErrorClass::Storage,

            FtsError::MissingBookkeeping(_)
            | FtsError::DuplicateBookkeeping { .. }
            | FtsError::CorruptedSnapshot(_) => ErrorClass::Consistency,
        }
    }

    pub fn invalid_parameter(param: impl Into<String>, value: impl Into<String>) -> Self {
        FtsError::InvalidParameter {
            param: param.into(),
            value: value.into(),
        }
    }

    pub fn malformed_list(param: impl Into<String>, message: impl Into<String>) -> Self {
        FtsError::MalformedList {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl From<TantivyError> for FtsError {
    fn from(err: TantivyError) -> Self {
        match err {
            TantivyError::LockFailure(..) => FtsError::Locked(err.to_string()),
            TantivyError::DataCorruption(..) | TantivyError::IncompatibleIndex(..) => {
                FtsError::Corrupted(err.to_string())
            }
            TantivyError::IoError(..)
            | TantivyError::OpenDirectoryError(..)
            | TantivyError::OpenReadError(..)
            | TantivyError::OpenWriteError(..) => FtsError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                err.to_string(),
            )),
            other => FtsError::Engine(other.to_string()),
        }
    }
}

impl From<tantivy::query::QueryParserError> for FtsError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        FtsError::InvalidQuery(err.to_string())
    }
}

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, FtsError>;
