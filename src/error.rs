use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for skymatch operations.
#[derive(Debug, Error)]
pub enum SkymatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to parse detection CSV from {path}: {source}")]
    DetectionCsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write detection CSV to {path}: {source}")]
    DetectionCsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid detection catalog from {path}: {message}")]
    DetectionCsvInvalid { path: PathBuf, message: String },

    #[error("Invalid detection result: {0}")]
    DetectionInvalid(String),

    #[error("Invalid sky catalog from {path}: {message}")]
    SkyCsvInvalid { path: PathBuf, message: String },

    #[error("Failed to parse sky CSV from {path}: {source}")]
    SkyCsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to parse mapped CSV from {path}: {source}")]
    MappedCsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid mapped CSV from {path}: {message}")]
    MappedCsvInvalid { path: PathBuf, message: String },

    #[error("Failed to write mapped CSV to {path}: {source}")]
    MappedCsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}

/// Coarse classification of [`SkymatchError`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid coordinate transform, invalid evaluation options.
    Configuration,
    /// Malformed or schema-mismatched input.
    Format,
    /// A referenced auxiliary file does not exist.
    NotFound,
    /// Underlying filesystem failure.
    Io,
    /// Catalog validation reported errors.
    Validation,
}

impl SkymatchError {
    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SkymatchError::Configuration(_) => ErrorKind::Configuration,
            SkymatchError::DetectionCsvParse { .. }
            | SkymatchError::DetectionCsvInvalid { .. }
            | SkymatchError::DetectionInvalid(_)
            | SkymatchError::SkyCsvInvalid { .. }
            | SkymatchError::SkyCsvParse { .. }
            | SkymatchError::MappedCsvParse { .. }
            | SkymatchError::MappedCsvInvalid { .. } => ErrorKind::Format,
            SkymatchError::NotFound { .. } => ErrorKind::NotFound,
            SkymatchError::Io(_)
            | SkymatchError::DetectionCsvWrite { .. }
            | SkymatchError::MappedCsvWrite { .. }
            | SkymatchError::JsonWrite { .. } => ErrorKind::Io,
            SkymatchError::ValidationFailed { .. } => ErrorKind::Validation,
        }
    }
}
