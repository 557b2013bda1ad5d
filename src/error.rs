//! Error types for the statement ingestion pipeline.

use crate::BankType;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting and recognizing statements.
#[derive(Debug, Error)]
pub enum Error {
    /// The input file could not be read or is not a valid document.
    #[error("Failed to extract text from {}: {message}", .path.display())]
    Extraction { path: PathBuf, message: String },

    /// Text was extracted but no known statement dialect matched.
    #[error("Unsupported statement format. Supported banks: {}", supported_list(.supported))]
    UnsupportedFormat { supported: Vec<BankType> },

    /// A date substring could not be normalized by any candidate format.
    #[error("Invalid date format: {0}")]
    DateFormat(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// Unknown bank name given where a dialect was expected.
    #[error("Invalid bank type: {0}")]
    InvalidBankType(String),

    /// Unknown output format name.
    #[error("Invalid output format: {0}")]
    InvalidOutputFormat(String),

    /// Invalid parser configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error writing CSV output.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error writing JSON output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The error raised when detection fails, naming every supported dialect.
    pub fn unsupported_format() -> Self {
        Error::UnsupportedFormat {
            supported: BankType::SUPPORTED.to_vec(),
        }
    }
}

fn supported_list(supported: &[BankType]) -> String {
    supported
        .iter()
        .map(|b| b.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
