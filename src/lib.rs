//! Statement Ingest Library
//!
//! Turns the extracted text of bank-statement PDFs into dated, validated
//! transactions with statement metadata and parse statistics.
//!
//! # Supported Banks
//!
//! - **HDFC Bank**: `Date Narration ... Withdrawal Amt. Deposit Amt. Closing Balance`
//! - **State Bank of India**: `Txn Date Value Date Description ... Debit Credit Balance`
//!
//! # Pipeline
//!
//! 1. [`extract`] reads the PDF into flat text
//! 2. [`detect`] classifies the text into a [`BankType`]
//! 3. the matching dialect parser ([`hdfc_format`], [`sbi_format`]) runs the
//!    shared [`scanner`] over the lines, normalizing dates with [`date_format`]
//! 4. [`orchestrator`] ties the steps together and records statistics
//! 5. [`csv_format`] writes the recognized transactions for import tools
//!
//! # Examples
//!
//! ## Parsing a single statement
//!
//! ```no_run
//! use stmt_ingest::StatementParser;
//!
//! let parser = StatementParser::new();
//! match parser.parse_bank_statement("april.pdf", 42, Some(7)) {
//!     Ok(result) => println!("{} transactions", result.stats.transaction_count),
//!     Err(failure) => eprintln!("{} after {:.2}s", failure.error, failure.stats.processing_time),
//! }
//! ```
//!
//! ## Parsing a batch
//!
//! ```no_run
//! use stmt_ingest::StatementParser;
//!
//! let parser = StatementParser::new();
//! let batch = parser.parse_multiple_bank_statements(&["a.pdf", "b.pdf"], 42, None);
//! println!("{} of 2 files parsed", batch.combined_stats.file_count);
//! ```

pub mod config;
pub mod csv_format;
pub mod date_format;
pub mod detect;
pub mod error;
pub mod extract;
pub mod hdfc_format;
pub mod orchestrator;
pub mod sbi_format;
pub mod scanner;
pub mod types;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use config::ParserConfig;
pub use detect::detect_bank_type;
pub use error::{Error, Result};
pub use extract::{FileTextExtractor, TextExtractor};
pub use csv_format::CsvExport;
pub use orchestrator::{parser_for, ParseFailure, StatementParser};
pub use scanner::DialectParser;
pub use types::{
    BatchResult, CombinedStats, ParseResult, ParseStats, ParsedStatement, StatementSummary,
    Transaction, TransactionType,
};

/// Statement dialects the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankType {
    /// HDFC Bank account statement.
    Hdfc,
    /// State Bank of India account statement.
    Sbi,
    /// Text that matched no known dialect.
    Unrecognized,
}

impl FromStr for BankType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hdfc" | "hdfc bank" => Ok(BankType::Hdfc),
            "sbi" | "state bank of india" => Ok(BankType::Sbi),
            _ => Err(Error::InvalidBankType(s.to_string())),
        }
    }
}

impl BankType {
    /// Every dialect a parser exists for.
    pub const SUPPORTED: [BankType; 2] = [BankType::Hdfc, BankType::Sbi];

    /// Human readable bank name.
    pub fn display_name(&self) -> &'static str {
        match self {
            BankType::Hdfc => "HDFC Bank",
            BankType::Sbi => "State Bank of India",
            BankType::Unrecognized => "Unrecognized",
        }
    }

    /// Whether a dialect parser exists for this bank type.
    pub fn is_supported(&self) -> bool {
        !matches!(self, BankType::Unrecognized)
    }
}

impl fmt::Display for BankType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Output formats of the `parse_statement` tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Full parse results as JSON.
    Json,
    /// One CSV row per transaction.
    Csv,
    /// Per-file totals as plain text.
    Summary,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "summary" | "text" => Ok(OutputFormat::Summary),
            _ => Err(Error::InvalidOutputFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_type_from_str() {
        assert_eq!("hdfc".parse::<BankType>().unwrap(), BankType::Hdfc);
        assert_eq!("HDFC".parse::<BankType>().unwrap(), BankType::Hdfc);
        assert_eq!("State Bank of India".parse::<BankType>().unwrap(), BankType::Sbi);
        assert!("unknown".parse::<BankType>().is_err());
        assert!("unrecognized".parse::<BankType>().is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Summary);
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(Error::InvalidOutputFormat(_))
        ));
    }

    #[test]
    fn test_unsupported_format_names_banks() {
        let message = Error::unsupported_format().to_string();
        assert!(message.contains("HDFC Bank"));
        assert!(message.contains("State Bank of India"));
    }
}
