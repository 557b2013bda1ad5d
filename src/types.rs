//! Common types produced by the statement parsers.

use crate::BankType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A transaction recognized in statement text, before categorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Date the transaction was booked.
    pub date: NaiveDate,

    /// Narration, with wrapped fragments joined by single spaces.
    pub description: String,

    /// Magnitude of the transaction. Never negative.
    pub amount: Decimal,

    /// Direction of the transaction.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    /// Running balance after the transaction, as printed.
    pub balance: Option<Decimal>,

    /// Cheque number, reference number or mode code.
    pub reference: Option<String>,

    /// Owner identifier supplied by the caller.
    pub user_id: i64,

    /// Bank account identifier supplied by the caller.
    pub bank_account_id: Option<i64>,

    /// Statement record identifier, assigned later by persistence.
    pub bank_statement_id: Option<i64>,

    /// Category assigned later by the categorization service.
    pub category: Option<String>,
}

/// Debit/Credit indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money leaving the account (withdrawal).
    Debit,
    /// Money entering the account (deposit).
    Credit,
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "D" | "DR" | "DEBIT" => Ok(TransactionType::Debit),
            "C" | "CR" | "CREDIT" => Ok(TransactionType::Credit),
            _ => Err(format!("Invalid debit/credit indicator: {}", s)),
        }
    }
}

impl TransactionType {
    /// Lowercase name used in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "debit",
            TransactionType::Credit => "credit",
        }
    }
}

/// Output of parsing one statement document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    /// Dialect the statement was recognized as.
    pub bank_type: BankType,

    /// Account number, empty if not found.
    pub account_number: String,

    /// Account holder name, empty if not found.
    pub account_holder_name: String,

    /// First day of the statement period.
    pub start_date: NaiveDate,

    /// Last day of the statement period.
    pub end_date: NaiveDate,

    /// Transactions in order of appearance.
    pub transactions: Vec<Transaction>,
}

impl ParsedStatement {
    /// Create an empty statement whose period is the single given day.
    pub fn new(bank_type: BankType, today: NaiveDate) -> Self {
        Self {
            bank_type,
            account_number: String::new(),
            account_holder_name: String::new(),
            start_date: today,
            end_date: today,
            transactions: Vec::new(),
        }
    }

    /// Totals over all transactions.
    pub fn summary(&self) -> StatementSummary {
        let mut summary = StatementSummary::default();
        for transaction in &self.transactions {
            match transaction.transaction_type {
                TransactionType::Debit => summary.total_debits += transaction.amount,
                TransactionType::Credit => summary.total_credits += transaction.amount,
            }
        }
        summary.net_flow = summary.total_credits - summary.total_debits;
        summary.transaction_count = self.transactions.len();
        summary
    }
}

/// Money in and out of a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSummary {
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    /// Credits minus debits.
    pub net_flow: Decimal,
    pub transaction_count: usize,
}

/// Diagnostics gathered while parsing one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Number of transactions recognized.
    pub transaction_count: usize,

    /// Recognized transactions divided by total source lines.
    pub success_rate: f64,

    /// Wall-clock seconds spent on the file.
    pub processing_time: f64,
}

impl ParseStats {
    /// Stats for a finished parse over `total_lines` lines of text.
    pub fn new(transaction_count: usize, total_lines: usize, processing_time: f64) -> Self {
        let success_rate = if total_lines == 0 {
            0.0
        } else {
            transaction_count as f64 / total_lines as f64
        };
        Self {
            transaction_count,
            success_rate,
            processing_time,
        }
    }

    /// Stats for a parse that failed before any transaction was recognized.
    pub fn failed(processing_time: f64) -> Self {
        Self {
            processing_time,
            ..Self::default()
        }
    }
}

/// A parsed statement together with its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub statement: ParsedStatement,
    pub stats: ParseStats,
}

/// Aggregate diagnostics over a batch of files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedStats {
    /// Transactions across all successful results.
    pub total_transactions: usize,

    /// Unweighted mean of each result's success rate.
    pub average_success_rate: f64,

    /// Wall-clock seconds for the whole batch.
    pub total_processing_time: f64,

    /// Number of files that parsed successfully.
    pub file_count: usize,
}

impl CombinedStats {
    /// Aggregate the results of a batch that took `total_processing_time` seconds.
    pub fn from_results(results: &[ParseResult], total_processing_time: f64) -> Self {
        let total_transactions = results.iter().map(|r| r.stats.transaction_count).sum();
        let average_success_rate = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.stats.success_rate).sum::<f64>() / results.len() as f64
        };

        Self {
            total_transactions,
            average_success_rate,
            total_processing_time,
            file_count: results.len(),
        }
    }
}

/// Successful results of a multi-file parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub results: Vec<ParseResult>,
    pub combined_stats: CombinedStats,
}
