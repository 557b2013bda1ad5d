//! CSV export of recognized transactions.
//!
//! Columns: `date,description,amount,type,balance,reference`. Dates are
//! ISO `%Y-%m-%d`; an unknown balance or reference is an empty cell.

use crate::error::Result;
use crate::types::Transaction;
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;

/// Header row, written even when there are no transactions.
pub const CSV_HEADER: [&str; 6] = ["date", "description", "amount", "type", "balance", "reference"];

/// Transactions to be written as CSV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsvExport<'a> {
    pub transactions: &'a [Transaction],
}

/// CSV transaction record structure.
#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    date: String,
    description: &'a str,
    amount: String,
    #[serde(rename = "type")]
    transaction_type: &'static str,
    balance: String,
    reference: &'a str,
}

impl<'a> CsvExport<'a> {
    pub fn new(transactions: &'a [Transaction]) -> Self {
        Self { transactions }
    }

    /// Write the transactions to any destination implementing `Write`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use stmt_ingest::csv_format::CsvExport;
    /// use stmt_ingest::StatementParser;
    ///
    /// let result = StatementParser::new().parse_bank_statement("april.pdf", 1, None)?;
    /// let mut file = File::create("april.csv")?;
    /// CsvExport::new(&result.statement.transactions).write_to(&mut file)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        csv_writer.write_record(CSV_HEADER)?;

        for transaction in self.transactions {
            let record = CsvRecord {
                date: transaction.date.format("%Y-%m-%d").to_string(),
                description: &transaction.description,
                amount: transaction.amount.to_string(),
                transaction_type: transaction.transaction_type.as_str(),
                balance: transaction
                    .balance
                    .map(|b| b.to_string())
                    .unwrap_or_default(),
                reference: transaction.reference.as_deref().unwrap_or_default(),
            };

            csv_writer.serialize(record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
