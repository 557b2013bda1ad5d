//! End-to-end statement parsing: extract, detect, dispatch, measure.

use crate::config::ParserConfig;
use crate::detect::detect_bank_type;
use crate::error::{Error, Result};
use crate::extract::{FileTextExtractor, TextExtractor};
use crate::hdfc_format::HdfcParser;
use crate::sbi_format::SbiParser;
use crate::scanner::DialectParser;
use crate::types::{BatchResult, CombinedStats, ParseResult, ParseStats, ParsedStatement};
use crate::BankType;
use std::fmt;
use std::path::Path;
use std::thread;
use std::time::Instant;

/// The parser registered for a dialect.
pub fn parser_for(bank_type: BankType) -> Option<&'static dyn DialectParser> {
    match bank_type {
        BankType::Hdfc => Some(&HdfcParser),
        BankType::Sbi => Some(&SbiParser),
        BankType::Unrecognized => None,
    }
}

/// A failed single-file parse, with the stats gathered before the failure.
#[derive(Debug)]
pub struct ParseFailure {
    pub error: Error,
    pub stats: ParseStats,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for ParseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Parses statement files into transactions.
#[derive(Debug, Clone, Default)]
pub struct StatementParser<E: TextExtractor = FileTextExtractor> {
    extractor: E,
    config: ParserConfig,
    /// Skips detection when set.
    bank_type: Option<BankType>,
}

impl StatementParser<FileTextExtractor> {
    /// Parser reading PDF and `.txt` files with the default config.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: TextExtractor> StatementParser<E> {
    /// Use a different text source, e.g. an OCR service.
    pub fn with_extractor(extractor: E) -> Self {
        Self {
            extractor,
            config: ParserConfig::default(),
            bank_type: None,
        }
    }

    /// Replace the scan windows and batch settings.
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse every input as `bank_type` instead of detecting the dialect.
    pub fn with_bank_type(mut self, bank_type: BankType) -> Self {
        self.bank_type = Some(bank_type);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Detect the dialect of already extracted text and parse it.
    pub fn parse_text(
        &self,
        text: &str,
        user_id: i64,
        account_id: Option<i64>,
    ) -> Result<ParsedStatement> {
        let bank_type = self.bank_type.unwrap_or_else(|| detect_bank_type(text));
        let parser = parser_for(bank_type).ok_or_else(Error::unsupported_format)?;
        parser.parse(text, user_id, account_id, &self.config)
    }

    /// Parse one statement file.
    ///
    /// On failure the returned [`ParseFailure`] still carries the elapsed
    /// time, with a zero transaction count and success rate.
    pub fn parse_bank_statement(
        &self,
        path: impl AsRef<Path>,
        user_id: i64,
        account_id: Option<i64>,
    ) -> std::result::Result<ParseResult, ParseFailure> {
        let path = path.as_ref();
        let started = Instant::now();

        let outcome = self.extractor.extract_text(path).and_then(|text| {
            let statement = self.parse_text(&text, user_id, account_id)?;
            Ok((statement, text.lines().count()))
        });
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok((statement, total_lines)) => {
                let stats = ParseStats::new(statement.transactions.len(), total_lines, elapsed);
                log::info!(
                    "Parsed {}: bank={} transactions={} success_rate={:.3}",
                    path.display(),
                    statement.bank_type,
                    stats.transaction_count,
                    stats.success_rate
                );
                Ok(ParseResult { statement, stats })
            }
            Err(error) => {
                log::warn!("Failed to parse {}: {}", path.display(), error);
                Err(ParseFailure {
                    error,
                    stats: ParseStats::failed(elapsed),
                })
            }
        }
    }

    /// Parse several files, skipping the ones that fail.
    ///
    /// Results keep input order. With `parallel_batch` set, each file gets
    /// its own scoped thread.
    pub fn parse_multiple_bank_statements<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
        user_id: i64,
        account_id: Option<i64>,
    ) -> BatchResult {
        let started = Instant::now();

        let outcomes: Vec<_> = if self.config.parallel_batch {
            self.parse_parallel(paths, user_id, account_id)
        } else {
            paths
                .iter()
                .map(|path| self.parse_bank_statement(path, user_id, account_id))
                .collect()
        };

        let results: Vec<ParseResult> = outcomes.into_iter().filter_map(|o| o.ok()).collect();
        let combined_stats =
            CombinedStats::from_results(&results, started.elapsed().as_secs_f64());

        log::info!(
            "Batch done: {}/{} files, {} transactions",
            combined_stats.file_count,
            paths.len(),
            combined_stats.total_transactions
        );

        BatchResult {
            results,
            combined_stats,
        }
    }

    fn parse_parallel<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
        user_id: i64,
        account_id: Option<i64>,
    ) -> Vec<std::result::Result<ParseResult, ParseFailure>> {
        thread::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| {
                    scope.spawn(move || self.parse_bank_statement(path, user_id, account_id))
                })
                .collect();

            handles
                .into_iter()
                .zip(paths)
                .map(|(handle, path)| {
                    handle.join().unwrap_or_else(|_| {
                        let path = path.as_ref();
                        log::warn!("Worker for {} panicked", path.display());
                        Err(ParseFailure {
                            error: Error::Extraction {
                                path: path.to_path_buf(),
                                message: "parser thread panicked".to_string(),
                            },
                            stats: ParseStats::default(),
                        })
                    })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionType;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    const HDFC_TWO_ROWS: &str = "\
HDFC BANK LIMITED
Date Narration Chq./Ref.No. Value Dt Withdrawal Amt. Deposit Amt. Closing Balance
01/04/23 SALARY CREDIT 50,000.00 75,000.00
02/04/23 RENT 20,000.00 55,000.00
";

    const SBI_TWO_ROWS: &str = "\
STATE BANK OF INDIA
Txn Date Value Date Description Ref No./Cheque No. Debit Credit Balance
1 Apr 2023 1 Apr 2023 BY CASH - 500.00 1,500.00
2 Apr 2023 2 Apr 2023 TO ATM 200.00 - 1,300.00
";

    /// Serves fixed text per file name.
    struct FixedText(HashMap<&'static str, &'static str>);

    impl TextExtractor for FixedText {
        fn extract_text(&self, path: &Path) -> Result<String> {
            let name = path.to_string_lossy();
            self.0
                .get(&*name)
                .map(|text| text.to_string())
                .ok_or_else(|| Error::Extraction {
                    path: path.to_path_buf(),
                    message: "no such fixture".to_string(),
                })
        }
    }

    fn fixed(files: &[(&'static str, &'static str)]) -> StatementParser<FixedText> {
        StatementParser::with_extractor(FixedText(files.iter().copied().collect()))
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stmt_ingest_{}_{}", std::process::id(), name));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parser_for() {
        assert_eq!(parser_for(BankType::Hdfc).unwrap().bank_type(), BankType::Hdfc);
        assert_eq!(parser_for(BankType::Sbi).unwrap().bank_type(), BankType::Sbi);
        assert!(parser_for(BankType::Unrecognized).is_none());
    }

    #[test]
    fn test_parse_text_dispatches_by_dialect() {
        let parser = StatementParser::new();
        let hdfc = parser.parse_text(HDFC_TWO_ROWS, 1, None).unwrap();
        assert_eq!(hdfc.bank_type, BankType::Hdfc);
        assert_eq!(hdfc.transactions.len(), 2);

        let sbi = parser.parse_text(SBI_TWO_ROWS, 1, None).unwrap();
        assert_eq!(sbi.bank_type, BankType::Sbi);
        let types: Vec<_> = sbi.transactions.iter().map(|t| t.transaction_type).collect();
        assert_eq!(types, vec![TransactionType::Credit, TransactionType::Debit]);
    }

    #[test]
    fn test_forced_bank_type_skips_detection() {
        let text = SBI_TWO_ROWS.replace("STATE BANK OF INDIA", "HDFC BANK LIMITED");
        let detected = StatementParser::new().parse_text(&text, 1, None).unwrap_err();
        assert!(matches!(detected, Error::UnsupportedFormat { .. }));

        let forced = StatementParser::new()
            .with_bank_type(BankType::Sbi)
            .parse_text(&text, 1, None)
            .unwrap();
        assert_eq!(forced.bank_type, BankType::Sbi);
        assert_eq!(forced.transactions.len(), 2);

        let unrecognized = StatementParser::new()
            .with_bank_type(BankType::Unrecognized)
            .parse_text(HDFC_TWO_ROWS, 1, None);
        assert!(unrecognized.is_err());
    }

    #[test]
    fn test_single_file_stats() {
        let parser = fixed(&[("april.pdf", HDFC_TWO_ROWS)]);
        let result = parser.parse_bank_statement("april.pdf", 42, Some(7)).unwrap();
        assert_eq!(result.stats.transaction_count, 2);
        assert_eq!(result.stats.success_rate, 2.0 / 4.0);
        assert!(result.stats.processing_time >= 0.0);
        assert!(result
            .statement
            .transactions
            .iter()
            .all(|t| t.user_id == 42 && t.bank_account_id == Some(7)));
    }

    #[test]
    fn test_unrecognized_text_fails_with_zero_stats() {
        let parser = fixed(&[("notes.pdf", "Grocery list\nmilk\neggs\n")]);
        let failure = parser.parse_bank_statement("notes.pdf", 1, None).unwrap_err();
        assert!(matches!(
            failure.error,
            Error::UnsupportedFormat { ref supported } if supported == &BankType::SUPPORTED.to_vec()
        ));
        assert_eq!(failure.stats.transaction_count, 0);
        assert_eq!(failure.stats.success_rate, 0.0);
        assert!(failure.to_string().contains("HDFC Bank"));
    }

    #[test]
    fn test_empty_text_fails() {
        let parser = fixed(&[("blank.pdf", "")]);
        let failure = parser.parse_bank_statement("blank.pdf", 1, None).unwrap_err();
        assert!(matches!(failure.error, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_batch_of_three_hdfc_files() {
        let parser = fixed(&[
            ("jan.pdf", HDFC_TWO_ROWS),
            ("feb.pdf", HDFC_TWO_ROWS),
            ("mar.pdf", HDFC_TWO_ROWS),
        ]);
        let batch =
            parser.parse_multiple_bank_statements(&["jan.pdf", "feb.pdf", "mar.pdf"], 1, None);
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.combined_stats.file_count, 3);
        assert_eq!(batch.combined_stats.total_transactions, 6);
        assert!(batch
            .results
            .iter()
            .all(|r| r.statement.bank_type == BankType::Hdfc));
    }

    #[test]
    fn test_sbi_statement_mentioning_hdfc_parses_as_sbi() {
        let text = "\
STATE BANK OF INDIA
Txn Date Value Date Description Ref No./Cheque No. Debit Credit Balance
1 Apr 2023 1 Apr 2023 TO TRANSFER-INB HDFC BANK CREDIT CARD 500.00 - 1,500.00
";
        let statement = StatementParser::new().parse_text(text, 1, None).unwrap();
        assert_eq!(statement.bank_type, BankType::Sbi);
        assert_eq!(statement.transactions.len(), 1);
        assert_eq!(statement.transactions[0].transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_mixed_bank_batch_totals() {
        let parser = fixed(&[
            ("a.pdf", HDFC_TWO_ROWS),
            ("b.pdf", SBI_TWO_ROWS),
            ("c.pdf", HDFC_TWO_ROWS),
        ]);
        let batch = parser.parse_multiple_bank_statements(&["a.pdf", "b.pdf", "c.pdf"], 1, None);
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.combined_stats.file_count, 3);
        assert_eq!(batch.combined_stats.total_transactions, 6);
        assert_eq!(batch.combined_stats.average_success_rate, 0.5);
        let banks: Vec<_> = batch.results.iter().map(|r| r.statement.bank_type).collect();
        assert_eq!(banks, vec![BankType::Hdfc, BankType::Sbi, BankType::Hdfc]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = StatementParser::new().parse_multiple_bank_statements::<&str>(&[], 1, None);
        assert!(batch.results.is_empty());
        assert_eq!(batch.combined_stats.file_count, 0);
        assert_eq!(batch.combined_stats.average_success_rate, 0.0);
    }

    #[test]
    fn test_batch_isolates_corrupted_file() {
        let dir = temp_dir("isolation");
        let good_a = dir.join("a.txt");
        let corrupted = dir.join("b.pdf");
        let good_c = dir.join("c.txt");
        fs::write(&good_a, HDFC_TWO_ROWS).unwrap();
        fs::write(&corrupted, b"%PDF-1.4 garbage").unwrap();
        fs::write(&good_c, SBI_TWO_ROWS).unwrap();

        let paths = vec![good_a, corrupted, good_c];
        let batch = StatementParser::new().parse_multiple_bank_statements(&paths, 1, None);
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.combined_stats.file_count, 2);
        assert_eq!(batch.combined_stats.total_transactions, 4);
    }

    #[test]
    fn test_parallel_batch_keeps_order() {
        let config = ParserConfig {
            parallel_batch: true,
            ..ParserConfig::default()
        };
        let parser = fixed(&[("a.pdf", SBI_TWO_ROWS), ("b.pdf", HDFC_TWO_ROWS)])
            .with_config(config);
        let batch =
            parser.parse_multiple_bank_statements(&["a.pdf", "missing.pdf", "b.pdf"], 1, None);
        let banks: Vec<_> = batch.results.iter().map(|r| r.statement.bank_type).collect();
        assert_eq!(banks, vec![BankType::Sbi, BankType::Hdfc]);
        assert_eq!(batch.combined_stats.total_transactions, 4);
    }
}
