//! Statement Ingest - CLI tool for turning bank-statement PDFs into transactions.

use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use stmt_ingest::{
    BankType, CsvExport, OutputFormat, ParseResult, ParserConfig, Result, StatementParser,
};

#[derive(Parser)]
#[command(name = "parse_statement")]
#[command(about = "Extract transactions from HDFC Bank and SBI statement PDFs", long_about = None)]
struct Cli {
    /// Statement files (PDF, or previously extracted .txt)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// TOML parser configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Owner recorded on every transaction
    #[arg(long = "user-id", default_value_t = 0)]
    user_id: i64,

    /// Bank account recorded on every transaction
    #[arg(long = "account-id")]
    account_id: Option<i64>,

    /// Parse as this bank (hdfc, sbi) instead of detecting it
    #[arg(long)]
    bank: Option<String>,

    /// Output format (json, csv, summary)
    #[arg(long = "output-format", default_value = "summary")]
    output_format: String,

    /// Output file path (or stdout if not provided)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let output_format = cli.output_format.parse::<OutputFormat>()?;
    let config = match cli.config {
        Some(ref path) => ParserConfig::load(path)?,
        None => ParserConfig::default(),
    };

    let mut parser = StatementParser::new().with_config(config);
    if let Some(ref bank) = cli.bank {
        parser = parser.with_bank_type(bank.parse::<BankType>()?);
    }

    let results = if let [path] = cli.files.as_slice() {
        match parser.parse_bank_statement(path, cli.user_id, cli.account_id) {
            Ok(result) => vec![result],
            Err(failure) => {
                eprintln!(
                    "{}: failed after {:.3}s",
                    path.display(),
                    failure.stats.processing_time
                );
                return Err(failure.error);
            }
        }
    } else {
        let batch = parser.parse_multiple_bank_statements(cli.files.as_slice(), cli.user_id, cli.account_id);
        eprintln!(
            "Parsed {} of {} files: {} transactions, average success rate {:.3}, {:.3}s",
            batch.combined_stats.file_count,
            cli.files.len(),
            batch.combined_stats.total_transactions,
            batch.combined_stats.average_success_rate,
            batch.combined_stats.total_processing_time
        );
        batch.results
    };

    if let Some(ref output_path) = cli.output {
        let mut file = File::create(output_path)?;
        write_output(&mut file, &results, output_format)?;
    } else {
        let mut stdout = io::stdout();
        write_output(&mut stdout, &results, output_format)?;
    }

    Ok(())
}

fn write_output<W: Write>(writer: &mut W, results: &[ParseResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, results)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => {
            let transactions: Vec<_> = results
                .iter()
                .flat_map(|r| r.statement.transactions.iter().cloned())
                .collect();
            CsvExport::new(&transactions).write_to(writer)?;
        }
        OutputFormat::Summary => {
            for result in results {
                let statement = &result.statement;
                let summary = statement.summary();
                writeln!(
                    writer,
                    "{} account {} ({}) {} to {}",
                    statement.bank_type,
                    display_or_unknown(&statement.account_number),
                    display_or_unknown(&statement.account_holder_name),
                    statement.start_date,
                    statement.end_date
                )?;
                writeln!(
                    writer,
                    "  {} transactions, credits {}, debits {}, net {}, success rate {:.3}",
                    summary.transaction_count,
                    summary.total_credits,
                    summary.total_debits,
                    summary.net_flow,
                    result.stats.success_rate
                )?;
            }
        }
    }
    Ok(())
}

fn display_or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}
