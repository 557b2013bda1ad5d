//! HDFC Bank statement dialect.
//!
//! Table columns:
//!
//! ```text
//! Date  Narration  Chq./Ref.No.  Value Dt  Withdrawal Amt.  Deposit Amt.  Closing Balance
//! ```
//!
//! Dates are `dd/mm/yy`. Text extraction drops the empty withdrawal or
//! deposit cell, so most rows arrive as a single amount and a closing
//! balance.

use crate::config::ParserConfig;
use crate::error::Result;
use crate::scanner::{compile, compile_one, scan_statement, DialectParser, DialectRules};
use crate::types::ParsedStatement;
use crate::BankType;
use regex::Regex;
use std::sync::OnceLock;

const TABLE_HEADER: &[&str] = &[r"(?i)\bDate\b", r"(?i)\bNarration\b", r"(?i)\bWithdrawal"];

const ACCOUNT_NUMBER: &[&str] =
    &[r"(?i)\bA/?c(?:count)?\s*(?:No|Number)\b\.?\s*:?\s*(?P<value>[0-9X*]{6,})"];

const HOLDER_NAME: &[&str] = &[
    r"(?i)^\s*(?:Account\s+Name|Customer\s+Name|Name)\s*:\s*(?P<value>.+?)\s*$",
    // HDFC prints the holder as a bare "MR. FIRST LAST" line
    r"^\s*(?:MR|MRS|MS|M/S|DR)\.?\s+(?P<value>[A-Z][A-Z .]+?)\s*$",
];

const PERIOD: &[&str] = &[
    r"(?i)\bFrom\s*:?\s*(?P<start>{DATE})\s*To\s*:?\s*(?P<end>{DATE})",
];

const BOILERPLATE: &[&str] = &[
    r"(?i)^\s*(?:opening|closing)\s+balance",
    r"(?i)^\s*page\s+(?:no\b)?[\s.:]*\d+",
    r"(?i)statement\s+summary",
    r"(?i)^\s*HDFC\s+BANK\s+LIMITED",
    r"(?i)^\s*generated\s+on",
    r"^\s*\*",
];

const OPENING_BALANCE: &str = r"(?i)opening\s+balance\D*?(?P<balance>{AMT})";

const AMOUNT_LINES: &[&str] = &[
    // withdrawal, deposit, closing balance
    r"(?:^|\s)(?P<withdrawal>{AMT}|-)\s+(?P<deposit>{AMT}|-)\s+(?P<balance>-?{AMT})\s*(?P<balance_marker>(?i:cr|dr))?\s*$",
    // one amount, closing balance
    r"(?:^|\s)(?P<amount>{AMT})\s*(?P<marker>(?i:cr|dr))?\s+(?P<balance>-?{AMT})\s*(?P<balance_marker>(?i:cr|dr))?\s*$",
];

const CREDIT_HINTS: &str =
    r"(?i)\b(?:CREDIT|CR|SALARY|DEPOSIT|REFUND|INTEREST|REVERSAL|CASHBACK|NEFT\s+CR|IMPS\s+CR)\b";

fn rules() -> &'static DialectRules {
    static RULES: OnceLock<DialectRules> = OnceLock::new();
    RULES.get_or_init(|| DialectRules {
        bank_type: BankType::Hdfc,
        table_header: compile(TABLE_HEADER),
        account_number: compile(ACCOUNT_NUMBER),
        holder_name: compile(HOLDER_NAME),
        period: compile(PERIOD),
        boilerplate: compile(BOILERPLATE),
        opening_balance: compile_one(OPENING_BALANCE),
        amount_lines: compile(AMOUNT_LINES),
        credit_hints: compile_one(CREDIT_HINTS),
        split_reference,
    })
}

fn trailing_value_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile_one(r"\s+{DATE}\s*$"))
}

fn trailing_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+(?P<reference>[A-Za-z0-9]{6,})\s*$").expect("reference regex"))
}

/// Strip the value date and Chq./Ref.No. cells off the end of a narration.
///
/// The reference is the last token when it is at least six alphanumerics
/// with a digit among them; plain words stay in the narration.
pub fn split_reference(text: &str) -> (String, Option<String>) {
    let mut rest = text.trim();
    if let Some(m) = trailing_value_date_re().find(rest) {
        rest = rest[..m.start()].trim_end();
    }

    if let Some(caps) = trailing_token_re().captures(rest) {
        if let (Some(whole), Some(token)) = (caps.get(0), caps.name("reference")) {
            if token.as_str().chars().any(|c| c.is_ascii_digit()) {
                return (
                    rest[..whole.start()].trim_end().to_string(),
                    Some(token.as_str().to_string()),
                );
            }
        }
    }

    (rest.to_string(), None)
}

/// Parser for HDFC Bank statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct HdfcParser;

impl DialectParser for HdfcParser {
    fn bank_type(&self) -> BankType {
        BankType::Hdfc
    }

    fn parse(
        &self,
        text: &str,
        user_id: i64,
        account_id: Option<i64>,
        config: &ParserConfig,
    ) -> Result<ParsedStatement> {
        scan_statement(text, rules(), user_id, account_id, config)
    }
}
