//! State Bank of India statement dialect.
//!
//! Table columns:
//!
//! ```text
//! Txn Date  Value Date  Description  Ref No./Cheque No.  Debit  Credit  Balance
//! ```
//!
//! Dates are `d Mon yyyy`. The empty debit or credit cell is printed as a
//! dash, so rows usually keep all three amount columns.

use crate::config::ParserConfig;
use crate::error::Result;
use crate::scanner::{compile, compile_one, scan_statement, DialectParser, DialectRules};
use crate::types::ParsedStatement;
use crate::BankType;
use regex::Regex;
use std::sync::OnceLock;

const TABLE_HEADER: &[&str] = &[
    r"(?i)\bDate\b",
    r"(?i)\b(?:Description|Particulars|Narration)\b",
    r"(?i)\b(?:Debit|Withdrawal)",
];

const ACCOUNT_NUMBER: &[&str] =
    &[r"(?i)\bAccount\s+(?:Number|No)\b\.?\s*:?\s*(?P<value>[0-9X*]{6,})"];

const HOLDER_NAME: &[&str] =
    &[r"(?i)^\s*Account\s+Name\s*:\s*(?:(?:Mrs|Mr|Ms|Dr)\.?\s+)?(?P<value>.+?)\s*$"];

const PERIOD: &[&str] = &[
    r"(?i)\bfrom\s*:?\s*(?P<start>{DATE})\s+to\s*:?\s*(?P<end>{DATE})",
    r"(?i)\bperiod\b\D*?(?P<start>{DATE})\s*(?:to|-)\s*(?P<end>{DATE})",
];

const BOILERPLATE: &[&str] = &[
    r"(?i)^\s*(?:opening|closing)\s+balance",
    r"(?i)^\s*balance\s+as\s+on",
    r"(?i)^\s*page\s+(?:no\b)?[\s.:]*\d+",
    r"(?i)computer\s+generated",
    r"(?i)please\s+do\s+not\s+share",
    r"^\s*\*",
];

const OPENING_BALANCE: &str =
    r"(?i)(?:opening\s+balance|balance\s+as\s+on\s+{DATE})\D*?(?P<balance>{AMT})";

const AMOUNT_LINES: &[&str] = &[
    // debit, credit, balance; the empty side is a dash
    r"(?:^|\s)(?P<withdrawal>{AMT}|-)\s+(?P<deposit>{AMT}|-)\s+(?P<balance>-?{AMT})\s*(?P<balance_marker>(?i:cr|dr))?\s*$",
    // dash lost in extraction
    r"(?:^|\s)(?P<amount>{AMT})\s*(?P<marker>(?i:cr|dr))?\s+(?P<balance>-?{AMT})\s*(?P<balance_marker>(?i:cr|dr))?\s*$",
];

const CREDIT_HINTS: &str = r"(?i)(?:^|\s)BY\s+(?:TRANSFER|CLEARING|CASH)|\b(?:CREDIT|CR|SALARY|DEPOSIT|REFUND|INTEREST|REVERSAL)\b";

fn rules() -> &'static DialectRules {
    static RULES: OnceLock<DialectRules> = OnceLock::new();
    RULES.get_or_init(|| DialectRules {
        bank_type: BankType::Sbi,
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

fn leading_value_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile_one(r"^\s*{DATE}(?:\s+|$)"))
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile_one(
            r"(?i)(?:^|\s+)(?P<reference>TRANSFER\s+(?:FROM|TO)\s+\d+|(?:CHQ|CHEQUE)\s*(?:NO\.?)?\s*\d+)\s*$",
        )
    })
}

/// Drop the value date from the front of the row text and split off the
/// Ref No./Cheque No. cell from the end.
pub fn split_reference(text: &str) -> (String, Option<String>) {
    let mut rest = text.trim();
    if let Some(m) = leading_value_date_re().find(rest) {
        rest = &rest[m.end()..];
    }

    match reference_re().captures(rest) {
        Some(caps) => {
            let start = caps.get(0).map_or(rest.len(), |m| m.start());
            let reference = caps
                .name("reference")
                .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "));
            (rest[..start].trim().to_string(), reference)
        }
        None => (rest.trim().to_string(), None),
    }
}

/// Parser for State Bank of India statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SbiParser;

impl DialectParser for SbiParser {
    fn bank_type(&self) -> BankType {
        BankType::Sbi
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionType;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const STATEMENT: &str = "\
STATE BANK OF INDIA
Account Name      : Mr. PRIYA NAIR
Address           : 12 MG ROAD
Account Number    : 00000031234567890
Branch            : MG ROAD BANGALORE
Balance as on 1 Apr 2023 : 10,000.00
Account Statement from 1 Apr 2023 to 30 Apr 2023
Txn Date Value Date Description Ref No./Cheque No. Debit Credit Balance
1 Apr 2023 1 Apr 2023 BY TRANSFER-NEFT*HDFC0000001*N0912345*ACME CORP TRANSFER FROM 4897691162091 - 50,000.00 60,000.00
3 Apr 2023 3 Apr 2023 TO TRANSFER-UPI/DR/312345678901/SWIGGY TRANSFER TO 4897694162093 450.00 - 59,550.00
5 Apr 2023 5 Apr 2023 ATM WDL-ATM CASH 1234 MG ROAD
Please do not share your ATM, Debit/Credit card number, PIN and OTP
BANGALORE 2,000.00 - 57,550.00
10 Apr 2023 10 Apr 2023 TO CLG-PAID TO LANDLORD CHQ NO 000123 15,000.00 - 42,550.00
30 Apr 2023 30 Apr 2023 INT.PD 120.00 42,670.00
**This is a computer generated statement and does not require a signature
";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(text: &str) -> ParsedStatement {
        SbiParser
            .parse(text, 9, None, &ParserConfig::default())
            .unwrap()
    }

    #[test]
    fn test_full_statement() {
        let statement = parse(STATEMENT);
        assert_eq!(statement.bank_type, BankType::Sbi);
        assert_eq!(statement.account_number, "00000031234567890");
        assert_eq!(statement.account_holder_name, "PRIYA NAIR");
        assert_eq!(statement.start_date, ymd(2023, 4, 1));
        assert_eq!(statement.end_date, ymd(2023, 4, 30));

        let rows: Vec<_> = statement
            .transactions
            .iter()
            .map(|t| {
                (
                    t.date,
                    t.description.as_str(),
                    t.amount,
                    t.transaction_type,
                    t.reference.as_deref(),
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                (
                    ymd(2023, 4, 1),
                    "BY TRANSFER-NEFT*HDFC0000001*N0912345*ACME CORP",
                    dec("50000.00"),
                    TransactionType::Credit,
                    Some("TRANSFER FROM 4897691162091"),
                ),
                (
                    ymd(2023, 4, 3),
                    "TO TRANSFER-UPI/DR/312345678901/SWIGGY",
                    dec("450.00"),
                    TransactionType::Debit,
                    Some("TRANSFER TO 4897694162093"),
                ),
                (
                    ymd(2023, 4, 5),
                    "ATM WDL-ATM CASH 1234 MG ROAD BANGALORE",
                    dec("2000.00"),
                    TransactionType::Debit,
                    None,
                ),
                (
                    ymd(2023, 4, 10),
                    "TO CLG-PAID TO LANDLORD",
                    dec("15000.00"),
                    TransactionType::Debit,
                    Some("CHQ NO 000123"),
                ),
                (
                    ymd(2023, 4, 30),
                    "INT.PD",
                    dec("120.00"),
                    TransactionType::Credit,
                    None,
                ),
            ]
        );

        let balances: Vec<_> = statement.transactions.iter().map(|t| t.balance).collect();
        assert_eq!(
            balances,
            vec![
                Some(dec("60000.00")),
                Some(dec("59550.00")),
                Some(dec("57550.00")),
                Some(dec("42550.00")),
                Some(dec("42670.00")),
            ]
        );
    }

    #[test]
    fn test_summary_totals() {
        let summary = parse(STATEMENT).summary();
        assert_eq!(summary.total_credits, dec("50120.00"));
        assert_eq!(summary.total_debits, dec("17450.00"));
        assert_eq!(summary.transaction_count, 5);
    }

    #[test]
    fn test_period_inferred_without_label() {
        let text = "\
Txn Date Value Date Description Ref No./Cheque No. Debit Credit Balance
12 May 2023 12 May 2023 TO CASH 100.00 - 900.00
2 May 2023 2 May 2023 BY CASH - 1,000.00 1,000.00
";
        let statement = parse(text);
        assert_eq!(statement.start_date, ymd(2023, 5, 2));
        assert_eq!(statement.end_date, ymd(2023, 5, 12));
        assert_eq!(statement.account_number, "");
        assert_eq!(statement.transactions.len(), 2);
    }

    #[test]
    fn test_uppercase_month_rows() {
        let text = "\
STATE BANK OF INDIA
Account Statement from 01 APR 2023 to 30 APR 2023
Txn Date Value Date Description Ref No./Cheque No. Debit Credit Balance
01 APR 2023 01 APR 2023 BY CASH - 500.00 1,500.00
03 APR 2023 03 APR 2023 TO TRANSFER-INB HDFC BANK CREDIT CARD 200.00 - 1,300.00
";
        let statement = parse(text);
        assert_eq!(statement.start_date, ymd(2023, 4, 1));
        assert_eq!(statement.end_date, ymd(2023, 4, 30));

        let rows: Vec<_> = statement
            .transactions
            .iter()
            .map(|t| (t.date, t.description.as_str(), t.transaction_type))
            .collect();
        assert_eq!(
            rows,
            vec![
                (ymd(2023, 4, 1), "BY CASH", TransactionType::Credit),
                (
                    ymd(2023, 4, 3),
                    "TO TRANSFER-INB HDFC BANK CREDIT CARD",
                    TransactionType::Debit
                ),
            ]
        );
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(
            split_reference("1 Apr 2023 BY CASH"),
            ("BY CASH".to_string(), None)
        );
        assert_eq!(
            split_reference("1 Apr 2023 TO SELF CHEQUE 4411"),
            ("TO SELF".to_string(), Some("CHEQUE 4411".to_string()))
        );
        assert_eq!(
            split_reference("NEFT TRANSFER  FROM  123"),
            ("NEFT".to_string(), Some("TRANSFER FROM 123".to_string()))
        );
    }
}
