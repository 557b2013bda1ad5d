//! Line scanner shared by the dialect parsers.
//!
//! Every supported dialect has the same overall shape: a header block with
//! account metadata, a table header row, and transaction rows that start
//! with a date, may wrap across several lines, and end with an amount
//! column group. The dialects differ only in vocabulary and regexes, which
//! live in [`DialectRules`].
//!
//! Rows are recognized by a small state machine over the line array:
//!
//! ```text
//! ScanningForDate --date line--> AccumulatingDescription --amount line--> AmountFound
//!        ^                              |        (or amounts on the date line itself)
//!        |                              | new date line / lookahead exhausted
//!        +------------------------------+ (row discarded)
//! ```
//!
//! A row that never reaches `AmountFound` is dropped without error.

use crate::config::ParserConfig;
use crate::date_format::{find_date_tokens, leading_date_token, normalize_date, DATE_TOKEN};
use crate::error::{Error, Result};
use crate::types::{ParsedStatement, Transaction, TransactionType};
use crate::BankType;
use chrono::{Local, NaiveDate};
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Regex fragment for one printed amount: `50000.00`, `12,500.00`, `1,25,000.00`.
pub const AMOUNT_TOKEN: &str = r"(?:\d{1,3}(?:,\d{2,3})+|\d+)\.\d{2}";

/// A parser for one statement dialect.
pub trait DialectParser: Sync {
    /// Dialect this parser understands.
    fn bank_type(&self) -> BankType;

    /// Parse extracted statement text.
    ///
    /// Fails only when the transaction table cannot be located.
    fn parse(
        &self,
        text: &str,
        user_id: i64,
        account_id: Option<i64>,
        config: &ParserConfig,
    ) -> Result<ParsedStatement>;
}

/// Compiled recognition rules for one dialect.
///
/// Patterns may use the placeholders `{DATE}` and `{AMT}`, which expand to
/// [`DATE_TOKEN`] and [`AMOUNT_TOKEN`].
pub struct DialectRules {
    pub bank_type: BankType,
    /// All must match one line for it to be the table header.
    pub table_header: Vec<Regex>,
    /// Capture group `value`.
    pub account_number: Vec<Regex>,
    /// Capture group `value`.
    pub holder_name: Vec<Regex>,
    /// Capture groups `start` and `end`.
    pub period: Vec<Regex>,
    /// Lines skipped wherever they appear inside the table.
    pub boilerplate: Vec<Regex>,
    /// Capture group `balance`.
    pub opening_balance: Regex,
    /// Groups `withdrawal`/`deposit` or `amount`/`marker`, plus `balance`
    /// and `balance_marker`. Tried in order.
    pub amount_lines: Vec<Regex>,
    /// Description vocabulary that suggests money coming in.
    pub credit_hints: Regex,
    /// Splits the row text into (description, reference).
    pub split_reference: fn(&str) -> (String, Option<String>),
}

/// Compile dialect patterns, expanding the `{DATE}` and `{AMT}` placeholders.
///
/// Patterns are compile-time constants, so a failure here is a programming
/// error.
pub fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| compile_one(p)).collect()
}

pub fn compile_one(pattern: &str) -> Regex {
    let expanded = pattern
        .replace("{DATE}", DATE_TOKEN)
        .replace("{AMT}", AMOUNT_TOKEN);
    Regex::new(&expanded).expect("dialect regex")
}

impl DialectRules {
    pub fn is_table_header(&self, line: &str) -> bool {
        self.table_header.iter().all(|re| re.is_match(line))
    }

    pub fn is_boilerplate(&self, line: &str) -> bool {
        line.trim().is_empty() || self.boilerplate.iter().any(|re| re.is_match(line))
    }

    pub fn opening_balance_in(&self, line: &str) -> Option<Decimal> {
        let caps = self.opening_balance.captures(line)?;
        parse_amount(caps.name("balance")?.as_str()).ok()
    }

    /// Find the amount column group at the end of `line`.
    pub fn match_amounts(&self, line: &str) -> Option<AmountLine> {
        self.amount_lines.iter().find_map(|re| {
            let caps = re.captures(line)?;
            let start = caps.get(0)?.start();
            match amount_line_from(&caps, &line[..start]) {
                Ok(amounts) => Some(amounts),
                Err(e) => {
                    log::trace!("Amount pattern matched but did not parse ({}): {:?}", e, line);
                    None
                }
            }
        })
    }
}

/// The amount columns found at the end of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountLine {
    /// Row text before the amounts.
    pub prefix: String,
    pub columns: AmountColumns,
    /// Running balance, negative when marked `Dr`.
    pub balance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AmountColumns {
    /// Separate withdrawal and deposit columns; placeholders are `None`.
    Split {
        withdrawal: Option<Decimal>,
        deposit: Option<Decimal>,
    },
    /// One amount whose column was lost in extraction.
    Single {
        amount: Decimal,
        marker: Option<TransactionType>,
    },
}

fn amount_line_from(caps: &Captures<'_>, prefix: &str) -> Result<AmountLine> {
    let mut balance = caps
        .name("balance")
        .map(|m| parse_amount(m.as_str()))
        .transpose()?;
    if let (Some(value), Some(marker)) = (balance, caps.name("balance_marker")) {
        if marker.as_str().eq_ignore_ascii_case("dr") {
            balance = Some(-value.abs());
        }
    }

    let columns = match caps.name("amount") {
        Some(amount) => AmountColumns::Single {
            amount: parse_amount(amount.as_str())?.abs(),
            marker: caps
                .name("marker")
                .and_then(|m| m.as_str().parse::<TransactionType>().ok()),
        },
        None => AmountColumns::Split {
            withdrawal: parse_column(caps.name("withdrawal").map(|m| m.as_str()))?,
            deposit: parse_column(caps.name("deposit").map(|m| m.as_str()))?,
        },
    };

    Ok(AmountLine {
        prefix: prefix.trim().to_string(),
        columns,
        balance,
    })
}

/// Parse a printed amount, dropping grouping separators. No rounding.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let cleaned = raw.trim().replace([',', ' '], "");
    Decimal::from_str(&cleaned).map_err(|_| Error::InvalidAmount(raw.to_string()))
}

/// A withdrawal/deposit cell. Dashes, blanks and zero mean "empty".
fn parse_column(raw: Option<&str>) -> Result<Option<Decimal>> {
    let raw = match raw.map(str::trim) {
        None | Some("") | Some("-") => return Ok(None),
        Some(raw) => raw,
    };
    let value = parse_amount(raw)?.abs();
    Ok(if value.is_zero() { None } else { Some(value) })
}

/// Account metadata read from the top of a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementHeader {
    pub account_number: String,
    pub holder_name: String,
    pub period: Option<(NaiveDate, NaiveDate)>,
}

/// Read account number, holder name and labeled period from the first
/// `window` lines. The first match for each field wins.
pub fn read_header(lines: &[&str], rules: &DialectRules, window: usize) -> StatementHeader {
    let mut header = StatementHeader::default();

    for line in lines.iter().take(window) {
        if header.account_number.is_empty() {
            if let Some(value) = capture_value(&rules.account_number, line) {
                header.account_number = value;
            }
        }
        if header.holder_name.is_empty() {
            if let Some(value) = capture_value(&rules.holder_name, line) {
                header.holder_name = value;
            }
        }
        if header.period.is_none() {
            header.period = labeled_period(&rules.period, line);
        }
    }

    header
}

fn capture_value(patterns: &[Regex], line: &str) -> Option<String> {
    patterns
        .iter()
        .filter_map(|re| re.captures(line))
        .filter_map(|caps| caps.name("value").map(|m| m.as_str().trim().to_string()))
        .find(|value| !value.is_empty())
}

fn labeled_period(patterns: &[Regex], line: &str) -> Option<(NaiveDate, NaiveDate)> {
    for re in patterns {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let start = caps.name("start").map(|m| normalize_date(m.as_str()));
        let end = caps.name("end").map(|m| normalize_date(m.as_str()));
        match (start, end) {
            (Some(Ok(start)), Some(Ok(end))) => return Some((start, end)),
            _ => log::debug!("Unparseable statement period: {:?}", line.trim()),
        }
    }
    None
}

/// Guess the statement period from the dates printed near the top.
///
/// Raw tokens are sorted and deduplicated as text first, then normalized;
/// the earliest and latest valid dates become the bounds.
pub fn infer_period(lines: &[&str], scan_lines: usize) -> Option<(NaiveDate, NaiveDate)> {
    let mut raw: Vec<&str> = lines
        .iter()
        .copied()
        .take(scan_lines)
        .flat_map(find_date_tokens)
        .collect();
    raw.sort_unstable();
    raw.dedup();

    let dates: Vec<NaiveDate> = raw.iter().filter_map(|r| normalize_date(r).ok()).collect();
    Some((*dates.iter().min()?, *dates.iter().max()?))
}

/// Index of the first line after the transaction table header.
pub fn find_table_start(lines: &[&str], rules: &DialectRules) -> Option<usize> {
    lines
        .iter()
        .position(|line| rules.is_table_header(line))
        .map(|i| i + 1)
}

/// Run the full dialect pipeline over extracted text.
pub fn scan_statement(
    text: &str,
    rules: &DialectRules,
    user_id: i64,
    account_id: Option<i64>,
    config: &ParserConfig,
) -> Result<ParsedStatement> {
    let lines: Vec<&str> = text.lines().collect();

    let table_start = find_table_start(&lines, rules).ok_or_else(|| {
        log::warn!("No {} transaction table found", rules.bank_type);
        Error::unsupported_format()
    })?;

    let mut statement = ParsedStatement::new(rules.bank_type, Local::now().date_naive());

    let header = read_header(&lines, rules, config.header_window);
    statement.account_number = header.account_number;
    statement.account_holder_name = header.holder_name;

    match header
        .period
        .or_else(|| infer_period(&lines, config.period_scan_lines))
    {
        Some((start, end)) => {
            statement.start_date = start.min(end);
            statement.end_date = start.max(end);
        }
        None => log::debug!("No statement period found, using today"),
    }

    let opening_balance = lines.iter().find_map(|line| rules.opening_balance_in(line));
    let scanner = RowScanner::new(rules, config, user_id, account_id);
    statement.transactions = scanner.scan(&lines[table_start..], opening_balance);

    Ok(statement)
}

/// A row whose date has been seen but whose amounts have not.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    pub date: NaiveDate,
    pub fragments: Vec<String>,
    /// Lines consumed after the date line.
    pub continuation_lines: usize,
}

impl PendingRow {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            fragments: Vec::new(),
            continuation_lines: 0,
        }
    }

    fn push(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            self.fragments.push(fragment.to_string());
        }
    }

    fn text(&self) -> String {
        self.fragments
            .iter()
            .flat_map(|f| f.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    ScanningForDate,
    AccumulatingDescription(PendingRow),
    AmountFound(PendingRow, AmountLine),
}

/// Whether a transition used up the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Consumed,
    Retry,
}

/// Row state machine for one dialect.
pub struct RowScanner<'a> {
    rules: &'a DialectRules,
    lookahead: usize,
    user_id: i64,
    account_id: Option<i64>,
}

impl<'a> RowScanner<'a> {
    pub fn new(
        rules: &'a DialectRules,
        config: &ParserConfig,
        user_id: i64,
        account_id: Option<i64>,
    ) -> Self {
        Self {
            rules,
            lookahead: config.lookahead_lines,
            user_id,
            account_id,
        }
    }

    /// Scan table lines into transactions, in order of appearance.
    pub fn scan(&self, lines: &[&str], opening_balance: Option<Decimal>) -> Vec<Transaction> {
        let mut transactions = Vec::new();
        let mut previous_balance = opening_balance;
        let mut state = ScanState::ScanningForDate;
        let mut idx = 0;

        while idx < lines.len() {
            let (next, step) = self.step(state, lines[idx]);
            if step == Step::Consumed {
                idx += 1;
            }

            state = match next {
                ScanState::AmountFound(row, amounts) => {
                    if let Some(transaction) = self.build_transaction(row, amounts, previous_balance) {
                        if transaction.balance.is_some() {
                            previous_balance = transaction.balance;
                        }
                        transactions.push(transaction);
                    }
                    ScanState::ScanningForDate
                }
                other => other,
            };
        }

        if let ScanState::AccumulatingDescription(row) = state {
            log::trace!("Discarding trailing row dated {} without amounts", row.date);
        }

        transactions
    }

    /// One state transition on one line.
    pub fn step(&self, state: ScanState, line: &str) -> (ScanState, Step) {
        match state {
            ScanState::ScanningForDate => {
                if self.is_skippable(line) {
                    return (ScanState::ScanningForDate, Step::Consumed);
                }
                match self.row_start(line) {
                    Some((date, rest)) => (self.begin_row(date, rest), Step::Consumed),
                    None => (ScanState::ScanningForDate, Step::Consumed),
                }
            }
            ScanState::AccumulatingDescription(mut row) => {
                if self.is_skippable(line) {
                    return (ScanState::AccumulatingDescription(row), Step::Consumed);
                }
                if self.row_start(line).is_some() {
                    log::trace!("Row dated {} ended without amounts", row.date);
                    return (ScanState::ScanningForDate, Step::Retry);
                }
                if row.continuation_lines >= self.lookahead {
                    log::trace!("Row dated {} exhausted lookahead", row.date);
                    return (ScanState::ScanningForDate, Step::Retry);
                }

                row.continuation_lines += 1;
                match self.rules.match_amounts(line) {
                    Some(amounts) => {
                        row.push(&amounts.prefix);
                        (ScanState::AmountFound(row, amounts), Step::Consumed)
                    }
                    None => {
                        row.push(line);
                        (ScanState::AccumulatingDescription(row), Step::Consumed)
                    }
                }
            }
            found @ ScanState::AmountFound(..) => (found, Step::Retry),
        }
    }

    fn is_skippable(&self, line: &str) -> bool {
        self.rules.is_boilerplate(line) || self.rules.is_table_header(line)
    }

    /// The normalized date a row starts with, and the rest of the line.
    fn row_start<'l>(&self, line: &'l str) -> Option<(NaiveDate, &'l str)> {
        let token = leading_date_token(line)?;
        let date = normalize_date(token).ok()?;
        let offset = line.find(token)? + token.len();
        Some((date, &line[offset..]))
    }

    fn begin_row(&self, date: NaiveDate, rest: &str) -> ScanState {
        let mut row = PendingRow::new(date);
        match self.rules.match_amounts(rest) {
            Some(amounts) => {
                row.push(&amounts.prefix);
                ScanState::AmountFound(row, amounts)
            }
            None => {
                row.push(rest);
                ScanState::AccumulatingDescription(row)
            }
        }
    }

    fn build_transaction(
        &self,
        row: PendingRow,
        amounts: AmountLine,
        previous_balance: Option<Decimal>,
    ) -> Option<Transaction> {
        let text = row.text();

        let (transaction_type, amount) = match amounts.columns {
            AmountColumns::Split {
                withdrawal: Some(amount),
                deposit: None,
            } => (TransactionType::Debit, amount),
            AmountColumns::Split {
                withdrawal: None,
                deposit: Some(amount),
            } => (TransactionType::Credit, amount),
            AmountColumns::Split { .. } => {
                log::trace!("Row dated {} has no single amount column: {:?}", row.date, text);
                return None;
            }
            AmountColumns::Single { amount, marker } => {
                let direction =
                    self.resolve_direction(amount, marker, amounts.balance, previous_balance, &text);
                (direction, amount)
            }
        };

        let (description, reference) = (self.rules.split_reference)(&text);

        Some(Transaction {
            date: row.date,
            description,
            amount,
            transaction_type,
            balance: amounts.balance,
            reference,
            user_id: self.user_id,
            bank_account_id: self.account_id,
            bank_statement_id: None,
            category: None,
        })
    }

    /// Direction of a lone amount: printed marker, then running-balance
    /// continuity, then description vocabulary, then debit.
    fn resolve_direction(
        &self,
        amount: Decimal,
        marker: Option<TransactionType>,
        balance: Option<Decimal>,
        previous_balance: Option<Decimal>,
        text: &str,
    ) -> TransactionType {
        if let Some(marker) = marker {
            return marker;
        }
        if let (Some(previous), Some(balance)) = (previous_balance, balance) {
            if previous - amount == balance {
                return TransactionType::Debit;
            }
            if previous + amount == balance {
                return TransactionType::Credit;
            }
        }
        if self.rules.credit_hints.is_match(text) {
            TransactionType::Credit
        } else {
            TransactionType::Debit
        }
    }
}
