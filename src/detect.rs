//! Bank-format detection.
//!
//! Detection is layered. Strong identity signals (the bank's own name) are
//! trusted first; the structural table-header match is the fallback because
//! column words can coincidentally appear in unrelated text; loose
//! vocabulary is the last resort.

use crate::BankType;
use regex::Regex;

/// The text signals that identify one statement dialect.
#[derive(Debug, Clone, Copy)]
pub struct DialectSignature {
    /// Dialect the signals identify.
    pub bank_type: BankType,

    /// Literal bank-name phrases, matched case-insensitively anywhere.
    pub name_phrases: &'static [&'static str],

    /// Header word patterns; all must appear on one line, in any order.
    pub header_words: &'static [&'static str],

    /// Looser dialect vocabulary, matched case-insensitively anywhere.
    pub secondary_phrases: &'static [&'static str],
}

pub const HDFC_SIGNATURE: DialectSignature = DialectSignature {
    bank_type: BankType::Hdfc,
    name_phrases: &["HDFC BANK LIMITED", "HDFC BANK LTD", "HDFC BANK"],
    header_words: &[
        r"\bDate\b",
        r"\bNarration\b",
        r"\bWithdrawal",
        r"\bDeposit",
        r"\bBalance\b",
    ],
    secondary_phrases: &["Chq./Ref.No.", "Withdrawal Amt", "Deposit Amt", "hdfcbank.com"],
};

pub const SBI_SIGNATURE: DialectSignature = DialectSignature {
    bank_type: BankType::Sbi,
    name_phrases: &["STATE BANK OF INDIA"],
    header_words: &[
        r"\bTxn\s+Date\b",
        r"\bDescription\b",
        r"\bDebit\b",
        r"\bCredit\b",
        r"\bBalance\b",
    ],
    secondary_phrases: &["Ref No./Cheque No.", "sbi.co.in", "Txn Date"],
};

/// Signatures in the order dialects are tried within each layer.
pub const SIGNATURES: [DialectSignature; 2] = [HDFC_SIGNATURE, SBI_SIGNATURE];

impl DialectSignature {
    /// Layer 1: the bank's name appears in the text.
    pub fn matches_name(&self, text: &str) -> bool {
        self.name_position(text).is_some()
    }

    /// Offset of the earliest bank-name phrase in the lowercased text.
    pub fn name_position(&self, text: &str) -> Option<usize> {
        let haystack = text.to_lowercase();
        self.name_phrases
            .iter()
            .filter_map(|phrase| haystack.find(&phrase.to_lowercase()))
            .min()
    }

    /// Layer 2: some line carries every header word.
    pub fn matches_header(&self, text: &str) -> bool {
        let patterns: Vec<Regex> = self
            .header_words
            .iter()
            .filter_map(|word| Regex::new(&format!("(?i){}", word)).ok())
            .collect();
        if patterns.len() != self.header_words.len() {
            return false;
        }
        text.lines()
            .any(|line| patterns.iter().all(|re| re.is_match(line)))
    }

    /// Layer 3: dialect vocabulary appears in the text.
    pub fn matches_secondary(&self, text: &str) -> bool {
        contains_any_phrase(text, self.secondary_phrases)
    }
}

fn contains_any_phrase(text: &str, phrases: &[&str]) -> bool {
    let haystack = text.to_lowercase();
    phrases
        .iter()
        .any(|phrase| haystack.contains(&phrase.to_lowercase()))
}

/// Classify extracted statement text into a dialect.
///
/// Narrations can mention other banks, so when several names appear the one
/// printed first wins.
pub fn detect_bank_type(text: &str) -> BankType {
    let named = SIGNATURES
        .iter()
        .filter_map(|s| s.name_position(text).map(|pos| (pos, s)))
        .min_by_key(|(pos, _)| *pos);
    if let Some((_, signature)) = named {
        log::debug!("Detected {} by name match", signature.bank_type);
        return signature.bank_type;
    }

    type Layer = fn(&DialectSignature, &str) -> bool;
    let layers: [(&str, Layer); 2] = [
        ("header", DialectSignature::matches_header),
        ("secondary", DialectSignature::matches_secondary),
    ];

    for (layer, matches) in layers {
        if let Some(signature) = SIGNATURES.iter().find(|s| matches(*s, text)) {
            log::debug!("Detected {} by {} match", signature.bank_type, layer);
            return signature.bank_type;
        }
    }

    log::debug!("No statement dialect matched");
    BankType::Unrecognized
}
