//! Parser configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! header_window = 40
//! period_scan_lines = 120
//! lookahead_lines = 6
//! parallel_batch = false
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable scan windows for the dialect parsers and batch behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Lines at the top of a statement searched for account metadata.
    pub header_window: usize,

    /// Lines searched for date-shaped text when no period is labeled.
    pub period_scan_lines: usize,

    /// Continuation lines a row may span before its amounts appear.
    pub lookahead_lines: usize,

    /// Parse batch files on separate threads.
    pub parallel_batch: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_window: 40,
            period_scan_lines: 120,
            lookahead_lines: 6,
            parallel_batch: false,
        }
    }
}

impl ParserConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ParserConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&s)
    }

    /// Reject windows that would make the parsers scan nothing.
    pub fn validate(&self) -> Result<()> {
        if self.header_window == 0 {
            return Err(Error::Config("header_window must be at least 1".to_string()));
        }
        if self.period_scan_lines == 0 {
            return Err(Error::Config("period_scan_lines must be at least 1".to_string()));
        }
        if self.lookahead_lines == 0 {
            return Err(Error::Config("lookahead_lines must be at least 1".to_string()));
        }
        Ok(())
    }
}
