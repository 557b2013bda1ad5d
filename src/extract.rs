//! Text extraction from statement files.
//!
//! Extraction has no knowledge of statement layout; it only turns a file on
//! disk into text with the rendered line breaks preserved.

use crate::error::{Error, Result};
use std::fs;
use std::panic;
use std::path::Path;

/// PDF magic bytes
const PDF_MAGIC: &[u8] = b"%PDF";
/// Maximum PDF file size (100 MB)
const MAX_PDF_SIZE: usize = 100 * 1024 * 1024;

/// Source of statement text.
///
/// Implementations must be `Sync` so a batch can be parsed across threads.
pub trait TextExtractor: Sync {
    /// Return the full text of the document at `path`.
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Extracts text from PDF files, and reads `.txt` files holding text that
/// was extracted earlier.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextExtractor;

impl TextExtractor for FileTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String> {
        log::debug!("Extracting text from {}", path.display());

        let bytes = fs::read(path).map_err(|e| extraction_error(path, e.to_string()))?;

        let is_text = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if is_text && !bytes.starts_with(PDF_MAGIC) {
            return String::from_utf8(bytes)
                .map_err(|_| extraction_error(path, "text file is not valid UTF-8".to_string()));
        }

        validate_pdf(&bytes).map_err(|message| extraction_error(path, message))?;

        // pdf-extract panics on some malformed documents; one bad file must
        // not take down a batch.
        let extracted = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
            .map_err(|_| extraction_error(path, "PDF text extraction aborted".to_string()))?;
        let text = extracted.map_err(|e| extraction_error(path, e.to_string()))?;

        log::debug!("Extracted {} chars from {}", text.len(), path.display());
        Ok(normalize_page_breaks(&text))
    }
}

fn extraction_error(path: &Path, message: String) -> Error {
    log::error!("Extraction failed for {}: {}", path.display(), message);
    Error::Extraction {
        path: path.to_path_buf(),
        message,
    }
}

/// Validate PDF bytes before extraction
fn validate_pdf(bytes: &[u8]) -> std::result::Result<(), String> {
    if bytes.len() < 8 {
        return Err("file too small to be a PDF".to_string());
    }

    if bytes.len() > MAX_PDF_SIZE {
        return Err(format!(
            "PDF too large ({} MB). Maximum: {} MB",
            bytes.len() / (1024 * 1024),
            MAX_PDF_SIZE / (1024 * 1024)
        ));
    }

    if !bytes.starts_with(PDF_MAGIC) {
        return Err("missing PDF header".to_string());
    }

    Ok(())
}

/// Pages come back separated by form feeds; the parsers only care about lines.
fn normalize_page_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace(['\u{000C}', '\r'], "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stmt_ingest_extract_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_validate_pdf() {
        assert!(validate_pdf(b"%PDF-1.7\n%...").is_ok());
        assert!(validate_pdf(b"%PDF").is_err());
        assert!(validate_pdf(b"not a pdf document").is_err());
    }

    #[test]
    fn test_normalize_page_breaks() {
        assert_eq!(normalize_page_breaks("a\r\nb\u{000C}c\rd"), "a\nb\nc\nd");
    }

    #[test]
    fn test_reads_text_file() {
        let path = temp_path("statement.txt");
        fs::write(&path, "HDFC BANK LIMITED\nline two\n").unwrap();
        let text = FileTextExtractor.extract_text(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(text, "HDFC BANK LIMITED\nline two\n");
    }

    #[test]
    fn test_rejects_corrupted_pdf() {
        let path = temp_path("corrupted.pdf");
        fs::write(&path, b"this is definitely not a pdf").unwrap();
        let err = FileTextExtractor.extract_text(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn test_rejects_truncated_pdf() {
        let path = temp_path("truncated.pdf");
        fs::write(&path, b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog").unwrap();
        let err = FileTextExtractor.extract_text(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = FileTextExtractor
            .extract_text(Path::new("/nonexistent/statement.pdf"))
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }
}
