//! Receipt files to text.
//!
//! Plain-text OCR dumps and PDFs with a text layer are read here; images need
//! an external OCR engine and are rejected.

use std::path::Path;

use tracing::debug;

use crate::error::{Result, TextSourceError};
use crate::models::receipt::RawReceipt;

/// Extract text from file bytes, dispatching on the file extension.
pub fn extract_text(bytes: &[u8], filename: &str) -> std::result::Result<String, TextSourceError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let text = match extension.as_str() {
        "txt" | "text" => String::from_utf8_lossy(bytes).into_owned(),
        "pdf" => pdf_text(bytes)?,
        "" => return Err(TextSourceError::UnsupportedFormat(filename.to_string())),
        other => return Err(TextSourceError::UnsupportedFormat(other.to_string())),
    };

    if text.trim().is_empty() {
        return Err(TextSourceError::NoText(filename.to_string()));
    }

    debug!(file = filename, chars = text.chars().count(), "Extracted receipt text");
    Ok(text)
}

/// Read a receipt file into a [`RawReceipt`] tagged with its file name.
pub fn read_receipt(path: &Path) -> Result<RawReceipt> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let text = extract_text(&bytes, &filename)?;
    Ok(RawReceipt::new(text).with_source_hint(filename))
}

#[cfg(feature = "pdf")]
fn pdf_text(bytes: &[u8]) -> std::result::Result<String, TextSourceError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| TextSourceError::Pdf(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(_bytes: &[u8]) -> std::result::Result<String, TextSourceError> {
    Err(TextSourceError::UnsupportedFormat(
        "pdf (built without the `pdf` feature)".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParagonError;

    #[test]
    fn test_plain_text() {
        let text = extract_text("Chleb 4,99 C\n".as_bytes(), "paragon.TXT").unwrap();
        assert_eq!(text, "Chleb 4,99 C\n");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let text = extract_text(&[b'A', 0xff, b'B'], "scan.txt").unwrap();
        assert_eq!(text, "A\u{fffd}B");
    }

    #[test]
    fn test_images_unsupported() {
        let err = extract_text(&[0x89, b'P', b'N', b'G'], "receipt.png").unwrap_err();
        assert!(matches!(err, TextSourceError::UnsupportedFormat(ref ext) if ext == "png"));
        assert!(matches!(
            extract_text(b"x", "README").unwrap_err(),
            TextSourceError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn test_blank_text_is_no_text() {
        let err = extract_text(b" \n\t ", "empty.txt").unwrap_err();
        assert!(matches!(err, TextSourceError::NoText(_)));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_broken_pdf() {
        let err = extract_text(b"this is not a pdf", "receipt.pdf").unwrap_err();
        assert!(matches!(err, TextSourceError::Pdf(_)));
    }

    #[test]
    fn test_read_receipt_sets_source_hint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lidl.txt");
        std::fs::write(&path, "LIDL\nChleb 4,99 C").unwrap();

        let receipt = read_receipt(&path).unwrap();
        assert_eq!(receipt.source_hint.as_deref(), Some("lidl.txt"));
        assert!(receipt.text.starts_with("LIDL"));

        let missing = read_receipt(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(missing, ParagonError::Io(_)));
    }
}
