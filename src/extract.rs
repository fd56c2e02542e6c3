//! PDF text extraction.
//!
//! The ingestion pipeline hands this module raw bytes from the upload slot and
//! gets back plain UTF-8 text, one concatenated string for the whole document.
//! Extraction delegates to `pdf-extract`; a file that cannot be parsed as a
//! PDF fails here and the pipeline leaves the existing index untouched.

/// Extraction error. Surfaced to the user as a visible ingestion failure;
/// never produces a partial index.
#[derive(Debug)]
pub enum ExtractError {
    /// The bytes are not a parseable PDF, or text extraction failed.
    Pdf(String),
    /// The PDF parsed but contains no extractable text.
    Empty,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Empty => write!(f, "PDF contains no extractable text"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain text from PDF bytes.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn empty_bytes_return_error() {
        assert!(extract_text(b"").is_err());
    }
}
