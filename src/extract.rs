//! Text extraction for uploaded lecture documents.
//!
//! Only PDF is accepted; anything else is rejected up front. Extraction is
//! pipeline-layer: the caller supplies bytes plus a content type and gets
//! plain UTF-8 text back.

/// The single supported MIME type.
pub const MIME_PDF: &str = "application/pdf";

/// Extraction error. No panic paths; the ingestion pipeline surfaces the
/// error and aborts the upload.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Pdf(String),
    Empty,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {} (only PDF is supported)", ct)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Empty => write!(f, "document contains no extractable text"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts plain text from an uploaded document.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    // Embedded NULs show up in some exporters' text streams
    let text = text.replace('\0', "");
    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}

/// Maps a lowercase file extension to the content type the extractor accepts.
pub fn content_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "pdf" => Some(MIME_PDF),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = extract_text(b"foo", "application/octet-stream").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn extension_mapping_is_pdf_only() {
        assert_eq!(content_type_for_extension("pdf"), Some(MIME_PDF));
        assert_eq!(content_type_for_extension("docx"), None);
        assert_eq!(content_type_for_extension("txt"), None);
    }
}
