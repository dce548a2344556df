//! Plain-text extraction from uploaded PDF bytes.

#[cfg(feature = "pdf")]
use crate::error::RagError;
use crate::error::Result;

/// Turns an uploaded file into plain text.
///
/// Extraction is CPU-bound and synchronous; async callers should run it on a
/// blocking thread.
pub trait PdfExtractor: Send + Sync {
    /// Extract the text of `bytes`.
    ///
    /// # Errors
    ///
    /// [`RagError::UnreadablePdf`] if the input is not a PDF or cannot be parsed.
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Whether `bytes` starts with the PDF header, allowing leading whitespace.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    bytes[start..].starts_with(b"%PDF-")
}

/// [`PdfExtractor`] built on the `pdf-extract` crate.
///
/// This type is only available when the `pdf` feature is enabled. Scanned
/// PDFs without a text layer extract to (nearly) empty text.
#[cfg(feature = "pdf")]
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

#[cfg(feature = "pdf")]
impl PdfExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        if !looks_like_pdf(bytes) {
            return Err(RagError::UnreadablePdf("file does not start with a PDF header".into()));
        }

        // The parser panics on some malformed inputs.
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(RagError::UnreadablePdf(e.to_string())),
            Err(_) => Err(RagError::UnreadablePdf("PDF parser failed on malformed input".into())),
        }
    }
}
