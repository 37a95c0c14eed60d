//! Document Text Extraction
//!
//! Uploaded documents are classified by filename extension and declared media
//! type, then decoded by the matching extractor:
//! - PDF via `pdf-extract`
//! - DOCX via the `zip` container and `quick-xml`
//! - RTF via control-word stripping
//! - anything else as lossy UTF-8 text
//!
//! Extractors may fail or panic on hostile input. Both outcomes are reported as
//! [`IngestError::Unparseable`] naming the file; parser internals are only
//! logged.

mod docx;
mod pdf;
mod rtf;

use crate::error::IngestError;
use crate::text::{collapse_whitespace, strip_bom};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::debug;

pub use docx::{extract_docx_text, DocxError};
pub use pdf::{extract_pdf_text, PdfError};
pub use rtf::rtf_to_text;

// ============================================================================
// Types
// ============================================================================

/// A binary document as received from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    /// Read a document from disk, guessing the media type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type_for_path(path).map(str::to_string);
        Ok(Self::new(name, media_type, bytes))
    }

    pub fn format(&self) -> DocumentFormat {
        classify(&self.name, self.media_type.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordFormat {
    Docx,
    Rtf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Word(WordFormat),
    PlainText,
}

// ============================================================================
// Classification
// ============================================================================

/// Pick an extractor from the filename extension, falling back to the declared
/// media type. Unknown inputs are treated as plain text.
pub fn classify(name: &str, media_type: Option<&str>) -> DocumentFormat {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => return DocumentFormat::Pdf,
        Some("docx") | Some("doc") | Some("docm") => return DocumentFormat::Word(WordFormat::Docx),
        Some("rtf") => return DocumentFormat::Word(WordFormat::Rtf),
        Some("txt") | Some("md") | Some("markdown") | Some("csv") | Some("json") => {
            return DocumentFormat::PlainText
        }
        _ => {}
    }

    let media = media_type
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .unwrap_or_default();
    match media.as_str() {
        "application/pdf" => DocumentFormat::Pdf,
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            DocumentFormat::Word(WordFormat::Docx)
        }
        "application/rtf" | "text/rtf" => DocumentFormat::Word(WordFormat::Rtf),
        _ => DocumentFormat::PlainText,
    }
}

pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "rtf" => "application/rtf",
        "md" | "markdown" => "text/markdown",
        "txt" => "text/plain",
        _ => return None,
    })
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract collapsed plain text from one uploaded document.
///
/// The returned text is never empty. Truncation to the per-entry budget is the
/// aggregator's job.
pub fn extract_document_text(
    upload: &DocumentUpload,
    max_bytes: usize,
) -> Result<String, IngestError> {
    let name = upload.name.clone();
    if upload.bytes.is_empty() {
        return Err(IngestError::EmptyFile { name });
    }
    if upload.bytes.len() > max_bytes {
        return Err(IngestError::FileTooLarge {
            name,
            size: upload.bytes.len(),
            limit: max_bytes,
        });
    }

    let format = upload.format();
    let raw = panic::catch_unwind(AssertUnwindSafe(|| decode(format, &upload.bytes)));
    let raw = match raw {
        Ok(Ok(text)) => text,
        Ok(Err(reason)) => {
            debug!(source = %name, ?format, %reason, "document decode failed");
            return Err(IngestError::Unparseable { name });
        }
        Err(_) => {
            debug!(source = %name, ?format, "document decoder panicked");
            return Err(IngestError::Unparseable { name });
        }
    };

    let text = collapse_whitespace(&raw);
    if text.is_empty() {
        return Err(IngestError::EmptyContent { name });
    }
    Ok(text)
}

fn decode(format: DocumentFormat, bytes: &[u8]) -> Result<String, String> {
    match format {
        DocumentFormat::Pdf => extract_pdf_text(bytes).map_err(|e| e.to_string()),
        DocumentFormat::Word(declared) => {
            // Legacy `.doc` uploads are frequently RTF under the hood.
            let word = if bytes.starts_with(b"{\\rtf") {
                WordFormat::Rtf
            } else {
                declared
            };
            match word {
                WordFormat::Docx => extract_docx_text(bytes).map_err(|e| e.to_string()),
                WordFormat::Rtf => Ok(rtf_to_text(&String::from_utf8_lossy(bytes))),
            }
        }
        DocumentFormat::PlainText => Ok(strip_bom(&String::from_utf8_lossy(bytes)).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_extension() {
        assert_eq!(classify("report.PDF", None), DocumentFormat::Pdf);
        assert_eq!(
            classify("notes.docx", Some("application/octet-stream")),
            DocumentFormat::Word(WordFormat::Docx)
        );
        assert_eq!(classify("a.rtf", None), DocumentFormat::Word(WordFormat::Rtf));
        assert_eq!(classify("a.txt", Some("application/pdf")), DocumentFormat::PlainText);
    }

    #[test]
    fn classify_falls_back_to_media_type() {
        assert_eq!(classify("blob", Some("application/pdf")), DocumentFormat::Pdf);
        assert_eq!(
            classify("blob", Some("text/rtf; charset=utf-8")),
            DocumentFormat::Word(WordFormat::Rtf)
        );
        assert_eq!(classify("blob", None), DocumentFormat::PlainText);
    }

    #[test]
    fn empty_and_oversized_fail_before_decoding() {
        let empty = DocumentUpload::new("empty.txt", None, Vec::new());
        assert_eq!(
            extract_document_text(&empty, 10),
            Err(IngestError::EmptyFile { name: "empty.txt".into() })
        );

        let big = DocumentUpload::new("big.txt", None, vec![b'a'; 11]);
        assert!(matches!(
            extract_document_text(&big, 10),
            Err(IngestError::FileTooLarge { size: 11, limit: 10, .. })
        ));
    }

    #[test]
    fn plain_text_is_collapsed() {
        let doc = DocumentUpload::new("n.txt", None, "\u{feff}line one\n\n  line   two\t".into());
        assert_eq!(extract_document_text(&doc, 1024).unwrap(), "line one line two");
    }

    #[test]
    fn whitespace_only_is_empty_content() {
        let doc = DocumentUpload::new("blank.md", None, b" \n\t \n".to_vec());
        assert_eq!(
            extract_document_text(&doc, 1024),
            Err(IngestError::EmptyContent { name: "blank.md".into() })
        );
    }

    #[test]
    fn garbage_docx_is_unparseable() {
        let doc = DocumentUpload::new("broken.docx", None, b"not a zip archive".to_vec());
        assert_eq!(
            extract_document_text(&doc, 1024),
            Err(IngestError::Unparseable { name: "broken.docx".into() })
        );
    }

    #[test]
    fn doc_containing_rtf_is_sniffed() {
        let doc = DocumentUpload::new("legacy.doc", None, br"{\rtf1\ansi Hello\par World}".to_vec());
        assert_eq!(extract_document_text(&doc, 1024).unwrap(), "Hello World");
    }
}
