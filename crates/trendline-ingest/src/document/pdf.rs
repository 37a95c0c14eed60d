//! PDF text extraction

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("PDF extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("PDF support not compiled in (enable the `pdf` feature)")]
    FeatureDisabled,
}

/// Extract the text layer of an in-memory PDF.
#[cfg(feature = "pdf")]
pub fn extract_pdf_text(data: &[u8]) -> Result<String, PdfError> {
    use pdf_extract::extract_text_from_mem;

    extract_text_from_mem(data).map_err(|e| PdfError::ExtractionFailed(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
pub fn extract_pdf_text(_data: &[u8]) -> Result<String, PdfError> {
    Err(PdfError::FeatureDisabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{extract_document_text, DocumentUpload};
    use crate::error::IngestError;

    #[test]
    fn mislabeled_pdf_is_unparseable() {
        let data = b"PK\x03\x04 this is a zip header, not a PDF".to_vec();
        let upload = DocumentUpload::new("cut.pdf", Some("application/pdf".into()), data);
        assert_eq!(
            extract_document_text(&upload, 1024),
            Err(IngestError::Unparseable { name: "cut.pdf".into() })
        );
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(extract_pdf_text(b"definitely not a pdf").is_err());
    }
}
