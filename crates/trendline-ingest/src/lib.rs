//! Reference ingestion for Trendline
//!
//! Turns user-supplied evidence into a bounded, status-tagged bundle of plain
//! text references:
//! - uploaded documents (PDF, DOCX, RTF, plain text)
//! - web pages (fetched, main content extracted)
//! - free text pasted by the user
//!
//! Every source is processed independently. A source that fails is reported
//! once in [`IngestionResult::errors`] and never aborts its siblings.
//!
//! **Untrusted boundary**: this crate is heavy IO/parsing over user input and
//! remote content. Parser failures (and panics) are converted into
//! [`IngestError`] before they leave the crate.

pub mod aggregate;
pub mod config;
pub mod document;
pub mod error;
pub mod intake;
pub mod reference;
pub mod text;
pub mod web;

pub use aggregate::{EvidenceItem, ReferenceIngestor};
pub use config::{ConfigError, IngestConfig};
pub use document::{classify, extract_document_text, DocumentFormat, DocumentUpload, WordFormat};
pub use error::IngestError;
pub use intake::{EncodedDocument, EvidenceIntake};
pub use reference::{IngestionResult, IngestionStatus, ReferenceEntry, ReferenceKind, USER_INPUT_SOURCE};
pub use web::{extract_main_text, strip_all_tags, HttpPageFetcher, PageFetcher};
