//! Per-source ingestion failures.
//!
//! Every variant names the source it came from; the `Display` text is what
//! ends up in `IngestionResult::errors`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("file is empty: {name}")]
    EmptyFile { name: String },

    #[error("file too large: {name} ({size} bytes, limit {limit} bytes)")]
    FileTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("file content is empty: {name}")]
    EmptyContent { name: String },

    #[error("cannot parse file: {name}")]
    Unparseable { name: String },

    #[error("file processing timed out: {name}")]
    DocumentTimeout { name: String },

    #[error("too many files: {name} skipped, at most {limit} per request")]
    TooManyFiles { name: String, limit: usize },

    #[error("link returned HTTP {status}: {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("link content is too large: {url} (limit {limit} bytes)")]
    PageTooLarge { url: String, limit: usize },

    #[error("link content is empty or restricted: {url}")]
    EmptyPage { url: String },

    #[error("link timed out: {url}")]
    FetchTimeout { url: String },

    #[error("cannot access link: {url}")]
    Unreachable { url: String },
}

impl IngestError {
    /// The filename or URL this failure belongs to.
    pub fn source_label(&self) -> &str {
        match self {
            Self::EmptyFile { name }
            | Self::FileTooLarge { name, .. }
            | Self::EmptyContent { name }
            | Self::Unparseable { name }
            | Self::DocumentTimeout { name }
            | Self::TooManyFiles { name, .. } => name,
            Self::HttpStatus { url, .. }
            | Self::PageTooLarge { url, .. }
            | Self::EmptyPage { url }
            | Self::FetchTimeout { url }
            | Self::Unreachable { url } => url,
        }
    }
}
