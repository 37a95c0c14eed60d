//! Reference ingestion aggregator.
//!
//! Each source is processed on its own and yields one outcome tagged with its
//! submission index. Outcomes are merged after every source has finished, so
//! a failing source never affects its siblings and the final entry order
//! matches the submission order regardless of completion order.

use crate::config::IngestConfig;
use crate::document::{extract_document_text, DocumentUpload};
use crate::error::IngestError;
use crate::intake::EvidenceIntake;
use crate::reference::{IngestionResult, IngestionStatus, ReferenceEntry, ReferenceKind, USER_INPUT_SOURCE};
use crate::text::collapse_whitespace;
use crate::web::{HttpPageFetcher, PageFetcher};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One piece of user-supplied evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceItem {
    Text(String),
    Document(DocumentUpload),
    Url(String),
}

/// A source ready to be processed, or already rejected at intake.
enum Pending {
    Item(EvidenceItem),
    Rejected(IngestError),
}

type SourceOutcome = (usize, Result<ReferenceEntry, IngestError>);

pub struct ReferenceIngestor {
    config: IngestConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl ReferenceIngestor {
    /// Ingestor that fetches URLs over HTTP.
    pub fn http(config: IngestConfig) -> Result<Self, reqwest::Error> {
        let fetcher = HttpPageFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: IngestConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest items in the given order. Blank text and blank URLs are ignored
    /// and do not count as submitted evidence.
    pub async fn ingest(&self, items: Vec<EvidenceItem>) -> IngestionResult {
        self.run(self.admit(items.into_iter().map(Ok).collect())).await
    }

    /// Ingest free text, then documents, then URLs.
    pub async fn ingest_references(
        &self,
        text: Option<&str>,
        documents: Vec<DocumentUpload>,
        urls: &[String],
    ) -> IngestionResult {
        let mut items = Vec::with_capacity(1 + documents.len() + urls.len());
        if let Some(text) = text {
            items.push(EvidenceItem::Text(text.to_string()));
        }
        items.extend(documents.into_iter().map(EvidenceItem::Document));
        items.extend(urls.iter().cloned().map(EvidenceItem::Url));
        self.ingest(items).await
    }

    /// Ingest an intake whose documents are still base64-encoded. A document
    /// that fails to decode is a failed source like any other.
    pub async fn ingest_intake(&self, intake: &EvidenceIntake) -> IngestionResult {
        let mut items = Vec::new();
        if let Some(text) = &intake.text {
            items.push(Ok(EvidenceItem::Text(text.clone())));
        }
        items.extend(
            intake
                .documents
                .iter()
                .map(|d| d.decode().map(EvidenceItem::Document)),
        );
        items.extend(intake.urls.iter().cloned().map(|u| Ok(EvidenceItem::Url(u))));
        self.run(self.admit(items)).await
    }

    /// Drop blank sources and reject documents past the per-request limit.
    /// Intake errors only ever come from documents.
    fn admit(&self, items: Vec<Result<EvidenceItem, IngestError>>) -> Vec<Pending> {
        let limit = self.config.max_documents;
        let mut documents = 0usize;
        let mut pending = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Ok(EvidenceItem::Text(t)) | Ok(EvidenceItem::Url(t)) if t.trim().is_empty() => {}
                Ok(EvidenceItem::Document(doc)) => {
                    documents += 1;
                    if documents > limit {
                        pending.push(Pending::Rejected(IngestError::TooManyFiles {
                            name: doc.name,
                            limit,
                        }));
                    } else {
                        pending.push(Pending::Item(EvidenceItem::Document(doc)));
                    }
                }
                Ok(item) => pending.push(Pending::Item(item)),
                Err(e) => {
                    documents += 1;
                    pending.push(Pending::Rejected(e));
                }
            }
        }
        pending
    }

    async fn run(&self, pending: Vec<Pending>) -> IngestionResult {
        if pending.is_empty() {
            return IngestionResult::empty();
        }

        let mut outcomes: Vec<SourceOutcome> = stream::iter(pending.into_iter().enumerate())
            .map(|(idx, p)| async move { (idx, self.process(p).await) })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|(idx, _)| *idx);

        let mut entries = Vec::new();
        let mut errors = Vec::new();
        for (_, outcome) in outcomes {
            match outcome {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(source = %e.source_label(), error = %e, "reference ingestion failed");
                    errors.push(e.to_string());
                }
            }
        }

        let status = IngestionStatus::from_counts(true, entries.len(), errors.len());
        info!(
            ?status,
            succeeded = entries.len(),
            failed = errors.len(),
            "reference ingestion finished"
        );
        IngestionResult {
            status,
            entries,
            errors,
        }
    }

    async fn process(&self, pending: Pending) -> Result<ReferenceEntry, IngestError> {
        let max_chars = self.config.max_entry_chars;
        match pending {
            Pending::Rejected(e) => Err(e),
            Pending::Item(EvidenceItem::Text(text)) => {
                let content = collapse_whitespace(&text);
                ReferenceEntry::new(ReferenceKind::Text, USER_INPUT_SOURCE, &content, max_chars)
                    .ok_or(IngestError::EmptyContent {
                        name: USER_INPUT_SOURCE.to_string(),
                    })
            }
            Pending::Item(EvidenceItem::Document(upload)) => {
                let name = upload.name.clone();
                let content = self.extract_document(upload).await?;
                ReferenceEntry::new(ReferenceKind::File, &name, &content, max_chars)
                    .ok_or(IngestError::EmptyContent { name })
            }
            Pending::Item(EvidenceItem::Url(url)) => {
                let url = url.trim().to_string();
                let fetched =
                    tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch_text(&url))
                        .await;
                let content = match fetched {
                    Ok(result) => result?,
                    Err(_) => return Err(IngestError::FetchTimeout { url }),
                };
                let content = collapse_whitespace(&content);
                ReferenceEntry::new(ReferenceKind::Url, &url, &content, max_chars)
                    .ok_or(IngestError::EmptyPage { url })
            }
        }
    }

    /// Decode on the blocking pool so a slow parser never stalls the runtime.
    async fn extract_document(&self, upload: DocumentUpload) -> Result<String, IngestError> {
        let name = upload.name.clone();
        let max_bytes = self.config.max_document_bytes;
        let task = tokio::task::spawn_blocking(move || extract_document_text(&upload, max_bytes));

        match tokio::time::timeout(self.config.document_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                debug!(source = %name, error = %join_err, "document task aborted");
                Err(IngestError::Unparseable { name })
            }
            // Blocking tasks cannot be cancelled: the parser keeps its pool
            // thread until it returns, even though the source is already
            // reported. Callers bound the pool with `max_blocking_threads`.
            Err(_) => {
                warn!(source = %name, "document decode timed out; parser thread still running");
                Err(IngestError::DocumentTimeout { name })
            }
        }
    }
}
