//! Aggregator tests against a stub page fetcher
//!
//! These tests verify that:
//! 1. Per-source failures never abort sibling sources
//! 2. Entries come back in submission order regardless of completion order
//! 3. Timeouts are reported as ordinary per-source failures
//! 4. Content is truncated to the per-entry budget

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use trendline_ingest::*;

/// Canned responses keyed by URL, each with an artificial delay.
struct StubFetcher {
    pages: HashMap<String, (Duration, Result<String, IngestError>)>,
}

impl StubFetcher {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    fn page(mut self, url: &str, delay_ms: u64, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            (Duration::from_millis(delay_ms), Ok(body.to_string())),
        );
        self
    }

    fn failing(mut self, url: &str, err: IngestError) -> Self {
        self.pages
            .insert(url.to_string(), (Duration::ZERO, Err(err)));
        self
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, IngestError> {
        match self.pages.get(url) {
            Some((delay, result)) => {
                tokio::time::sleep(*delay).await;
                result.clone()
            }
            None => Err(IngestError::Unreachable {
                url: url.to_string(),
            }),
        }
    }
}

fn ingestor(config: IngestConfig, fetcher: StubFetcher) -> ReferenceIngestor {
    ReferenceIngestor::with_fetcher(config, Arc::new(fetcher))
}

// ============================================================================
// Status and isolation
// ============================================================================

#[tokio::test]
async fn text_plus_unreachable_url_is_partial() {
    let fetcher = StubFetcher::new().failing(
        "https://down.example",
        IngestError::Unreachable {
            url: "https://down.example".into(),
        },
    );
    let result = ingestor(IngestConfig::default(), fetcher)
        .ingest_references(Some("my notes"), Vec::new(), &["https://down.example".to_string()])
        .await;

    assert_eq!(result.status, IngestionStatus::Partial);
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].kind, ReferenceKind::Text);
    assert_eq!(result.entries[0].source, USER_INPUT_SOURCE);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("https://down.example"));
}

#[tokio::test]
async fn every_source_failing_is_failed() {
    let fetcher = StubFetcher::new().failing(
        "https://gone.example",
        IngestError::HttpStatus {
            url: "https://gone.example".into(),
            status: 404,
        },
    );
    let docs = vec![DocumentUpload::new("empty.pdf", None, Vec::new())];
    let result = ingestor(IngestConfig::default(), fetcher)
        .ingest_references(None, docs, &["https://gone.example".to_string()])
        .await;

    assert_eq!(result.status, IngestionStatus::Failed);
    assert!(result.entries.is_empty());
    assert_eq!(
        result.errors,
        vec![
            "file is empty: empty.pdf".to_string(),
            "link returned HTTP 404: https://gone.example".to_string(),
        ]
    );
}

#[tokio::test]
async fn nothing_submitted_is_empty() {
    let result = ingestor(IngestConfig::default(), StubFetcher::new())
        .ingest_references(Some(" \n "), Vec::new(), &[])
        .await;
    assert_eq!(result.status, IngestionStatus::Empty);
    assert!(result.entries.is_empty());
    assert!(result.errors.is_empty());
}

// ============================================================================
// Ordering and concurrency
// ============================================================================

#[tokio::test]
async fn entries_keep_submission_order() {
    // Earlier URLs finish last.
    let fetcher = StubFetcher::new()
        .page("https://a.example", 120, "page a")
        .page("https://b.example", 60, "page b")
        .page("https://c.example", 0, "page c");
    let urls: Vec<String> = ["https://a.example", "https://b.example", "https://c.example"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let docs = vec![DocumentUpload::new("notes.txt", None, b"doc body".to_vec())];

    let result = ingestor(IngestConfig::default().with_max_concurrency(4), fetcher)
        .ingest_references(Some("typed"), docs, &urls)
        .await;

    assert_eq!(result.status, IngestionStatus::Success);
    let sources: Vec<&str> = result.entries.iter().map(|e| e.source.as_str()).collect();
    assert_eq!(
        sources,
        vec![
            USER_INPUT_SOURCE,
            "notes.txt",
            "https://a.example",
            "https://b.example",
            "https://c.example"
        ]
    );
    let contents: Vec<&str> = result.entries.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["typed", "doc body", "page a", "page b", "page c"]);
}

#[tokio::test]
async fn slow_fetch_times_out_without_blocking_siblings() {
    let fetcher = StubFetcher::new()
        .page("https://slow.example", 5_000, "never")
        .page("https://fast.example", 0, "fast page");
    let config = IngestConfig::default().with_fetch_timeout(Duration::from_millis(50));
    let result = ingestor(config, fetcher)
        .ingest_references(
            None,
            Vec::new(),
            &["https://slow.example".to_string(), "https://fast.example".to_string()],
        )
        .await;

    assert_eq!(result.status, IngestionStatus::Partial);
    assert_eq!(result.entries[0].source, "https://fast.example");
    assert_eq!(result.errors, vec!["link timed out: https://slow.example".to_string()]);
}

// ============================================================================
// Budgets
// ============================================================================

#[tokio::test]
async fn long_content_is_truncated_with_marker() {
    let body = "word ".repeat(5_000);
    let fetcher = StubFetcher::new().page("https://long.example", 0, &body);
    let result = ingestor(IngestConfig::default(), fetcher)
        .ingest_references(None, Vec::new(), &["https://long.example".to_string()])
        .await;

    let content = &result.entries[0].content;
    assert!(content.ends_with('…'));
    assert!(content.chars().count() <= 6_001);
}

#[tokio::test]
async fn oversized_document_names_the_file() {
    let docs = vec![
        DocumentUpload::new("big.txt", None, vec![b'x'; 2 * 1024 * 1024 + 1]),
        DocumentUpload::new("ok.txt", None, b"fine".to_vec()),
    ];
    let result = ingestor(IngestConfig::default(), StubFetcher::new())
        .ingest_references(None, docs, &[])
        .await;

    assert_eq!(result.status, IngestionStatus::Partial);
    assert_eq!(result.entries[0].source, "ok.txt");
    assert!(result.errors[0].starts_with("file too large: big.txt"));
}

#[tokio::test]
async fn intake_with_encoded_documents() {
    let intake = EvidenceIntake::new("trend of remote work")
        .with_document(EncodedDocument::from_bytes(
            "memo.txt",
            Some("text/plain".into()),
            b"Remote work peaked in 2021.",
        ))
        .with_url("https://a.example");
    let fetcher = StubFetcher::new().page("https://a.example", 0, "Offices reopened in 2023.");
    let result = ingestor(IngestConfig::default(), fetcher)
        .ingest_intake(&intake)
        .await;

    assert_eq!(result.status, IngestionStatus::Success);
    assert_eq!(result.entries[0].kind, ReferenceKind::File);
    assert_eq!(result.entries[1].kind, ReferenceKind::Url);
}
