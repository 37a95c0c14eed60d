//! End-to-end request flow: ingest references, assemble the prompt, run the
//! two-attempt orchestrator.

use crate::orchestrator::{GenerationError, GenerationOrchestrator};
use crate::prompt::{initial_request, truncate_preview};
use crate::recovery::RecoveryStrategy;
use serde::Serialize;
use tracing::{info, warn};
use trendline_ingest::{EvidenceIntake, IngestionResult, ReferenceIngestor};
use trendline_series::{DualAxisChart, GeneratedPayload};

const DETAIL_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub ingestion: IngestionResult,
    pub payload: GeneratedPayload,
    /// Number of generator calls made (1 or 2).
    pub attempts: usize,
    pub strategy: RecoveryStrategy,
    pub repaired: bool,
}

impl PipelineOutput {
    pub fn chart(&self) -> DualAxisChart {
        DualAxisChart::from_payload(&self.payload)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("{source}")]
    Generation {
        source: GenerationError,
        /// Ingestion outcome, kept for diagnostics.
        ingestion: IngestionResult,
    },
}

impl PipelineError {
    /// Short message suitable for an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "Please describe the trend you want to chart.",
            Self::Generation { source, .. } => match source {
                GenerationError::Upstream(_) => {
                    "The generation service is unavailable right now. Please try again later."
                }
                GenerationError::Unparseable { .. } => {
                    "The generated output could not be parsed, even after a retry. Please try again."
                }
                GenerationError::Validation(_) => {
                    "The generated output did not have the expected structure. Please try again."
                }
            },
        }
    }

    /// Diagnostic lines: the underlying error, per-source ingestion failures
    /// and a preview of unparseable output.
    pub fn details(&self) -> Vec<String> {
        let Self::Generation { source, ingestion } = self else {
            return Vec::new();
        };

        let mut out = vec![source.to_string()];
        out.extend(ingestion.errors.iter().map(|e| format!("reference: {e}")));
        if let GenerationError::Unparseable {
            last_output: Some(raw),
        } = source
        {
            out.push(format!(
                "last output: {}",
                truncate_preview(raw, DETAIL_PREVIEW_CHARS)
            ));
        }
        out
    }
}

pub struct Pipeline {
    ingestor: ReferenceIngestor,
    orchestrator: GenerationOrchestrator,
}

impl Pipeline {
    pub fn new(ingestor: ReferenceIngestor, orchestrator: GenerationOrchestrator) -> Self {
        Self {
            ingestor,
            orchestrator,
        }
    }

    pub fn ingestor(&self) -> &ReferenceIngestor {
        &self.ingestor
    }

    pub async fn run(&self, intake: &EvidenceIntake) -> Result<PipelineOutput, PipelineError> {
        if intake.prompt.trim().is_empty() {
            return Err(PipelineError::EmptyPrompt);
        }

        let ingestion = self.ingestor.ingest_intake(intake).await;
        info!(
            status = ?ingestion.status,
            references = ingestion.entries.len(),
            failures = ingestion.errors.len(),
            "references ingested"
        );

        let request = initial_request(&intake.prompt, &ingestion);
        match self
            .orchestrator
            .generate(&request, ingestion.has_references())
            .await
        {
            Ok(outcome) => Ok(PipelineOutput {
                ingestion,
                payload: outcome.payload,
                attempts: outcome.attempt + 1,
                strategy: outcome.strategy,
                repaired: outcome.repaired,
            }),
            Err(source) => {
                warn!(error = %source, "generation failed");
                Err(PipelineError::Generation { source, ingestion })
            }
        }
    }
}
