//! Generation orchestrator
//!
//! Two strictly sequential attempts:
//!
//! ```text
//! attempt 0 ── generate ──┬─ transport error ─────────────▶ Upstream (no retry)
//!                         ├─ no text / no object ─────────▶ attempt 1 (strict-JSON reminder)
//!                         └─ object ── validate ─┬─ fail ─▶ Validation (no retry)
//!                                                └─ ok ───▶ success
//! attempt 1 ── same, but running out ends in ───────────▶ Unparseable
//! ```

use crate::llm::{GenerationRequest, LLMError, TextGenerator};
use crate::prompt::retry_request;
use crate::recovery::{recover_object, RecoveryStrategy};
use crate::validate::{validate_payload, ValidationError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use trendline_series::GeneratedPayload;

pub const MAX_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("generator unavailable: {0}")]
    Upstream(LLMError),

    #[error("output unparseable, already retried once")]
    Unparseable {
        /// Raw text of the final attempt, if the generator produced any.
        last_output: Option<String>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A validated payload plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub payload: GeneratedPayload,
    /// Zero-based index of the successful attempt.
    pub attempt: usize,
    pub strategy: RecoveryStrategy,
    pub repaired: bool,
}

pub struct GenerationOrchestrator {
    generator: Arc<dyn TextGenerator>,
    timeout: Option<Duration>,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            timeout: None,
        }
    }

    /// Bound every generator call; an expired call is an upstream failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        has_references: bool,
    ) -> Result<GenerationOutcome, GenerationError> {
        let mut last_output: Option<String> = None;

        for attempt in 0..MAX_ATTEMPTS {
            let request = if attempt == 0 {
                request.clone()
            } else {
                retry_request(request, last_output.as_deref())
            };

            debug!(attempt, model = %self.generator.model_name(), "calling generator");
            let text = self.call(&request).await.map_err(|e| {
                warn!(attempt, error = %e, "generator call failed");
                GenerationError::Upstream(e)
            })?;

            let Some(text) = text else {
                warn!(attempt, "generator returned no text");
                last_output = None;
                continue;
            };

            let Some(recovered) = recover_object(&text) else {
                warn!(attempt, chars = text.chars().count(), "no object recoverable from output");
                last_output = Some(text);
                continue;
            };

            let strategy = recovered.strategy;
            let repaired = recovered.repaired;
            let payload = validate_payload(recovered.into_value(), has_references).map_err(|e| {
                warn!(attempt, %strategy, error = %e, "generated output failed validation");
                GenerationError::Validation(e)
            })?;

            info!(attempt, %strategy, repaired, phases = payload.phases.len(), "generation succeeded");
            return Ok(GenerationOutcome {
                payload,
                attempt,
                strategy,
                repaired,
            });
        }

        Err(GenerationError::Unparseable { last_output })
    }

    async fn call(&self, request: &GenerationRequest) -> Result<Option<String>, LLMError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.generator.generate(request))
                .await
                .unwrap_or_else(|_| Err(LLMError::Timeout(limit.as_secs()))),
            None => self.generator.generate(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedGenerator;
    use crate::prompt::STRICT_JSON_REMINDER;

    fn valid_json(phases: usize) -> String {
        let phases: Vec<String> = (0..phases)
            .map(|i| {
                format!(
                    r#"{{"start_label":"{}","end_label":"{}","open":10,"high":20,"low":5,"close":10}}"#,
                    2000 + i,
                    2001 + i
                )
            })
            .collect();
        format!(r#"{{"subject":"X","metric":"m","phases":[{}]}}"#, phases.join(","))
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("sys").with_user("Topic: X")
    }

    #[tokio::test]
    async fn empty_then_valid_succeeds_on_retry() {
        let generator = Arc::new(ScriptedGenerator::new());
        generator.push_empty();
        generator.push_text(valid_json(5));
        let orch = GenerationOrchestrator::new(generator.clone());

        let outcome = orch.generate(&request(), false).await.unwrap();
        assert_eq!(outcome.attempt, 1);
        let sent = generator.requests();
        assert!(sent[1].last_user_message().unwrap().contains(STRICT_JSON_REMINDER));
        assert!(!sent[0].last_user_message().unwrap().contains(STRICT_JSON_REMINDER));
    }

    #[tokio::test]
    async fn two_unparseable_outputs_fail() {
        let generator = Arc::new(ScriptedGenerator::with_texts(["nope", "still nope"]));
        let orch = GenerationOrchestrator::new(generator.clone());

        let err = orch.generate(&request(), false).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::Unparseable {
                last_output: Some("still nope".into())
            }
        );
        assert_eq!(err.to_string(), "output unparseable, already retried once");
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn validation_failure_is_not_retried() {
        let generator = Arc::new(ScriptedGenerator::with_texts([valid_json(4), valid_json(5)]));
        let orch = GenerationOrchestrator::new(generator.clone());

        let err = orch.generate(&request(), false).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::Validation(ValidationError::PhaseCount { count: 4 })
        );
        assert_eq!(generator.call_count(), 1);
        assert_eq!(generator.remaining(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_not_retried() {
        let generator = Arc::new(ScriptedGenerator::new());
        generator.push_error(LLMError::Network("connection refused".into()));
        generator.push_text(valid_json(5));
        let orch = GenerationOrchestrator::new(generator.clone());

        let err = orch.generate(&request(), false).await.unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(LLMError::Network(_))));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn slow_generator_times_out_as_upstream() {
        let generator = Arc::new(
            ScriptedGenerator::with_texts([valid_json(5)]).with_delay(Duration::from_secs(5)),
        );
        let orch = GenerationOrchestrator::new(generator).with_timeout(Duration::from_millis(20));

        let err = orch.generate(&request(), false).await.unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(LLMError::Timeout(_))));
    }
}
