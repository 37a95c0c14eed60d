//! Scripted generator for tests and offline runs.

use super::*;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Replays a fixed queue of responses, one per call, and records every
/// request it receives.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<Option<String>, LLMError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// A generator that answers each call with the next text in order.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let generator = Self::new();
        for text in texts {
            generator.push_text(text);
        }
        generator
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.script.lock().push_back(Ok(Some(text.into())));
    }

    pub fn push_empty(&self) {
        self.script.lock().push_back(Ok(None));
    }

    pub fn push_error(&self, error: LLMError) {
        self.script.lock().push_back(Err(error));
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, LLMError> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Err(LLMError::Api("scripted generator has no responses left".into())))
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_errors() {
        let generator = ScriptedGenerator::with_texts(["a", "b"]);
        let req = GenerationRequest::new("s").with_user("u");
        assert_eq!(generator.generate(&req).await.unwrap().as_deref(), Some("a"));
        assert_eq!(generator.generate(&req).await.unwrap().as_deref(), Some("b"));
        assert!(generator.generate(&req).await.is_err());
        assert_eq!(generator.call_count(), 3);
    }
}
