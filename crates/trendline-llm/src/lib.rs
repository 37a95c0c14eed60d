//! Trendline LLM: generation, recovery and validation of narrative payloads
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                       GENERATION PIPELINE                            │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  ┌──────────┐   ┌────────────┐   ┌─────────────┐   ┌─────────────┐   │
//! │  │ Evidence │──►│ Ingestor   │──►│ Prompt      │──►│ Orchestrator│   │
//! │  │ intake   │   │ (refs)     │   │ assembly    │   │ (2 attempts)│   │
//! │  └──────────┘   └────────────┘   └─────────────┘   └──────┬──────┘   │
//! │                                                           │          │
//! │                 ┌────────────┐   ┌─────────────┐   ┌──────▼──────┐   │
//! │                 │ Validator  │◄──│ Recovery    │◄──│ Generator   │   │
//! │                 │ (shape)    │   │ cascade +   │   │ (OpenAI,    │   │
//! │                 └─────┬──────┘   │ repair      │   │  Anthropic, │   │
//! │                       │          └─────────────┘   │  Local)     │   │
//! │                       ▼                            └─────────────┘   │
//! │               GeneratedPayload                                       │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The generator is an untrusted text source. Nothing it returns is assumed
//! to be JSON until [`recovery`] has found an object and [`validate`] has
//! checked its shape.

pub mod llm;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod recovery;
pub mod repair;
pub mod validate;

pub use llm::providers::{LLMConfig, Provider, UnifiedClient};
pub use llm::scripted::ScriptedGenerator;
pub use llm::{GenerationRequest, LLMError, Message, Role, TextGenerator};
pub use orchestrator::{GenerationError, GenerationOrchestrator, GenerationOutcome, MAX_ATTEMPTS};
pub use pipeline::{Pipeline, PipelineError, PipelineOutput};
pub use prompt::{initial_request, retry_request, STRICT_JSON_REMINDER};
pub use recovery::{recover_object, RecoveredObject, RecoveryStrategy};
pub use repair::repair_json;
pub use validate::{validate_payload, validate_structure, ValidationError};
