//! Structural gate on a recovered object.
//!
//! Only shape is checked. Value ranges are left to render-time clamping.

use serde_json::Value;
use trendline_series::GeneratedPayload;

pub const MIN_PHASES: usize = 5;
pub const MAX_PHASES: usize = 10;
/// Minimum digest length, in characters, once evidence was ingested.
pub const MIN_SOURCE_DIGEST_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("generated output is not an object")]
    NotAnObject,

    #[error("generated output has no `phases` array")]
    MissingPhases,

    #[error("generated output has {count} phases, expected {MIN_PHASES} to {MAX_PHASES}")]
    PhaseCount { count: usize },

    #[error("generated output lacks a `source_digest` although references were supplied")]
    MissingSourceDigest,

    #[error("`source_digest` is too short ({chars} characters, need at least {MIN_SOURCE_DIGEST_CHARS})")]
    SourceDigestTooShort { chars: usize },

    #[error("generated output does not match the payload schema: {0}")]
    Schema(String),
}

/// Shape checks on the raw value.
pub fn validate_structure(value: &Value, has_references: bool) -> Result<(), ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let phases = object
        .get("phases")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingPhases)?;
    if !(MIN_PHASES..=MAX_PHASES).contains(&phases.len()) {
        return Err(ValidationError::PhaseCount {
            count: phases.len(),
        });
    }

    if has_references {
        let digest = object
            .get("source_digest")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingSourceDigest)?;
        let chars = digest.trim().chars().count();
        if chars < MIN_SOURCE_DIGEST_CHARS {
            return Err(ValidationError::SourceDigestTooShort { chars });
        }
    }

    Ok(())
}

/// Shape checks, then decode into the typed payload.
pub fn validate_payload(value: Value, has_references: bool) -> Result<GeneratedPayload, ValidationError> {
    validate_structure(&value, has_references)?;
    serde_json::from_value(value).map_err(|e| ValidationError::Schema(e.to_string()))
}
