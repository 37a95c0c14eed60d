//! The JSON evidence intake accepted at the pipeline boundary.

use crate::document::DocumentUpload;
use crate::error::IngestError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Prompt plus raw evidence, as submitted by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceIntake {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, alias = "files")]
    pub documents: Vec<EncodedDocument>,
}

impl EvidenceIntake {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    pub fn with_document(mut self, document: EncodedDocument) -> Self {
        self.documents.push(document);
        self
    }
}

/// A document carried inline as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedDocument {
    #[serde(alias = "name")]
    pub filename: String,
    #[serde(default, alias = "mediaType", alias = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub data: String,
}

impl EncodedDocument {
    pub fn from_bytes(filename: impl Into<String>, media_type: Option<String>, bytes: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            media_type,
            data: STANDARD.encode(bytes),
        }
    }

    /// Decode the payload. A `data:<type>;base64,` prefix is accepted and its
    /// media type used when none was declared.
    pub fn decode(&self) -> Result<DocumentUpload, IngestError> {
        let data = self.data.trim();
        let (prefix_type, payload) = match data.strip_prefix("data:") {
            Some(rest) => match rest.split_once(',') {
                Some((meta, payload)) => {
                    let media = meta.strip_suffix(";base64").unwrap_or(meta);
                    ((!media.is_empty()).then(|| media.to_string()), payload)
                }
                None => (None, rest),
            },
            None => (None, data),
        };

        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| IngestError::Unparseable {
                name: self.filename.clone(),
            })?;

        Ok(DocumentUpload::new(
            self.filename.clone(),
            self.media_type.clone().or(prefix_type),
            bytes,
        ))
    }
}
