//! Ingestion limits and timeouts.
//!
//! Defaults match the evidence intake contract (2 MiB per document, at most 5
//! documents, ~6000 characters per reference). Every knob can be overridden from
//! the environment with a `TRENDLINE_*` variable.

use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "trendline/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/trendline/trendline)"
);

pub const MAX_DOCUMENT_BYTES_ENV: &str = "TRENDLINE_MAX_DOCUMENT_BYTES";
pub const MAX_DOCUMENTS_ENV: &str = "TRENDLINE_MAX_DOCUMENTS";
pub const MAX_ENTRY_CHARS_ENV: &str = "TRENDLINE_MAX_ENTRY_CHARS";
pub const MAX_PAGE_BYTES_ENV: &str = "TRENDLINE_MAX_PAGE_BYTES";
pub const MAX_CONCURRENCY_ENV: &str = "TRENDLINE_INGEST_CONCURRENCY";
pub const FETCH_TIMEOUT_ENV: &str = "TRENDLINE_FETCH_TIMEOUT_SECS";
pub const DOCUMENT_TIMEOUT_ENV: &str = "TRENDLINE_DOCUMENT_TIMEOUT_SECS";
pub const USER_AGENT_ENV: &str = "TRENDLINE_USER_AGENT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub max_document_bytes: usize,
    pub max_documents: usize,
    pub max_entry_chars: usize,
    pub max_page_bytes: usize,
    pub max_concurrency: usize,
    pub fetch_timeout: Duration,
    pub document_timeout: Duration,
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: 2 * 1024 * 1024,
            max_documents: 5,
            max_entry_chars: 6000,
            max_page_bytes: 2_000_000,
            max_concurrency: 4,
            fetch_timeout: Duration::from_secs(15),
            document_timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by any `TRENDLINE_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            max_document_bytes: env_usize(MAX_DOCUMENT_BYTES_ENV, d.max_document_bytes, 1, 64 * 1024 * 1024)?,
            max_documents: env_usize(MAX_DOCUMENTS_ENV, d.max_documents, 0, 100)?,
            max_entry_chars: env_usize(MAX_ENTRY_CHARS_ENV, d.max_entry_chars, 1, 1_000_000)?,
            max_page_bytes: env_usize(MAX_PAGE_BYTES_ENV, d.max_page_bytes, 1, 64 * 1024 * 1024)?,
            max_concurrency: env_usize(MAX_CONCURRENCY_ENV, d.max_concurrency, 1, 64)?,
            fetch_timeout: env_secs(FETCH_TIMEOUT_ENV, d.fetch_timeout)?,
            document_timeout: env_secs(DOCUMENT_TIMEOUT_ENV, d.document_timeout)?,
            user_agent: match std::env::var(USER_AGENT_ENV) {
                Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
                _ => d.user_agent,
            },
        })
    }

    pub fn with_max_document_bytes(mut self, bytes: usize) -> Self {
        self.max_document_bytes = bytes;
        self
    }

    pub fn with_max_documents(mut self, n: usize) -> Self {
        self.max_documents = n;
        self
    }

    pub fn with_max_entry_chars(mut self, n: usize) -> Self {
        self.max_entry_chars = n;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_document_timeout(mut self, timeout: Duration) -> Self {
        self.document_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: `{value}` (expected an integer in {min}..={max})")]
    Invalid {
        name: &'static str,
        value: String,
        min: usize,
        max: usize,
    },
}

fn env_usize(name: &'static str, default: usize, min: usize, max: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            if v.is_empty() {
                return Ok(default);
            }
            match v.parse::<usize>() {
                Ok(n) if (min..=max).contains(&n) => Ok(n),
                _ => Err(ConfigError::Invalid {
                    name,
                    value: v.to_string(),
                    min,
                    max,
                }),
            }
        }
        Err(_) => Ok(default),
    }
}

fn env_secs(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let secs = env_usize(name, default.as_secs() as usize, 1, 600)?;
    Ok(Duration::from_secs(secs as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_intake_contract() {
        let c = IngestConfig::default();
        assert_eq!(c.max_document_bytes, 2 * 1024 * 1024);
        assert_eq!(c.max_documents, 5);
        assert_eq!(c.max_entry_chars, 6000);
        assert!(c.user_agent.starts_with("trendline/"));
    }

    #[test]
    fn bad_env_value_is_reported() {
        std::env::set_var("TRENDLINE_TEST_BAD_USIZE", "lots");
        let err = env_usize("TRENDLINE_TEST_BAD_USIZE", 3, 1, 10).unwrap_err();
        assert!(err.to_string().contains("TRENDLINE_TEST_BAD_USIZE"));
        std::env::remove_var("TRENDLINE_TEST_BAD_USIZE");
    }

    #[test]
    fn builder_setters() {
        let c = IngestConfig::new()
            .with_max_documents(2)
            .with_max_concurrency(0)
            .with_user_agent("custom-agent/1");
        assert_eq!(c.max_documents, 2);
        assert_eq!(c.max_concurrency, 1);
        assert_eq!(c.user_agent, "custom-agent/1");
    }
}
