//! Web page fetching and main-content extraction.
//!
//! Remote pages are **untrusted input**:
//! - only `http`/`https` URLs are fetched,
//! - bodies are capped both by `Content-Length` and by bytes actually read,
//! - HTML is reduced to the visible text of its main content region.
//!
//! The network side sits behind [`PageFetcher`] so the aggregator can run
//! against a stub.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::text::collapse_whitespace;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

pub const ACCEPT_HEADER: &str =
    "text/html,application/xhtml+xml;q=0.9,text/plain;q=0.8,*/*;q=0.5";

/// Candidate content regions, most specific first.
static REGION_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "main",
        "article",
        "[role=\"main\"]",
        "#main, #content, #main-content",
        "body",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("region selector"))
    .collect()
});

/// Subtrees that never contribute page text.
const EXCLUDED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "template", "svg",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "main", "li", "ul", "ol", "br", "h1", "h2", "h3", "h4",
    "h5", "h6", "tr", "td", "th", "table", "blockquote", "pre", "dd", "dt", "figcaption",
];

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("script regex"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("style regex"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").expect("entity regex"));

// ============================================================================
// Fetching
// ============================================================================

/// Fetches a URL and returns its extracted, whitespace-collapsed text.
///
/// Implementations return non-empty text or an [`IngestError`] naming the URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, IngestError>;
}

/// `reqwest`-backed fetcher.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    max_page_bytes: usize,
}

impl HttpPageFetcher {
    pub fn new(config: &IngestConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.fetch_timeout)
            .build()?;
        Ok(Self {
            client,
            max_page_bytes: config.max_page_bytes,
        })
    }

    pub fn with_client(client: reqwest::Client, max_page_bytes: usize) -> Self {
        Self {
            client,
            max_page_bytes,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, raw_url: &str) -> Result<String, IngestError> {
        let unreachable = || IngestError::Unreachable {
            url: raw_url.to_string(),
        };
        let transport = |e: reqwest::Error| {
            debug!(url = %raw_url, error = %e, "fetch failed");
            if e.is_timeout() {
                IngestError::FetchTimeout {
                    url: raw_url.to_string(),
                }
            } else {
                unreachable()
            }
        };

        let url = Url::parse(raw_url).map_err(|_| unreachable())?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(unreachable());
        }

        let mut resp = self.client.get(url).send().await.map_err(transport)?;
        if !resp.status().is_success() {
            return Err(IngestError::HttpStatus {
                url: raw_url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let too_large = || IngestError::PageTooLarge {
            url: raw_url.to_string(),
            limit: self.max_page_bytes,
        };
        if let Some(len) = resp.content_length() {
            if len as usize > self.max_page_bytes {
                return Err(too_large());
            }
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(transport)? {
            if body.len() + chunk.len() > self.max_page_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&body);
        let text = if content_type.starts_with("text/plain") {
            collapse_whitespace(&body)
        } else {
            extract_main_text(&body)
        };

        if text.is_empty() {
            return Err(IngestError::EmptyPage {
                url: raw_url.to_string(),
            });
        }
        debug!(url = %raw_url, chars = text.chars().count(), "fetched page");
        Ok(text)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Visible text of the page's main content region, whitespace-collapsed.
///
/// Falls back to [`strip_all_tags`] when no region exists or the chosen region
/// has no text.
pub fn extract_main_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let region = REGION_SELECTORS
        .iter()
        .find_map(|selector| doc.select(selector).next());

    if let Some(region) = region {
        let mut raw = String::new();
        collect_visible_text(region, &mut raw);
        let text = collapse_whitespace(&raw);
        if !text.is_empty() {
            return text;
        }
    }

    strip_all_tags(html)
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => {
                let name = e.name();
                if EXCLUDED_ELEMENTS.contains(&name) {
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push(' ');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_visible_text(child_el, out);
                }
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Regex fallback: drop script/style blocks, comments and tags, then decode
/// the common entities.
pub fn strip_all_tags(html: &str) -> String {
    let s = SCRIPT_BLOCK.replace_all(html, " ");
    let s = STYLE_BLOCK.replace_all(&s, " ");
    let s = COMMENT.replace_all(&s, " ");
    let s = TAG.replace_all(&s, " ");
    collapse_whitespace(&decode_entities(&s))
}

fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let digits = &caps[1];
        let code = match digits.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => digits.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
