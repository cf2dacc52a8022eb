use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{RetrievalBackend, RetrievalRequest};
use crate::error::RetrievalError;
use crate::models::{Document, META_AUTHORS, META_ENTRY_ID, META_PUBLISHED, META_TITLE};

/// Configuration for the arXiv export API client
#[derive(Debug, Clone)]
pub struct ArxivConfig {
    /// Query endpoint of the export API
    pub base_url: String,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Abstract length kept when full text is not requested
    pub snippet_chars: usize,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: "http://export.arxiv.org/api/query".to_string(),
            timeout: Duration::from_secs(30),
            snippet_chars: 500,
        }
    }
}

/// arXiv search client
///
/// Holds one HTTP client for the lifetime of the process.
///
/// The export API only serves abstracts, never the paper body. With
/// `full_text` set a document carries the whole abstract; without it the
/// abstract is cut to `snippet_chars`.
pub struct ArxivClient {
    client: Client,
    config: ArxivConfig,
}

impl ArxivClient {
    pub fn new(config: ArxivConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("paperqa/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .context("Failed to build arXiv HTTP client")?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl RetrievalBackend for ArxivClient {
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<Document>, RetrievalError> {
        let search_query = format!("all:{}", request.query);
        let max_results = request.max_documents.to_string();

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrievalError::Timeout(self.config.timeout)
                } else {
                    RetrievalError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Status { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RetrievalError::Network(e.to_string()))?;

        let mut documents = parse_atom_feed(&body)?;
        documents.truncate(request.max_documents);

        if !request.full_text {
            for doc in &mut documents {
                doc.text = truncate_at_word(&doc.text, self.config.snippet_chars);
            }
        }

        debug!("arXiv returned {} documents for {:?}", documents.len(), request.query);
        Ok(documents)
    }
}

fn selector(css: &str) -> Result<Selector, RetrievalError> {
    Selector::parse(css).map_err(|e| RetrievalError::Malformed(format!("bad selector {css}: {e}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn child_text(entry: ElementRef<'_>, sel: &Selector) -> Option<String> {
    entry
        .select(sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Parse an arXiv Atom feed into documents
///
/// Entries without an abstract are skipped. A response that is not a feed,
/// or the error entry arXiv returns for rejected queries, is malformed.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<Document>, RetrievalError> {
    let html = Html::parse_document(xml);

    let feed_sel = selector("feed")?;
    let entry_sel = selector("entry")?;
    let id_sel = selector("id")?;
    let title_sel = selector("title")?;
    let summary_sel = selector("summary")?;
    let published_sel = selector("published")?;
    let author_sel = selector("author name")?;

    if html.select(&feed_sel).next().is_none() {
        return Err(RetrievalError::Malformed(
            "response is not an Atom feed".to_string(),
        ));
    }

    let mut documents = Vec::new();

    for entry in html.select(&entry_sel) {
        let id = child_text(entry, &id_sel).unwrap_or_default();
        if id.contains("arxiv.org/api/errors") {
            let message = child_text(entry, &summary_sel).unwrap_or_else(|| "unknown error".to_string());
            return Err(RetrievalError::Malformed(format!("arXiv rejected query: {message}")));
        }

        let Some(text) = child_text(entry, &summary_sel) else {
            warn!("Skipping arXiv entry {:?} without abstract", id);
            continue;
        };

        let mut doc = Document::new(text);
        if !id.is_empty() {
            doc = doc.with_metadata(META_ENTRY_ID, id);
        }
        if let Some(published) = child_text(entry, &published_sel) {
            doc = doc.with_metadata(META_PUBLISHED, published);
        }
        if let Some(title) = child_text(entry, &title_sel) {
            doc = doc.with_metadata(META_TITLE, title);
        }

        let authors: Vec<String> = entry
            .select(&author_sel)
            .map(element_text)
            .filter(|a| !a.is_empty())
            .collect();
        if !authors.is_empty() {
            doc = doc.with_metadata(META_AUTHORS, authors.join(", "));
        }

        documents.push(doc);
    }

    Ok(documents)
}

/// Shorten text to at most `max_chars` characters, cutting at a word boundary
fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut result = String::new();
    for word in text.split_whitespace() {
        let needed = if result.is_empty() { word.chars().count() } else { word.chars().count() + 1 };
        if result.chars().count() + needed > max_chars {
            break;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }

    if result.is_empty() {
        result = text.chars().take(max_chars).collect();
    }
    result.push_str("...");
    result
}
