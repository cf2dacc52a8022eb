use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::RetrievalError;
use crate::models::{State, StateUpdate};
use crate::retrieval::{RetrievalBackend, RetrievalRequest};

/// Configuration for the retrieve stage
#[derive(Debug, Clone)]
pub struct RetrieveConfig {
    /// Maximum number of documents requested from the backend
    pub max_documents: usize,
    /// Request complete document text rather than snippets (arXiv: the whole abstract)
    pub full_text: bool,
    /// Append year, title and authors to each context entry
    pub include_citations: bool,
    /// Upper bound on the backend call
    pub timeout: Duration,
}

impl Default for RetrieveConfig {
    fn default() -> Self {
        Self {
            max_documents: 8,
            full_text: true,
            include_citations: false,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Why the context ended up the size it did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    /// The backend returned documents
    Found { documents: usize },
    /// The backend answered, but nothing matched
    NoResults,
    /// The backend failed; the run continues without evidence
    Degraded { reason: String },
}

impl RetrievalOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalOutcome::Degraded { .. })
    }
}

/// Result of the retrieve stage
#[derive(Debug)]
pub struct RetrieveResult {
    pub update: StateUpdate,
    pub outcome: RetrievalOutcome,
}

/// Execute the retrieve stage
///
/// Never fails: a backend error or timeout yields an empty context and a
/// [`RetrievalOutcome::Degraded`] outcome.
pub async fn execute_retrieve(
    backend: &dyn RetrievalBackend,
    state: &State,
    config: &RetrieveConfig,
) -> RetrieveResult {
    let request = RetrievalRequest {
        query: state.primary_question().to_string(),
        max_documents: config.max_documents,
        full_text: config.full_text,
    };

    let response = match tokio::time::timeout(config.timeout, backend.retrieve(&request)).await {
        Ok(response) => response,
        Err(_) => Err(RetrievalError::Timeout(config.timeout)),
    };

    match response {
        Ok(documents) if documents.is_empty() => {
            info!("Retrieve: no documents matched");
            RetrieveResult {
                update: StateUpdate::context(Vec::new()),
                outcome: RetrievalOutcome::NoResults,
            }
        }
        Ok(documents) => {
            let context: Vec<String> = documents
                .iter()
                .take(config.max_documents)
                .map(|doc| doc.to_context_entry(config.include_citations))
                .collect();

            info!("Retrieve: {} documents", context.len());
            RetrieveResult {
                outcome: RetrievalOutcome::Found {
                    documents: context.len(),
                },
                update: StateUpdate::context(context),
            }
        }
        Err(e) => {
            warn!("Retrieve degraded, continuing without context: {}", e);
            RetrieveResult {
                update: StateUpdate::context(Vec::new()),
                outcome: RetrievalOutcome::Degraded {
                    reason: e.to_string(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::models::{Document, META_TITLE};

    struct Fixed(Result<Vec<Document>, ()>);

    #[async_trait]
    impl RetrievalBackend for Fixed {
        async fn retrieve(&self, _request: &RetrievalRequest) -> Result<Vec<Document>, RetrievalError> {
            self.0
                .clone()
                .map_err(|_| RetrievalError::Network("connection refused".to_string()))
        }
    }

    struct Hangs;

    #[async_trait]
    impl RetrievalBackend for Hangs {
        async fn retrieve(&self, _request: &RetrievalRequest) -> Result<Vec<Document>, RetrievalError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_formats_documents_in_order() {
        let backend = Fixed(Ok(vec![
            Document::new("one").with_metadata(META_TITLE, "First"),
            Document::new("two"),
        ]));
        let state = State::new("q").unwrap();
        let config = RetrieveConfig {
            include_citations: true,
            ..Default::default()
        };

        let result = execute_retrieve(&backend, &state, &config).await;

        assert_eq!(result.update.context, vec!["one\nTitle: First", "two"]);
        assert_eq!(result.outcome, RetrievalOutcome::Found { documents: 2 });
    }

    #[tokio::test]
    async fn test_caps_documents_at_max() {
        let docs = (0..5).map(|i| Document::new(format!("doc {i}"))).collect();
        let config = RetrieveConfig {
            max_documents: 3,
            ..Default::default()
        };

        let result = execute_retrieve(&Fixed(Ok(docs)), &State::new("q").unwrap(), &config).await;

        assert_eq!(result.update.context.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_not_degraded() {
        let result = execute_retrieve(
            &Fixed(Ok(vec![])),
            &State::new("q").unwrap(),
            &RetrieveConfig::default(),
        )
        .await;

        assert!(result.update.context.is_empty());
        assert_eq!(result.outcome, RetrievalOutcome::NoResults);
    }

    #[tokio::test]
    async fn test_backend_error_degrades() {
        let result = execute_retrieve(
            &Fixed(Err(())),
            &State::new("q").unwrap(),
            &RetrieveConfig::default(),
        )
        .await;

        assert!(result.update.context.is_empty());
        assert!(result.outcome.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_backend_times_out() {
        let config = RetrieveConfig {
            timeout: Duration::from_secs(5),
            ..Default::default()
        };

        let result = execute_retrieve(&Hangs, &State::new("q").unwrap(), &config).await;

        match result.outcome {
            RetrievalOutcome::Degraded { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected degraded outcome, got {other:?}"),
        }
    }
}
