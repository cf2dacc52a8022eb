pub mod arxiv;

pub use arxiv::*;

use async_trait::async_trait;

use crate::error::RetrievalError;
use crate::models::Document;

/// Parameters for one retrieval call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    /// Free-text query
    pub query: String,
    /// Upper bound on returned documents
    pub max_documents: usize,
    /// Return complete document bodies instead of snippets
    pub full_text: bool,
}

/// A corpus that can be searched for documents relevant to a query
///
/// Implementations are shared across runs and fan-out items, so they hold
/// no per-request state.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<Document>, RetrievalError>;
}
