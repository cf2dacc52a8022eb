use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::models::Phase;

/// Failure talking to the retrieval backend
///
/// Never escapes the retrieve stage: it is folded into a degraded outcome.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval request failed: {0}")]
    Network(String),

    #[error("retrieval backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed retrieval response: {0}")]
    Malformed(String),
}

/// Failure talking to the completion backend
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Network(String),

    #[error("completion API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion response contained no text")]
    EmptyResponse,

    #[error("failed to parse completion response: {0}")]
    Parse(String),
}

/// Failure writing the rendered answer document
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize run report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure that aborts a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("final answer synthesis failed: {0}")]
    Synthesis(#[source] CompletionError),

    #[error("run cancelled during {phase}: {reason}")]
    Cancelled { phase: Phase, reason: String },

    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },
}
