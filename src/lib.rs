pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod retrieval;
pub mod stages;

pub use error::{CompletionError, PipelineError, RenderError, RetrievalError};
pub use io::{DocumentRenderer, MarkdownRenderer, RenderConfig};
pub use llm::{
    AnthropicClient, AnthropicConfig, CitationStyle, CompletionBackend, OpenAiClient,
    OpenAiConfig, PromptStyle,
};
pub use models::{Document, Phase, State, StateUpdate};
pub use pipeline::{CancellationToken, Pipeline, PipelineConfig, RunReport};
pub use retrieval::{ArxivClient, ArxivConfig, RetrievalBackend, RetrievalRequest};
pub use stages::{
    RetrievalOutcome, RetrieveConfig, SummarizeConfig, SummarizeReport, SynthesizeConfig,
};
