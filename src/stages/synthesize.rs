use std::time::Duration;

use tracing::{debug, info};

use crate::error::{CompletionError, PipelineError};
use crate::llm::{build_synthesis_prompt, CitationStyle, CompletionBackend, PromptStyle};
use crate::models::{State, StateUpdate};

/// Configuration for the final answer stage
#[derive(Debug, Clone)]
pub struct SynthesizeConfig {
    /// Prompt wording
    pub style: PromptStyle,
    /// Bibliography format for the scientific style
    pub citation_style: CitationStyle,
    /// Upper bound on the completion call
    pub timeout: Duration,
}

impl Default for SynthesizeConfig {
    fn default() -> Self {
        Self {
            style: PromptStyle::Summary,
            citation_style: CitationStyle::Apa,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Execute the final answer stage
///
/// Runs even when there are no pre-answers. Any failure is fatal to the run;
/// no placeholder answer is produced.
pub async fn execute_synthesize(
    backend: &dyn CompletionBackend,
    state: &State,
    config: &SynthesizeConfig,
) -> Result<StateUpdate, PipelineError> {
    let prompt = build_synthesis_prompt(
        config.style,
        config.citation_style,
        state.primary_question(),
        &state.pre_answers,
    );

    info!("Synthesize: merging {} pre-answers", state.pre_answers.len());
    debug!("Synthesis prompt of {} chars", prompt.len());

    let answer = tokio::time::timeout(config.timeout, backend.complete(&prompt))
        .await
        .map_err(|_| CompletionError::Timeout(config.timeout))
        .and_then(|response| response)
        .map_err(PipelineError::Synthesis)?;

    Ok(StateUpdate::final_output(answer))
}
