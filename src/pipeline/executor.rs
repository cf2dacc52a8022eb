use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::CancellationToken;
use crate::error::PipelineError;
use crate::io::DocumentRenderer;
use crate::llm::{CompletionBackend, PromptStyle};
use crate::models::{Phase, State};
use crate::retrieval::RetrievalBackend;
use crate::stages::{
    execute_render, execute_retrieve, execute_summarize, execute_synthesize, RenderOutcome,
    RetrievalOutcome, RetrieveConfig, SummarizeConfig, SummarizeReport, SynthesizeConfig,
};

/// Configuration for every stage of the pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub retrieve: RetrieveConfig,
    pub summarize: SummarizeConfig,
    pub synthesize: SynthesizeConfig,
}

impl PipelineConfig {
    /// Switch both prompts to `style`
    ///
    /// The scientific style also turns on citation metadata in the context,
    /// since its prompts ask the model to keep citations.
    pub fn with_style(mut self, style: PromptStyle) -> Self {
        self.summarize.style = style;
        self.synthesize.style = style;
        self.retrieve.include_citations = style == PromptStyle::Scientific;
        self
    }
}

/// Everything known about a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Always [`Phase::Finalized`] for a returned report
    pub phase: Phase,
    pub state: State,
    pub retrieval: RetrievalOutcome,
    pub summarize: SummarizeReport,
    /// Present when a renderer is configured
    pub render: Option<RenderOutcome>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn final_output(&self) -> &str {
        self.state.final_output.as_deref().unwrap_or_default()
    }
}

/// The fixed retrieve → summarize → synthesize pipeline
///
/// Backends are long-lived handles shared by every run. Each call to
/// [`Pipeline::run`] owns a fresh [`State`], so runs can proceed concurrently.
pub struct Pipeline {
    retriever: Arc<dyn RetrievalBackend>,
    completer: Arc<dyn CompletionBackend>,
    renderer: Option<Arc<dyn DocumentRenderer>>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        retriever: Arc<dyn RetrievalBackend>,
        completer: Arc<dyn CompletionBackend>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever,
            completer,
            renderer: None,
            config,
        }
    }

    /// Render every successful run with `renderer`
    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Answer one question
    ///
    /// Retrieval problems degrade the run, per-document failures drop that
    /// document, and a synthesis failure or cancellation aborts the run.
    pub async fn run(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        self.run_inner(run_id, question, cancel)
            .instrument(info_span!("run", %run_id))
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let started_at = Utc::now();

        let mut state = State::new(question)?;
        let mut phase = Phase::Init;
        info!("Run started: {:?}", state.primary_question());

        let retrieved = until_cancelled(
            cancel,
            phase,
            execute_retrieve(self.retriever.as_ref(), &state, &self.config.retrieve),
        )
        .await?;
        state.apply(retrieved.update);
        phase.advance(Phase::Retrieved)?;

        let summarized = until_cancelled(
            cancel,
            phase,
            execute_summarize(self.completer.as_ref(), &state, &self.config.summarize),
        )
        .await?;
        state.apply(summarized.update);
        phase.advance(Phase::Summarized)?;

        let synthesized = until_cancelled(
            cancel,
            phase,
            execute_synthesize(self.completer.as_ref(), &state, &self.config.synthesize),
        )
        .await??;
        state.apply(synthesized);
        phase.advance(Phase::Finalized)?;

        let render = self
            .renderer
            .as_deref()
            .map(|renderer| execute_render(renderer, &state));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "Run finished in {}ms: {} context, {} pre-answers",
            elapsed_ms,
            state.context.len(),
            state.pre_answers.len()
        );

        Ok(RunReport {
            run_id,
            started_at,
            phase,
            state,
            retrieval: retrieved.outcome,
            summarize: summarized.report,
            render,
            elapsed_ms,
        })
    }
}

/// Drive `stage` unless the run is cancelled first
///
/// Dropping the stage future abandons its in-flight backend calls.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    phase: Phase,
    stage: F,
) -> Result<F::Output, PipelineError> {
    if cancel.is_cancelled() {
        return Err(cancelled(cancel, phase));
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled(cancel, phase)),
        output = stage => Ok(output),
    }
}

fn cancelled(cancel: &CancellationToken, phase: Phase) -> PipelineError {
    info!("Run cancelled at {}", phase);
    PipelineError::Cancelled {
        phase,
        reason: cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
    }
}
