use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CompletionError;
use crate::llm::{build_document_prompt, CompletionBackend, PromptStyle};
use crate::models::{State, StateUpdate};

/// Configuration for the per-document answer stage
#[derive(Debug, Clone)]
pub struct SummarizeConfig {
    /// Prompt wording
    pub style: PromptStyle,
    /// Maximum in-flight completion calls
    pub concurrency: usize,
    /// Retries per document after the first attempt
    pub max_retries: u32,
    /// Base delay between retries, multiplied by the attempt number
    pub retry_backoff: Duration,
    /// Upper bound on each completion call
    pub timeout: Duration,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            style: PromptStyle::Summary,
            concurrency: 4,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(90),
        }
    }
}

/// A document whose answer could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Index into `context`
    pub index: usize,
    pub error: String,
}

/// Bookkeeping for the per-document stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummarizeReport {
    /// Context index answered by each pre-answer, in order
    pub answered: Vec<usize>,
    /// Documents skipped after exhausting their retries
    pub failures: Vec<ItemFailure>,
}

impl SummarizeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of the per-document stage
#[derive(Debug)]
pub struct SummarizeResult {
    pub update: StateUpdate,
    pub report: SummarizeReport,
}

/// Execute the per-document answer stage
///
/// Each context entry is answered independently, at most `concurrency` at a
/// time. Answers are collected in context order whatever order the calls
/// finish in. A document that keeps failing is skipped without affecting
/// the others.
pub async fn execute_summarize(
    backend: &dyn CompletionBackend,
    state: &State,
    config: &SummarizeConfig,
) -> SummarizeResult {
    let question = state.primary_question();

    if state.context.is_empty() {
        info!("Summarize: no context, skipping");
        return SummarizeResult {
            update: StateUpdate::pre_answers(Vec::new()),
            report: SummarizeReport::default(),
        };
    }

    info!(
        "Summarize: answering {} documents (concurrency {})",
        state.context.len(),
        config.concurrency.max(1)
    );

    let outcomes: Vec<(usize, Result<String, CompletionError>)> =
        stream::iter(state.context.iter().enumerate())
            .map(move |(index, context)| async move {
                (index, answer_document(backend, question, index, context, config).await)
            })
            .buffered(config.concurrency.max(1))
            .collect()
            .await;

    let mut pre_answers = Vec::with_capacity(outcomes.len());
    let mut report = SummarizeReport::default();

    for (index, outcome) in outcomes {
        match outcome {
            Ok(answer) => {
                pre_answers.push(answer);
                report.answered.push(index);
            }
            Err(e) => {
                warn!("Document {} skipped: {}", index, e);
                report.failures.push(ItemFailure {
                    index,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Summarize: {} answered, {} skipped",
        report.answered.len(),
        report.failures.len()
    );

    SummarizeResult {
        update: StateUpdate::pre_answers(pre_answers),
        report,
    }
}

/// Answer one document, retrying on failure
async fn answer_document(
    backend: &dyn CompletionBackend,
    question: &str,
    index: usize,
    context: &str,
    config: &SummarizeConfig,
) -> Result<String, CompletionError> {
    let prompt = build_document_prompt(config.style, question, context);
    debug!("Document {}: prompt of {} chars", index, prompt.len());

    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            info!("Document {}: retry {} of {}", index, attempt, config.max_retries);
            tokio::time::sleep(config.retry_backoff * attempt).await;
        }

        let response = match tokio::time::timeout(config.timeout, backend.complete(&prompt)).await {
            Ok(response) => response,
            Err(_) => Err(CompletionError::Timeout(config.timeout)),
        };

        match response {
            Ok(answer) => return Ok(answer),
            Err(e) => {
                warn!("Document {} attempt {} failed: {}", index, attempt + 1, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(CompletionError::EmptyResponse))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Fails the first `failures` calls, then echoes the prompt length
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for Flaky {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(CompletionError::Network("reset".to_string()))
            } else {
                Ok(format!("len {}", prompt.len()))
            }
        }
    }

    fn state_with_context(entries: &[&str]) -> State {
        let mut state = State::new("q").unwrap();
        state.apply(StateUpdate::context(entries.iter().map(|s| s.to_string()).collect()));
        state
    }

    #[test]
    fn test_summarize_config_default() {
        let config = SummarizeConfig::default();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.style, PromptStyle::Summary);
    }

    #[tokio::test]
    async fn test_empty_context_makes_no_calls() {
        let backend = Flaky {
            failures: 0,
            calls: AtomicUsize::new(0),
        };

        let result =
            execute_summarize(&backend, &State::new("q").unwrap(), &SummarizeConfig::default())
                .await;

        assert!(result.update.pre_answers.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let backend = Flaky {
            failures: 1,
            calls: AtomicUsize::new(0),
        };
        let config = SummarizeConfig {
            concurrency: 1,
            ..Default::default()
        };

        let result = execute_summarize(&backend, &state_with_context(&["only"]), &config).await;

        assert_eq!(result.update.pre_answers.len(), 1);
        assert!(result.report.is_complete());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_skip_the_document() {
        let backend = Flaky {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let config = SummarizeConfig {
            max_retries: 1,
            ..Default::default()
        };

        let result = execute_summarize(&backend, &state_with_context(&["a", "b"]), &config).await;

        assert!(result.update.pre_answers.is_empty());
        assert_eq!(result.report.failures.len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
    }
}
