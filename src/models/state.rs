use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Accumulated record of a single question-answering run
///
/// Sequence fields only ever grow: stage fragments are merged with [`append`],
/// never assigned. `final_output` is written once by the synthesis stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Question history; stages read index 0
    pub question: Vec<String>,
    /// One formatted entry per retrieved document
    pub context: Vec<String>,
    /// One answer per successfully answered context entry, in context order
    pub pre_answers: Vec<String>,
    /// Synthesized answer
    pub final_output: Option<String>,
}

/// Partial result returned by a stage
///
/// Every field defaults to empty, so a stage only fills what it produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub question: Vec<String>,
    pub context: Vec<String>,
    pub pre_answers: Vec<String>,
    pub final_output: Option<String>,
}

impl StateUpdate {
    pub fn context(entries: Vec<String>) -> Self {
        Self {
            context: entries,
            ..Default::default()
        }
    }

    pub fn pre_answers(entries: Vec<String>) -> Self {
        Self {
            pre_answers: entries,
            ..Default::default()
        }
    }

    pub fn final_output(text: String) -> Self {
        Self {
            final_output: Some(text),
            ..Default::default()
        }
    }
}

/// Reducer for sequence fields: concatenate the fragment onto the existing values
pub fn append(current: &mut Vec<String>, fragment: Vec<String>) {
    current.extend(fragment);
}

/// Reducer for single-writer fields: a present fragment replaces the stored value
pub fn last_write_wins(current: &mut Option<String>, fragment: Option<String>) {
    if fragment.is_some() {
        *current = fragment;
    }
}

impl State {
    /// Create the initial state for a question
    ///
    /// Blank questions are rejected, so `question[0]` is always meaningful.
    pub fn new(question: impl Into<String>) -> Result<Self, PipelineError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        Ok(Self {
            question: vec![question],
            ..Default::default()
        })
    }

    /// The question every stage works on
    pub fn primary_question(&self) -> &str {
        self.question.first().map(String::as_str).unwrap_or_default()
    }

    /// Merge a stage fragment into the state, field by field
    pub fn apply(&mut self, update: StateUpdate) {
        append(&mut self.question, update.question);
        append(&mut self.context, update.context);
        append(&mut self.pre_answers, update.pre_answers);
        last_write_wins(&mut self.final_output, update.final_output);
    }
}

/// Position of a run in the fixed pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Retrieved,
    Summarized,
    Finalized,
}

impl Phase {
    /// The phase reached after the next stage completes, if any
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Init => Some(Phase::Retrieved),
            Phase::Retrieved => Some(Phase::Summarized),
            Phase::Summarized => Some(Phase::Finalized),
            Phase::Finalized => None,
        }
    }

    /// Move to `target`, which must be the immediate successor
    pub fn advance(&mut self, target: Phase) -> Result<(), PipelineError> {
        if self.next() != Some(target) {
            return Err(PipelineError::InvalidTransition {
                from: *self,
                to: target,
            });
        }
        *self = target;
        Ok(())
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Finalized
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Retrieved => "retrieved",
            Phase::Summarized => "summarized",
            Phase::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_rejects_blank_question() {
        assert!(matches!(State::new("   "), Err(PipelineError::EmptyQuestion)));
        assert!(matches!(State::new(""), Err(PipelineError::EmptyQuestion)));
    }

    #[test]
    fn test_new_state_has_only_question() {
        let state = State::new("What is a qubit?").unwrap();
        assert_eq!(state.question, vec!["What is a qubit?".to_string()]);
        assert_eq!(state.primary_question(), "What is a qubit?");
        assert!(state.context.is_empty());
        assert!(state.pre_answers.is_empty());
        assert!(state.final_output.is_none());
    }

    #[test]
    fn test_append_sums_fragment_sizes_in_order() {
        let mut state = State::new("q").unwrap();
        let fragments = vec![
            vec!["a1".to_string(), "a2".to_string()],
            vec![],
            vec!["b1".to_string()],
            vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
        ];
        let expected_len: usize = fragments.iter().map(Vec::len).sum();

        for fragment in fragments {
            state.apply(StateUpdate::context(fragment));
        }

        assert_eq!(state.context.len(), expected_len);
        assert_eq!(state.context, vec!["a1", "a2", "b1", "c1", "c2", "c3"]);
    }

    #[test]
    fn test_apply_never_overwrites_sequences() {
        let mut state = State::new("first").unwrap();
        state.apply(StateUpdate {
            question: vec!["follow-up".to_string()],
            ..Default::default()
        });
        state.apply(StateUpdate::pre_answers(vec!["x".to_string()]));
        state.apply(StateUpdate::pre_answers(vec!["y".to_string()]));

        assert_eq!(state.question, vec!["first", "follow-up"]);
        assert_eq!(state.primary_question(), "first");
        assert_eq!(state.pre_answers, vec!["x", "y"]);
    }

    #[test]
    fn test_final_output_last_write_wins() {
        let mut state = State::new("q").unwrap();
        state.apply(StateUpdate::final_output("draft".to_string()));
        state.apply(StateUpdate::default());
        assert_eq!(state.final_output.as_deref(), Some("draft"));

        state.apply(StateUpdate::final_output("final".to_string()));
        assert_eq!(state.final_output.as_deref(), Some("final"));
    }

    #[test]
    fn test_phase_is_strictly_linear() {
        let mut phase = Phase::Init;
        phase.advance(Phase::Retrieved).unwrap();
        phase.advance(Phase::Summarized).unwrap();
        phase.advance(Phase::Finalized).unwrap();
        assert!(phase.is_terminal());
        assert!(phase.next().is_none());
    }

    #[test]
    fn test_phase_rejects_skipping_a_stage() {
        let mut phase = Phase::Init;
        let err = phase.advance(Phase::Summarized).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: Phase::Init,
                to: Phase::Summarized
            }
        ));
        assert_eq!(phase, Phase::Init);
    }
}
