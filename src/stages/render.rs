use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::io::DocumentRenderer;
use crate::models::State;

/// What happened when the final state was rendered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderOutcome {
    /// Where the document was written
    pub path: Option<PathBuf>,
    /// Why it was not written
    pub error: Option<String>,
}

/// Execute the render stage
///
/// Renders the question as title and the final answer as body. Failures are
/// reported in the outcome and never affect the answer itself.
pub fn execute_render(renderer: &dyn DocumentRenderer, state: &State) -> RenderOutcome {
    let Some(body) = state.final_output.as_deref() else {
        warn!("Render skipped: run has no final output");
        return RenderOutcome {
            path: None,
            error: Some("run has no final output".to_string()),
        };
    };

    match renderer.render(state.primary_question(), body) {
        Ok(path) => {
            info!("Answer document written to {:?}", path);
            RenderOutcome {
                path: Some(path),
                error: None,
            }
        }
        Err(e) => {
            warn!("Render failed: {}", e);
            RenderOutcome {
                path: None,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::RenderError;
    use crate::models::StateUpdate;

    struct Broken;

    impl DocumentRenderer for Broken {
        fn render(&self, _title: &str, _body: &str) -> Result<PathBuf, RenderError> {
            Err(RenderError::Io {
                path: PathBuf::from("/read-only/x.md"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    #[test]
    fn test_render_failure_is_reported_not_raised() {
        let mut state = State::new("q").unwrap();
        state.apply(StateUpdate::final_output("answer".to_string()));

        let outcome = execute_render(&Broken, &state);

        assert!(outcome.path.is_none());
        assert!(outcome.error.unwrap().contains("denied"));
        assert_eq!(state.final_output.as_deref(), Some("answer"));
    }

    #[test]
    fn test_render_without_final_output() {
        let outcome = execute_render(&Broken, &State::new("q").unwrap());
        assert!(outcome.error.is_some());
    }
}
