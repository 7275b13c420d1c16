//! Script run state and element staleness

use serde::Serialize;

/// Where the backend script is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    NotRunning,
    Running {
        run_id: String,
    },
    /// A flush asked for a new run that has not started yet
    RerunRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Staleness {
    Fresh,
    Stale,
}

/// Staleness of an element produced by run `element_run_id`
pub fn staleness(run_state: &RunState, element_run_id: &str) -> Staleness {
    match run_state {
        RunState::NotRunning => Staleness::Fresh,
        RunState::RerunRequested => Staleness::Stale,
        RunState::Running { run_id } if run_id == element_run_id => Staleness::Fresh,
        RunState::Running { .. } => Staleness::Stale,
    }
}
