use thiserror::Error;

/// Fatal errors emitted by the agent-core crate.
///
/// Non-fatal conditions (a failed click, an unknown function name, an
/// over-budget history that cannot be pruned further) are modeled as result
/// values and fed back to the model; only the variants below end a run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Model or environment connection/auth failure. Never retried here;
    /// retries, if any, belong to the transport collaborator.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Unrecoverable environment failure (launch, viewport setup).
    #[error("environment failure: {0}")]
    Environment(String),

    /// The model stopped issuing actions for too many consecutive turns.
    #[error("model made no progress for {limit} consecutive turns")]
    SafetyCeilingExceeded { limit: u32 },

    /// Explicit model-reported mismatch. Fatal by design: the whole point
    /// of the report action is to fail the run deterministically.
    #[error("validation failed: expected '{expected}', got '{actual}': {detail}")]
    ValidationFailed {
        expected: String,
        actual: String,
        detail: String,
    },
}

impl AgentError {
    /// Helper for wrapping transport-level failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Helper for unrecoverable environment failures.
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }
}
