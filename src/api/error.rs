//! Error types for the library API.

use std::time::Duration;

use llm::error::LLMError;
use thiserror::Error;

use super::store::SessionKey;

/// Errors raised by the session state store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No session exists for the given (app, user, id) triple.
    #[error("Session '{0}' not found")]
    SessionNotFound(SessionKey),

    /// The session exists but holds no value under the requested key.
    #[error("Key '{key}' not found in session '{session}'")]
    KeyNotFound { session: SessionKey, key: String },

    /// A session with the same identity was already created.
    #[error("Session '{0}' already exists")]
    SessionExists(SessionKey),
}

/// Failures reported by a [`ModelClient`](super::ModelClient).
#[derive(Error, Debug)]
pub enum ModelError {
    /// An error originating from the underlying LLM backend.
    #[error("LLM backend error: {0}")]
    Backend(#[from] LLMError),

    /// The backend answered but produced no text.
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// The call exceeded the caller-supplied budget.
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced while building or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The pipeline was wired incorrectly. Raised before any model call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A step's input key was absent from session state when it ran.
    #[error("Step '{step}' requires state key '{key}' which has not been produced")]
    MissingDependency { step: String, key: String },

    /// The model call behind a step failed.
    #[error("Step '{step}' failed to invoke the model: {source}")]
    ModelInvocation {
        step: String,
        #[source]
        source: ModelError,
    },

    /// An error originating from the session store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller cancelled the run.
    #[error("Run cancelled{}", .step.as_ref().map(|s| format!(" during step '{}'", s)).unwrap_or_default())]
    Cancelled { step: Option<String> },
}

impl PipelineError {
    /// Whether a caller-side retry of the whole run could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::ModelInvocation { .. })
    }

    /// Name of the step the error is attributed to, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            PipelineError::MissingDependency { step, .. }
            | PipelineError::ModelInvocation { step, .. } => Some(step),
            PipelineError::Cancelled { step } => step.as_deref(),
            _ => None,
        }
    }
}
