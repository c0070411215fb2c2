//! Drives a pipeline run for one session and collects its outcome.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::{PipelineError, StoreError};
use super::event::{Event, EventStream};
use super::llm_bridge::ModelClient;
use super::runner::Agent;
use super::store::{Session, SessionKey, SessionStore};

/// Caller-supplied run options.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Budget handed to the model client for every call.
    pub timeout: Option<Duration>,
    /// Cancels the run at the next step boundary, or mid-call.
    pub cancel: CancellationToken,
}

impl RunConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Everything a step needs while it runs.
pub struct InvocationContext {
    pub invocation_id: Uuid,
    pub session: SessionKey,
    pub user_input: String,
    pub store: Arc<dyn SessionStore>,
    pub model: Arc<dyn ModelClient>,
    pub config: RunConfig,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed,
    Failed(PipelineError),
    Cancelled,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// Result of [`Runner::run_to_completion`].
#[derive(Debug)]
pub struct RunReport {
    pub session: SessionKey,
    pub invocation_id: Option<Uuid>,
    pub events: Vec<Event>,
    pub outcome: RunOutcome,
}

/// Owns an agent, a session store and a model client, and runs the agent
/// for sessions of one application.
pub struct Runner {
    app_name: String,
    agent: Arc<Agent>,
    store: Arc<dyn SessionStore>,
    model: Arc<dyn ModelClient>,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        agent: impl Into<Agent>,
        store: Arc<dyn SessionStore>,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            agent: Arc::new(agent.into()),
            store,
            model,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Creates a fresh session for `user_id` under this runner's application.
    pub fn create_session(&self, user_id: &str) -> Result<Session, StoreError> {
        self.store.create(&self.app_name, user_id, None)
    }

    /// Starts the agent for an existing session.
    ///
    /// The stream is lazy and single-pass; it ends after the last step or
    /// right after the first error.
    pub fn run(
        &self,
        user_id: &str,
        session_id: &str,
        prompt: &str,
        config: RunConfig,
    ) -> EventStream<'static> {
        let agent = Arc::clone(&self.agent);
        let ctx = InvocationContext {
            invocation_id: Uuid::new_v4(),
            session: SessionKey::new(&self.app_name, user_id, session_id),
            user_input: prompt.to_string(),
            store: Arc::clone(&self.store),
            model: Arc::clone(&self.model),
            config,
        };

        Box::pin(async_stream::stream! {
            match ctx.store.get_session(&ctx.session) {
                Err(e) => {
                    yield Err(PipelineError::from(e));
                }
                Ok(_) => {
                    tracing::info!(
                        agent = %agent.name(),
                        session_id = %ctx.session.session_id,
                        invocation_id = %ctx.invocation_id,
                        "run started"
                    );
                    let mut events = agent.run(&ctx);
                    while let Some(item) = events.next().await {
                        yield item;
                    }
                }
            }
        })
    }

    /// Runs the agent and drains every event, calling `observer` for each one.
    pub async fn run_to_completion<F>(
        &self,
        session: &SessionKey,
        prompt: &str,
        config: RunConfig,
        mut observer: F,
    ) -> RunReport
    where
        F: FnMut(&Event),
    {
        let mut events = Vec::new();
        let mut outcome = RunOutcome::Completed;

        let mut stream = self.run(&session.user_id, &session.session_id, prompt, config);
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    tracing::debug!(
                        author = %event.author,
                        length = event.content.len(),
                        "event received"
                    );
                    observer(&event);
                    events.push(event);
                }
                Err(PipelineError::Cancelled { step }) => {
                    tracing::warn!(step = step.as_deref().unwrap_or("-"), "run cancelled");
                    outcome = RunOutcome::Cancelled;
                }
                Err(err) => {
                    tracing::error!(error = %err, "error during agent execution");
                    outcome = RunOutcome::Failed(err);
                }
            }
        }

        RunReport {
            session: session.clone(),
            invocation_id: events.first().map(|e| e.invocation_id),
            events,
            outcome,
        }
    }
}
