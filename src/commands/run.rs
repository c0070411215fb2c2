use console::style;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::agents::blog;
use crate::api::{Agent, Event, InMemorySessionStore, LlmClient, RunConfig, RunOutcome, Runner};
use crate::cli::Cli;
use crate::core::config::{ModelConfig, APP_NAME, USER_ID};
use crate::core::pipeline_file;

use super::report::Reporter;

/// Builds the pipeline, runs it once for a fresh session and prints the results.
///
/// `Err` is reserved for fatal setup problems; run failures come back as the outcome.
pub async fn run(cli: &Cli) -> Result<RunOutcome, String> {
    let model_config = ModelConfig::load(cli.config.as_deref()).map_err(|e| e.to_string())?;
    let settings = model_config.settings().map_err(|e| e.to_string())?;
    tracing::debug!(
        backend = %model_config.backend,
        model = %model_config.model,
        "model configured"
    );

    let agent: Agent = match &cli.pipeline {
        Some(path) => pipeline_file::load(path)
            .map_err(|e| format!("Failed to build agent: {}", e))?
            .into(),
        None => {
            tracing::info!("building blog agent pipeline");
            blog::build()
                .map_err(|e| format!("Failed to build agent: {}", e))?
                .into()
        }
    };

    let store = Arc::new(InMemorySessionStore::new());
    let runner = Runner::new(
        APP_NAME,
        agent,
        store.clone(),
        Arc::new(LlmClient::new(settings)),
    );
    let session = runner
        .create_session(USER_ID)
        .map_err(|e| format!("Failed to create session: {}", e))?;

    let prompt = cli
        .prompt
        .clone()
        .unwrap_or_else(|| blog::default_prompt().to_string());

    let cancel = CancellationToken::new();
    watch_for_cancellation(&cancel, cli.deadline_secs.map(Duration::from_secs));
    let mut config = RunConfig::default().with_cancel(cancel);
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    tracing::info!(prompt = %prompt, "running pipeline");
    tracing::debug!(session_id = %session.id(), user_id = USER_ID, "session details");
    banner(runner.agent());
    println!("> {}\n", prompt);

    let report = runner
        .run_to_completion(&session.key, &prompt, config, print_event)
        .await;

    if cli.agent_logger {
        tracing::info!("agent logger enabled, retrieving session outputs");
        Reporter::new(store.as_ref()).print(&session.key, runner.agent());
    } else {
        tracing::info!("agent logger disabled, skipping session output logging");
    }

    let rule = "=".repeat(80);
    let status = match &report.outcome {
        RunOutcome::Completed => style("Completed!".to_string()).green().bold(),
        RunOutcome::Cancelled => style("Cancelled.".to_string()).yellow().bold(),
        RunOutcome::Failed(e) => {
            tracing::error!(error = %e, step = e.step().unwrap_or("-"), "run failed");
            style(format!("Failed: {}", e)).red().bold()
        }
    };
    println!("\n{}\n{}\n{}\n", rule, status, rule);
    tracing::info!(
        events = report.events.len(),
        success = report.outcome.is_success(),
        "application finished"
    );

    Ok(report.outcome)
}

/// Process exit status for a run that got past setup.
///
/// A failed model call still reaches the completion path and exits 0; only a
/// caller-initiated cancellation exits non-zero.
pub fn exit_code(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Completed | RunOutcome::Failed(_) => 0,
        RunOutcome::Cancelled => 1,
    }
}

fn banner(agent: &Agent) {
    let rule = "=".repeat(80);
    println!("\n{}\n{}", rule, style(agent.name()).bold());
    if !agent.description().is_empty() {
        println!("{}", style(agent.description()).dim());
    }
    println!("{}", rule);
}

fn print_event(event: &Event) {
    println!("Agent: {}", style(&event.author).yellow());
    if !event.content.is_empty() {
        println!("Response:\n{}", event.content);
    }
}

/// Cancels `token` on Ctrl-C and, when set, once `deadline` has elapsed.
fn watch_for_cancellation(token: &CancellationToken, deadline: Option<Duration>) {
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    if let Some(deadline) = deadline {
        let on_deadline = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            tracing::warn!(deadline_secs = deadline.as_secs(), "deadline reached, cancelling run");
            on_deadline.cancel();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ModelError, PipelineError};

    #[test]
    fn failed_runs_exit_zero_and_cancelled_runs_do_not() {
        assert_eq!(exit_code(&RunOutcome::Completed), 0);

        let failed = RunOutcome::Failed(PipelineError::ModelInvocation {
            step: "OutlineAgent".into(),
            source: ModelError::EmptyResponse,
        });
        assert_eq!(exit_code(&failed), 0);

        assert_eq!(exit_code(&RunOutcome::Cancelled), 1);
    }
}
