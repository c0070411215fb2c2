//! A single LLM-backed pipeline step.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::driver::InvocationContext;
use super::error::{PipelineError, StoreError};
use super::event::Event;
use super::llm_bridge::GenerateRequest;
use super::store::value_to_text;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"));

/// One named unit: reads its input from state, calls the model, writes its output.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmStep {
    name: String,
    description: String,
    instruction: String,
    input_key: Option<String>,
    output_key: String,
}

impl LlmStep {
    /// Starts a builder for a step with the given name.
    pub fn builder(name: impl Into<String>) -> LlmStepBuilder {
        LlmStepBuilder {
            name: name.into(),
            description: String::new(),
            instruction: String::new(),
            input_key: None,
            output_key: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_key(&self) -> Option<&str> {
        self.input_key.as_deref()
    }

    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// State keys this step reads: its input key plus any `{{key}}` placeholders.
    pub fn required_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.input_key.as_deref().into_iter().collect();
        for caps in PLACEHOLDER.captures_iter(&self.instruction) {
            if let Some(m) = caps.get(1) {
                if !keys.contains(&m.as_str()) {
                    keys.push(m.as_str());
                }
            }
        }
        keys
    }

    /// Runs the step against the session in `ctx`.
    ///
    /// On success exactly one state entry (the output key) is written and the
    /// completion event is returned. Nothing is written on failure.
    pub async fn execute(&self, ctx: &InvocationContext) -> Result<Event, PipelineError> {
        let mut vars = HashMap::new();
        for key in self.required_keys() {
            let value = self.read_dependency(ctx, key)?;
            vars.insert(key.to_string(), value);
        }

        let request = GenerateRequest {
            system_instruction: render_template(&self.instruction, &vars),
            user_context: self.user_context(&ctx.user_input, &vars),
            timeout: ctx.config.timeout,
        };

        tracing::info!(
            step = %self.name,
            description = %self.description,
            output_key = %self.output_key,
            "step started"
        );
        tracing::debug!(
            step = %self.name,
            instruction = %request.system_instruction,
            "model request"
        );

        let text = tokio::select! {
            biased;
            _ = ctx.config.cancel.cancelled() => {
                return Err(PipelineError::Cancelled { step: Some(self.name.clone()) });
            }
            result = ctx.model.generate(&request) => {
                result.map_err(|source| PipelineError::ModelInvocation {
                    step: self.name.clone(),
                    source,
                })?
            }
        };

        ctx.store
            .set(&ctx.session, &self.output_key, Value::String(text.clone()))?;
        tracing::info!(
            step = %self.name,
            output_key = %self.output_key,
            length = text.len(),
            "step completed"
        );

        Ok(Event::new(ctx.invocation_id, &self.name, &self.output_key, text))
    }

    fn read_dependency(
        &self,
        ctx: &InvocationContext,
        key: &str,
    ) -> Result<String, PipelineError> {
        match ctx.store.get(&ctx.session, key) {
            Ok(value) => Ok(value_to_text(value)),
            Err(StoreError::KeyNotFound { .. }) => Err(PipelineError::MissingDependency {
                step: self.name.clone(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn user_context(&self, user_input: &str, vars: &HashMap<String, String>) -> String {
        let dependency = self
            .input_key
            .as_deref()
            .and_then(|k| vars.get(k).map(|v| (k, v)));
        match dependency {
            Some((key, value)) => format!("{}\n\n--- {} ---\n{}", user_input, key, value),
            None => user_input.to_string(),
        }
    }
}

/// Builder for [`LlmStep`].
pub struct LlmStepBuilder {
    name: String,
    description: String,
    instruction: String,
    input_key: Option<String>,
    output_key: Option<String>,
}

impl LlmStepBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Declares the state key this step expects an earlier step to have written.
    pub fn input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = Some(key.into());
        self
    }

    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn build(self) -> Result<LlmStep, PipelineError> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "step name must not be empty".to_string(),
            ));
        }
        let output_key = match self.output_key {
            Some(k) if !k.trim().is_empty() => k,
            _ => {
                return Err(PipelineError::Configuration(format!(
                    "step '{}' has no output key",
                    self.name
                )))
            }
        };
        if self.input_key.as_deref() == Some(output_key.as_str()) {
            return Err(PipelineError::Configuration(format!(
                "step '{}' reads and writes the same key '{}'",
                self.name, output_key
            )));
        }

        Ok(LlmStep {
            name: self.name,
            description: self.description,
            instruction: self.instruction,
            input_key: self.input_key.filter(|k| !k.trim().is_empty()),
            output_key,
        })
    }
}

/// Replaces `{{key}}` placeholders with values from `vars`.
fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
