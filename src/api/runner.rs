//! Agents and the sequential pipeline that runs them in declaration order.

use std::collections::HashSet;

use futures::StreamExt;

use super::driver::InvocationContext;
use super::error::PipelineError;
use super::event::EventStream;
use super::step::LlmStep;

/// A runnable unit of a pipeline.
///
/// Leaf steps call the model; composites only order their children.
#[derive(Debug, Clone)]
pub enum Agent {
    Llm(LlmStep),
    Sequential(SequentialPipeline),
}

impl Agent {
    pub fn name(&self) -> &str {
        match self {
            Agent::Llm(step) => step.name(),
            Agent::Sequential(pipeline) => pipeline.name(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Agent::Llm(step) => step.description(),
            Agent::Sequential(pipeline) => pipeline.description(),
        }
    }

    /// Leaf steps in execution order.
    pub fn steps(&self) -> Vec<&LlmStep> {
        match self {
            Agent::Llm(step) => vec![step],
            Agent::Sequential(pipeline) => pipeline.steps(),
        }
    }

    /// State keys written by this agent, in execution order.
    pub fn output_keys(&self) -> Vec<&str> {
        self.steps().into_iter().map(LlmStep::output_key).collect()
    }

    /// Starts the agent. Nothing runs until the returned stream is polled.
    pub fn run<'a>(&'a self, ctx: &'a InvocationContext) -> EventStream<'a> {
        match self {
            Agent::Llm(step) => {
                let events: EventStream<'a> = Box::pin(async_stream::stream! {
                    if ctx.config.cancel.is_cancelled() {
                        yield Err(PipelineError::Cancelled {
                            step: Some(step.name().to_string()),
                        });
                    } else {
                        yield step.execute(ctx).await;
                    }
                });
                events
            }
            Agent::Sequential(pipeline) => pipeline.run(ctx),
        }
    }
}

impl From<LlmStep> for Agent {
    fn from(step: LlmStep) -> Self {
        Agent::Llm(step)
    }
}

impl From<SequentialPipeline> for Agent {
    fn from(pipeline: SequentialPipeline) -> Self {
        Agent::Sequential(pipeline)
    }
}

/// Ordered list of agents sharing one session state.
#[derive(Debug, Clone)]
pub struct SequentialPipeline {
    name: String,
    description: String,
    agents: Vec<Agent>,
}

impl SequentialPipeline {
    pub fn builder(name: impl Into<String>) -> SequentialPipelineBuilder {
        SequentialPipelineBuilder {
            name: name.into(),
            description: String::new(),
            agents: Vec::new(),
            check_dependencies: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn steps(&self) -> Vec<&LlmStep> {
        self.agents.iter().flat_map(Agent::steps).collect()
    }

    /// Runs every child in order and stops at the first error.
    ///
    /// Child `i + 1` is not started before child `i` has written its output
    /// and its event has been handed to the consumer. State written by
    /// completed children is left in place when a later child fails.
    pub fn run<'a>(&'a self, ctx: &'a InvocationContext) -> EventStream<'a> {
        Box::pin(async_stream::stream! {
            'agents: for agent in &self.agents {
                let mut events = agent.run(ctx);
                while let Some(item) = events.next().await {
                    let failed = item.is_err();
                    if let Err(err) = &item {
                        tracing::error!(
                            pipeline = %self.name,
                            agent = %agent.name(),
                            error = %err,
                            "pipeline aborted"
                        );
                    }
                    yield item;
                    if failed {
                        break 'agents;
                    }
                }
            }
        })
    }
}

/// Builder for [`SequentialPipeline`]; all validation happens in [`build`](Self::build).
pub struct SequentialPipelineBuilder {
    name: String,
    description: String,
    agents: Vec<Agent>,
    check_dependencies: bool,
}

impl SequentialPipelineBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a step or a nested pipeline.
    pub fn agent(mut self, agent: impl Into<Agent>) -> Self {
        self.agents.push(agent.into());
        self
    }

    /// Controls the ordering check. When disabled, a step placed before the
    /// producer of its input fails at run time with `MissingDependency`.
    pub fn check_dependencies(mut self, enabled: bool) -> Self {
        self.check_dependencies = enabled;
        self
    }

    pub fn build(self) -> Result<SequentialPipeline, PipelineError> {
        if self.agents.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "pipeline '{}' has no steps",
                self.name
            )));
        }

        let pipeline = SequentialPipeline {
            name: self.name,
            description: self.description,
            agents: self.agents,
        };

        let mut produced: HashSet<&str> = HashSet::new();
        for step in pipeline.steps() {
            if self.check_dependencies {
                let missing = step
                    .required_keys()
                    .into_iter()
                    .find(|k| !produced.contains(k));
                if let Some(key) = missing {
                    return Err(PipelineError::Configuration(format!(
                        "step '{}' requires '{}' but no earlier step produces it",
                        step.name(),
                        key
                    )));
                }
            }
            if !produced.insert(step.output_key()) {
                return Err(PipelineError::Configuration(format!(
                    "output key '{}' is declared by more than one step",
                    step.output_key()
                )));
            }
        }
        Ok(pipeline)
    }
}
