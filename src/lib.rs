pub mod agents;
pub mod api;
pub mod cli;
pub mod commands;
pub mod core;

pub use api::{
    Agent, Event, InMemorySessionStore, LlmStep, ModelClient, PipelineError, RunConfig,
    RunOutcome, Runner, SequentialPipeline, SessionStore, StoreError,
};
