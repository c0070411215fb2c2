//! Pipeline core: session state, steps, the sequential runner and its driver.

mod driver;
mod error;
mod event;
mod llm_bridge;
mod runner;
mod step;
mod store;

pub use driver::{InvocationContext, RunConfig, RunOutcome, RunReport, Runner};
pub use error::{ModelError, PipelineError, StoreError};
pub use event::{Event, EventStream};
pub use llm_bridge::{GenerateRequest, LlmClient, LlmSettings, ModelClient};
pub use runner::{Agent, SequentialPipeline, SequentialPipelineBuilder};
pub use step::{LlmStep, LlmStepBuilder};
pub use store::{value_to_text, InMemorySessionStore, Session, SessionKey, SessionStore, State};
