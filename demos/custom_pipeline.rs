//! Builds a two-step pipeline in code and consumes its event stream by hand.
//!
//! Run with `GOOGLE_API_KEY` set:
//! `cargo run --example custom_pipeline`

use std::sync::Arc;
use std::time::Duration;

use blog_pipeline::api::{
    InMemorySessionStore, LlmClient, LlmStep, RunConfig, Runner, SequentialPipeline, SessionStore,
};
use blog_pipeline::core::config::ModelConfig;
use futures::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = ModelConfig::default().settings()?;

    let pipeline = SequentialPipeline::builder("ReleaseNotes")
        .agent(
            LlmStep::builder("Summarizer")
                .instruction("List the three most important points of the given text.")
                .output_key("summary")
                .build()?,
        )
        .agent(
            LlmStep::builder("Announcer")
                .instruction("Write a two-sentence announcement from these points: {{summary}}")
                .output_key("announcement")
                .build()?,
        )
        .build()?;

    let store = Arc::new(InMemorySessionStore::new());
    let runner = Runner::new("demo", pipeline, store.clone(), Arc::new(LlmClient::new(settings)));
    let session = runner.create_session("demo_user")?;

    let config = RunConfig::default().with_timeout(Duration::from_secs(60));
    let mut events = runner.run(
        "demo_user",
        session.id(),
        "Version 2 adds session isolation, cancellation and YAML pipelines.",
        config,
    );

    while let Some(event) = events.next().await {
        let event = event?;
        println!("[{}] wrote '{}':\n{}\n", event.author, event.output_key, event.content);
    }

    println!("Announcement from state:\n{}", store.get_string(&session.key, "announcement")?);
    Ok(())
}
