//! Defines the command-line interface structure using clap.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "blog-pipeline",
    version,
    about = "Outline, draft and edit a blog post with a sequential LLM pipeline"
)]
pub struct Cli {
    /// Log level: debug, info, error. Overrides RUST_LOG; info when neither is set
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Print the pipeline outputs from session state after the run
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "true|false")]
    pub agent_logger: bool,

    /// Blog prompt to process (defaults to a built-in sample)
    #[arg(long)]
    pub prompt: Option<String>,

    /// TOML file with a [model] table (backend, model, api_key_env, ...)
    #[arg(long, env = "BLOG_PIPELINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// YAML pipeline definition to run instead of the blog pipeline
    #[arg(long)]
    pub pipeline: Option<PathBuf>,

    /// Time budget for each model call, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Cancel the whole run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub deadline_secs: Option<u64>,
}
