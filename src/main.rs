use blog_pipeline::cli::Cli;
use blog_pipeline::commands;
use blog_pipeline::core::logging;
use clap::Parser;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    logging::init(cli.log_level.as_deref().map(logging::parse_level));
    tracing::info!(
        log_level = cli.log_level.as_deref().unwrap_or("-"),
        agent_logger = cli.agent_logger,
        "starting blog pipeline"
    );
    tracing::debug!("debug logging enabled");

    match commands::run::run(&cli).await {
        Ok(outcome) => {
            let code = commands::run::exit_code(&outcome);
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal initialization error");
            eprintln!("• {}", e);
            std::process::exit(1);
        }
    }
}
