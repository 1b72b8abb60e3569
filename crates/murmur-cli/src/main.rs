//! CLI entry point - the composition root.
//!
//! Builds the speech configuration (defaults, then `MURMUR_TTS_*` from the
//! environment or a `.env` file, then flags), wires the pipeline and
//! dispatches to a handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use murmur_cli::{Cli, Commands, handlers};
use murmur_speech::SpeechConfig;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.speech.apply(SpeechConfig::from_env());
    tracing::debug!(endpoint = %config.endpoint(), voice = %config.voice, "Configuration resolved");

    let pipeline = handlers::build_pipeline(&config, cli.speech.volume)?;

    let outcome = match cli.command {
        Commands::Speak { texts, flush } => handlers::speak(&pipeline, &texts, flush).await,
        Commands::Stdin => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            handlers::speak_lines(&pipeline, stdin).await
        }
    };

    pipeline.shutdown().await;

    let spoken = outcome?;
    tracing::info!(spoken, "All utterances spoken");
    Ok(())
}
