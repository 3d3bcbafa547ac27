//! Main entry point for the translation gateway CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use translation_gateway::cli::commands::{self, Commands};
use translation_gateway::GatewayConfig;

/// Translation gateway - cached, rate-limited translations over HTTP
#[derive(Parser, Debug)]
#[command(name = "translation-gateway", version, about, long_about = None)]
struct Args {
    /// API key for Gemini (optional, defaults to GEMINI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Redis URL for the shared cache (optional, defaults to REDIS_URL env var)
    #[arg(long)]
    redis_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("translation_gateway={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = GatewayConfig::from_env()?;

    // Override config with CLI args if provided
    if let Some(api_key) = args.api_key {
        config.api_key = api_key;
    }
    if let Some(redis_url) = args.redis_url {
        config.redis_url = Some(redis_url);
    }

    match args.command {
        Some(Commands::Serve { host, port }) => {
            config.validate()?;
            commands::handle_serve(config, host, port).await?;
        }
        Some(Commands::Translate { text, target_lang }) => {
            config.validate()?;
            commands::handle_translate(config, text, target_lang).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
