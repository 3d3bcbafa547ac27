//! CLI command definitions and handlers

use clap::Subcommand;

use crate::core::config::GatewayConfig;

/// Commands for the translation gateway
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP API server
    Serve {
        /// Bind address (default: HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (default: PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Translate a single text through the same cache and provider as the server
    Translate {
        /// Text to translate
        text: String,

        /// Target language, e.g. "French" or "pt-BR"
        #[arg(short, long)]
        target_lang: String,
    },
}

/// Handle server command
pub async fn handle_serve(
    mut config: GatewayConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    use crate::server::api::run_server;
    use tracing::info;

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    info!("Starting HTTP server on {}:{}", config.host, config.port);
    println!("🚀 Server starting on http://{}:{}", config.host, config.port);
    println!("📊 API Documentation: http://{}:{}/api-docs", config.host, config.port);

    run_server(config).await
}

/// Handle one-shot translate command
pub async fn handle_translate(
    config: GatewayConfig,
    text: String,
    target_lang: String,
) -> anyhow::Result<()> {
    use crate::core::models::TranslationRequest;
    use crate::core::pipeline::TranslationPipeline;
    use std::time::Instant;
    use tracing::info;

    let start_time = Instant::now();
    let pipeline = TranslationPipeline::from_config(&config).await?;
    let request = TranslationRequest::new(text, target_lang);

    let translated = pipeline.translate("cli", &request).await?;

    info!(
        "Translated in {:?} (cached: {})",
        start_time.elapsed(),
        translated.result.cached
    );
    println!("{}", translated.result.text);

    Ok(())
}
