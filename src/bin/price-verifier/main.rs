//! price-verifier CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, LogFormat};
use color_eyre::eyre::eyre;
use price_verifier::PriceVerifier;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Build configuration
    let config = cli.to_config()?;

    // Initialize tracing on stderr so stdout carries only the record
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    info!("price-verifier v{}", env!("CARGO_PKG_VERSION"));

    if cli.run_offline(&config, &mut std::io::stdout())? {
        return Ok(());
    }

    let api_key = cli
        .api_key
        .as_deref()
        .ok_or_else(|| eyre!("an API key is required (--api-key or GOOGLE_API_KEY)"))?;
    let verifier = PriceVerifier::from_config(&config, api_key)?;

    let record = verifier
        .verify_price(
            &cli.url,
            &cli.plan(),
            config.retry_count,
            cli.correlation_id.as_deref(),
        )
        .await;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
