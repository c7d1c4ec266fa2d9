//! Command-line interface definition.

use clap::{Parser, ValueEnum};
use price_verifier::config::{default_config_path, VerifierConfig};
use price_verifier::prompt::verification_prompt;
use price_verifier::PlanDescriptor;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Verify an advertised internet plan price against the provider's page.
#[derive(Parser, Debug)]
#[command(name = "price-verifier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provider page to verify against.
    #[arg(long)]
    pub url: String,

    /// Plan name as advertised by the provider.
    #[arg(long)]
    pub plan_name: String,

    /// Advertised download speed in Mbps.
    #[arg(long)]
    pub download: u32,

    /// Advertised upload speed in Mbps.
    #[arg(long)]
    pub upload: u32,

    /// Advertised monthly price.
    #[arg(long)]
    pub price: Option<f64>,

    /// Number of attempts before giving up.
    #[arg(long, env = "PRICE_VERIFIER_RETRY_COUNT")]
    pub retry_count: Option<u32>,

    /// Correlation id for tracing (defaults to the request id).
    #[arg(long)]
    pub correlation_id: Option<String>,

    /// Path to configuration file.
    #[arg(long, short, env = "PRICE_VERIFIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Deadline in seconds for each model call.
    #[arg(long, env = "PRICE_VERIFIER_MODEL_TIMEOUT")]
    pub model_timeout: Option<u64>,

    /// Log level (overrides the config file).
    #[arg(long, env = "PRICE_VERIFIER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text", env = "PRICE_VERIFIER_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Write the effective configuration to this path and exit.
    #[arg(long)]
    pub write_config: Option<PathBuf>,

    /// Print the rendered prompt and exit without calling any model.
    #[arg(long)]
    pub print_prompt: bool,
}

/// Log format CLI enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// The plan described by the arguments.
    pub fn plan(&self) -> PlanDescriptor {
        PlanDescriptor::new(&self.plan_name, self.download, self.upload, self.price)
    }

    /// Build the effective configuration.
    ///
    /// Starts from `--config`, or the per-user config file when it exists,
    /// then applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<VerifierConfig> {
        let path = self
            .config
            .clone()
            .or_else(|| default_config_path().filter(|p| p.exists()));

        let mut config = match path {
            Some(ref path) => VerifierConfig::from_file(path)?,
            None => VerifierConfig::default(),
        };

        if let Some(retry_count) = self.retry_count {
            config.retry_count = retry_count;
        }
        if let Some(secs) = self.model_timeout {
            config.model_timeout_secs = Some(secs);
        }
        if let Some(ref level) = self.log_level {
            config.log_level.clone_from(level);
        }

        Ok(config)
    }

    /// Handle `--write-config` and `--print-prompt`.
    ///
    /// Returns `true` when one of them ran, in which case no model is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file or `out` cannot be written.
    pub fn run_offline(
        &self,
        config: &VerifierConfig,
        out: &mut impl Write,
    ) -> color_eyre::Result<bool> {
        if let Some(ref path) = self.write_config {
            config.to_file(path)?;
            info!("Configuration written to {}", path.display());
            return Ok(true);
        }

        if self.print_prompt {
            writeln!(out, "{}", verification_prompt(&self.url, self.download))?;
            return Ok(true);
        }

        Ok(false)
    }
}
