//! Configuration for price-verifier.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default Gemini REST endpoint root.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Which key of the model response feeds `promo_details`.
///
/// The response schema asks for `promotion_details`, but the record has
/// historically been filled from a `promo` key that the schema never
/// produces, which leaves `promo_details` empty. Both behaviours are kept
/// selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoField {
    /// Read the `promo` key (absent from the schema).
    #[default]
    Promo,
    /// Read the `promotion_details` key requested by the prompt.
    PromotionDetails,
}

impl PromoField {
    /// The JSON key this variant reads.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Promo => "promo",
            Self::PromotionDetails => "promotion_details",
        }
    }
}

/// Verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Seconds a verified result stays in the cache.
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout_secs: u64,

    /// Default retry budget for [`PriceVerifier::verify`](crate::PriceVerifier::verify).
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Optional deadline for each individual model call.
    #[serde(default)]
    pub model_timeout_secs: Option<u64>,

    /// Model API root URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Response key used for `promo_details`.
    #[serde(default)]
    pub promo_field: PromoField,

    /// Retry backoff configuration.
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Primary model.
    #[serde(default = "ModelConfig::primary")]
    pub primary: ModelConfig,

    /// Secondary model.
    #[serde(default = "ModelConfig::secondary")]
    pub secondary: ModelConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Exponential backoff configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Base delay in seconds, multiplied by `2^attempt`.
    #[serde(default = "default_backoff_base")]
    pub base_secs: u64,

    /// Hard ceiling on any single delay, in seconds.
    #[serde(default = "default_backoff_max")]
    pub max_secs: u64,
}

/// Generation settings for one model instance.
///
/// Fixed per deployment; never varied per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Top-k sampling.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Maximum output tokens.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl ModelConfig {
    /// Default primary model settings.
    #[must_use]
    pub fn primary() -> Self {
        Self::named("gemini-2.0-flash")
    }

    /// Default secondary model settings.
    #[must_use]
    pub fn secondary() -> Self {
        Self::named("gemini-2.0-flash-lite")
    }

    /// Default sampling settings for the named model.
    #[must_use]
    pub fn named(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            cache_timeout_secs: default_cache_timeout(),
            retry_count: default_retry_count(),
            model_timeout_secs: None,
            api_base: default_api_base(),
            promo_field: PromoField::default(),
            backoff: BackoffConfig::default(),
            primary: ModelConfig::primary(),
            secondary: ModelConfig::secondary(),
            log_level: default_log_level(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_secs: default_backoff_base(),
            max_secs: default_backoff_max(),
        }
    }
}

const fn default_cache_timeout() -> u64 {
    3600 // 1 hour
}

const fn default_retry_count() -> u32 {
    2
}

const fn default_backoff_base() -> u64 {
    30
}

const fn default_backoff_max() -> u64 {
    300 // 5 minutes
}

const fn default_temperature() -> f32 {
    0.2
}

const fn default_top_p() -> f32 {
    0.2
}

const fn default_top_k() -> u32 {
    40
}

const fn default_max_output_tokens() -> u32 {
    400
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Location of the per-user configuration file, if the platform has one.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "price-verifier")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl VerifierConfig {
    /// Cache TTL as a [`Duration`].
    #[must_use]
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }

    /// Per-call model deadline, if configured.
    #[must_use]
    pub fn model_timeout(&self) -> Option<Duration> {
        self.model_timeout_secs.map(Duration::from_secs)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
