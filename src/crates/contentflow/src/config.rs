//! Workflow configuration.
//!
//! One validated [`WorkflowConfig`] drives all three workflows: provider
//! selection, per-phase model IDs, temperatures, token budgets, retry tuning,
//! and logging. Every field has a default except credentials.
//!
//! Callers supply a [`ConfigOverrides`] patch; [`WorkflowConfig::load`]
//! merges it over the defaults section by section (a supplied section
//! replaces its default wholesale) and validates the result.

use serde::{Deserialize, Serialize};
use stategraph::RetryPolicy;
use thiserror::Error;

/// Supported completion providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    /// Display name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }
}

/// Per-provider API credentials. The only part of the configuration with no
/// default; a missing key surfaces at execution time, not construction time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

/// Model identifier per workflow phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub analysis: String,
    pub generation: String,
    pub summarization: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            analysis: "gpt-4-turbo-preview".to_string(),
            generation: "gpt-4-turbo-preview".to_string(),
            summarization: "gpt-3.5-turbo".to_string(),
        }
    }
}

/// Sampling temperature per workflow phase, each in `0.0..=2.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureSettings {
    pub analysis: f32,
    pub generation: f32,
    pub summarization: f32,
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            analysis: 0.3,
            generation: 0.7,
            summarization: 0.2,
        }
    }
}

/// Completion token budget per workflow phase.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub analysis: u32,
    pub generation: u32,
    pub summarization: u32,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            analysis: 2000,
            generation: 4000,
            summarization: 1000,
        }
    }
}

/// Log verbosity levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Logging configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

/// The full workflow configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowConfig {
    pub provider: ProviderSetting,
    pub api_keys: ApiKeys,
    pub models: ModelSettings,
    pub temperature: TemperatureSettings,
    pub max_tokens: TokenSettings,
    pub retry: RetryPolicy,
    pub logging: LoggingConfig,
}

/// Wrapper giving the provider field a default of OpenAI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderSetting(pub Provider);

impl Default for ProviderSetting {
    fn default() -> Self {
        Self(Provider::OpenAi)
    }
}

/// Partial configuration patch; supplied sections replace their defaults
/// wholesale.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    pub provider: Option<Provider>,
    pub api_keys: Option<ApiKeys>,
    pub models: Option<ModelSettings>,
    pub temperature: Option<TemperatureSettings>,
    pub max_tokens: Option<TokenSettings>,
    pub retry: Option<RetryPolicy>,
    pub logging: Option<LoggingConfig>,
}

/// Configuration validation failures.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{phase} temperature {value} is outside the allowed range 0.0..=2.0")]
    TemperatureOutOfRange { phase: &'static str, value: f32 },

    #[error("backoff multiplier {0} must be at least 1.0")]
    InvalidBackoffMultiplier(f64),
}

impl WorkflowConfig {
    /// Build a configuration from defaults plus the given overrides.
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::default().merged(overrides)
    }

    /// Merge overrides onto this configuration, section by section, and
    /// validate the result.
    pub fn merged(&self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let merged = Self {
            provider: overrides
                .provider
                .map(ProviderSetting)
                .unwrap_or(self.provider),
            api_keys: overrides.api_keys.unwrap_or_else(|| self.api_keys.clone()),
            models: overrides.models.unwrap_or_else(|| self.models.clone()),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            max_tokens: overrides.max_tokens.unwrap_or(self.max_tokens),
            retry: overrides.retry.unwrap_or_else(|| self.retry.clone()),
            logging: overrides.logging.unwrap_or(self.logging),
        };
        merged.validate()?;
        Ok(merged)
    }

    /// The configured provider.
    pub fn provider(&self) -> Provider {
        self.provider.0
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let temps = [
            ("analysis", self.temperature.analysis),
            ("generation", self.temperature.generation),
            ("summarization", self.temperature.summarization),
        ];
        for (phase, value) in temps {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::TemperatureOutOfRange { phase, value });
            }
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier(
                self.retry.backoff_multiplier,
            ));
        }
        Ok(())
    }
}
