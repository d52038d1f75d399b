//! Provider client configuration.

use std::time::Duration;

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Anthropic API base URL.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Configuration shared by the provider clients: credentials, endpoint,
/// model, and request timeout.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// API key sent with every request.
    pub api_key: String,
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Model identifier, e.g. `gpt-4-turbo-preview` or `claude-3-opus-20240229`.
    pub model: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Create a configuration with the default 60 s timeout.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Configuration pointed at the public OpenAI endpoint.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(api_key, OPENAI_BASE_URL, model)
    }

    /// Configuration pointed at the public Anthropic endpoint.
    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(api_key, ANTHROPIC_BASE_URL, model)
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = ProviderConfig::new("key", "https://api.example.com/v1/", "model");
        assert_eq!(config.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn provider_defaults() {
        let config = ProviderConfig::openai("key", "gpt-4-turbo-preview");
        assert_eq!(config.base_url, OPENAI_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }
}
