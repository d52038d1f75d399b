//! Chat model provider clients.
//!
//! Implementations of the [`stategraph::ChatModel`] trait for the hosted
//! providers contentflow supports:
//!
//! - [`OpenAiClient`] — OpenAI chat completions API
//! - [`AnthropicClient`] — Anthropic messages API
//!
//! Both clients share [`ProviderConfig`] (key, endpoint, model, timeout) and
//! map HTTP failures onto [`stategraph::ChatError`] so the workflow layer can
//! make uniform retry decisions regardless of provider.

pub mod anthropic;
pub mod config;
mod http;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use config::{ProviderConfig, ANTHROPIC_BASE_URL, OPENAI_BASE_URL};
pub use openai::OpenAiClient;
