//! LLM integration.
//!
//! Supports:
//! - **OpenAI**: Chat Completions via rig-core, with JSON mode
//! - **Anthropic**: Messages API via rig-core
//!
//! rig-core handles HTTP transport; `RigAdapter` bridges rig's
//! `CompletionModel` to our `LlmProvider` trait. [`FailoverChain`] tries the
//! providers in configured order.

pub mod failover;
pub mod provider;
mod rig_adapter;

pub use failover::{FailoverChain, RawCompletion, Unavailable, call_provider};
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};

use crate::config::ProviderConfig;
use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi,
    Anthropic,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// The backend used as fallback for this one.
    pub fn other(&self) -> Self {
        match self {
            Self::OpenAi => Self::Anthropic,
            Self::Anthropic => Self::OpenAi,
        }
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(
    config: &ProviderConfig,
    timeout: Duration,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::OpenAi => create_openai_provider(config, timeout),
        LlmBackend::Anthropic => create_anthropic_provider(config, timeout),
    }
}

fn require_key(config: &ProviderConfig) -> Result<&SecretString, LlmError> {
    config
        .api_key
        .as_ref()
        .ok_or_else(|| LlmError::MissingCredential {
            provider: config.backend.as_str().to_string(),
        })
}

fn create_openai_provider(
    config: &ProviderConfig,
    timeout: Duration,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let api_key = require_key(config)?;
    // rig's OpenAI base URL includes the API version segment.
    let base_url = format!("{}/v1", config.base_url.trim_end_matches('/'));

    let client = <openai::Client>::builder()
        .api_key(api_key.expose_secret())
        .base_url(&base_url)
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: "openai".to_string(),
            reason: format!("Failed to create OpenAI client: {}", e),
        })?
        .completions_api();

    let model = client.completion_model(&config.model_id);
    tracing::debug!(model = %config.model_id, base_url = %base_url, "Created OpenAI provider");
    let adapter = RigAdapter::new(model, "openai", &config.model_id, timeout)
        .with_json_params(serde_json::json!({ "response_format": { "type": "json_object" } }));
    Ok(Arc::new(adapter))
}

fn create_anthropic_provider(
    config: &ProviderConfig,
    timeout: Duration,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::anthropic;

    let api_key = require_key(config)?;
    let base_url = config.base_url.trim_end_matches('/').to_string();

    let client = <anthropic::Client>::builder()
        .api_key(api_key.expose_secret())
        .base_url(&base_url)
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: "anthropic".to_string(),
            reason: format!("Failed to create Anthropic client: {}", e),
        })?;

    // The Messages API has no JSON mode; the prompt alone asks for JSON.
    let model = client.completion_model(&config.model_id);
    tracing::debug!(model = %config.model_id, base_url = %base_url, "Created Anthropic provider");
    Ok(Arc::new(RigAdapter::new(
        model,
        "anthropic",
        &config.model_id,
        timeout,
    )))
}
