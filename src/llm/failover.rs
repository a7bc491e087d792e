//! Ordered provider fallback.
//!
//! Providers are tried in order until one yields non-blank text. Every
//! provider failure is logged and folded into [`Unavailable`]; nothing is
//! retried beyond moving to the next provider.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ClassifierConfig;
use crate::llm::create_provider;
use crate::llm::provider::{CompletionRequest, LlmProvider};

/// Opaque completion text. May be JSON, JSON inside prose, or garbage.
pub type RawCompletion = String;

/// No provider produced usable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no generative provider produced a completion")]
pub struct Unavailable;

/// Call a single provider, converting every failure into `Unavailable`.
pub async fn call_provider(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
) -> Result<RawCompletion, Unavailable> {
    match provider.complete(request).await {
        Ok(response) if response.content.trim().is_empty() => {
            warn!(provider = provider.name(), "Provider returned blank completion");
            Err(Unavailable)
        }
        Ok(response) => {
            debug!(
                provider = provider.name(),
                model = provider.model_name(),
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                "Provider completion received"
            );
            Ok(response.content)
        }
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Provider unavailable");
            Err(Unavailable)
        }
    }
}

/// Providers in priority order.
#[derive(Clone, Default)]
pub struct FailoverChain {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl FailoverChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    /// An empty chain; every attempt is `Unavailable`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the chain from configuration. Providers without a key are left
    /// out; rule-only mode yields an empty chain.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mut providers = Vec::new();
        for provider_config in config.provider_order() {
            let name = provider_config.backend.as_str();
            if !provider_config.has_credential() {
                debug!(provider = name, "No API key configured, skipping provider");
                continue;
            }
            match create_provider(provider_config, config.request_timeout) {
                Ok(provider) => {
                    info!(
                        provider = name,
                        model = %provider_config.model_id,
                        position = providers.len() + 1,
                        "Provider enabled"
                    );
                    providers.push(provider);
                }
                Err(e) => warn!(provider = name, error = %e, "Could not create provider"),
            }
        }
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Provider names in attempt order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Try each provider once, in order, returning the first usable completion.
    pub async fn attempt(&self, request: &CompletionRequest) -> Result<RawCompletion, Unavailable> {
        for provider in &self.providers {
            if let Ok(raw) = call_provider(provider.as_ref(), request.clone()).await {
                return Ok(raw);
            }
        }
        Err(Unavailable)
    }
}
