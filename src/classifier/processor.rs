//! Email classifier — the top-level classify-and-respond entry point.
//!
//! **Core invariant: the caller always gets a well-formed result.**
//!
//! Flow:
//! 1. Build the prompt from the raw text
//! 2. Failover chain → first usable completion, or unavailable
//! 3. Parser → repaired result (unavailable skips straight to rules)
//! 4. Any internal failure → degraded Productive result

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, error, info};

use crate::classifier::normalizer::Normalizer;
use crate::classifier::parser::parse_completion;
use crate::classifier::prompt::build_classification_prompt;
use crate::classifier::rules::{PRODUCTIVE_RESPONSE, RuleClassifier};
use crate::classifier::types::{Classification, ClassificationResult};
use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::llm::{ChatMessage, CompletionRequest, FailoverChain};

/// Prefix of the reply used when classification itself broke.
pub const DEGRADED_RESPONSE_PREFIX: &str =
    "Ocorreu um erro ao processar a mensagem; utilizando a resposta padrão.";

/// Classifies messages and suggests replies.
pub struct EmailClassifier {
    chain: FailoverChain,
    rules: RuleClassifier,
    temperature: f64,
    max_tokens: u32,
}

impl EmailClassifier {
    /// Create a classifier with an explicit provider chain.
    pub fn new(chain: FailoverChain, rules: RuleClassifier) -> Self {
        let defaults = ClassifierConfig::default();
        Self {
            chain,
            rules,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    /// Create a classifier from configuration.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let chain = FailoverChain::from_config(config);
        let rules = RuleClassifier::new(Normalizer::new().with_stemming(config.stemming));
        info!(
            providers = ?chain.names(),
            stemming = config.stemming,
            "Email classifier ready"
        );
        Self {
            chain,
            rules,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// A classifier that never calls a provider.
    pub fn rule_only() -> Self {
        Self::new(FailoverChain::empty(), RuleClassifier::default())
    }

    pub fn rules(&self) -> &RuleClassifier {
        &self.rules
    }

    /// Classify a message and suggest a reply. Never fails.
    pub async fn classify_and_respond(&self, text: &str) -> ClassificationResult {
        let outcome = AssertUnwindSafe(self.try_classify(text))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ClassifyError::Panicked(panic_message(&*panic))));

        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Classification failed, returning default reply");
                degraded_result()
            }
        }
    }

    async fn try_classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        if self.chain.is_empty() || text.trim().is_empty() {
            debug!(
                providers = self.chain.len(),
                "Skipping generative providers, using rules"
            );
            return Ok(self.rules.classify(text));
        }

        let request = self.build_request(text);
        let result = match self.chain.attempt(&request).await {
            Ok(raw) => parse_completion(&raw, text, &self.rules),
            Err(unavailable) => {
                info!(reason = %unavailable, "Falling back to rule-based classification");
                self.rules.classify(text)
            }
        };

        result.validate()?;
        info!(
            classification = %result.classification,
            is_multiple = result.is_multiple,
            "Message classified"
        );
        Ok(result)
    }

    fn build_request(&self, text: &str) -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user(build_classification_prompt(text))])
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_json_output()
    }
}

/// Result returned when the pipeline itself failed.
pub fn degraded_result() -> ClassificationResult {
    ClassificationResult::single(
        Classification::Productive,
        format!("{DEGRADED_RESPONSE_PREFIX} {PRODUCTIVE_RESPONSE}"),
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
