//! Configuration types.
//!
//! Built once at startup from the environment and handed to the classifier
//! by value. Nothing mutates it afterwards.

use std::time::Duration;

use secrecy::SecretString;
use tracing::warn;

use crate::error::ConfigError;
use crate::llm::LlmBackend;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Which classification path the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSelection {
    /// Try this backend first, then the other one.
    Llm(LlmBackend),
    /// Never call a generative provider.
    RuleOnly,
}

impl ProviderSelection {
    /// Parse an `LLM_PROVIDER` value. Returns `None` for unknown names.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "provider_a" => Some(Self::Llm(LlmBackend::OpenAi)),
            "anthropic" | "provider_b" => Some(Self::Llm(LlmBackend::Anthropic)),
            "rule_only" | "rules" | "none" => Some(Self::RuleOnly),
            _ => None,
        }
    }
}

impl Default for ProviderSelection {
    fn default() -> Self {
        Self::Llm(LlmBackend::OpenAi)
    }
}

/// Connection settings for one generative provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub backend: LlmBackend,
    /// `None` when the key is unset or blank.
    pub api_key: Option<SecretString>,
    pub model_id: String,
    /// Scheme and host, without the API path.
    pub base_url: String,
}

impl ProviderConfig {
    /// OpenAI settings with defaults and no key.
    pub fn openai() -> Self {
        Self {
            backend: LlmBackend::OpenAi,
            api_key: None,
            model_id: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    /// Anthropic settings with defaults and no key.
    pub fn anthropic() -> Self {
        Self {
            backend: LlmBackend::Anthropic,
            api_key: None,
            model_id: DEFAULT_ANTHROPIC_MODEL.to_string(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_id = model.into();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Classifier configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub selection: ProviderSelection,
    pub openai: ProviderConfig,
    pub anthropic: ProviderConfig,
    /// Upper bound on a single provider call.
    pub request_timeout: Duration,
    /// Completion length bound sent to the provider.
    pub max_tokens: u32,
    /// Sampling temperature sent to the provider.
    pub temperature: f64,
    /// Apply the Portuguese stemmer during normalization.
    pub stemming: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            selection: ProviderSelection::default(),
            openai: ProviderConfig::openai(),
            anthropic: ProviderConfig::anthropic(),
            request_timeout: Duration::from_secs(30),
            max_tokens: 512,
            temperature: 0.2,
            stemming: false,
        }
    }
}

impl ClassifierConfig {
    /// A configuration that never calls a provider.
    pub fn rule_only() -> Self {
        Self {
            selection: ProviderSelection::RuleOnly,
            ..Self::default()
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let selection = match get("LLM_PROVIDER") {
            Some(raw) => ProviderSelection::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown LLM_PROVIDER, using default");
                ProviderSelection::default()
            }),
            None => ProviderSelection::default(),
        };

        let mut openai = ProviderConfig::openai();
        openai.api_key = get("OPENAI_API_KEY").map(SecretString::from);
        if let Some(model) = get("OPENAI_MODEL") {
            openai.model_id = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            openai.base_url = url;
        }

        let mut anthropic = ProviderConfig::anthropic();
        anthropic.api_key = get("ANTHROPIC_API_KEY").map(SecretString::from);
        if let Some(model) = get("ANTHROPIC_MODEL") {
            anthropic.model_id = model;
        }
        if let Some(url) = get("ANTHROPIC_BASE_URL") {
            anthropic.base_url = url;
        }

        let defaults = Self::default();

        let request_timeout = match get("LLM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = parse_value("LLM_TIMEOUT_SECS", &raw)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "LLM_TIMEOUT_SECS".into(),
                        message: "must be greater than zero".into(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        let max_tokens = match get("LLM_MAX_TOKENS") {
            Some(raw) => parse_value("LLM_MAX_TOKENS", &raw)?,
            None => defaults.max_tokens,
        };

        let temperature = match get("LLM_TEMPERATURE") {
            Some(raw) => {
                let t: f64 = parse_value("LLM_TEMPERATURE", &raw)?;
                if !(0.0..=2.0).contains(&t) {
                    return Err(ConfigError::InvalidValue {
                        key: "LLM_TEMPERATURE".into(),
                        message: format!("{t} is outside 0.0..=2.0"),
                    });
                }
                t
            }
            None => defaults.temperature,
        };

        let stemming = get("NORMALIZER_STEMMING")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(Self {
            selection,
            openai,
            anthropic,
            request_timeout,
            max_tokens,
            temperature,
            stemming,
        })
    }

    /// Settings for one backend.
    pub fn provider(&self, backend: LlmBackend) -> &ProviderConfig {
        match backend {
            LlmBackend::OpenAi => &self.openai,
            LlmBackend::Anthropic => &self.anthropic,
        }
    }

    /// Providers in the order they should be tried: primary, then fallback.
    /// Empty in rule-only mode.
    pub fn provider_order(&self) -> Vec<&ProviderConfig> {
        match self.selection {
            ProviderSelection::RuleOnly => Vec::new(),
            ProviderSelection::Llm(primary) => {
                vec![self.provider(primary), self.provider(primary.other())]
            }
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ClassifierConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.selection, ProviderSelection::Llm(LlmBackend::OpenAi));
        assert!(!config.openai.has_credential());
        assert!(!config.anthropic.has_credential());
        assert_eq!(config.openai.model_id, "gpt-4o-mini");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_tokens, 512);
        assert!((config.temperature - 0.2).abs() < f64::EPSILON);
        assert!(!config.stemming);
    }

    #[test]
    fn reads_provider_settings() {
        let config = ClassifierConfig::from_lookup(lookup(&[
            ("LLM_PROVIDER", "anthropic"),
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("ANTHROPIC_MODEL", "claude-test"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://127.0.0.1:9999"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("NORMALIZER_STEMMING", "true"),
        ]))
        .unwrap();

        assert_eq!(
            config.selection,
            ProviderSelection::Llm(LlmBackend::Anthropic)
        );
        assert_eq!(
            config.anthropic.api_key.as_ref().unwrap().expose_secret(),
            "sk-ant-test"
        );
        assert_eq!(config.anthropic.model_id, "claude-test");
        assert_eq!(config.openai.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.stemming);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config =
            ClassifierConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap();
        assert!(!config.openai.has_credential());
    }

    #[test]
    fn unknown_provider_falls_back_to_default() {
        let config =
            ClassifierConfig::from_lookup(lookup(&[("LLM_PROVIDER", "mistral")])).unwrap();
        assert_eq!(config.selection, ProviderSelection::default());
    }

    #[test]
    fn provider_aliases() {
        assert_eq!(
            ProviderSelection::parse("provider_a"),
            Some(ProviderSelection::Llm(LlmBackend::OpenAi))
        );
        assert_eq!(
            ProviderSelection::parse("Provider_B"),
            Some(ProviderSelection::Llm(LlmBackend::Anthropic))
        );
        assert_eq!(
            ProviderSelection::parse("rule_only"),
            Some(ProviderSelection::RuleOnly)
        );
        assert_eq!(ProviderSelection::parse("gemini"), None);
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = ClassifierConfig::from_lookup(lookup(&[("LLM_MAX_TOKENS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("LLM_MAX_TOKENS"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(ClassifierConfig::from_lookup(lookup(&[("LLM_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        assert!(ClassifierConfig::from_lookup(lookup(&[("LLM_TEMPERATURE", "3.5")])).is_err());
    }

    #[test]
    fn provider_order_primary_first() {
        let mut config = ClassifierConfig::default();
        config.selection = ProviderSelection::Llm(LlmBackend::Anthropic);
        let order: Vec<LlmBackend> = config.provider_order().iter().map(|p| p.backend).collect();
        assert_eq!(order, vec![LlmBackend::Anthropic, LlmBackend::OpenAi]);
    }

    #[test]
    fn rule_only_has_no_providers() {
        assert!(ClassifierConfig::rule_only().provider_order().is_empty());
    }
}
