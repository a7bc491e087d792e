//! Error types for the email triage engine.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
///
/// None of these reach the caller of `classify_and_respond`: the failover
/// layer logs them and turns them into [`crate::llm::Unavailable`].
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("No API key configured for provider {provider}")]
    MissingCredential { provider: String },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} returned an empty completion")]
    EmptyCompletion { provider: String },
}

/// Internal failures detected while building a classification.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Result violates invariant: {0}")]
    InvalidResult(String),

    #[error("Classification pipeline panicked: {0}")]
    Panicked(String),
}

/// Errors from the raw-text input collaborator.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("No file or text provided")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
