//! Bridges rig's `CompletionModel` to our [`LlmProvider`] trait.
//!
//! rig owns the wire format of each provider. The adapter maps our
//! request onto rig's builder, bounds the call with a timeout, and flattens
//! the text content of the answer.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel, Message};
use serde_json::Value;

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role,
};

/// A rig completion model behind the `LlmProvider` interface.
pub struct RigAdapter<M> {
    model: M,
    provider: &'static str,
    model_name: String,
    timeout: Duration,
    json_params: Option<Value>,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, provider: &'static str, model_name: &str, timeout: Duration) -> Self {
        Self {
            model,
            provider,
            model_name: model_name.to_string(),
            timeout,
            json_params: None,
        }
    }

    /// Provider-specific parameters merged into requests that ask for JSON.
    pub fn with_json_params(mut self, params: Value) -> Self {
        self.json_params = Some(params);
        self
    }
}

/// Our message list in the shape rig's builder takes.
#[derive(Debug, PartialEq, Eq)]
struct PromptParts {
    preamble: Option<String>,
    history: Vec<String>,
    prompt: String,
}

/// System messages become the preamble, the last user message the prompt.
/// Returns `None` when there is no user message.
fn split_messages(messages: &[ChatMessage]) -> Option<PromptParts> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let mut user: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .collect();
    let prompt = user.pop()?;

    Some(PromptParts {
        preamble: (!system.is_empty()).then(|| system.join("\n\n")),
        history: user,
        prompt,
    })
}

fn saturating_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn name(&self) -> &str {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let parts = split_messages(&request.messages).ok_or_else(|| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: "request has no user message".to_string(),
        })?;

        let mut builder = self
            .model
            .completion_request(Message::user(parts.prompt))
            .messages(parts.history.into_iter().map(Message::user).collect());
        if let Some(preamble) = parts.preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }
        if request.json_output
            && let Some(params) = &self.json_params
        {
            builder = builder.additional_params(params.clone());
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.provider.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: e.to_string(),
            })?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();
        if content.is_empty() {
            return Err(LlmError::EmptyCompletion {
                provider: self.provider.to_string(),
            });
        }

        Ok(CompletionResponse {
            content,
            input_tokens: saturating_u32(response.usage.input_tokens),
            output_tokens: saturating_u32(response.usage.output_tokens),
        })
    }
}
