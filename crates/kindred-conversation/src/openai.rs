//! Chat-completion reply generation over HTTP.

use crate::config::DialogueConfig;
use crate::dialogue::ReplyGenerator;
use crate::error::DialogueError;
use crate::prompt::DialogueRequest;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Largest error body kept from a failed response.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generates replies through an OpenAI-compatible `/chat/completions`
/// endpoint, retrying once on the fallback model when the primary model is
/// rejected.
#[derive(Debug, Clone)]
pub struct OpenAiChatGenerator {
    config: DialogueConfig,
    client: Client,
}

impl OpenAiChatGenerator {
    pub fn new(config: DialogueConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Builds the request body for `model`.
    pub fn request_body(&self, model: &str, request: &DialogueRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(json!({ "role": "system", "content": request.system_prompt }));
        messages.extend(request.messages.iter().map(|m| {
            json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        json!({
            "model": model,
            "messages": messages,
            "temperature": self.config.temperature.clamp(0.0, 2.0),
            "max_tokens": self.config.max_tokens,
        })
    }

    async fn complete(&self, model: &str, request: &DialogueRequest) -> Result<String, DialogueError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&self.request_body(model, request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            return Err(DialogueError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| DialogueError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DialogueError::InvalidResponse("no choices in response".to_string()))?;

        if content.trim().is_empty() {
            return Err(DialogueError::EmptyReply);
        }
        Ok(content)
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiChatGenerator {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, request: &DialogueRequest) -> Result<String, DialogueError> {
        if !self.config.has_api_key() {
            return Err(DialogueError::MissingApiKey("openai"));
        }

        debug!(
            avatar_id = %request.avatar_id,
            model = %self.config.primary_model,
            messages = request.messages.len(),
            "requesting chat completion"
        );

        match self.complete(&self.config.primary_model, request).await {
            Err(DialogueError::Status { status, body })
                if self.config.fallback_model != self.config.primary_model
                    && status != StatusCode::UNAUTHORIZED.as_u16() =>
            {
                warn!(
                    status,
                    primary = %self.config.primary_model,
                    fallback = %self.config.fallback_model,
                    "primary model rejected, retrying with fallback model"
                );
                debug!(body = %body, "primary model error body");
                self.complete(&self.config.fallback_model, request).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ChatMessage;
    use kindred_types::{PersonaTraits, Role};

    fn request() -> DialogueRequest {
        DialogueRequest {
            avatar_id: "a".to_string(),
            system_prompt: "Be kind.".to_string(),
            messages: vec![
                ChatMessage {
                    role: Role::User,
                    content: "hello".to_string(),
                },
                ChatMessage {
                    role: Role::Assistant,
                    content: "hi!".to_string(),
                },
                ChatMessage {
                    role: Role::User,
                    content: "how are you".to_string(),
                },
            ],
            persona: PersonaTraits::default(),
        }
    }

    #[test]
    fn body_carries_system_prompt_and_full_history() {
        let generator = OpenAiChatGenerator::new(DialogueConfig::default());
        let body = generator.request_body("gpt-4", &request());

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 512);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Be kind.");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "how are you");
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let generator = OpenAiChatGenerator::new(DialogueConfig::default());
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(matches!(err, DialogueError::MissingApiKey("openai")));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let config = DialogueConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let generator = OpenAiChatGenerator::new(config);
        assert!(generator.generate(&request()).await.is_err());
    }
}
