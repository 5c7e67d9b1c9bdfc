use serde::{Deserialize, Serialize};
use std::fmt;

/// Base system prompt for avatar replies.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful digital avatar assistant representing a specific person. \
     Keep responses concise, engaging, and in character with your assigned personality. \
     Respond with empathy and personal warmth.";

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_primary_model() -> String {
    "gpt-4".to_string()
}

fn default_fallback_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_timeout_secs() -> u64 {
    60
}

/// Settings for chat-completion reply generation.
#[derive(Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Bearer key for the completion endpoint. Empty selects the offline
    /// scripted responder.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    /// Tried once when the primary model is rejected. Equal to the primary
    /// model to disable the retry.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for DialogueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("primary_model", &self.primary_model)
            .field("fallback_model", &self.fallback_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DialogueConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
