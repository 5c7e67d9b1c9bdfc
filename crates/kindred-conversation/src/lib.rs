//! Conversation state and dialogue generation for Kindred avatars.
//!
//! [`ConversationStore`] owns one [`ConversationContext`] per avatar id:
//! a capped, append-only turn history plus the user profile and persona.
//! [`DialogueStage`] records each user turn, asks a [`ReplyGenerator`] for a
//! reply using the full history as context, and records the reply. A failed
//! generation is recorded as [`FALLBACK_REPLY`], so the history always
//! reflects what the user actually heard.
//!
//! Exchanges for one avatar are serialized through [`ExchangeGuard`];
//! different avatars never wait on each other.

pub mod config;
pub mod dialogue;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod scripted;
pub mod store;

pub use config::{DialogueConfig, DEFAULT_SYSTEM_PROMPT};
pub use dialogue::{DialogueReply, DialogueStage, ReplyGenerator, FALLBACK_REPLY};
pub use error::DialogueError;
pub use openai::OpenAiChatGenerator;
pub use prompt::{build_system_prompt, ChatMessage, DialogueRequest};
pub use scripted::ScriptedGenerator;
pub use store::{ConversationContext, ConversationHandle, ConversationStore, ExchangeGuard};

use std::sync::Arc;

/// Picks the generator for `config`: the completion service when a key is
/// configured, the scripted responder otherwise.
pub fn generator_from_config(config: &DialogueConfig) -> Arc<dyn ReplyGenerator> {
    if config.has_api_key() {
        Arc::new(OpenAiChatGenerator::new(config.clone()))
    } else {
        tracing::info!("no dialogue API key configured, using scripted replies");
        Arc::new(ScriptedGenerator::new())
    }
}
