use crate::config::DEFAULT_SYSTEM_PROMPT;
use crate::error::DialogueError;
use crate::prompt::DialogueRequest;
use crate::store::{ConversationStore, ExchangeGuard};
use async_trait::async_trait;
use kindred_types::Role;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reply recorded when generation fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an issue while processing your request.";

/// A text-generation capability.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Produces the avatar's reply to the last user message in `request`.
    async fn generate(&self, request: &DialogueRequest) -> Result<String, DialogueError>;
}

/// Outcome of one dialogue step.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueReply {
    /// What the avatar says. Never empty.
    pub text: String,
    /// True when the generator failed and [`FALLBACK_REPLY`] was used.
    pub fallback: bool,
}

/// Produces replies and records both sides of the exchange.
pub struct DialogueStage {
    store: ConversationStore,
    generator: Arc<dyn ReplyGenerator>,
    system_prompt: String,
}

impl DialogueStage {
    pub fn new(store: ConversationStore, generator: Arc<dyn ReplyGenerator>) -> Self {
        Self {
            store,
            generator,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// The store both sides of each exchange are recorded in.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Records the user's turn, generates a reply from the full history, and
    /// records the reply.
    ///
    /// Requires the avatar's exchange guard, so the history read for
    /// generation and the reply append cannot interleave with another
    /// exchange. A failed generation records [`FALLBACK_REPLY`] instead.
    pub async fn respond(&self, exchange: &ExchangeGuard, transcript: &str) -> DialogueReply {
        let avatar_id = exchange.avatar_id();

        self.store.append_turn(avatar_id, Role::User, transcript);
        let context = exchange.handle().snapshot();
        let request = DialogueRequest::from_context(&self.system_prompt, &context);

        let reply = match self.generator.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => DialogueReply {
                text: text.trim().to_string(),
                fallback: false,
            },
            Ok(_) => {
                warn!(
                    avatar_id,
                    generator = self.generator.name(),
                    "generator returned an empty reply"
                );
                DialogueReply {
                    text: FALLBACK_REPLY.to_string(),
                    fallback: true,
                }
            }
            Err(e) => {
                warn!(
                    avatar_id,
                    generator = self.generator.name(),
                    error = %e,
                    "reply generation failed"
                );
                DialogueReply {
                    text: FALLBACK_REPLY.to_string(),
                    fallback: true,
                }
            }
        };

        self.store.append_turn(avatar_id, Role::Assistant, reply.text.as_str());
        debug!(
            avatar_id,
            history_len = exchange.handle().history_len(),
            fallback = reply.fallback,
            "dialogue exchange recorded"
        );
        reply
    }
}
