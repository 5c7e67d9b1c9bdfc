//! Prompt assembly from persona and history.

use crate::store::ConversationContext;
use kindred_types::{PersonaTraits, Role};
use serde::Serialize;

/// One message of generation context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Everything a generator needs to produce one reply.
#[derive(Debug, Clone)]
pub struct DialogueRequest {
    pub avatar_id: String,
    pub system_prompt: String,
    /// Full capped history, oldest first. The last entry is the user turn
    /// being answered.
    pub messages: Vec<ChatMessage>,
    pub persona: PersonaTraits,
}

impl DialogueRequest {
    pub fn from_context(base_prompt: &str, context: &ConversationContext) -> Self {
        Self {
            avatar_id: context.avatar_id.clone(),
            system_prompt: build_system_prompt(base_prompt, &context.persona),
            messages: context
                .history
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role,
                    content: turn.content.clone(),
                })
                .collect(),
            persona: context.persona.clone(),
        }
    }

    /// The text of the most recent user message.
    pub fn latest_user_text(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Appends persona details to the base prompt.
pub fn build_system_prompt(base: &str, persona: &PersonaTraits) -> String {
    let mut prompt = base.trim().to_string();

    if let Some(name) = persona.name.as_deref().filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!(" Your name is {}.", name.trim()));
    }
    if !persona.background.trim().is_empty() {
        prompt.push_str(&format!(" Your background: {}", persona.background.trim()));
    }
    if !persona.interests.is_empty() {
        prompt.push_str(&format!(" You enjoy talking about {}.", persona.interests.join(", ")));
    }

    let style = style_hints(persona);
    if !style.is_empty() {
        prompt.push_str(" Style: ");
        prompt.push_str(&style.join(" "));
    }

    prompt
}

fn style_hints(persona: &PersonaTraits) -> Vec<&'static str> {
    let style = persona.communication;
    let mut hints = Vec::new();
    if style.formality >= 0.7 {
        hints.push("Speak formally and politely.");
    } else if style.formality <= 0.3 {
        hints.push("Speak casually, like an old friend.");
    }
    if style.humor >= 0.7 {
        hints.push("Use gentle humor where it fits.");
    }
    if style.empathy >= 0.7 {
        hints.push("Acknowledge the user's feelings.");
    }
    hints
}
