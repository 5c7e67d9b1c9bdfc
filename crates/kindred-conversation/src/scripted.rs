//! Offline rule-based replies, used when no generation service is configured.

use crate::dialogue::ReplyGenerator;
use crate::error::DialogueError;
use crate::prompt::DialogueRequest;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedGenerator;

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Picks a canned reply for `text`.
    pub fn reply_to(text: &str, avatar_name: Option<&str>) -> String {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();

        if words.iter().any(|w| *w == "hello" || *w == "hi") {
            return "Hello! It's nice to talk with you today.".to_string();
        }
        if lower.contains("how are you") {
            return "I'm doing well, thank you for asking. How are you feeling today?".to_string();
        }
        if lower.contains("name") {
            return match avatar_name.filter(|n| !n.trim().is_empty()) {
                Some(name) => format!("My name is {name}. It's wonderful to chat with you."),
                None => "I'm your digital companion. I'm here to chat with you and keep you company."
                    .to_string(),
            };
        }
        "That's interesting! Tell me more about what's on your mind.".to_string()
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, request: &DialogueRequest) -> Result<String, DialogueError> {
        Ok(Self::reply_to(
            request.latest_user_text(),
            request.persona.name.as_deref(),
        ))
    }
}
