//! Shared types for the Kindred companion pipeline.
//!
//! This crate holds the data model that every other Kindred crate speaks:
//! conversation turns, the per-avatar user profile and persona, the emotion
//! vector produced from reply text, voice catalog entries, and the uniform
//! [`PipelineResult`] envelope returned to callers.
//!
//! Nothing in here performs I/O. Crates depend on `kindred-types` for
//! cross-cutting definitions so the dependency graph stays acyclic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod emotion;
pub mod voice;

pub use emotion::{EmotionLabel, EmotionVector};
pub use voice::{VoiceEngine, VoiceModel, VoiceProfile};

/// Maximum number of turns retained per avatar conversation.
pub const MAX_HISTORY: usize = 50;

/// Language tag used when no preference has been recorded.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human speaking to the avatar.
    User,
    /// The avatar's reply.
    Assistant,
}

impl Role {
    /// Returns the wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One utterance in a conversation.
///
/// Turns are immutable once recorded; history only ever drops turns from the
/// front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique identifier of the turn.
    pub id: String,
    /// Speaker of the turn.
    pub role: Role,
    /// Text content (transcript or reply).
    pub content: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
    /// Language tag the turn was recorded under.
    pub language: String,
}

impl Turn {
    /// Creates a turn stamped with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: format!("msg-{}", uuid::Uuid::new_v4()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            language: language.into(),
        }
    }
}

/// How the user prefers to interact with the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Spoken conversation (recorded audio in, synthesized audio out).
    #[default]
    Voice,
    /// Text-only conversation.
    Text,
}

/// Preference bag for the user talking to an avatar.
///
/// Only changed through an explicit profile update on the conversation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identifier of the user.
    pub id: String,
    /// Display name of the user.
    pub name: String,
    /// Preferred language tag, stamped onto recorded turns.
    #[serde(default = "default_language")]
    pub language: String,
    /// Preferred interaction mode.
    #[serde(default)]
    pub interaction_mode: InteractionMode,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl UserProfile {
    /// Returns the default profile created alongside a new conversation.
    pub fn for_avatar(avatar_id: &str) -> Self {
        Self {
            id: format!("user-{avatar_id}"),
            name: "User".to_string(),
            language: default_language(),
            interaction_mode: InteractionMode::Voice,
        }
    }
}

/// Communication style parameters, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommunicationStyle {
    pub formality: f32,
    pub humor: f32,
    pub empathy: f32,
}

impl Default for CommunicationStyle {
    fn default() -> Self {
        Self {
            formality: 0.5,
            humor: 0.5,
            empathy: 0.8,
        }
    }
}

/// Persona of an avatar. Read-only while a conversation is in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaTraits {
    /// Name the avatar introduces itself with.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form background woven into the system prompt.
    #[serde(default)]
    pub background: String,
    /// Topics the avatar likes to talk about.
    #[serde(default)]
    pub interests: Vec<String>,
    /// Preferred synthesis voice, overriding catalog selection.
    #[serde(default)]
    pub voice_id: Option<String>,
    /// Communication style parameters.
    #[serde(default)]
    pub communication: CommunicationStyle,
}

/// Uniform result envelope returned by the pipeline.
///
/// `audio_url == None` is a signal to the caller: render `text` through the
/// device's local speech synthesis instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub text: String,
    #[serde(rename = "audioUrl")]
    pub audio_url: Option<String>,
    /// What the user was heard to say, when transcription ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}

impl PipelineResult {
    /// A completed run, possibly degraded.
    pub fn completed(
        text: impl Into<String>,
        transcription: impl Into<String>,
        audio_url: Option<String>,
    ) -> Self {
        Self {
            success: true,
            text: text.into(),
            audio_url,
            transcription: Some(transcription.into()),
        }
    }

    /// A run that could not complete.
    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
            audio_url: None,
            transcription: None,
        }
    }

    /// Whether the caller must fall back to local speech synthesis.
    pub fn needs_local_speech(&self) -> bool {
        self.audio_url.is_none()
    }
}
