//! Voice catalog entries and local voice profiles.
//!
//! A [`VoiceModel`] is what callers see when enumerating voices. A
//! [`VoiceProfile`] maps a voice id onto a local synthesis model and its
//! parameters.

use serde::{Deserialize, Serialize};

/// Supported synthesis back ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceEngine {
    /// Piper TTS (ONNX-based, fast, local).
    #[default]
    Piper,
    /// ElevenLabs hosted synthesis.
    ElevenLabs,
}

/// A selectable voice as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceModel {
    pub id: String,
    pub name: String,
    /// `male`, `female`, or `neutral` when the catalog does not say.
    pub gender: String,
    /// Sample clip URL, when the catalog provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl VoiceModel {
    pub fn new(id: impl Into<String>, name: impl Into<String>, gender: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gender: gender.into(),
            preview_url: None,
        }
    }
}

/// A local voice profile configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Unique identifier for the voice profile.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Reported gender of the voice.
    #[serde(default = "neutral")]
    pub gender: String,
    /// Path to the model file (relative to the voices directory or absolute).
    pub model_path: String,
    /// Path to the model configuration file (if applicable).
    #[serde(default)]
    pub config_path: Option<String>,
    /// Speech speed multiplier (1.0 is normal).
    #[serde(default = "unit_speed")]
    pub speed: f32,
    /// Speaker ID within a multi-speaker model (0-indexed).
    #[serde(default)]
    pub speaker_id: Option<u32>,
}

fn neutral() -> String {
    "neutral".to_string()
}

fn unit_speed() -> f32 {
    1.0
}

impl VoiceProfile {
    /// The catalog entry advertised for this profile.
    pub fn to_model(&self) -> VoiceModel {
        VoiceModel::new(&self.id, &self.name, &self.gender)
    }
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default Voice".to_string(),
            gender: "female".to_string(),
            model_path: "en_US-lessac-medium.onnx".to_string(),
            config_path: Some("en_US-lessac-medium.onnx.json".to_string()),
            speed: 1.0,
            speaker_id: None,
        }
    }
}
