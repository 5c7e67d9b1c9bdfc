use kindred_types::VoiceProfile;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_whisper_model() -> String {
    "whisper-1".to_string()
}

fn default_whisper_timeout_secs() -> u64 {
    60
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_elevenlabs_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_voices_dir() -> String {
    "assets/voices".to_string()
}

fn default_piper_binary() -> String {
    "assets/piper/piper".to_string()
}

fn default_sample_rate() -> u32 {
    22050
}

/// Hosted Whisper transcription settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_whisper_model")]
    pub model: String,
    #[serde(default = "default_whisper_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_whisper_model(),
            timeout_secs: default_whisper_timeout_secs(),
        }
    }
}

impl fmt::Debug for WhisperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhisperConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// ElevenLabs synthesis settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_elevenlabs_base_url")]
    pub base_url: String,
    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,
    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,
    #[serde(default = "default_elevenlabs_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_elevenlabs_base_url(),
            model_id: default_elevenlabs_model(),
            use_speaker_boost: true,
            timeout_secs: default_elevenlabs_timeout_secs(),
        }
    }
}

impl fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .field("use_speaker_boost", &self.use_speaker_boost)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Local piper synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiperConfig {
    /// Directory relative model paths are resolved against.
    #[serde(default = "default_voices_dir")]
    pub voices_dir: String,
    #[serde(default = "default_piper_binary")]
    pub binary: String,
    /// Sample rate of the raw PCM piper emits.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub profiles: Vec<VoiceProfile>,
}

impl Default for PiperConfig {
    fn default() -> Self {
        Self {
            voices_dir: default_voices_dir(),
            binary: default_piper_binary(),
            sample_rate: default_sample_rate(),
            profiles: Vec::new(),
        }
    }
}
