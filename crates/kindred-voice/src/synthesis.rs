//! Text-to-speech stage.

use crate::audio::AudioStore;
use crate::catalog::VoiceCatalog;
use crate::error::VoiceError;
use crate::prosody::Prosody;
use async_trait::async_trait;
use kindred_types::{EmotionVector, VoiceModel};
use std::sync::Arc;
use tracing::{debug, warn};

/// Container format of synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 2] = [AudioFormat::Mp3, AudioFormat::Wav];

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }
}

/// A complete synthesized clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

/// A text-to-speech capability with its own voice listing.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_voices(&self) -> Result<Vec<VoiceModel>, VoiceError>;

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        prosody: &Prosody,
    ) -> Result<SynthesizedAudio, VoiceError>;
}

/// Turns reply text into a stored clip and returns its URL.
#[derive(Clone)]
pub struct SynthesisStage {
    synthesizer: Arc<dyn Synthesizer>,
    catalog: VoiceCatalog,
    store: Arc<dyn AudioStore>,
    base_prosody: Prosody,
}

impl SynthesisStage {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        catalog: VoiceCatalog,
        store: Arc<dyn AudioStore>,
    ) -> Self {
        Self {
            synthesizer,
            catalog,
            store,
            base_prosody: Prosody::default(),
        }
    }

    pub fn with_base_prosody(mut self, base: Prosody) -> Self {
        self.base_prosody = base;
        self
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    /// The voice to speak with: `preferred` when given, else the first
    /// catalog entry.
    pub async fn select_voice(&self, preferred: Option<&str>) -> Option<String> {
        match preferred.map(str::trim).filter(|v| !v.is_empty()) {
            Some(voice) => Some(voice.to_string()),
            None => self
                .catalog
                .voices(false)
                .await
                .into_iter()
                .next()
                .map(|v| v.id),
        }
    }

    /// Synthesizes `text` and stores the clip. `None` means the caller
    /// should speak `text` with a local engine.
    pub async fn synthesize(
        &self,
        text: &str,
        emotions: &EmotionVector,
        preferred_voice: Option<&str>,
    ) -> Option<String> {
        let Some(voice_id) = self.select_voice(preferred_voice).await else {
            warn!("no voice available, skipping synthesis");
            return None;
        };
        let prosody = Prosody::from_emotions(self.base_prosody, emotions);

        match self.render(text, &voice_id, &prosody).await {
            Ok(url) => {
                debug!(
                    synthesizer = self.synthesizer.name(),
                    voice_id = %voice_id,
                    url = %url,
                    "synthesized reply"
                );
                Some(url)
            }
            Err(e) => {
                warn!(
                    synthesizer = self.synthesizer.name(),
                    voice_id = %voice_id,
                    error = %e,
                    "synthesis failed, leaving playback to the client"
                );
                None
            }
        }
    }

    async fn render(
        &self,
        text: &str,
        voice_id: &str,
        prosody: &Prosody,
    ) -> Result<String, VoiceError> {
        let audio = self.synthesizer.synthesize(text, voice_id, prosody).await?;
        if audio.bytes.is_empty() {
            return Err(VoiceError::Tts("synthesizer returned no audio".to_string()));
        }
        self.store.put(audio).await
    }
}
