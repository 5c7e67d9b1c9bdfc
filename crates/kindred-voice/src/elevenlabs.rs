//! ElevenLabs hosted synthesis.

use crate::config::ElevenLabsConfig;
use crate::error::{status_error, VoiceError};
use crate::prosody::Prosody;
use crate::synthesis::{AudioFormat, SynthesizedAudio, Synthesizer};
use async_trait::async_trait;
use kindred_types::VoiceModel;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const API_KEY_HEADER: &str = "xi-api-key";

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
    #[serde(default)]
    labels: VoiceLabels,
    #[serde(default)]
    preview_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceLabels {
    #[serde(default)]
    gender: Option<String>,
}

impl From<VoiceEntry> for VoiceModel {
    fn from(entry: VoiceEntry) -> Self {
        VoiceModel {
            id: entry.voice_id,
            name: entry.name,
            gender: entry.labels.gender.unwrap_or_else(|| "neutral".to_string()),
            preview_url: entry.preview_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    config: ElevenLabsConfig,
    client: Client,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: ElevenLabsConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn api_key(&self) -> Result<&str, VoiceError> {
        let key = self.config.api_key.trim();
        if key.is_empty() {
            Err(VoiceError::MissingApiKey("elevenlabs"))
        } else {
            Ok(key)
        }
    }

    /// `{base}/v1/<segments>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, VoiceError> {
        let mut url = Url::parse(self.config.base_url.trim_end_matches('/'))
            .map_err(|e| VoiceError::Config(format!("invalid ElevenLabs base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| VoiceError::Config("ElevenLabs base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    pub fn request_body(&self, text: &str, prosody: &Prosody) -> Value {
        json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": prosody.stability,
                "similarity_boost": prosody.similarity_boost,
                "style": prosody.style,
                "use_speaker_boost": self.config.use_speaker_boost,
            },
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn list_voices(&self) -> Result<Vec<VoiceModel>, VoiceError> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(self.endpoint(&["voices"])?)
            .header(API_KEY_HEADER, key)
            .timeout(self.timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("elevenlabs", response).await);
        }

        let parsed: VoicesResponse = response.json().await?;
        Ok(parsed.voices.into_iter().map(VoiceModel::from).collect())
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        prosody: &Prosody,
    ) -> Result<SynthesizedAudio, VoiceError> {
        let key = self.api_key()?;
        let response = self
            .client
            .post(self.endpoint(&["text-to-speech", voice_id])?)
            .header(API_KEY_HEADER, key)
            .header(reqwest::header::ACCEPT, AudioFormat::Mp3.content_type())
            .timeout(self.timeout())
            .json(&self.request_body(text, prosody))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("elevenlabs", response).await);
        }

        let bytes = response.bytes().await?;
        Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            format: AudioFormat::Mp3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesizer() -> ElevenLabsSynthesizer {
        ElevenLabsSynthesizer::new(ElevenLabsConfig {
            api_key: "xi-test".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn voice_ids_are_encoded_as_one_segment() {
        let url = synthesizer()
            .endpoint(&["text-to-speech", "premade/adam"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.elevenlabs.io/v1/text-to-speech/premade%2Fadam"
        );
    }

    #[test]
    fn body_carries_prosody() {
        let prosody = Prosody {
            stability: 0.4,
            similarity_boost: 0.85,
            style: 0.16,
            rate: 1.1,
        };
        let body = synthesizer().request_body("Hello!", &prosody);
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["voice_settings"]["use_speaker_boost"], true);
        let stability = body["voice_settings"]["stability"].as_f64().unwrap();
        assert!((stability - 0.4).abs() < 1e-6);
    }

    #[test]
    fn voice_entry_without_gender_is_neutral() {
        let entry: VoiceEntry = serde_json::from_value(json!({
            "voice_id": "abc",
            "name": "Sam",
            "labels": {},
            "preview_url": "https://example.com/sam.mp3"
        }))
        .unwrap();
        let model = VoiceModel::from(entry);
        assert_eq!(model.gender, "neutral");
        assert_eq!(model.preview_url.as_deref(), Some("https://example.com/sam.mp3"));
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let synth = ElevenLabsSynthesizer::new(ElevenLabsConfig::default());
        assert!(matches!(
            synth.list_voices().await,
            Err(VoiceError::MissingApiKey("elevenlabs"))
        ));
        assert!(matches!(
            synth.synthesize("hi", "premade/adam", &Prosody::default()).await,
            Err(VoiceError::MissingApiKey("elevenlabs"))
        ));
    }
}
