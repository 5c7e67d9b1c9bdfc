//! Hosted Whisper transcription.

use crate::config::WhisperConfig;
use crate::error::{status_error, VoiceError};
use crate::transcription::Transcriber;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const UPLOAD_FILE_NAME: &str = "recording.webm";
const UPLOAD_MIME: &str = "audio/webm";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Posts recordings to an OpenAI-compatible `/audio/transcriptions` endpoint.
#[derive(Debug, Clone)]
pub struct WhisperApiTranscriber {
    config: WhisperConfig,
    client: Client,
}

impl WhisperApiTranscriber {
    pub fn new(config: WhisperConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn form(&self, audio: &[u8], language: Option<&str>) -> Result<Form, VoiceError> {
        let part = Part::bytes(audio.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(UPLOAD_MIME)?;
        let mut form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }
        Ok(form)
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    fn name(&self) -> &'static str {
        "whisper-api"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        language: Option<&str>,
    ) -> Result<String, VoiceError> {
        if self.config.api_key.trim().is_empty() {
            return Err(VoiceError::MissingApiKey("whisper"));
        }

        let url = format!(
            "{}/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .multipart(self.form(audio, language)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("whisper", response).await);
        }

        let parsed: TranscriptionResponse = response.json().await?;
        Ok(parsed.text.trim().to_string())
    }
}
