//! Speech-to-text stage.

use crate::error::VoiceError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Transcript substituted when speech could not be recognized.
pub const APOLOGY_TRANSCRIPT: &str = "I couldn't understand what you said.";

/// A speech-to-text capability.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transcribes `audio`. `language` is `None` for auto-detection.
    async fn transcribe(&self, audio: &[u8], language: Option<&str>)
        -> Result<String, VoiceError>;
}

/// Normalizes a caller language hint: `auto` and blank mean detect.
pub fn language_hint(language: &str) -> Option<&str> {
    let trimmed = language.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(trimmed)
    }
}

/// Outcome of the transcription stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    /// True when `text` is [`APOLOGY_TRANSCRIPT`] rather than recognized speech.
    pub fallback: bool,
}

/// Runs a [`Transcriber`] and absorbs its failures.
#[derive(Clone)]
pub struct TranscriptionStage {
    transcriber: Arc<dyn Transcriber>,
}

impl TranscriptionStage {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    pub fn transcriber_name(&self) -> &'static str {
        self.transcriber.name()
    }

    /// Never fails: errors and empty results become [`APOLOGY_TRANSCRIPT`].
    pub async fn transcribe(&self, audio: &[u8], language: &str) -> Transcript {
        let hint = language_hint(language);
        match self.transcriber.transcribe(audio, hint).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(
                    transcriber = self.transcriber.name(),
                    chars = text.len(),
                    "transcribed audio"
                );
                Transcript {
                    text: text.trim().to_string(),
                    fallback: false,
                }
            }
            Ok(_) => {
                warn!(
                    transcriber = self.transcriber.name(),
                    "empty transcript, using apology transcript"
                );
                Self::apology()
            }
            Err(e) => {
                warn!(
                    transcriber = self.transcriber.name(),
                    error = %e,
                    "transcription failed, using apology transcript"
                );
                Self::apology()
            }
        }
    }

    fn apology() -> Transcript {
        Transcript {
            text: APOLOGY_TRANSCRIPT.to_string(),
            fallback: true,
        }
    }
}
