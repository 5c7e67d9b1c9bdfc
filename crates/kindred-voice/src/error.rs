use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("Voice profile not found: {0}")]
    ProfileNotFound(String),

    #[error("audio storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Largest error body kept from a failed response.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Builds a [`VoiceError::Status`] from a non-success response.
pub(crate) async fn status_error(service: &'static str, response: reqwest::Response) -> VoiceError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    VoiceError::Status {
        service,
        status,
        body,
    }
}
