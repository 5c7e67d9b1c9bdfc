use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("audio payload is empty")]
    EmptyAudio,

    #[error("audio payload too large: {size} bytes (limit: {limit} bytes)")]
    AudioTooLarge { size: usize, limit: usize },

    #[error("avatar id must not be blank")]
    InvalidAvatarId,

    #[error("pipeline stage panicked: {0}")]
    StagePanicked(String),

    #[error("pipeline task was cancelled")]
    Cancelled,
}
