use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("generator returned an empty reply")]
    EmptyReply,
}
