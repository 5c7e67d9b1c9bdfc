//! End-to-end voice exchange for Kindred avatars.
//!
//! [`PipelineOrchestrator::process`] takes a finished recording and runs it
//! through transcription, dialogue and synthesis, always resolving to a
//! [`PipelineResult`](kindred_types::PipelineResult). Stage failures degrade
//! the result rather than failing it; only malformed input or a panicking
//! stage yields `success: false`.

pub mod error;
pub mod orchestrator;

pub use error::PipelineError;
pub use orchestrator::{
    PipelineOrchestrator, PipelineStage, ProcessOptions, AUTO_LANGUAGE, CATASTROPHIC_REPLY,
    MAX_AUDIO_BYTES,
};
