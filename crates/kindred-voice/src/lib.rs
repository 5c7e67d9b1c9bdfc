//! Speech in and speech out for Kindred avatars.
//!
//! The [`TranscriptionStage`] turns a recording into text and the
//! [`SynthesisStage`] turns reply text into a stored clip, biased by the
//! emotions [`infer_emotions`] reads from the reply. Both stages wrap
//! pluggable capabilities ([`Transcriber`], [`Synthesizer`]) and absorb
//! their failures: transcription falls back to [`APOLOGY_TRANSCRIPT`], and
//! synthesis returns no URL so the client speaks the text locally.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod elevenlabs;
pub mod emotion;
pub mod error;
pub mod prosody;
pub mod stt;
pub mod synthesis;
pub mod transcription;
pub mod tts;
pub mod whisper_api;

pub use audio::{AudioStore, DirectoryAudioStore, MemoryAudioStore};
pub use catalog::{default_voices, unconfigured_voices, VoiceCatalog};
pub use config::{ElevenLabsConfig, PiperConfig, WhisperConfig};
pub use elevenlabs::ElevenLabsSynthesizer;
pub use emotion::{infer_emotions, CUE_INTENSITY};
pub use error::VoiceError;
pub use prosody::Prosody;
pub use stt::WhisperCliTranscriber;
pub use synthesis::{AudioFormat, SynthesisStage, SynthesizedAudio, Synthesizer};
pub use transcription::{
    language_hint, Transcriber, Transcript, TranscriptionStage, APOLOGY_TRANSCRIPT,
};
pub use tts::PiperSynthesizer;
pub use whisper_api::WhisperApiTranscriber;
