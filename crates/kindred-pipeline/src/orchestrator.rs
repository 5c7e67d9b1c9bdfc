use crate::error::PipelineError;
use kindred_conversation::{ConversationStore, DialogueStage, ExchangeGuard};
use kindred_types::{PipelineResult, VoiceModel};
use kindred_voice::{infer_emotions, SynthesisStage, TranscriptionStage};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Reply text when a request cannot be processed at all.
pub const CATASTROPHIC_REPLY: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

/// Largest accepted recording (10 MiB).
pub const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Language hint used when the caller gives none.
pub const AUTO_LANGUAGE: &str = "auto";

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Spoken language hint. `None` or `auto` detects.
    #[serde(default)]
    pub language: Option<String>,
    /// Voice to speak the reply with when the avatar's persona names none.
    #[serde(default)]
    pub voice_id: Option<String>,
}

impl ProcessOptions {
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(AUTO_LANGUAGE)
    }
}

/// Where a request is in the pipeline. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Idle,
    Transcribing,
    Dialoguing,
    Synthesizing,
    Done,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Transcribing => "transcribing",
            PipelineStage::Dialoguing => "dialoguing",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage tracker for one request.
struct Run<'a> {
    avatar_id: &'a str,
    stage: PipelineStage,
}

impl<'a> Run<'a> {
    fn new(avatar_id: &'a str) -> Self {
        Self {
            avatar_id,
            stage: PipelineStage::Idle,
        }
    }

    fn enter(&mut self, next: PipelineStage) {
        debug_assert!(next > self.stage, "pipeline stages only advance");
        debug!(
            avatar_id = self.avatar_id,
            from = %self.stage,
            to = %next,
            "pipeline stage"
        );
        self.stage = next;
    }
}

struct Stages {
    transcription: TranscriptionStage,
    dialogue: DialogueStage,
    synthesis: SynthesisStage,
}

/// Sequences transcription, dialogue and synthesis for each request.
///
/// Cheap to clone; clones share the same stages and conversation store.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    stages: Arc<Stages>,
}

impl PipelineOrchestrator {
    pub fn new(
        transcription: TranscriptionStage,
        dialogue: DialogueStage,
        synthesis: SynthesisStage,
    ) -> Self {
        Self {
            stages: Arc::new(Stages {
                transcription,
                dialogue,
                synthesis,
            }),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        self.stages.dialogue.store()
    }

    /// Runs one request end to end. Never fails: any error that escapes the
    /// stages becomes an unsuccessful result carrying [`CATASTROPHIC_REPLY`].
    pub async fn process(
        &self,
        avatar_id: &str,
        audio: Vec<u8>,
        options: ProcessOptions,
    ) -> PipelineResult {
        match self.try_process(avatar_id, audio, options).await {
            Ok(result) => result,
            Err(e) => {
                error!(avatar_id, error = %e, "voice pipeline failed");
                PipelineResult::failed(CATASTROPHIC_REPLY)
            }
        }
    }

    /// Like [`process`](Self::process) but reports why a request failed.
    ///
    /// The exchange for `avatar_id` is queued before anything else runs, so
    /// requests for one avatar complete in the order they were issued. The
    /// stages then run on their own task: a caller that stops waiting does
    /// not cut an exchange in half, and a panicking stage is reported as
    /// [`PipelineError::StagePanicked`].
    pub async fn try_process(
        &self,
        avatar_id: &str,
        audio: Vec<u8>,
        options: ProcessOptions,
    ) -> Result<PipelineResult, PipelineError> {
        validate(avatar_id, &audio)?;

        let exchange = self.store().exchange(avatar_id).await;
        let stages = self.stages.clone();
        let task = tokio::spawn(async move { stages.run(exchange, audio, options).await });

        task.await.map_err(|e| {
            if e.is_panic() {
                PipelineError::StagePanicked(panic_message(e.into_panic()))
            } else {
                PipelineError::Cancelled
            }
        })
    }

    /// Voices the avatar can speak with, never empty. The avatar's persona
    /// voice, when listed, comes first.
    pub async fn voice_models(&self, avatar_id: Option<&str>) -> Vec<VoiceModel> {
        let mut voices = self.stages.synthesis.catalog().voices(false).await;

        let preferred = avatar_id
            .filter(|id| !id.trim().is_empty())
            .and_then(|id| self.store().peek(id))
            .and_then(|conversation| conversation.snapshot().persona.voice_id);
        if let Some(preferred) = preferred {
            if let Some(pos) = voices.iter().position(|v| v.id == preferred) {
                let voice = voices.remove(pos);
                voices.insert(0, voice);
            }
        }
        voices
    }
}

impl Stages {
    async fn run(
        &self,
        exchange: ExchangeGuard,
        audio: Vec<u8>,
        options: ProcessOptions,
    ) -> PipelineResult {
        let avatar_id = exchange.avatar_id().to_string();
        let mut run = Run::new(&avatar_id);

        run.enter(PipelineStage::Transcribing);
        let transcript = self
            .transcription
            .transcribe(&audio, options.language())
            .await;

        run.enter(PipelineStage::Dialoguing);
        let reply = self.dialogue.respond(&exchange, &transcript.text).await;
        let persona_voice = exchange.handle().snapshot().persona.voice_id;
        // Synthesis does not touch history; let the next exchange start.
        drop(exchange);

        run.enter(PipelineStage::Synthesizing);
        let emotions = infer_emotions(&reply.text);
        let voice = persona_voice.as_deref().or(options.voice_id.as_deref());
        let audio_url = self.synthesis.synthesize(&reply.text, &emotions, voice).await;

        run.enter(PipelineStage::Done);
        info!(
            avatar_id = %avatar_id,
            transcript_fallback = transcript.fallback,
            reply_fallback = reply.fallback,
            has_audio = audio_url.is_some(),
            dominant_emotion = emotions.dominant().map(|l| l.as_str()),
            "voice exchange complete"
        );

        PipelineResult::completed(reply.text, transcript.text, audio_url)
    }
}

fn validate(avatar_id: &str, audio: &[u8]) -> Result<(), PipelineError> {
    if avatar_id.trim().is_empty() {
        return Err(PipelineError::InvalidAvatarId);
    }
    if audio.is_empty() {
        return Err(PipelineError::EmptyAudio);
    }
    if audio.len() > MAX_AUDIO_BYTES {
        return Err(PipelineError::AudioTooLarge {
            size: audio.len(),
            limit: MAX_AUDIO_BYTES,
        });
    }
    Ok(())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
