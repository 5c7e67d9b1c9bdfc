//! Kindred server library logic.

pub mod api;
pub mod config;
pub mod retention;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Extension, Json, Router,
};
use config::{Config, TranscriptionBackend};
use kindred_conversation::{generator_from_config, ConversationStore, DialogueStage};
use kindred_pipeline::PipelineOrchestrator;
use kindred_types::VoiceEngine;
use kindred_voice::{
    DirectoryAudioStore, ElevenLabsSynthesizer, PiperSynthesizer, SynthesisStage, Synthesizer,
    Transcriber, TranscriptionStage, VoiceCatalog, WhisperApiTranscriber, WhisperCliTranscriber,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Maximum body size for the process route (12 MiB): the largest accepted
/// recording plus form overhead.
const MAX_REQUEST_BODY_BYTES: usize = 12 * 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineOrchestrator,
    /// Directory served under `/audio`, when clips are written to disk.
    pub audio_dir: Option<PathBuf>,
}

/// Builds the pipeline described by `config`.
pub async fn build_state(config: &Config) -> AppState {
    let transcriber: Arc<dyn Transcriber> = match config.transcription.backend {
        TranscriptionBackend::WhisperApi => {
            let mut whisper = config.transcription.whisper.clone();
            if whisper.api_key.trim().is_empty() {
                whisper.api_key = config.dialogue.api_key.clone();
            }
            Arc::new(WhisperApiTranscriber::new(whisper))
        }
        TranscriptionBackend::WhisperCli => Arc::new(WhisperCliTranscriber::new(
            &config.transcription.cli.model,
            &config.transcription.cli.binary,
        )),
    };

    let synthesizer: Arc<dyn Synthesizer> = match config.synthesis.engine {
        VoiceEngine::ElevenLabs => Arc::new(ElevenLabsSynthesizer::new(
            config.synthesis.elevenlabs.clone(),
        )),
        VoiceEngine::Piper => {
            Arc::new(PiperSynthesizer::from_config(&config.synthesis.piper).await)
        }
    };

    let clips = clip_store(config);
    let audio_dir = clips.dir().to_path_buf();

    let dialogue = DialogueStage::new(
        ConversationStore::new(),
        generator_from_config(&config.dialogue),
    )
    .with_system_prompt(config.dialogue.system_prompt.clone());

    tracing::info!(
        transcriber = transcriber.name(),
        generator = dialogue.generator_name(),
        synthesizer = synthesizer.name(),
        audio_dir = %audio_dir.display(),
        "voice pipeline configured"
    );

    let pipeline = PipelineOrchestrator::new(
        TranscriptionStage::new(transcriber),
        dialogue,
        SynthesisStage::new(
            synthesizer.clone(),
            VoiceCatalog::new(synthesizer),
            Arc::new(clips),
        ),
    );

    AppState {
        pipeline,
        audio_dir: Some(audio_dir),
    }
}

/// Clip directory described by `config`, addressed under `<public_url>/audio`.
pub fn clip_store(config: &Config) -> DirectoryAudioStore {
    DirectoryAudioStore::new(
        PathBuf::from(&config.audio.dir),
        format!("{}/audio", config.server.public_url()),
    )
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let process_routes = Router::new()
        .route("/api/voice-chat/process", post(api::process_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES));

    let router = Router::new()
        .route("/health", get(health))
        .route("/api/voice-models", get(api::voice_models_handler))
        .route(
            "/api/avatars/{avatarId}/history",
            get(api::history_handler),
        )
        .route(
            "/api/avatars/{avatarId}/persona",
            put(api::set_persona_handler),
        )
        .route(
            "/api/avatars/{avatarId}/profile",
            put(api::update_profile_handler),
        )
        .merge(process_routes);

    // Serve synthesized clips under /audio/*
    let router = match &state.audio_dir {
        Some(dir) => {
            tracing::info!(path = %dir.display(), "serving synthesized audio at /audio");
            router.nest_service("/audio", ServeDir::new(dir))
        }
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
