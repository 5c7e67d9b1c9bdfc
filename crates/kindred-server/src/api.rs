//! HTTP handlers for the voice pipeline.

use crate::AppState;
use axum::{
    extract::{Extension, Json, Multipart, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kindred_conversation::ConversationContext;
use kindred_pipeline::{ProcessOptions, AUTO_LANGUAGE};
use kindred_types::{PersonaTraits, PipelineResult, UserProfile, VoiceModel};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Avatar used when a request does not name one.
pub const DEFAULT_AVATAR_ID: &str = "default";

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Fields of a `POST /api/voice-chat/process` form.
#[derive(Debug, Default)]
struct ProcessForm {
    audio: Vec<u8>,
    avatar_id: Option<String>,
    language: Option<String>,
    voice_id: Option<String>,
}

async fn read_process_form(mut multipart: Multipart) -> Result<ProcessForm, ApiError> {
    let mut form = ProcessForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                form.audio = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read audio: {}", e)))?
                    .to_vec();
            }
            "avatar_id" | "language" | "voice_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read {}: {}", name, e)))?;
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                match name.as_str() {
                    "avatar_id" => form.avatar_id = value,
                    "language" => form.language = value,
                    _ => form.voice_id = value,
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown form field");
            }
        }
    }
    Ok(form)
}

/// Handler for `POST /api/voice-chat/process`.
///
/// Malformed recordings are reported in the result envelope, not as HTTP
/// errors; only an unreadable form is a `400`.
pub async fn process_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<PipelineResult>, ApiError> {
    let form = read_process_form(multipart).await?;
    let avatar_id = form
        .avatar_id
        .unwrap_or_else(|| DEFAULT_AVATAR_ID.to_string());
    let options = ProcessOptions {
        language: Some(form.language.unwrap_or_else(|| AUTO_LANGUAGE.to_string())),
        voice_id: form.voice_id,
    };

    tracing::debug!(
        avatar_id = %avatar_id,
        bytes = form.audio.len(),
        "voice chat request"
    );
    let result = state.pipeline.process(&avatar_id, form.audio, options).await;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct VoiceModelsQuery {
    #[serde(default)]
    pub avatar_id: Option<String>,
}

/// Handler for `GET /api/voice-models`.
pub async fn voice_models_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<VoiceModelsQuery>,
) -> Json<Vec<VoiceModel>> {
    Json(state.pipeline.voice_models(query.avatar_id.as_deref()).await)
}

/// Handler for `GET /api/avatars/{avatarId}/history`.
pub async fn history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(avatar_id): Path<String>,
) -> Result<Json<ConversationContext>, ApiError> {
    state
        .pipeline
        .store()
        .peek(&avatar_id)
        .map(|conversation| Json(conversation.snapshot()))
        .ok_or_else(|| ApiError::NotFound(format!("avatar {}", avatar_id)))
}

/// Handler for `PUT /api/avatars/{avatarId}/persona`.
pub async fn set_persona_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(avatar_id): Path<String>,
    Json(persona): Json<PersonaTraits>,
) -> Result<Json<ConversationContext>, ApiError> {
    let avatar_id = non_blank(avatar_id)?;
    let store = state.pipeline.store();
    store.set_persona(&avatar_id, persona).await;
    tracing::info!(avatar_id = %avatar_id, "persona updated");
    Ok(Json(store.snapshot(&avatar_id)))
}

/// Handler for `PUT /api/avatars/{avatarId}/profile`.
pub async fn update_profile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(avatar_id): Path<String>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<ConversationContext>, ApiError> {
    let avatar_id = non_blank(avatar_id)?;
    let store = state.pipeline.store();
    store.update_profile(&avatar_id, profile);
    Ok(Json(store.snapshot(&avatar_id)))
}

fn non_blank(avatar_id: String) -> Result<String, ApiError> {
    if avatar_id.trim().is_empty() {
        Err(ApiError::BadRequest("avatar id must not be blank".to_string()))
    } else {
        Ok(avatar_id)
    }
}
