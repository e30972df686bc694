//! LiveKit join tokens and room queries for browser clients.

use crate::{api::ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    Json,
};
use carrie_voice::ParticipantSummary;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body for `POST /livekit/token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub room_name: Option<String>,
    pub identity: Option<String>,
    /// Display name; defaults to the identity.
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    /// LiveKit server the token is valid for.
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsResponse {
    pub success: bool,
    pub room_name: String,
    pub count: usize,
    pub participants: Vec<ParticipantSummary>,
}

/// Handler for `POST /livekit/token`.
pub async fn token_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(payload) = payload?;
    let room_name = payload
        .room_name
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("roomName is required".to_string()))?;
    let identity = payload
        .identity
        .filter(|i| !i.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("identity is required".to_string()))?;
    let name = payload.name.unwrap_or_else(|| identity.clone());

    let token = state
        .voice_service
        .generate_participant_token(&room_name, &identity, &name)?;
    tracing::info!(room = %room_name, identity = %identity, "issued participant token");

    Ok(Json(TokenResponse {
        success: true,
        token,
        url: state.voice_service.get_url().to_string(),
    }))
}

/// Handler for `GET /livekit/rooms/{roomName}/participants`.
pub async fn participants_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    let participants = state.voice_service.list_participants(&room_name).await?;
    Ok(Json(ParticipantsResponse {
        success: true,
        count: participants.len(),
        room_name,
        participants,
    }))
}
