//! Pass-through to the face-expression detector.

use crate::{api::ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use carrie_types::EmotionSignal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ProcessFrameRequest {
    /// Encoded video frame, forwarded untouched.
    pub frame: Option<String>,
}

/// Handler for `GET /emotion/current`.
pub async fn current_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let emotion = state.orchestrator.emotion().current().await?;
    Ok(Json(json!({ "success": true, "emotion": emotion })))
}

/// Handler for `POST /emotion/process-frame`.
pub async fn process_frame_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ProcessFrameRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let frame = payload
        .frame
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Frame data is required".to_string()))?;

    let emotion = state.orchestrator.emotion().process_frame(&frame).await?;
    Ok(Json(json!({ "success": true, "emotion": emotion })))
}

/// Handler for `GET /emotion/webhook`.
///
/// Never fails: an unreachable detector yields the neutral signal.
pub async fn webhook_handler(Extension(state): Extension<Arc<AppState>>) -> Json<EmotionSignal> {
    Json(state.orchestrator.emotion().fetch().await)
}
