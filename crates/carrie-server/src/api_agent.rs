//! Agent API handlers: deployment, speech, and conversation.

use crate::{api::ApiError, AppState};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Extension, Multipart, Path},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use carrie_agent::{Reply, ReplySource};
use carrie_types::{AgentInstance, ConversationTurn, EmotionSignal};
use carrie_voice::{DynamicVariables, VoiceInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_AGENT_IDENTITY: &str = "ai-agent";
const AUDIO_MPEG: &str = "audio/mpeg";

/// Request body for `POST /agent/deploy`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub room_name: Option<String>,
    pub agent_identity: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeployResponse {
    pub success: bool,
    pub agent: AgentInstance,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentListResponse {
    pub success: bool,
    pub count: usize,
    pub agents: Vec<AgentInstance>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub agent: AgentInstance,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAgentsResponse {
    pub success: bool,
    pub room_name: String,
    pub count: usize,
    pub agents: Vec<AgentInstance>,
}

/// Request body for `POST /agent/speak`.
#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: Option<String>,
    /// Chunked transfer instead of one buffered body.
    #[serde(default)]
    pub stream: bool,
}

/// Request body for both message endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub text: Option<String>,
    pub room_name: Option<String>,
    pub conversation_id: Option<String>,
    pub dynamic_variables: Option<DynamicVariables>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    pub input: String,
    pub response: String,
    pub conversation_id: Option<String>,
    pub source: ReplySource,
    /// Base64 of the synthesized reply.
    pub audio: String,
    pub audio_content_type: &'static str,
    pub turns: Vec<ConversationTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<EmotionSignal>,
    pub message: String,
}

impl MessageResponse {
    fn from_reply(input: String, reply: Reply, message: &str) -> Self {
        Self {
            success: true,
            input,
            audio: base64::engine::general_purpose::STANDARD.encode(&reply.audio),
            audio_content_type: AUDIO_MPEG,
            response: reply.text,
            conversation_id: reply.conversation_id,
            source: reply.source,
            turns: reply.turns,
            emotion: reply.emotion,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub success: bool,
    pub transcription: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub success: bool,
    pub voices: Vec<VoiceInfo>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

/// Handler for `POST /agent/deploy`.
pub async fn deploy_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<Json<DeployResponse>, ApiError> {
    let Json(payload) = payload?;
    let room_name = required(payload.room_name, "roomName")?;
    let identity = payload
        .agent_identity
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AGENT_IDENTITY.to_string());

    let agent = state.registry.deploy(&room_name, &identity)?;

    Ok(Json(DeployResponse {
        success: true,
        agent,
        message: "Agent deployed successfully".to_string(),
    }))
}

/// Handler for `GET /agent/list`.
pub async fn list_handler(Extension(state): Extension<Arc<AppState>>) -> Json<AgentListResponse> {
    let agents = state.registry.list_all();
    Json(AgentListResponse {
        success: true,
        count: agents.len(),
        agents,
    })
}

/// Handler for `GET /agent/{agentId}`.
pub async fn get_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentResponse>, ApiError> {
    let agent = state
        .registry
        .get(&agent_id)
        .ok_or_else(|| ApiError::NotFound("Agent not found".to_string()))?;

    Ok(Json(AgentResponse {
        success: true,
        agent,
    }))
}

/// Handler for `DELETE /agent/{agentId}`. Unknown ids succeed too.
pub async fn remove_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Json<serde_json::Value> {
    state.registry.remove(&agent_id);
    Json(serde_json::json!({
        "success": true,
        "message": "Agent removed successfully",
    }))
}

/// Handler for `GET /agent/room/{roomName}`.
pub async fn room_agents_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> Json<RoomAgentsResponse> {
    let agents = state.registry.list_by_room(&room_name);
    Json(RoomAgentsResponse {
        success: true,
        room_name,
        count: agents.len(),
        agents,
    })
}

/// Handler for `POST /agent/speak`.
///
/// Responds with `audio/mpeg`, either buffered or streamed as it arrives
/// from the vendor.
pub async fn speak_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let text = required(payload.text, "text")?;

    if payload.stream {
        let stream = state.orchestrator.speak_stream(&text).await?;
        let body = Body::from_stream(stream);
        return Ok(([(header::CONTENT_TYPE, AUDIO_MPEG)], body).into_response());
    }

    let audio = state.orchestrator.speak(&text).await?;
    Ok(([(header::CONTENT_TYPE, AUDIO_MPEG)], audio).into_response())
}

/// Handler for `POST /agent/message`.
pub async fn message_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    let text = required(payload.text, "text")?;

    let reply = state
        .orchestrator
        .reply_to_text(
            &text,
            payload.room_name.as_deref(),
            payload.conversation_id.as_deref(),
            payload.dynamic_variables,
        )
        .await?;

    Ok(Json(MessageResponse::from_reply(
        text,
        reply,
        "Message processed successfully",
    )))
}

/// Handler for `POST /agent/message-with-emotion`.
pub async fn message_with_emotion_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    let text = required(payload.text, "text")?;

    let reply = state
        .orchestrator
        .reply_to_text_with_emotion(
            &text,
            payload.room_name.as_deref(),
            payload.conversation_id.as_deref(),
            payload.dynamic_variables,
        )
        .await?;

    Ok(Json(MessageResponse::from_reply(
        text,
        reply,
        "Message processed successfully with emotion awareness",
    )))
}

/// Handler for `POST /agent/transcribe`. Expects a multipart field named `audio`.
pub async fn transcribe_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read audio upload: {}", e)))?;
        upload = Some((bytes, filename));
        break;
    }

    let (audio, filename) =
        upload.ok_or_else(|| ApiError::BadRequest("audio file is required".to_string()))?;
    tracing::info!(bytes = audio.len(), filename = ?filename, "transcribing upload");

    let transcription = state
        .orchestrator
        .transcribe(audio.to_vec(), filename.as_deref())
        .await?;

    Ok(Json(TranscribeResponse {
        success: true,
        transcription,
        message: "Audio transcribed successfully".to_string(),
    }))
}

/// Handler for `GET /agent/voices`.
pub async fn voices_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<VoicesResponse>, ApiError> {
    let voices = state.orchestrator.vendor().list_voices().await?;
    Ok(Json(VoicesResponse {
        success: true,
        voices,
    }))
}

/// Handler for `GET /agent/conversation-token`.
pub async fn conversation_token_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = state.orchestrator.vendor().conversation_token().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "conversationToken": token,
    })))
}

/// Handler for `GET /agent/signed-url`.
pub async fn signed_url_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signed_url = state.orchestrator.vendor().conversation_signed_url().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "signedUrl": signed_url,
    })))
}
