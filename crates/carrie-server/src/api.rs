//! Error type shared by every handler.
//!
//! Bodies are always `{"error": <code>, "message": <text>}` where `code` is
//! stable and safe to match on in clients.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use carrie_agent::AgentError;
use carrie_voice::VoiceError;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("vendor authentication failed: {0}")]
    VendorAuth(String),
    #[error("vendor feature unavailable: {0}")]
    VendorNotConfigured(String),
    #[error("vendor error: {0}")]
    Vendor(String),
    #[error("room service error: {0}")]
    RoomService(String),
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),
    #[error("emotion detector unavailable: {0}")]
    EmotionUnavailable(String),
    #[error("transcode failed: {0}")]
    Transcode(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::VendorNotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::VendorAuth(_)
            | ApiError::Vendor(_)
            | ApiError::RoomService(_)
            | ApiError::TranscriptionFailed(_)
            | ApiError::SynthesisFailed(_)
            | ApiError::EmotionUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Transcode(_) | ApiError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Configuration(_) => "configuration_error",
            ApiError::VendorAuth(_) => "vendor_auth_error",
            ApiError::VendorNotConfigured(_) => "vendor_not_configured",
            ApiError::Vendor(_) => "vendor_error",
            ApiError::RoomService(_) => "room_service_error",
            ApiError::TranscriptionFailed(_) => "transcription_failed",
            ApiError::SynthesisFailed(_) => "synthesis_failed",
            ApiError::EmotionUnavailable(_) => "emotion_unavailable",
            ApiError::Transcode(_) => "transcode_error",
            ApiError::InternalServerError(_) => "internal_error",
        }
    }

    fn into_message(self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Configuration(msg)
            | ApiError::VendorAuth(msg)
            | ApiError::VendorNotConfigured(msg)
            | ApiError::Vendor(msg)
            | ApiError::RoomService(msg)
            | ApiError::TranscriptionFailed(msg)
            | ApiError::SynthesisFailed(msg)
            | ApiError::EmotionUnavailable(msg)
            | ApiError::Transcode(msg)
            | ApiError::InternalServerError(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }

        let body = Json(serde_json::json!({
            "error": code,
            "message": self.into_message(),
        }));

        (status, body).into_response()
    }
}

impl From<VoiceError> for ApiError {
    fn from(e: VoiceError) -> Self {
        match e {
            VoiceError::Config(msg) => ApiError::Configuration(msg),
            VoiceError::Auth(msg) => ApiError::VendorAuth(msg),
            VoiceError::NotConfigured(msg) => ApiError::VendorNotConfigured(msg),
            VoiceError::Vendor(msg) => ApiError::Vendor(msg),
            VoiceError::Synthesis(msg) => ApiError::SynthesisFailed(msg),
            VoiceError::Transcription(msg) => ApiError::TranscriptionFailed(msg),
            VoiceError::Transcode(msg) => ApiError::Transcode(msg),
            VoiceError::RoomService(msg) => ApiError::RoomService(msg),
            VoiceError::Busy => ApiError::Conflict(VoiceError::Busy.to_string()),
            other @ VoiceError::LiveKit(_) => ApiError::InternalServerError(other.to_string()),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::TranscriptionFailed(msg) => ApiError::TranscriptionFailed(msg),
            AgentError::SynthesisFailed(msg) => ApiError::SynthesisFailed(msg),
            AgentError::EmotionUnavailable(msg) => ApiError::EmotionUnavailable(msg),
            AgentError::Voice(inner) => inner.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
