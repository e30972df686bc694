//! Carrie server library logic.

pub mod api;
pub mod api_agent;
pub mod api_emotion;
pub mod api_livekit;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use carrie_agent::{AgentRegistry, EmotionClient, Orchestrator};
use carrie_voice::{SpeechVendorClient, VoiceError, VoiceService};
use config::Config;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Upper bound for `POST /agent/transcribe` uploads.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Deployed agents, keyed by id.
    pub registry: Arc<AgentRegistry>,
    /// Reply pipeline: emotion, hosted agent or rules, synthesis.
    pub orchestrator: Arc<Orchestrator>,
    /// LiveKit token issuer and room service.
    pub voice_service: Arc<VoiceService>,
}

impl AppState {
    /// Wires the services described by `config`.
    ///
    /// Missing vendor or LiveKit credentials do not fail startup; the
    /// affected routes answer with `configuration_error` instead.
    pub fn from_config(config: &Config) -> Result<Self, VoiceError> {
        let voice_service = Arc::new(VoiceService::new(config.livekit.clone()));
        let vendor = Arc::new(SpeechVendorClient::new(config.vendor.clone())?);
        let emotion = EmotionClient::new(config.emotion.detector_url.clone())
            .with_timeout(config.emotion.signal_timeout());

        Ok(Self::new(voice_service, vendor, emotion))
    }

    pub fn new(
        voice_service: Arc<VoiceService>,
        vendor: Arc<SpeechVendorClient>,
        emotion: EmotionClient,
    ) -> Self {
        let registry = AgentRegistry::new(voice_service.clone());
        Self {
            registry: Arc::new(registry),
            orchestrator: Arc::new(Orchestrator::new(vendor, emotion)),
            voice_service,
        }
    }
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agent/deploy", post(api_agent::deploy_handler))
        .route("/agent/list", get(api_agent::list_handler))
        .route("/agent/room/{roomName}", get(api_agent::room_agents_handler))
        .route("/agent/speak", post(api_agent::speak_handler))
        .route("/agent/message", post(api_agent::message_handler))
        .route(
            "/agent/message-with-emotion",
            post(api_agent::message_with_emotion_handler),
        )
        .route(
            "/agent/transcribe",
            post(api_agent::transcribe_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/agent/voices", get(api_agent::voices_handler))
        .route(
            "/agent/conversation-token",
            get(api_agent::conversation_token_handler),
        )
        .route("/agent/signed-url", get(api_agent::signed_url_handler))
        .route(
            "/agent/{agentId}",
            get(api_agent::get_agent_handler).delete(api_agent::remove_agent_handler),
        )
        .route("/emotion/current", get(api_emotion::current_handler))
        .route(
            "/emotion/process-frame",
            post(api_emotion::process_frame_handler),
        )
        .route("/emotion/webhook", get(api_emotion::webhook_handler))
        .route("/livekit/token", post(api_livekit::token_handler))
        .route(
            "/livekit/rooms/{roomName}/participants",
            get(api_livekit::participants_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
