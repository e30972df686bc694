#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use carrie_agent::EmotionClient;
use carrie_server::{app, AppState};
use carrie_voice::{LiveKitConfig, SpeechVendorClient, VendorConfig, VoiceService};
use serde_json::Value;
use tower::ServiceExt; // for oneshot

pub const VOICE: &str = "voice-test";
pub const LIVEKIT_URL: &str = "ws://localhost:7880";
pub const LIVEKIT_KEY: &str = "devkey";
pub const LIVEKIT_SECRET: &str = "devsecret";

pub struct TestApp {
    pub vendor_base: String,
    pub detector_base: String,
    pub agent_id: Option<String>,
    pub livekit: LiveKitConfig,
}

impl TestApp {
    pub fn new(vendor_base: &str, detector_base: &str) -> Self {
        Self {
            vendor_base: vendor_base.to_string(),
            detector_base: detector_base.to_string(),
            agent_id: None,
            livekit: LiveKitConfig::new(LIVEKIT_URL, LIVEKIT_KEY, LIVEKIT_SECRET),
        }
    }

    pub fn with_agent(mut self, agent_id: &str) -> Self {
        self.agent_id = Some(agent_id.to_string());
        self
    }

    pub fn without_livekit(mut self) -> Self {
        self.livekit = LiveKitConfig::default();
        self
    }

    pub fn state(&self) -> AppState {
        let mut vendor = VendorConfig::new("test-key").with_base_url(self.vendor_base.as_str());
        vendor.voice_id = VOICE.to_string();
        if let Some(agent_id) = &self.agent_id {
            vendor = vendor.with_agent_id(agent_id.as_str());
        }

        AppState::new(
            Arc::new(VoiceService::new(self.livekit.clone())),
            Arc::new(SpeechVendorClient::new(vendor).unwrap()),
            EmotionClient::new(self.detector_base.as_str()),
        )
    }

    pub fn router(&self) -> Router {
        app(self.state())
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sends `request` and parses the body as JSON.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}
