use crate::error::AgentError;
use carrie_types::EmotionSignal;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DETECTOR_URL: &str = "http://localhost:5000";

/// Bound on the signal fetch that precedes an emotion-aware reply.
const SIGNAL_TIMEOUT: Duration = Duration::from_secs(3);
/// Bound on the pass-through calls made on behalf of the browser.
const PASSTHROUGH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the external face-expression detector.
#[derive(Debug, Clone)]
pub struct EmotionClient {
    http: reqwest::Client,
    base_url: String,
    signal_timeout: Duration,
}

impl EmotionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            signal_timeout: SIGNAL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.signal_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current signal, or [`EmotionSignal::undetected`] on any failure.
    pub async fn fetch(&self) -> EmotionSignal {
        let url = format!("{}/api/webhook/emotion", self.base_url);
        let result = async {
            self.http
                .get(&url)
                .timeout(self.signal_timeout)
                .send()
                .await?
                .error_for_status()?
                .json::<EmotionSignal>()
                .await
        }
        .await;

        match result {
            Ok(signal) => {
                debug!(
                    emotion = %signal.emotion,
                    confidence = signal.confidence,
                    face_detected = signal.face_detected,
                    "emotion signal fetched"
                );
                signal
            }
            Err(e) => {
                debug!(error = %e, "could not fetch emotion signal");
                EmotionSignal::undetected()
            }
        }
    }

    /// Raw detector state from `GET /api/emotion`.
    pub async fn current(&self) -> Result<Value, AgentError> {
        let url = format!("{}/api/emotion", self.base_url);
        self.passthrough(self.http.get(url)).await
    }

    /// Forwards one encoded video frame to `POST /api/process_frame`.
    pub async fn process_frame(&self, frame: &str) -> Result<Value, AgentError> {
        let url = format!("{}/api/process_frame", self.base_url);
        self.passthrough(self.http.post(url).json(&json!({ "frame": frame })))
            .await
    }

    async fn passthrough(&self, request: reqwest::RequestBuilder) -> Result<Value, AgentError> {
        request
            .timeout(PASSTHROUGH_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AgentError::EmotionUnavailable(e.to_string()))?
            .json::<Value>()
            .await
            .map_err(|e| AgentError::EmotionUnavailable(e.to_string()))
    }
}

impl Default for EmotionClient {
    fn default() -> Self {
        Self::new(DEFAULT_DETECTOR_URL)
    }
}
