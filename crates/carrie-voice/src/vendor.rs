//! HTTP client for the speech vendor (ElevenLabs).
//!
//! Every operation is a single request: no caching, no retries. Failures
//! are classified into [`VoiceError`] variants and the raw vendor body is
//! logged rather than parsed beyond the `detail`/`message` fields.

use crate::config::VendorConfig;
use crate::error::VoiceError;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Template variables injected into the hosted agent's prompt.
pub type DynamicVariables = BTreeMap<String, String>;

/// Lazily produced synthesized audio. Finite and not restartable.
pub type AudioStream = BoxStream<'static, Result<Bytes, VoiceError>>;

const DEFAULT_TRANSCRIBE_FILENAME: &str = "audio.mp3";
const TRANSCRIBE_CONTENT_TYPE: &str = "audio/webm";

/// Reply from the hosted conversational agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseReply {
    pub text: String,
    pub conversation_id: Option<String>,
    pub audio_url: Option<String>,
}

/// One entry from the vendor's voice catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub voice_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceInfo>,
}

#[derive(Debug, Clone)]
pub struct SpeechVendorClient {
    http: reqwest::Client,
    config: VendorConfig,
}

impl SpeechVendorClient {
    pub fn new(config: VendorConfig) -> Result<Self, VoiceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    /// Whether a hosted conversational agent is configured.
    pub fn has_agent(&self) -> bool {
        self.config.agent_id().is_some()
    }

    fn api_key(&self) -> Result<&str, VoiceError> {
        if self.config.api_key.trim().is_empty() {
            return Err(VoiceError::Config(
                "speech vendor API key is not configured (set ELEVENLABS_API_KEY)".to_string(),
            ));
        }
        Ok(&self.config.api_key)
    }

    fn agent_id(&self) -> Result<&str, VoiceError> {
        self.config.agent_id().ok_or_else(|| {
            VoiceError::Config(
                "speech vendor agent id is not configured (set ELEVENLABS_AGENT_ID)".to_string(),
            )
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn tts_request(&self, path: &str, text: &str) -> Result<reqwest::RequestBuilder, VoiceError> {
        let api_key = self.api_key()?;
        let body = json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
            },
        });

        Ok(self
            .http
            .post(self.url(path))
            .header("xi-api-key", api_key)
            .header("Accept", "audio/mpeg")
            .json(&body))
    }

    /// Synthesizes `text` and returns the whole compressed (MP3) payload.
    pub async fn synthesize(&self, text: &str) -> Result<Bytes, VoiceError> {
        let path = format!("text-to-speech/{}", self.config.voice_id);
        let response = self
            .tts_request(&path, text)?
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "speech synthesis request failed");
                VoiceError::Synthesis(e.to_string())
            })?;

        let response = ensure_synthesis_success(response).await?;
        let audio = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("failed to read audio body: {}", e)))?;

        debug!(bytes = audio.len(), chars = text.len(), "speech synthesized");
        Ok(audio)
    }

    /// Synthesizes `text` as a stream so playback can start on the first chunk.
    pub async fn synthesize_stream(&self, text: &str) -> Result<AudioStream, VoiceError> {
        let path = format!("text-to-speech/{}/stream", self.config.voice_id);
        let response = self
            .tts_request(&path, text)?
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "speech synthesis stream request failed");
                VoiceError::Synthesis(e.to_string())
            })?;

        let response = ensure_synthesis_success(response).await?;
        debug!(chars = text.len(), "speech synthesis stream started");

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| VoiceError::Synthesis(format!("stream interrupted: {}", e)))
            })
            .boxed())
    }

    /// Transcribes an uploaded recording.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<String, VoiceError> {
        let api_key = self.api_key()?;
        let byte_len = audio.len();
        let file = Part::bytes(audio)
            .file_name(filename.unwrap_or(DEFAULT_TRANSCRIBE_FILENAME).to_string())
            .mime_str(TRANSCRIBE_CONTENT_TYPE)
            .map_err(|e| VoiceError::Transcription(format!("invalid upload part: {}", e)))?;

        let form = Form::new()
            .part("file", file)
            .text("model_id", self.config.stt_model_id.clone())
            .text("tag_audio_events", "true")
            .text("diarize", "false");

        info!(bytes = byte_len, "transcribing audio");

        let response = self
            .http
            .post(self.url("speech-to-text"))
            .header("xi-api-key", api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceError::Transcription(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            error!(%status, body = %body, "transcription request rejected");
            let message = vendor_message(&body).unwrap_or_else(|| format!("HTTP {}", status));
            return Err(VoiceError::Transcription(message));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| VoiceError::Transcription(format!("invalid response JSON: {}", e)))?;

        let text = transcript_text(&value);
        debug!(chars = text.len(), "transcription complete");
        Ok(text)
    }

    /// Sends one user message to the hosted conversational agent.
    ///
    /// When `conversation_id` is given the vendor continues that context;
    /// otherwise it opens a new one and returns its id.
    pub async fn converse(
        &self,
        text: &str,
        conversation_id: Option<&str>,
        dynamic_variables: &DynamicVariables,
    ) -> Result<ConverseReply, VoiceError> {
        let agent_id = self.agent_id()?;
        let api_key = self.api_key()?;

        let mut body = json!({
            "agent_id": agent_id,
            "text": text,
        });
        if let Some(id) = conversation_id {
            body["conversation_id"] = json!(id);
        }
        if !dynamic_variables.is_empty() {
            body["dynamic_variables"] = json!(dynamic_variables);
        }

        info!(
            conversation_id = conversation_id.unwrap_or("<new>"),
            variables = dynamic_variables.len(),
            "sending message to hosted agent"
        );

        let response = self
            .http
            .post(self.url("convai/conversation"))
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Vendor(format!("conversational AI request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceError::Vendor(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            error!(%status, body = %body, "hosted agent request rejected");
            return Err(classify_converse_failure(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| VoiceError::Vendor(format!("invalid response JSON: {}", e)))?;

        let reply = ConverseReply {
            text: first_string(&value, &["text", "response", "message"]).unwrap_or_default(),
            conversation_id: first_string(&value, &["conversation_id"])
                .or_else(|| conversation_id.map(str::to_string)),
            audio_url: first_string(&value, &["audio_url"]),
        };

        debug!(
            conversation_id = reply.conversation_id.as_deref().unwrap_or("<none>"),
            "hosted agent replied"
        );
        Ok(reply)
    }

    /// Lists the voices available to this account.
    pub async fn list_voices(&self) -> Result<Vec<VoiceInfo>, VoiceError> {
        let value = self.get_json("voices", &[]).await?;
        let parsed: VoicesResponse = serde_json::from_value(value)
            .map_err(|e| VoiceError::Vendor(format!("invalid voices payload: {}", e)))?;
        Ok(parsed.voices)
    }

    /// Returns a signed WebSocket URL a browser can use to talk to the hosted agent.
    pub async fn conversation_signed_url(&self) -> Result<String, VoiceError> {
        let agent_id = self.agent_id()?.to_string();
        let value = self
            .get_json(
                "convai/conversation/get-signed-url",
                &[("agent_id", agent_id.as_str())],
            )
            .await?;
        first_string(&value, &["signed_url"])
            .ok_or_else(|| VoiceError::Vendor("response did not contain signed_url".to_string()))
    }

    /// Returns a WebRTC conversation token for the hosted agent.
    pub async fn conversation_token(&self) -> Result<String, VoiceError> {
        let agent_id = self.agent_id()?.to_string();
        let value = self
            .get_json("convai/conversation/token", &[("agent_id", agent_id.as_str())])
            .await?;
        first_string(&value, &["token"])
            .ok_or_else(|| VoiceError::Vendor("response did not contain token".to_string()))
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, VoiceError> {
        let api_key = self.api_key()?;
        let response = self
            .http
            .get(self.url(path))
            .header("xi-api-key", api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| VoiceError::Vendor(format!("request to {} failed: {}", path, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceError::Vendor(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            error!(%status, path, body = %body, "speech vendor request rejected");
            return Err(classify_converse_failure(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| VoiceError::Vendor(format!("invalid response JSON: {}", e)))
    }
}

async fn ensure_synthesis_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, VoiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(%status, body = %body, "speech synthesis rejected by vendor");
    Err(VoiceError::Synthesis(format!("vendor returned HTTP {}", status)))
}

/// Maps a failed vendor response onto the error taxonomy.
pub(crate) fn classify_converse_failure(status: StatusCode, body: &str) -> VoiceError {
    let detail = vendor_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VoiceError::Auth(detail.unwrap_or_else(
            || "check the API key and agent id".to_string(),
        )),
        StatusCode::NOT_FOUND => VoiceError::NotConfigured(detail.unwrap_or_else(|| {
            "endpoint not found; this feature may require a different plan".to_string()
        })),
        _ => VoiceError::Vendor(detail.unwrap_or_else(|| format!("HTTP {}", status))),
    }
}

/// Extracts the human-readable message from a vendor error body, if any.
///
/// The vendor reports `detail` either as a string or as an object with its
/// own `message`; some endpoints use a top-level `message` instead.
pub(crate) fn vendor_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Some(detail) = value.get("detail") {
        if let Some(s) = detail.as_str() {
            return Some(s.to_string());
        }
        if detail.is_object() {
            return Some(
                detail
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| detail.to_string()),
            );
        }
    }
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Transcript text: `text` first, then `transcript`, else empty.
pub(crate) fn transcript_text(value: &Value) -> String {
    first_string(value, &["text", "transcript"]).unwrap_or_default()
}

/// First non-empty string among `keys`, checked in order.
fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
