use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_vendor_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_voice_id() -> String {
    // "Rachel"
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_model_id() -> String {
    "eleven_monolingual_v1".to_string()
}

fn default_stt_model_id() -> String {
    "scribe_v1".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveKitConfig {
    pub url: String,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

/// Speech vendor (ElevenLabs) settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Hosted conversational agent. Without it replies come from the local responder.
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default = "default_vendor_base_url")]
    pub base_url: String,
    #[serde(default = "default_stt_model_id")]
    pub stt_model_id: String,
    /// Per-request timeout. Unset means the HTTP client's own behaviour.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: default_voice_id(),
            model_id: default_model_id(),
            agent_id: None,
            base_url: default_vendor_base_url(),
            stt_model_id: default_stt_model_id(),
            request_timeout_secs: None,
        }
    }
}

impl fmt::Debug for VendorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorConfig")
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("agent_id", &self.agent_id)
            .field("base_url", &self.base_url)
            .field("stt_model_id", &self.stt_model_id)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl VendorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The configured agent id, treating an empty string as unset.
    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
