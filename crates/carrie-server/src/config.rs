//! Server configuration loading from file and environment variables.

use carrie_agent::DEFAULT_DETECTOR_URL;
use carrie_voice::{LiveKitConfig, VendorConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// LiveKit deployment used for join tokens and room queries.
    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// Speech vendor credentials and voice selection.
    #[serde(default)]
    pub vendor: VendorConfig,

    /// Face-expression detector.
    #[serde(default)]
    pub emotion: EmotionConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "carrie_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmotionConfig {
    #[serde(default = "default_detector_url")]
    pub detector_url: String,

    /// Bound on the signal fetch made before an emotion-aware reply.
    #[serde(default = "default_signal_timeout_ms")]
    pub signal_timeout_ms: u64,
}

impl EmotionConfig {
    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_detector_url() -> String {
    DEFAULT_DETECTOR_URL.to_string()
}

fn default_signal_timeout_ms() -> u64 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            detector_url: default_detector_url(),
            signal_timeout_ms: default_signal_timeout_ms(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides (see [`apply_env_overrides`]).
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Overlays environment values onto `config`.
///
/// - `CARRIE_HOST`, `CARRIE_PORT` override `server.*` (unparseable values are ignored)
/// - `CARRIE_LOG_LEVEL`, `CARRIE_LOG_JSON` override `logging.*` (`"true"` or `"1"` enables JSON)
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET` override `livekit.*`
/// - `ELEVENLABS_API_KEY`, `ELEVENLABS_VOICE_ID`, `ELEVENLABS_AGENT_ID` override `vendor.*`
/// - `EMOTION_DETECTOR_URL` overrides `emotion.detector_url`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("CARRIE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("CARRIE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("CARRIE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("CARRIE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    if let Some(url) = lookup("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Some(key) = lookup("LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Some(secret) = lookup("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }

    if let Some(key) = lookup("ELEVENLABS_API_KEY") {
        config.vendor.api_key = key;
    }
    if let Some(voice) = lookup("ELEVENLABS_VOICE_ID") {
        config.vendor.voice_id = voice;
    }
    if let Some(agent) = lookup("ELEVENLABS_AGENT_ID") {
        config.vendor.agent_id = Some(agent);
    }

    if let Some(url) = lookup("EMOTION_DETECTOR_URL") {
        config.emotion.detector_url = url;
    }
}
