use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("LiveKit API error: {0}")]
    LiveKit(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Room service error: {0}")]
    RoomService(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The vendor rejected the API key or agent id (HTTP 401/403).
    #[error("Speech vendor authentication failed: {0}")]
    Auth(String),

    /// The vendor endpoint does not exist for this account (HTTP 404).
    #[error("Speech vendor feature unavailable: {0}")]
    NotConfigured(String),

    #[error("Speech vendor error: {0}")]
    Vendor(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Audio transcode failed: {0}")]
    Transcode(String),

    #[error("Agent is already speaking")]
    Busy,
}
