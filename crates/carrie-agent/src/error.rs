use carrie_voice::VoiceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to transcribe audio: {0}")]
    TranscriptionFailed(String),

    #[error("Failed to generate speech: {0}")]
    SynthesisFailed(String),

    #[error("Emotion detector unavailable: {0}")]
    EmotionUnavailable(String),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}
