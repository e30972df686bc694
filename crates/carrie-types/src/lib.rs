//! Shared types for the Carrie voice-agent backend.
//!
//! This crate holds the data model passed between the voice, agent, and
//! server crates: deployed agent records, conversation turns, emotion
//! signals, PCM audio frames, and the observer list used for lifecycle
//! notifications.
//!
//! Nothing in here performs I/O. Keeping the model in a leaf crate lets the
//! voice and agent crates share it without depending on each other.

pub mod agent;
pub mod audio;
pub mod conversation;
pub mod emotion;
pub mod observer;

pub use agent::{AgentInstance, AgentStatus, ParseAgentStatusError};
pub use audio::{
    AudioFrame, BYTES_PER_SAMPLE, DEFAULT_CHANNELS, DEFAULT_FRAME_SAMPLES, DEFAULT_SAMPLE_RATE,
};
pub use conversation::{ConversationTurn, Role};
pub use emotion::EmotionSignal;
pub use observer::{Notifier, ObserverId};
