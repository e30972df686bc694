//! Voice infrastructure for the Carrie companion backend.
//!
//! Wraps the two external platforms the agent talks through: the speech
//! vendor (text-to-speech, speech-to-text, hosted conversational AI) and
//! the realtime media room (LiveKit join tokens, room service, and the
//! transport the agent publishes its voice on). Audio format conversion is
//! delegated to an external `ffmpeg` process.
//!
//! The flow for an agent turn is: text is synthesized by the vendor as
//! MP3, transcoded to 48 kHz mono PCM, cut into 20 ms frames, and handed to
//! the room transport one frame batch per utterance.

pub mod agent;
pub mod audio;
pub mod config;
pub mod error;
#[cfg(feature = "livekit-rtc")]
pub mod rtc;
pub mod service;
pub mod transport;
pub mod vendor;

pub use agent::{RoomAgent, RoomAgentConfig, RoomNotification, SpeakOutcome, SpeakPolicy};
pub use audio::AudioBridge;
pub use config::{LiveKitConfig, VendorConfig};
pub use error::VoiceError;
#[cfg(feature = "livekit-rtc")]
pub use rtc::LiveKitTransport;
pub use service::{ParticipantSummary, VoiceService};
pub use transport::{
    LocalRoomHandle, LocalTransport, RoomSession, RoomTransport, TrackKind, TransportEvent,
};
pub use vendor::{AudioStream, ConverseReply, DynamicVariables, SpeechVendorClient, VoiceInfo};
