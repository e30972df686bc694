//! Realtime room transport.
//!
//! [`RoomTransport`] is the seam between the agent and the media SFU.
//! `LiveKitTransport` (feature `livekit-rtc`) joins real rooms through the
//! LiveKit SDK. The in-process [`LocalTransport`] connects to a simulated
//! room whose events are injected through a [`LocalRoomHandle`].

use crate::error::VoiceError;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use carrie_types::AudioFrame;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Capacity of the per-session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Lifecycle event raised by the room.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    ParticipantConnected {
        identity: String,
    },
    ParticipantDisconnected {
        identity: String,
    },
    TrackSubscribed {
        participant: String,
        kind: TrackKind,
        track_sid: String,
    },
    TrackUnsubscribed {
        participant: String,
        track_sid: String,
    },
    Disconnected {
        reason: Option<String>,
    },
}

/// An established room connection.
#[derive(Debug)]
pub struct RoomSession {
    pub room_name: String,
    pub events: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// Joins the room the token grants access to.
    async fn connect(&self, url: &str, token: &str) -> Result<RoomSession, VoiceError>;

    /// Publishes one utterance worth of PCM frames, in order.
    async fn publish_frames(&self, frames: Vec<AudioFrame>) -> Result<(), VoiceError>;

    async fn disconnect(&self) -> Result<(), VoiceError>;
}

#[derive(Default)]
struct LocalState {
    events: Option<mpsc::Sender<TransportEvent>>,
    room_name: Option<String>,
    published: Vec<Vec<AudioFrame>>,
    fail_connect: Option<String>,
}

/// In-process transport backed by a simulated room.
#[derive(Clone, Default)]
pub struct LocalTransport {
    state: Arc<Mutex<LocalState>>,
}

/// Test and simulation handle for a [`LocalTransport`].
#[derive(Clone)]
pub struct LocalRoomHandle {
    state: Arc<Mutex<LocalState>>,
}

#[derive(Deserialize)]
struct TokenClaims {
    #[serde(default)]
    video: Option<VideoClaims>,
}

#[derive(Deserialize)]
struct VideoClaims {
    #[serde(default)]
    room: Option<String>,
}

fn lock(state: &Mutex<LocalState>) -> MutexGuard<'_, LocalState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reads the `video.room` claim from a join token without verifying it.
fn room_from_token(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: TokenClaims = serde_json::from_slice(&decoded).ok()?;
    claims.video?.room.filter(|room| !room.is_empty())
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> LocalRoomHandle {
        LocalRoomHandle {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl RoomTransport for LocalTransport {
    async fn connect(&self, url: &str, token: &str) -> Result<RoomSession, VoiceError> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.fail_connect.clone() {
            return Err(VoiceError::RoomService(reason));
        }
        if token.is_empty() {
            return Err(VoiceError::RoomService("join token is empty".to_string()));
        }

        let room_name = room_from_token(token).unwrap_or_else(|| "local".to_string());
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        state.events = Some(tx);
        state.room_name = Some(room_name.clone());

        info!(url, room = %room_name, "connected to local room");
        Ok(RoomSession {
            room_name,
            events: rx,
        })
    }

    async fn publish_frames(&self, frames: Vec<AudioFrame>) -> Result<(), VoiceError> {
        let count = frames.len();
        let mut state = lock(&self.state);
        if state.events.is_none() {
            return Err(VoiceError::RoomService(
                "transport is not connected to a room".to_string(),
            ));
        }
        state.published.push(frames);
        debug!(frames = count, "published frames to local room");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        let mut state = lock(&self.state);
        state.events = None;
        state.room_name = None;
        Ok(())
    }
}

impl LocalRoomHandle {
    /// Delivers an event to the connected session. Returns false when nobody is listening.
    pub async fn emit(&self, event: TransportEvent) -> bool {
        let sender = lock(&self.state).events.clone();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Makes subsequent `connect` calls fail with `reason`.
    pub fn fail_connect(&self, reason: impl Into<String>) {
        lock(&self.state).fail_connect = Some(reason.into());
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).events.is_some()
    }

    pub fn room_name(&self) -> Option<String> {
        lock(&self.state).room_name.clone()
    }

    /// Frame batches published so far, one per utterance.
    pub fn published(&self) -> Vec<Vec<AudioFrame>> {
        lock(&self.state).published.clone()
    }
}
