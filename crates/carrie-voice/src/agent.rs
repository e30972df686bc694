//! An AI participant bound to one realtime room.

use crate::audio::AudioBridge;
use crate::error::VoiceError;
use crate::transport::{RoomTransport, TrackKind, TransportEvent};
use crate::vendor::SpeechVendorClient;
use carrie_types::{
    Notifier, ObserverId, DEFAULT_CHANNELS, DEFAULT_FRAME_SAMPLES, DEFAULT_SAMPLE_RATE,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const DEFAULT_GREETING: &str = "Hello! I am your AI assistant. How can I help you today?";

/// What `speak` does when the agent is already speaking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakPolicy {
    /// Discard the new utterance.
    #[default]
    Drop,
    /// Wait for the current utterance to finish.
    Queue,
    /// Fail with [`VoiceError::Busy`].
    Reject,
}

#[derive(Debug, Clone)]
pub struct RoomAgentConfig {
    pub url: String,
    pub token: String,
    pub auto_greet: bool,
    pub greeting: String,
    pub speak_policy: SpeakPolicy,
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_samples: usize,
}

impl RoomAgentConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            auto_greet: false,
            greeting: DEFAULT_GREETING.to_string(),
            speak_policy: SpeakPolicy::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            frame_samples: DEFAULT_FRAME_SAMPLES,
        }
    }

    pub fn with_policy(mut self, policy: SpeakPolicy) -> Self {
        self.speak_policy = policy;
        self
    }

    pub fn with_auto_greet(mut self, greeting: Option<String>) -> Self {
        self.auto_greet = true;
        if let Some(greeting) = greeting {
            self.greeting = greeting;
        }
        self
    }
}

/// Result of one `speak` call that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakOutcome {
    Spoken { frames: usize },
    /// Another utterance was in progress under [`SpeakPolicy::Drop`].
    Dropped,
    /// The pipeline failed; the reason was also sent as `SpeechFailed`.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoomNotification {
    Connected {
        room: String,
    },
    ParticipantJoined {
        identity: String,
    },
    ParticipantLeft {
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
    AudioReceived {
        participant: String,
        track_sid: String,
    },
    SpeechComplete {
        text: String,
        frames: usize,
    },
    SpeechFailed {
        text: String,
        error: String,
    },
    Disconnected {
        reason: Option<String>,
    },
}

pub struct RoomAgent {
    vendor: Arc<SpeechVendorClient>,
    bridge: AudioBridge,
    transport: Arc<dyn RoomTransport>,
    config: RoomAgentConfig,
    notifier: Arc<Notifier<RoomNotification>>,
    speaking: Mutex<()>,
    speaking_flag: AtomicBool,
    connected: Arc<AtomicBool>,
    room_name: RwLock<Option<String>>,
    pump: StdMutex<Option<JoinHandle<()>>>,
}

impl RoomAgent {
    pub fn new(
        config: RoomAgentConfig,
        vendor: Arc<SpeechVendorClient>,
        bridge: AudioBridge,
        transport: Arc<dyn RoomTransport>,
    ) -> Self {
        Self {
            vendor,
            bridge,
            transport,
            config,
            notifier: Arc::new(Notifier::new()),
            speaking: Mutex::new(()),
            speaking_flag: AtomicBool::new(false),
            connected: Arc::new(AtomicBool::new(false)),
            room_name: RwLock::new(None),
            pump: StdMutex::new(None),
        }
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&RoomNotification) + Send + Sync + 'static,
    {
        self.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Joins the room and starts forwarding its events.
    ///
    /// Transport failures are returned to the caller. A failed greeting is
    /// only reported through `SpeechFailed`.
    pub async fn connect(&self) -> Result<(), VoiceError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(VoiceError::RoomService(
                "agent is already connected".to_string(),
            ));
        }

        info!(url = %self.config.url, "agent connecting to room");
        let session = self
            .transport
            .connect(&self.config.url, &self.config.token)
            .await
            .map_err(|e| {
                error!(error = %e, "agent connection failed");
                e
            })?;

        let room = session.room_name.clone();
        self.connected.store(true, Ordering::SeqCst);
        *self
            .room_name
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(room.clone());

        let handle = tokio::spawn(pump_events(
            session.events,
            Arc::clone(&self.transport),
            Arc::clone(&self.notifier),
            Arc::clone(&self.connected),
        ));
        if let Some(previous) = self
            .pump
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(handle)
        {
            previous.abort();
        }
        info!(room = %room, "agent connected");

        if self.config.auto_greet {
            let greeting = self.config.greeting.clone();
            if let Err(e) = self.speak(&greeting).await {
                warn!(error = %e, "greeting was not spoken");
            }
        }

        self.notifier.emit(&RoomNotification::Connected { room });
        Ok(())
    }

    /// Synthesizes `text` and publishes it to the room.
    ///
    /// Only [`SpeakPolicy::Reject`] returns an error, and only when busy.
    /// Pipeline failures come back as [`SpeakOutcome::Failed`], as does a
    /// call made while the agent is not in a room. Nothing is synthesized
    /// in that case.
    pub async fn speak(&self, text: &str) -> Result<SpeakOutcome, VoiceError> {
        let _guard = match self.config.speak_policy {
            SpeakPolicy::Drop => match self.speaking.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    info!(text, "agent is already speaking, dropping utterance");
                    return Ok(SpeakOutcome::Dropped);
                }
            },
            SpeakPolicy::Reject => self.speaking.try_lock().map_err(|_| VoiceError::Busy)?,
            SpeakPolicy::Queue => self.speaking.lock().await,
        };
        let _flag = SpeakingFlag::raise(&self.speaking_flag);

        let result = if self.is_connected() {
            info!(text, "agent speaking");
            self.render_and_publish(text).await
        } else {
            Err(VoiceError::RoomService(
                "agent is not connected to a room".to_string(),
            ))
        };

        match result {
            Ok(frames) => {
                info!(frames, "speech published");
                self.notifier.emit(&RoomNotification::SpeechComplete {
                    text: text.to_string(),
                    frames,
                });
                Ok(SpeakOutcome::Spoken { frames })
            }
            Err(e) => {
                error!(error = %e, "failed to speak");
                let message = e.to_string();
                self.notifier.emit(&RoomNotification::SpeechFailed {
                    text: text.to_string(),
                    error: message.clone(),
                });
                Ok(SpeakOutcome::Failed(message))
            }
        }
    }

    async fn render_and_publish(&self, text: &str) -> Result<usize, VoiceError> {
        let audio = self.vendor.synthesize(text).await?;
        let pcm = self
            .bridge
            .to_pcm(&audio, self.config.sample_rate, self.config.channels)
            .await?;
        let frames =
            AudioBridge::to_frames(&pcm, self.config.sample_rate, self.config.frame_samples);
        let count = frames.len();
        self.transport.publish_frames(frames).await?;
        Ok(count)
    }

    /// Leaves the room. Calling it again is a no-op.
    pub async fn disconnect(&self) -> Result<(), VoiceError> {
        if let Some(pump) = self
            .pump
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            pump.abort();
        }

        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        info!("agent disconnecting");
        self.transport.disconnect().await?;
        self.notifier
            .emit(&RoomNotification::Disconnected { reason: None });
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking_flag.load(Ordering::SeqCst)
    }

    pub fn room_name(&self) -> Option<String> {
        self.room_name
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Drop for RoomAgent {
    fn drop(&mut self) {
        if let Some(pump) = self
            .pump
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            pump.abort();
        }
    }
}

/// Lowers the speaking flag on every exit path.
struct SpeakingFlag<'a>(&'a AtomicBool);

impl<'a> SpeakingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SpeakingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn pump_events(
    mut events: tokio::sync::mpsc::Receiver<TransportEvent>,
    transport: Arc<dyn RoomTransport>,
    notifier: Arc<Notifier<RoomNotification>>,
    connected: Arc<AtomicBool>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::ParticipantConnected { identity } => {
                info!(participant = %identity, "participant joined");
                notifier.emit(&RoomNotification::ParticipantJoined { identity });
            }
            TransportEvent::ParticipantDisconnected { identity } => {
                info!(participant = %identity, "participant left");
                notifier.emit(&RoomNotification::ParticipantLeft { identity });
            }
            TransportEvent::TrackSubscribed {
                participant,
                kind,
                track_sid,
            } => {
                info!(participant = %participant, ?kind, track = %track_sid, "track subscribed");
                notifier.emit(&RoomNotification::TrackSubscribed {
                    participant: participant.clone(),
                    kind,
                    track_sid: track_sid.clone(),
                });
                if kind == TrackKind::Audio {
                    notifier.emit(&RoomNotification::AudioReceived {
                        participant,
                        track_sid,
                    });
                }
            }
            TransportEvent::TrackUnsubscribed {
                participant,
                track_sid,
            } => {
                info!(participant = %participant, track = %track_sid, "track unsubscribed");
                notifier.emit(&RoomNotification::TrackUnsubscribed {
                    participant,
                    track_sid,
                });
            }
            TransportEvent::Disconnected { reason } => {
                info!(reason = reason.as_deref().unwrap_or("none"), "room disconnected");
                connected.store(false, Ordering::SeqCst);
                if let Err(e) = transport.disconnect().await {
                    warn!(error = %e, "failed to release transport after room disconnect");
                }
                notifier.emit(&RoomNotification::Disconnected { reason });
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_from_lowercase() {
        let policy: SpeakPolicy = serde_json::from_str("\"queue\"").unwrap();
        assert_eq!(policy, SpeakPolicy::Queue);
        assert_eq!(SpeakPolicy::default(), SpeakPolicy::Drop);
    }

    #[test]
    fn config_defaults_to_twenty_ms_frames() {
        let config = RoomAgentConfig::new("ws://lk", "token");
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.frame_samples, 960);
        assert!(!config.auto_greet);
    }
}
