//! [`RoomTransport`] backed by the LiveKit Rust SDK.
//!
//! Joining a room publishes one microphone-sourced audio track fed by a
//! [`NativeAudioSource`]. Every utterance handed to
//! [`RoomTransport::publish_frames`] is captured into that source frame by
//! frame, so the SDK paces playback. Room events are translated into
//! [`TransportEvent`]s on a forwarding task.

use crate::error::VoiceError;
use crate::transport::{RoomSession, RoomTransport, TrackKind, TransportEvent};
use async_trait::async_trait;
use carrie_types::{AudioFrame, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
use livekit::options::TrackPublishOptions;
use livekit::prelude::{
    DisconnectReason, LocalAudioTrack, LocalTrack, Room, RoomEvent, RoomOptions,
    TrackKind as RtcTrackKind, TrackSource,
};
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::prelude::{AudioFrame as RtcAudioFrame, AudioSourceOptions, RtcAudioSource};
use std::borrow::Cow;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const TRACK_NAME: &str = "agent-voice";
/// Audio the native source buffers ahead of the encoder.
const SOURCE_QUEUE_MS: u32 = 1000;

struct LiveKitSession {
    room: Room,
    source: NativeAudioSource,
    forwarder: JoinHandle<()>,
}

/// Joins real LiveKit rooms and publishes the agent's voice on them.
pub struct LiveKitTransport {
    sample_rate: u32,
    channels: u16,
    session: Mutex<Option<LiveKitSession>>,
}

impl LiveKitTransport {
    pub fn new() -> Self {
        Self::with_format(DEFAULT_SAMPLE_RATE, DEFAULT_CHANNELS)
    }

    /// Format of the published track. Frames must match it.
    pub fn with_format(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            session: Mutex::new(None),
        }
    }
}

impl Default for LiveKitTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomTransport for LiveKitTransport {
    async fn connect(&self, url: &str, token: &str) -> Result<RoomSession, VoiceError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(VoiceError::RoomService(
                "transport is already connected to a room".to_string(),
            ));
        }

        let (room, room_events) = Room::connect(url, token, RoomOptions::default())
            .await
            .map_err(|e| VoiceError::RoomService(format!("failed to join room: {}", e)))?;
        let room_name = room.name();

        let source = NativeAudioSource::new(
            AudioSourceOptions {
                echo_cancellation: false,
                noise_suppression: false,
                auto_gain_control: false,
            },
            self.sample_rate,
            u32::from(self.channels),
            SOURCE_QUEUE_MS,
        );
        let track =
            LocalAudioTrack::create_audio_track(TRACK_NAME, RtcAudioSource::Native(source.clone()));
        let options = TrackPublishOptions {
            source: TrackSource::Microphone,
            ..Default::default()
        };

        if let Err(e) = room
            .local_participant()
            .publish_track(LocalTrack::Audio(track), options)
            .await
        {
            error!(room = %room_name, error = %e, "failed to publish agent audio track");
            if let Err(close_err) = room.close().await {
                warn!(error = %close_err, "failed to leave room after publish failure");
            }
            return Err(VoiceError::RoomService(format!(
                "failed to publish audio track: {}",
                e
            )));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let forwarder = tokio::spawn(forward_events(room_events, tx));
        *session = Some(LiveKitSession {
            room,
            source,
            forwarder,
        });

        info!(url, room = %room_name, "joined LiveKit room");
        Ok(RoomSession {
            room_name,
            events: rx,
        })
    }

    async fn publish_frames(&self, frames: Vec<AudioFrame>) -> Result<(), VoiceError> {
        let source = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|session| session.source.clone())
            .ok_or_else(|| {
                VoiceError::RoomService("transport is not connected to a room".to_string())
            })?;

        let count = frames.len();
        for frame in &frames {
            let rtc_frame = rtc_frame(frame, self.channels);
            source
                .capture_frame(&rtc_frame)
                .await
                .map_err(|e| VoiceError::RoomService(format!("failed to capture frame: {}", e)))?;
        }
        debug!(frames = count, "published frames to LiveKit room");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        session.forwarder.abort();
        session
            .room
            .close()
            .await
            .map_err(|e| VoiceError::RoomService(format!("failed to leave room: {}", e)))?;
        info!("left LiveKit room");
        Ok(())
    }
}

/// Reinterprets an s16le frame as the SDK's interleaved sample frame.
fn rtc_frame(frame: &AudioFrame, channels: u16) -> RtcAudioFrame<'static> {
    let samples = frame.samples();
    let samples_per_channel = samples.len() / usize::from(channels.max(1));
    RtcAudioFrame {
        data: Cow::Owned(samples),
        sample_rate: frame.sample_rate(),
        num_channels: u32::from(channels),
        samples_per_channel: samples_per_channel as u32,
    }
}

fn disconnect_reason(reason: DisconnectReason) -> Option<String> {
    match reason {
        DisconnectReason::UnknownReason => None,
        other => Some(format!("{:?}", other)),
    }
}

fn translate(event: RoomEvent) -> Option<TransportEvent> {
    match event {
        RoomEvent::ParticipantConnected(participant) => Some(TransportEvent::ParticipantConnected {
            identity: participant.identity().to_string(),
        }),
        RoomEvent::ParticipantDisconnected(participant) => {
            Some(TransportEvent::ParticipantDisconnected {
                identity: participant.identity().to_string(),
            })
        }
        RoomEvent::TrackSubscribed {
            track, participant, ..
        } => {
            let kind = match track.kind() {
                RtcTrackKind::Audio => TrackKind::Audio,
                RtcTrackKind::Video => TrackKind::Video,
            };
            Some(TransportEvent::TrackSubscribed {
                participant: participant.identity().to_string(),
                kind,
                track_sid: track.sid().to_string(),
            })
        }
        RoomEvent::TrackUnsubscribed {
            track, participant, ..
        } => Some(TransportEvent::TrackUnsubscribed {
            participant: participant.identity().to_string(),
            track_sid: track.sid().to_string(),
        }),
        RoomEvent::Disconnected { reason } => Some(TransportEvent::Disconnected {
            reason: disconnect_reason(reason),
        }),
        _ => None,
    }
}

async fn forward_events(
    mut room_events: mpsc::UnboundedReceiver<RoomEvent>,
    tx: mpsc::Sender<TransportEvent>,
) {
    while let Some(event) = room_events.recv().await {
        let Some(event) = translate(event) else {
            continue;
        };
        let last = matches!(event, TransportEvent::Disconnected { .. });
        if tx.send(event).await.is_err() || last {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_samples_are_little_endian() {
        let frame = AudioFrame::new(vec![0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0xff, 0x7f], 48_000);
        let rtc = rtc_frame(&frame, 1);
        assert_eq!(&rtc.data[..], &[1, -1, i16::MIN, i16::MAX]);
        assert_eq!(rtc.sample_rate, 48_000);
        assert_eq!(rtc.num_channels, 1);
        assert_eq!(rtc.samples_per_channel, 4);
    }

    #[test]
    fn stereo_frame_counts_samples_per_channel() {
        let frame = AudioFrame::new(vec![0u8; 3840], 48_000);
        let rtc = rtc_frame(&frame, 2);
        assert_eq!(rtc.data.len(), 1920);
        assert_eq!(rtc.samples_per_channel, 960);
    }

    #[test]
    fn unknown_disconnect_reason_is_dropped() {
        assert_eq!(disconnect_reason(DisconnectReason::UnknownReason), None);
        assert_eq!(
            disconnect_reason(DisconnectReason::RoomDeleted).as_deref(),
            Some("RoomDeleted")
        );
    }

    #[tokio::test]
    async fn publish_requires_connection() {
        let transport = LiveKitTransport::new();
        let result = transport.publish_frames(Vec::new()).await;
        assert!(matches!(result, Err(VoiceError::RoomService(_))));
    }

    #[tokio::test]
    async fn disconnect_without_room_is_a_no_op() {
        let transport = LiveKitTransport::new();
        assert!(transport.disconnect().await.is_ok());
    }
}
