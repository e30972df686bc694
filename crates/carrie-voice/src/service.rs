use crate::config::LiveKitConfig;
use crate::error::VoiceError;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::RoomClient;
use livekit_protocol::ParticipantInfo;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Metadata attached to every agent join token.
const AGENT_METADATA: &str = r#"{"role":"agent","type":"elevenlabs"}"#;

/// A participant currently in a realtime room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub sid: String,
    pub identity: String,
    pub name: String,
    pub joined_at: i64,
}

impl From<ParticipantInfo> for ParticipantSummary {
    fn from(info: ParticipantInfo) -> Self {
        Self {
            sid: info.sid,
            identity: info.identity,
            name: info.name,
            joined_at: info.joined_at,
        }
    }
}

#[derive(Debug)]
pub struct VoiceService {
    config: LiveKitConfig,
    room_client: RoomClient,
}

impl VoiceService {
    pub fn new(config: LiveKitConfig) -> Self {
        let room_client =
            RoomClient::with_api_key(&config.url, &config.api_key, &config.api_secret);
        Self {
            config,
            room_client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.url.is_empty()
    }

    pub fn get_url(&self) -> &str {
        &self.config.url
    }

    fn ensure_credentials(&self) -> Result<(), VoiceError> {
        if self.config.api_key.is_empty() || self.config.api_secret.is_empty() {
            return Err(VoiceError::Config(
                "LiveKit credentials are not configured (set LIVEKIT_API_KEY and LIVEKIT_API_SECRET)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Mints a join token that can publish and subscribe in `room_name`.
    pub fn generate_join_token(
        &self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
        metadata: Option<&str>,
    ) -> Result<String, VoiceError> {
        self.ensure_credentials()?;

        let mut token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(participant_identity)
            .with_name(participant_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));
        if let Some(metadata) = metadata {
            token = token.with_metadata(metadata);
        }

        token.to_jwt().map_err(VoiceError::LiveKit)
    }

    /// Join token for the agent participant itself.
    pub fn generate_agent_token(
        &self,
        room_name: &str,
        identity: &str,
    ) -> Result<String, VoiceError> {
        self.generate_join_token(room_name, identity, identity, Some(AGENT_METADATA))
    }

    /// Minimal token for a browser participant: room join only.
    pub fn generate_participant_token(
        &self,
        room_name: &str,
        identity: &str,
        name: &str,
    ) -> Result<String, VoiceError> {
        self.ensure_credentials()?;

        let token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(identity)
            .with_name(name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        token.to_jwt().map_err(VoiceError::LiveKit)
    }

    /// Lists the participants of a room. A missing room yields an empty list.
    pub async fn list_participants(
        &self,
        room_name: &str,
    ) -> Result<Vec<ParticipantSummary>, VoiceError> {
        self.ensure_credentials()?;

        match self.room_client.list_participants(room_name).await {
            Ok(participants) => Ok(participants.into_iter().map(Into::into).collect()),
            Err(e) => {
                warn!(room = room_name, error = %e, "failed to list room participants");
                Ok(Vec::new())
            }
        }
    }
}
