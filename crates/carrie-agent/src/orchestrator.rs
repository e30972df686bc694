//! User message in, spoken reply out.
//!
//! Each call runs `fetch emotion (optional) -> generate reply -> synthesize`
//! in order. Reply generation never fails: a missing or failing hosted agent
//! falls back to the rule-based [`responder`](crate::responder). Synthesis
//! has no fallback and its failure fails the call.

use crate::emotion::EmotionClient;
use crate::error::AgentError;
use crate::responder;
use bytes::Bytes;
use carrie_types::{ConversationTurn, EmotionSignal, Role};
use carrie_voice::{AudioStream, DynamicVariables, SpeechVendorClient, VoiceError};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Where the reply text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    HostedAgent,
    RuleBased,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub audio: Bytes,
    pub conversation_id: Option<String>,
    pub source: ReplySource,
    /// The user turn and the assistant turn of this exchange.
    pub turns: Vec<ConversationTurn>,
    /// The signal used, for emotion-aware replies only.
    pub emotion: Option<EmotionSignal>,
}

pub struct Orchestrator {
    vendor: Arc<SpeechVendorClient>,
    emotion: EmotionClient,
}

impl Orchestrator {
    pub fn new(vendor: Arc<SpeechVendorClient>, emotion: EmotionClient) -> Self {
        Self { vendor, emotion }
    }

    pub fn vendor(&self) -> &SpeechVendorClient {
        &self.vendor
    }

    pub fn emotion(&self) -> &EmotionClient {
        &self.emotion
    }

    pub async fn reply_to_text(
        &self,
        text: &str,
        room_name: Option<&str>,
        conversation_id: Option<&str>,
        variables: Option<DynamicVariables>,
    ) -> Result<Reply, AgentError> {
        info!(text, room = room_name.unwrap_or("unknown"), "processing user message");

        let variables = with_system_context(variables.unwrap_or_default(), room_name);
        let (reply_text, reply_conversation, source) = self
            .generate(text, conversation_id, &variables, responder::reply)
            .await;

        self.finish(text, conversation_id, reply_text, reply_conversation, source, None)
            .await
    }

    pub async fn reply_to_text_with_emotion(
        &self,
        text: &str,
        room_name: Option<&str>,
        conversation_id: Option<&str>,
        variables: Option<DynamicVariables>,
    ) -> Result<Reply, AgentError> {
        info!(text, room = room_name.unwrap_or("unknown"), "processing user message with emotion");

        let signal = self.emotion.fetch().await;
        let mut variables = with_system_context(variables.unwrap_or_default(), room_name);
        if signal.face_detected {
            info!(
                emotion = %signal.emotion,
                confidence = %signal.confidence_percent(),
                "user emotion detected"
            );
            variables.insert("user_emotion".to_string(), signal.emotion.clone());
            variables.insert(
                "user_emotion_confidence".to_string(),
                signal.confidence_percent(),
            );
            variables.insert("emotion_context".to_string(), signal.context.clone());
        }

        let (reply_text, reply_conversation, source) = self
            .generate(text, conversation_id, &variables, |t| {
                responder::reply_with_emotion(t, &signal)
            })
            .await;

        self.finish(
            text,
            conversation_id,
            reply_text,
            reply_conversation,
            source,
            Some(signal),
        )
        .await
    }

    /// Transcribes an uploaded recording.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<String, AgentError> {
        self.vendor
            .transcribe(audio, filename)
            .await
            .map_err(|e| match e {
                VoiceError::Config(_) => AgentError::Voice(e),
                other => {
                    error!(error = %other, "transcription failed");
                    AgentError::TranscriptionFailed(vendor_detail(other))
                }
            })
    }

    /// Synthesizes `text` without generating a reply.
    pub async fn speak(&self, text: &str) -> Result<Bytes, AgentError> {
        self.vendor.synthesize(text).await.map_err(synthesis_error)
    }

    /// Streamed variant of [`speak`](Self::speak).
    pub async fn speak_stream(&self, text: &str) -> Result<AudioStream, AgentError> {
        self.vendor
            .synthesize_stream(text)
            .await
            .map_err(synthesis_error)
    }

    async fn generate<F>(
        &self,
        text: &str,
        conversation_id: Option<&str>,
        variables: &DynamicVariables,
        fallback: F,
    ) -> (String, Option<String>, ReplySource)
    where
        F: Fn(&str) -> String,
    {
        let passed_id = conversation_id.map(str::to_string);

        if !self.vendor.has_agent() {
            info!("no hosted agent configured, using rule-based replies");
            return (fallback(text), passed_id, ReplySource::RuleBased);
        }

        match self.vendor.converse(text, conversation_id, variables).await {
            Ok(reply) if !reply.text.trim().is_empty() => {
                info!(response = %reply.text, "hosted agent replied");
                (reply.text, reply.conversation_id, ReplySource::HostedAgent)
            }
            Ok(_) => {
                warn!("hosted agent returned an empty reply, falling back to rule-based replies");
                (fallback(text), passed_id, ReplySource::RuleBased)
            }
            Err(e) => {
                warn!(error = %e, "hosted agent failed, falling back to rule-based replies");
                (fallback(text), passed_id, ReplySource::RuleBased)
            }
        }
    }

    async fn finish(
        &self,
        user_text: &str,
        conversation_id: Option<&str>,
        reply_text: String,
        reply_conversation: Option<String>,
        source: ReplySource,
        emotion: Option<EmotionSignal>,
    ) -> Result<Reply, AgentError> {
        info!(response = %reply_text, ?source, "final response");
        let audio = self.speak(&reply_text).await?;

        let turns = vec![
            ConversationTurn::now(
                Role::User,
                user_text,
                conversation_id.map(str::to_string),
            ),
            ConversationTurn::now(Role::Assistant, reply_text.clone(), reply_conversation.clone()),
        ];

        Ok(Reply {
            text: reply_text,
            audio,
            conversation_id: reply_conversation,
            source,
            turns,
            emotion,
        })
    }
}

/// Adds `system__time` and `system__room`, overriding caller-supplied values.
fn with_system_context(
    mut variables: DynamicVariables,
    room_name: Option<&str>,
) -> DynamicVariables {
    variables.insert(
        "system__time".to_string(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    variables.insert(
        "system__room".to_string(),
        room_name.unwrap_or("unknown").to_string(),
    );
    variables
}

fn synthesis_error(e: VoiceError) -> AgentError {
    match e {
        VoiceError::Config(_) => AgentError::Voice(e),
        other => {
            error!(error = %other, "speech synthesis failed");
            AgentError::SynthesisFailed(vendor_detail(other))
        }
    }
}

fn vendor_detail(e: VoiceError) -> String {
    match e {
        VoiceError::Synthesis(msg)
        | VoiceError::Transcription(msg)
        | VoiceError::Vendor(msg)
        | VoiceError::Auth(msg)
        | VoiceError::NotConfigured(msg) => msg,
        other => other.to_string(),
    }
}
