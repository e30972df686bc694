//! Rule-based replies used when the hosted agent is unavailable.
//!
//! Matching is a case-insensitive substring search over [`KEYWORDS`], first
//! hit wins. The emotion-aware variant consults [`EMOTION_REPLIES`] first,
//! and only when the detector actually saw a face.

use carrie_types::EmotionSignal;
use chrono::Local;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Greeting,
    Wellbeing,
    Weather,
    Time,
    Help,
    Testing,
    Gratitude,
    Farewell,
    Name,
    Identity,
    Capabilities,
}

/// Ordered keyword table. Order matters: "hi" is checked before "how are you".
pub const KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Greeting, &["hello", "hi"]),
    (Topic::Wellbeing, &["how are you"]),
    (Topic::Weather, &["weather"]),
    (Topic::Time, &["time"]),
    (Topic::Help, &["help"]),
    (Topic::Testing, &["testing"]),
    (Topic::Gratitude, &["thank"]),
    (Topic::Farewell, &["bye", "goodbye"]),
    (Topic::Name, &["name"]),
    (Topic::Identity, &["who are you"]),
    (Topic::Capabilities, &["what can you do"]),
];

pub const GENERIC_REPLIES: [&str; 6] = [
    "That's interesting! Tell me more about that.",
    "I see what you mean. What else would you like to know?",
    "Good point! Anything else on your mind?",
    "Interesting thought! What made you think of that?",
    "I understand. Is there anything specific you'd like help with?",
    "Got it! What would you like to explore next?",
];

/// Which inputs an emotional reply applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionScope {
    Greeting,
    Wellbeing,
    /// Anything that is neither a greeting nor a wellbeing question.
    Other,
}

pub const EMOTION_REPLIES: &[(EmotionScope, &str, &str)] = &[
    (
        EmotionScope::Greeting,
        "Happy",
        "Hey! You're looking cheerful today! How can I help you?",
    ),
    (
        EmotionScope::Greeting,
        "Sad",
        "Hi there. I'm here for you. What's on your mind?",
    ),
    (
        EmotionScope::Greeting,
        "Angry",
        "Hello. I'm here to help. Take your time and let me know what's bothering you.",
    ),
    (
        EmotionScope::Wellbeing,
        "Happy",
        "I'm doing great, and it looks like you are too! What can I do for you?",
    ),
    (
        EmotionScope::Wellbeing,
        "Sad",
        "I'm here for you. It seems like you might be going through something. Want to talk about it?",
    ),
    (
        EmotionScope::Other,
        "Sad",
        "I'm here to listen and support you. How can I help make things better?",
    ),
    (
        EmotionScope::Other,
        "Angry",
        "I understand you might be upset. Take your time, and let me know how I can assist you.",
    ),
    (
        EmotionScope::Other,
        "Happy",
        "That's wonderful! What would you like to talk about?",
    ),
];

impl Topic {
    /// Classifies `text`, or `None` when no keyword matches.
    pub fn of(text: &str) -> Option<Topic> {
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(topic, _)| *topic)
    }

    pub fn reply(self) -> String {
        match self {
            Topic::Greeting => "Hey there! How can I help you today?".to_string(),
            Topic::Wellbeing => {
                "I'm doing great, thanks for asking! What can I do for you?".to_string()
            }
            Topic::Weather => {
                "I don't have access to weather data right now, but I'd be happy to help with something else!"
                    .to_string()
            }
            Topic::Time => format!("It's {} right now.", Local::now().format("%-I:%M:%S %p")),
            Topic::Help => {
                "I'm here to assist you! You can ask me questions, have a chat, or just talk to me about anything."
                    .to_string()
            }
            Topic::Testing => {
                "I hear you loud and clear! The system is working perfectly.".to_string()
            }
            Topic::Gratitude => "You're welcome! Happy to help anytime!".to_string(),
            Topic::Farewell => "Goodbye! Have a great day!".to_string(),
            Topic::Name => {
                "I'm your AI voice assistant. You can just call me Assistant!".to_string()
            }
            Topic::Identity => {
                "I'm an AI assistant here to chat with you and help out however I can!".to_string()
            }
            Topic::Capabilities => {
                "I can have conversations with you, answer questions, and help with various tasks. What would you like to talk about?"
                    .to_string()
            }
        }
    }

    fn emotion_scope(topic: Option<Topic>) -> EmotionScope {
        match topic {
            Some(Topic::Greeting) => EmotionScope::Greeting,
            Some(Topic::Wellbeing) => EmotionScope::Wellbeing,
            _ => EmotionScope::Other,
        }
    }
}

fn generic_reply() -> String {
    GENERIC_REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(GENERIC_REPLIES[0])
        .to_string()
}

/// Plain keyword reply. Never empty.
pub fn reply(text: &str) -> String {
    match Topic::of(text) {
        Some(topic) => topic.reply(),
        None => generic_reply(),
    }
}

/// Keyword reply shaded by the user's detected emotion.
///
/// Identical to [`reply`] when no face was detected.
pub fn reply_with_emotion(text: &str, signal: &EmotionSignal) -> String {
    let topic = Topic::of(text);
    if let Some(emotion) = signal.detected_emotion() {
        let scope = Topic::emotion_scope(topic);
        let hit = EMOTION_REPLIES
            .iter()
            .find(|(s, e, _)| *s == scope && e.eq_ignore_ascii_case(emotion));
        if let Some((_, _, response)) = hit {
            return response.to_string();
        }
    }

    match topic {
        Some(topic) => topic.reply(),
        None => generic_reply(),
    }
}
