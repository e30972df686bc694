//! Emotion signal reported by the external face-expression detector.

use serde::{Deserialize, Deserializer, Serialize};

/// Context sent to the agent when no face is visible.
const UNDETECTED_CONTEXT: &str =
    "Emotion detection unavailable. Proceed with neutral conversation.";

fn default_emotion() -> String {
    "Neutral".to_string()
}

/// The detector sends `null` for the label when it has no reading.
fn emotion_or_neutral<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label.filter(|l| !l.trim().is_empty()).unwrap_or_else(default_emotion))
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single reading from the emotion detector.
///
/// Field names follow the detector's JSON (`face_detected` is snake_case).
/// When `face_detected` is false the label and confidence carry no meaning
/// and must not influence replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSignal {
    #[serde(default = "default_emotion", deserialize_with = "emotion_or_neutral")]
    pub emotion: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub face_detected: bool,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub context: String,
}

impl EmotionSignal {
    /// The neutral reading substituted whenever the detector is unreachable.
    pub fn undetected() -> Self {
        Self {
            emotion: default_emotion(),
            confidence: 0.0,
            face_detected: false,
            context: UNDETECTED_CONTEXT.to_string(),
        }
    }

    /// Returns the emotion label only when a face was actually seen.
    pub fn detected_emotion(&self) -> Option<&str> {
        self.face_detected.then_some(self.emotion.as_str())
    }

    /// Confidence rendered as a whole percentage, e.g. `"87%"`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.0}%", self.confidence.clamp(0.0, 1.0) * 100.0)
    }
}

impl Default for EmotionSignal {
    fn default() -> Self {
        Self::undetected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_payload_deserializes() {
        let json =
            r#"{"emotion":"Happy","confidence":0.874,"face_detected":true,"context":"smiling"}"#;
        let signal: EmotionSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.detected_emotion(), Some("Happy"));
        assert_eq!(signal.confidence_percent(), "87%");
    }

    #[test]
    fn missing_fields_fall_back_to_neutral() {
        let signal: EmotionSignal = serde_json::from_str("{}").unwrap();
        assert_eq!(signal.emotion, "Neutral");
        assert!(!signal.face_detected);
        assert_eq!(signal.detected_emotion(), None);
    }

    #[test]
    fn null_label_becomes_neutral_and_keeps_the_reading() {
        let json = r#"{"emotion":null,"confidence":0.8,"face_detected":true,"context":null}"#;
        let signal: EmotionSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.emotion, "Neutral");
        assert!(signal.face_detected);
        assert_eq!(signal.confidence_percent(), "80%");
        assert_eq!(signal.context, "");
    }

    #[test]
    fn undetected_ignores_label() {
        let signal = EmotionSignal {
            emotion: "Happy".to_string(),
            confidence: 0.99,
            face_detected: false,
            context: String::new(),
        };
        assert_eq!(signal.detected_emotion(), None);
    }
}
