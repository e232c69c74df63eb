//! Core signal types shared by every producer and consumer in the engine.
//!
//! Each modality keeps its own closed label set. The label spaces are merged
//! only at the mood-state layer through [`MoodLabel`], which tags every label
//! with the modality that produced it; labels are never combined numerically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The modality a sample or verdict originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Camera frames run through face detection and the image classifier.
    Face,
    /// Microphone audio run through the audio emotion classifier, or a
    /// recognized-speech transcript.
    Audio,
    /// Keystroke timing from a text-input surface.
    Typing,
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalSource::Face => write!(f, "face"),
            SignalSource::Audio => write!(f, "audio"),
            SignalSource::Typing => write!(f, "typing"),
        }
    }
}

/// Emotion labels produced by the 7-class face/image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceEmotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

/// Emotion labels produced by the 8-class audio model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEmotion {
    Neutral,
    Calm,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgust,
    Surprised,
}

/// Mood labels produced by the typing-cadence heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypingMood {
    Focused,
    Tired,
    Anxious,
    Neutral,
}

/// A label from any modality, tagged with the space it came from.
///
/// `Unknown` covers empty aggregation input and classifier indices that fall
/// outside the fixed label tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodLabel {
    Face(FaceEmotion),
    Audio(AudioEmotion),
    Typing(TypingMood),
    Unknown,
}

impl MoodLabel {
    /// True for the "happy" label of any modality.
    pub fn is_happy(&self) -> bool {
        matches!(
            self,
            MoodLabel::Face(FaceEmotion::Happy) | MoodLabel::Audio(AudioEmotion::Happy)
        )
    }

    /// True for the "neutral" label of any modality.
    pub fn is_neutral(&self) -> bool {
        matches!(
            self,
            MoodLabel::Face(FaceEmotion::Neutral)
                | MoodLabel::Audio(AudioEmotion::Neutral)
                | MoodLabel::Typing(TypingMood::Neutral)
        )
    }
}

impl std::fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoodLabel::Face(e) => write!(f, "{e:?}"),
            MoodLabel::Audio(e) => write!(f, "{e:?}"),
            MoodLabel::Typing(e) => write!(f, "{e:?}"),
            MoodLabel::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One reduced classification decision: a label plus its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: MoodLabel,
    pub confidence: f32,
}

impl Verdict {
    pub fn new(label: MoodLabel, confidence: f32) -> Self {
        Self { label, confidence }
    }

    /// The verdict used when there is nothing to aggregate.
    pub fn unknown() -> Self {
        Self {
            label: MoodLabel::Unknown,
            confidence: 0.0,
        }
    }
}

/// Payload carried by a [`Sample`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplePayload {
    /// A pre-classified label with its confidence.
    LabelConfidence { label: MoodLabel, confidence: f32 },
    /// A raw probability vector of fixed, source-specific dimensionality.
    Probabilities(Vec<f32>),
}

/// One immutable observation from a producer.
///
/// Ownership transfers from the producer to the aggregator or analyzer that
/// consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub source: SignalSource,
    pub timestamp: DateTime<Utc>,
    pub payload: SamplePayload,
}

impl Sample {
    pub fn probabilities(source: SignalSource, probs: Vec<f32>) -> Self {
        Self {
            source,
            timestamp: Utc::now(),
            payload: SamplePayload::Probabilities(probs),
        }
    }

    pub fn labeled(source: SignalSource, label: MoodLabel, confidence: f32) -> Self {
        Self {
            source,
            timestamp: Utc::now(),
            payload: SamplePayload::LabelConfidence { label, confidence },
        }
    }
}

/// Axis-aligned bounding box of a detected face, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One face found by the external detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bounds: BoundingBox,
    /// Probability that the subject is smiling, when the detector reports it.
    pub smile_probability: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_labels_across_modalities() {
        assert!(MoodLabel::Face(FaceEmotion::Happy).is_happy());
        assert!(MoodLabel::Audio(AudioEmotion::Happy).is_happy());
        assert!(!MoodLabel::Typing(TypingMood::Focused).is_happy());
        assert!(!MoodLabel::Unknown.is_happy());
    }

    #[test]
    fn test_neutral_labels_across_modalities() {
        assert!(MoodLabel::Face(FaceEmotion::Neutral).is_neutral());
        assert!(MoodLabel::Audio(AudioEmotion::Neutral).is_neutral());
        assert!(MoodLabel::Typing(TypingMood::Neutral).is_neutral());
        assert!(!MoodLabel::Audio(AudioEmotion::Calm).is_neutral());
    }

    #[test]
    fn test_sample_roundtrip() {
        let sample = Sample::probabilities(SignalSource::Audio, vec![0.1, 0.9]);
        let json = serde_json::to_string(&sample).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample, back);
    }
}
