//! Reduction of noisy per-frame classifier output into stable verdicts.
//!
//! Two operating modes, selected by source:
//!
//! - **Vector averaging** (audio): element-wise mean over every probability
//!   vector in the window, then argmax. Used for the 8-class audio model,
//!   which emits one vector per time step.
//! - **Single best** (face/image): argmax over one vector per detection
//!   event, mapped through a fixed 1-indexed label table. Used for the
//!   7-class image model.
//!
//! Ties always resolve to the lowest index, so reduction is deterministic.

use std::collections::VecDeque;

use crate::error::EngineError;
use crate::signal::{AudioEmotion, Detection, FaceEmotion, MoodLabel, SignalSource, Verdict};

/// Smile probability above which a face reads as happy.
const SMILE_HAPPY: f64 = 0.6;
/// Smile probability above which a face reads as neutral.
const SMILE_NEUTRAL: f64 = 0.3;

/// A bounded, arrival-ordered buffer of probability vectors from one source.
///
/// The window never holds vectors from more than one source, every vector
/// must match the fixed dimensionality `dim`, and the oldest vectors are
/// evicted first once `capacity` is exceeded. The window is owned and
/// mutated by a single aggregation pipeline; it is not shared across threads.
#[derive(Debug, Clone)]
pub struct AggregationWindow {
    source: SignalSource,
    dim: usize,
    capacity: usize,
    samples: VecDeque<Vec<f32>>,
}

impl AggregationWindow {
    pub fn new(source: SignalSource, dim: usize, capacity: usize) -> Self {
        Self {
            source,
            dim,
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn source(&self) -> SignalSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a probability vector, evicting the oldest if at capacity.
    ///
    /// Vectors of the wrong dimensionality are a caller contract violation
    /// and are rejected here rather than silently truncated.
    pub fn push(&mut self, probs: Vec<f32>) -> Result<(), EngineError> {
        if probs.len() != self.dim {
            return Err(EngineError::DimensionMismatch {
                expected: self.dim,
                actual: probs.len(),
            });
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(probs);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Element-wise arithmetic mean of every vector in the window.
    pub fn mean(&self) -> Option<Vec<f32>> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sums = vec![0.0f32; self.dim];
        for probs in &self.samples {
            for (sum, p) in sums.iter_mut().zip(probs) {
                *sum += p;
            }
        }
        let n = self.samples.len() as f32;
        for sum in &mut sums {
            *sum /= n;
        }
        Some(sums)
    }
}

/// Index of the maximum element; ties resolve to the lowest index.
fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Audio label table, indexed by raw class position.
fn audio_label(index: usize) -> Option<AudioEmotion> {
    use AudioEmotion::*;
    const TABLE: [AudioEmotion; 8] = [Neutral, Calm, Happy, Sad, Angry, Fearful, Disgust, Surprised];
    TABLE.get(index).copied()
}

/// Face label table, 1-indexed: raw class 0 maps to table position 1.
fn face_label(position: usize) -> Option<FaceEmotion> {
    use FaceEmotion::*;
    match position {
        1 => Some(Angry),
        2 => Some(Disgust),
        3 => Some(Fear),
        4 => Some(Happy),
        5 => Some(Sad),
        6 => Some(Surprise),
        7 => Some(Neutral),
        _ => None,
    }
}

/// Vector-averaging reduction: mean every vector in the window, take the
/// argmax as the label and the mean value at that index as confidence.
///
/// An empty window yields `Unknown` with confidence 0, not an error.
pub fn vector_average(window: &AggregationWindow) -> Verdict {
    let Some(mean) = window.mean() else {
        return Verdict::unknown();
    };
    let Some(index) = argmax(&mean) else {
        return Verdict::unknown();
    };

    let label = match window.source() {
        SignalSource::Audio => audio_label(index).map(MoodLabel::Audio),
        SignalSource::Face => face_label(index + 1).map(MoodLabel::Face),
        SignalSource::Typing => None,
    };
    match label {
        Some(label) => Verdict::new(label, mean[index]),
        None => Verdict::unknown(),
    }
}

/// Single-best reduction for one image-classifier output vector.
///
/// The raw argmax index is mapped through the fixed 1-indexed face table;
/// indices outside the table yield `Unknown`. Confidence is always the raw
/// probability at the argmax index, even for `Unknown`.
pub fn single_best(probs: &[f32]) -> Verdict {
    let Some(index) = argmax(probs) else {
        return Verdict::unknown();
    };
    let confidence = probs[index];
    match face_label(index + 1) {
        Some(label) => Verdict::new(MoodLabel::Face(label), confidence),
        None => Verdict::new(MoodLabel::Unknown, confidence),
    }
}

/// Smile-probability heuristic over a full detection list.
///
/// Returns `None` when the list is empty (no subject); otherwise the mean
/// smile probability maps to happy, neutral, or sad. Detections without a
/// reported smile probability contribute nothing to the mean.
pub fn smile_verdict(detections: &[Detection]) -> Option<Verdict> {
    if detections.is_empty() {
        return None;
    }

    let probs: Vec<f64> = detections
        .iter()
        .filter_map(|d| d.smile_probability)
        .map(f64::from)
        .collect();
    let avg = if probs.is_empty() {
        0.0
    } else {
        probs.iter().sum::<f64>() / probs.len() as f64
    };

    let label = if avg > SMILE_HAPPY {
        FaceEmotion::Happy
    } else if avg > SMILE_NEUTRAL {
        FaceEmotion::Neutral
    } else {
        FaceEmotion::Sad
    };
    Some(Verdict::new(MoodLabel::Face(label), avg as f32))
}

/// Keyword heuristic for a recognized-speech transcript.
pub fn transcript_verdict(text: &str) -> AudioEmotion {
    let lower = text.to_lowercase();
    if lower.contains("happy") {
        AudioEmotion::Happy
    } else if lower.contains("sad") {
        AudioEmotion::Sad
    } else if lower.contains("angry") {
        AudioEmotion::Angry
    } else {
        AudioEmotion::Neutral
    }
}
