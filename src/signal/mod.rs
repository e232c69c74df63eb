//! Signal data model and producer-to-engine transport.

pub mod types;

pub use types::{
    AudioEmotion, BoundingBox, Detection, FaceEmotion, MoodLabel, Sample, SamplePayload,
    SignalSource, TypingMood, Verdict,
};

use crossbeam_channel::{bounded, Receiver, Sender};

/// Create a bounded channel for transporting samples from producer threads
/// to the engine loop.
pub fn sample_bus(capacity: usize) -> (Sender<Sample>, Receiver<Sample>) {
    bounded(capacity)
}
