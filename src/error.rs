//! Error types for the moodsense engine.

use thiserror::Error;

use crate::signal::SignalSource;

/// Errors that can occur inside the aggregation and capture pipelines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A probability vector did not match the window's fixed dimensionality.
    /// This is a caller contract violation and is rejected at ingestion.
    #[error("probability vector has {actual} classes, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A raw probability payload arrived from a source that has no
    /// probability pipeline.
    #[error("no probability pipeline for {0} samples")]
    UnsupportedPayload(SignalSource),

    /// Capture was started while a previous capture was still running.
    #[error("capture is already running")]
    CaptureAlreadyRunning,

    /// The capture thread panicked or could not be joined.
    #[error("capture worker failed: {0}")]
    CaptureWorker(String),

    /// Reading a frame source or trace file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A byte buffer was too short or malformed for the WAV container layout.
    #[error("malformed WAV container: {0}")]
    MalformedContainer(String),

    /// A trace file line could not be deserialized.
    #[error("malformed trace: {0}")]
    MalformedTrace(String),
}
