//! Trace replay: drive the engine from a recorded JSONL event stream.
//!
//! Each line of a trace file is one [`TraceEvent`]. Replaying a trace
//! exercises exactly the same ingestion paths a live run would, which makes
//! traces the main tool for reproducing field behavior offline.

use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::MoodEngine;
use crate::error::EngineError;
use crate::signal::{Detection, Verdict};

/// One recorded input event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum TraceEvent {
    /// A text-change event, timestamped relative to trace start.
    Keystroke { text: String, at_ms: i64 },
    /// A batch of audio model output vectors, one per time step.
    AudioSteps { steps: Vec<Vec<f32>> },
    /// One face model output vector for the primary detection.
    FaceProbabilities { probabilities: Vec<f32> },
    /// Detections from a frame, for the smile heuristic.
    SmileFrame {
        detections: Vec<Detection>,
        frame_width: u32,
        frame_height: u32,
    },
    /// A recognized-speech transcript.
    Transcript { text: String },
}

/// Applies trace events to an engine, keeping a fixed epoch so keystroke
/// timestamps replay with their recorded spacing.
pub struct TraceReplayer {
    epoch: chrono::DateTime<chrono::Utc>,
}

impl TraceReplayer {
    pub fn new() -> Self {
        Self {
            epoch: chrono::Utc::now(),
        }
    }

    /// Apply one event. Returns the verdict it produced, if the event
    /// completed an aggregation cycle.
    pub fn apply(
        &self,
        engine: &mut MoodEngine,
        event: TraceEvent,
    ) -> Result<Option<Verdict>, EngineError> {
        match event {
            TraceEvent::Keystroke { text, at_ms } => {
                let at = self.epoch + chrono::Duration::milliseconds(at_ms);
                Ok(engine.process_keystroke(&text, at))
            }
            TraceEvent::AudioSteps { steps } => engine.process_audio_steps(steps).map(Some),
            TraceEvent::FaceProbabilities { probabilities } => {
                let sample = crate::signal::Sample::probabilities(
                    crate::signal::SignalSource::Face,
                    probabilities,
                );
                engine.ingest(sample)
            }
            TraceEvent::SmileFrame {
                detections,
                frame_width,
                frame_height,
            } => Ok(engine.process_smile(&detections, frame_width, frame_height)),
            TraceEvent::Transcript { text } => Ok(Some(engine.process_transcript(&text))),
        }
    }
}

impl Default for TraceReplayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Replay a JSONL trace file through the engine, returning the verdicts
/// produced in order. Blank lines are skipped; a malformed line aborts the
/// replay.
pub fn replay_file(engine: &mut MoodEngine, path: &Path) -> Result<Vec<Verdict>, EngineError> {
    let file = std::fs::File::open(path)?;
    let replayer = TraceReplayer::new();
    let mut verdicts = Vec::new();

    for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(&line)
            .map_err(|e| EngineError::MalformedTrace(format!("line {}: {e}", lineno + 1)))?;
        debug!(line = lineno + 1, "replaying trace event");
        if let Some(verdict) = replayer.apply(engine, event)? {
            verdicts.push(verdict);
        }
    }
    Ok(verdicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{AudioEmotion, FaceEmotion, MoodLabel, TypingMood};
    use std::io::Write;
    use std::time::Duration;

    fn engine() -> MoodEngine {
        MoodEngine::new(400, 10, Duration::from_secs(25 * 60))
    }

    #[tokio::test]
    async fn test_apply_face_probabilities() {
        let mut engine = engine();
        let replayer = TraceReplayer::new();
        let verdict = replayer
            .apply(
                &mut engine,
                TraceEvent::FaceProbabilities {
                    probabilities: vec![0.0, 0.0, 0.0, 0.0, 0.9, 0.05, 0.05],
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(verdict.label, MoodLabel::Face(FaceEmotion::Sad));
    }

    #[tokio::test]
    async fn test_replay_file_in_order() {
        let mut engine = engine();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");

        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"{{"event":"transcript","text":"so happy today"}}"#
        )
        .unwrap();
        writeln!(f).unwrap();
        // 12 fast keystrokes on long text: one cadence cycle at stride 10.
        for i in 1..=12 {
            writeln!(
                f,
                r#"{{"event":"keystroke","text":"{}","at_ms":{}}}"#,
                "x".repeat(10 + i),
                i as i64 * 100
            )
            .unwrap();
        }
        drop(f);

        let verdicts = replay_file(&mut engine, &path).unwrap();
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].label, MoodLabel::Audio(AudioEmotion::Happy));
        assert_eq!(verdicts[1].label, MoodLabel::Typing(TypingMood::Focused));
    }

    #[tokio::test]
    async fn test_malformed_line_aborts() {
        let mut engine = engine();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"event\":\"nope\"}\n").unwrap();

        assert!(replay_file(&mut engine, &path).is_err());
    }
}
