//! The multi-modal mood engine.
//!
//! Wires per-source ingestion paths into the single mood state machine:
//!
//! ```text
//! camera frames ──▶ FrameMailbox ──▶ face detector ──▶ image model ──▶ single-best ─┐
//! audio steps ─────────────────────▶ AggregationWindow ──▶ vector average ──────────┤
//! keystrokes ──────────────────────▶ CadenceAnalyzer ──▶ typing mood ───────────────┼──▶ MoodCell
//! transcripts ─────────────────────▶ keyword heuristic ─────────────────────────────┘      │
//!                                                                                          ▼
//!                                                                     SessionTimer (snapshot at tick zero)
//! ```
//!
//! Classifier models and the face detector are external collaborators,
//! consumed through the traits below.

pub mod aggregator;
pub mod cadence;
pub mod cell;
pub mod mailbox;
pub mod mood;
pub mod timer;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::EngineError;
use crate::signal::{
    BoundingBox, Detection, MoodLabel, Sample, SamplePayload, SignalSource, Verdict,
};
use crate::verdict_log::SharedVerdictLog;

pub use aggregator::{
    single_best, smile_verdict, transcript_verdict, vector_average, AggregationWindow,
};
pub use cadence::CadenceAnalyzer;
pub use cell::StateCell;
pub use mailbox::FrameMailbox;
pub use mood::{MoodCell, MoodState};
pub use timer::{
    SessionTimer, SessionTimerState, DEFAULT_SESSION, MESSAGE_HAPPY, MESSAGE_NEUTRAL, MESSAGE_OTHER,
};

/// Class count of the audio emotion model.
pub const AUDIO_CLASSES: usize = 8;
/// Class count of the face/image emotion model.
pub const FACE_CLASSES: usize = 7;

/// External face detector: one frame in, zero or more detections out.
pub trait FaceDetector<F> {
    fn detect(&self, frame: &F) -> Vec<Detection>;
}

/// External image emotion classifier, run on one face region of a frame.
/// Returns a probability vector of [`FACE_CLASSES`] dimensions.
pub trait ImageEmotionModel<F> {
    fn infer(&self, frame: &F, region: &BoundingBox) -> Vec<f32>;
}

/// External audio emotion classifier: a fixed-length sample window in, one
/// probability vector of [`AUDIO_CLASSES`] dimensions per time step out.
pub trait AudioEmotionModel {
    fn infer(&self, samples: &[f32]) -> Vec<Vec<f32>>;
}

/// Detections retained for overlay rendering, with the frame dimensions
/// they were measured in. Only the primary detection feeds mood inference;
/// the rest exist for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceOverlay {
    pub detections: Vec<Detection>,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// The aggregation engine: owns every per-source pipeline plus the mood
/// cell and session timer they feed.
pub struct MoodEngine {
    instance_id: Uuid,
    mood: Arc<MoodCell>,
    overlay: Arc<StateCell<FaceOverlay>>,
    audio_window: AggregationWindow,
    cadence: CadenceAnalyzer,
    timer: SessionTimer,
    log: SharedVerdictLog,
}

impl MoodEngine {
    /// Create an engine.
    ///
    /// `audio_window_steps` is the vector-averaging window capacity (one
    /// entry per model time step), `analysis_stride` the cadence analyzer's
    /// every-Nth-event trigger, `session_duration` the focus-session length.
    pub fn new(
        audio_window_steps: usize,
        analysis_stride: usize,
        session_duration: Duration,
    ) -> Self {
        Self::with_log(
            audio_window_steps,
            analysis_stride,
            session_duration,
            crate::verdict_log::create_shared_log(),
        )
    }

    /// Create an engine that records verdicts into an existing log.
    pub fn with_log(
        audio_window_steps: usize,
        analysis_stride: usize,
        session_duration: Duration,
        log: SharedVerdictLog,
    ) -> Self {
        let mood = Arc::new(MoodCell::new());
        let timer = SessionTimer::new(mood.subscribe(), session_duration);
        Self {
            instance_id: Uuid::new_v4(),
            mood,
            overlay: Arc::new(StateCell::new(FaceOverlay::default())),
            audio_window: AggregationWindow::new(SignalSource::Audio, AUDIO_CLASSES, audio_window_steps),
            cadence: CadenceAnalyzer::new(analysis_stride),
            timer,
            log,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn mood(&self) -> &MoodCell {
        &self.mood
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn log(&self) -> &SharedVerdictLog {
        &self.log
    }

    /// Latest overlay detections for display.
    pub fn overlay(&self) -> watch::Receiver<FaceOverlay> {
        self.overlay.subscribe()
    }

    // ── Face path ────────────────────────────────────────────────────

    /// Run one face classification cycle on a frame.
    ///
    /// All detections are published for overlay; only the first (primary)
    /// detection is classified. An empty detection list completes the cycle
    /// as `Error{"no face detected"}` and returns `None`.
    pub fn process_frame<F>(
        &mut self,
        frame: &F,
        frame_width: u32,
        frame_height: u32,
        detector: &impl FaceDetector<F>,
        model: &impl ImageEmotionModel<F>,
    ) -> Option<Verdict> {
        let detections = detector.detect(frame);
        self.overlay.publish(FaceOverlay {
            detections: detections.clone(),
            frame_width,
            frame_height,
        });

        let Some(primary) = detections.first() else {
            self.mood.complete_error("no face detected");
            self.log.record_error_cycle();
            return None;
        };

        let probs = model.infer(frame, &primary.bounds);
        let verdict = single_best(&probs);
        self.mood.complete_detected(verdict, SignalSource::Face);
        self.log.record_verdict(SignalSource::Face, &verdict);
        Some(verdict)
    }

    /// Process the pending frame from a delivery mailbox, if any.
    ///
    /// Imaging callbacks deposit frames with [`FrameMailbox::offer`]; burst
    /// arrivals overwrite each other there, so at most the newest frame is
    /// classified per call.
    pub fn process_pending_frame<F>(
        &mut self,
        mailbox: &FrameMailbox<F>,
        frame_width: u32,
        frame_height: u32,
        detector: &impl FaceDetector<F>,
        model: &impl ImageEmotionModel<F>,
    ) -> Option<Verdict> {
        let frame = mailbox.take()?;
        self.process_frame(&frame, frame_width, frame_height, detector, model)
    }

    /// Run one smile-heuristic cycle on a detection list, without invoking
    /// the image classifier.
    pub fn process_smile(
        &mut self,
        detections: &[Detection],
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Verdict> {
        self.overlay.publish(FaceOverlay {
            detections: detections.to_vec(),
            frame_width,
            frame_height,
        });

        match smile_verdict(detections) {
            Some(verdict) => {
                self.mood.complete_detected(verdict, SignalSource::Face);
                self.log.record_verdict(SignalSource::Face, &verdict);
                Some(verdict)
            }
            None => {
                self.mood.complete_error("no face detected");
                self.log.record_error_cycle();
                None
            }
        }
    }

    // ── Audio path ───────────────────────────────────────────────────

    /// Ingest a batch of per-time-step probability vectors and complete one
    /// vector-averaging cycle over the window.
    ///
    /// Every vector is dimension-checked before anything is published; a
    /// malformed batch is rejected whole.
    pub fn process_audio_steps(&mut self, steps: Vec<Vec<f32>>) -> Result<Verdict, EngineError> {
        for step in &steps {
            if step.len() != AUDIO_CLASSES {
                return Err(EngineError::DimensionMismatch {
                    expected: AUDIO_CLASSES,
                    actual: step.len(),
                });
            }
        }
        for step in steps {
            self.audio_window.push(step)?;
        }
        Ok(self.complete_audio_cycle())
    }

    /// Complete one vector-averaging cycle over whatever the window holds.
    pub fn complete_audio_cycle(&mut self) -> Verdict {
        let verdict = vector_average(&self.audio_window);
        self.mood.complete_detected(verdict, SignalSource::Audio);
        self.log.record_verdict(SignalSource::Audio, &verdict);
        verdict
    }

    /// Run one keyword-heuristic cycle on a recognized-speech transcript.
    pub fn process_transcript(&mut self, text: &str) -> Verdict {
        let verdict = Verdict::new(MoodLabel::Audio(transcript_verdict(text)), 1.0);
        self.mood.complete_detected(verdict, SignalSource::Audio);
        self.log.record_verdict(SignalSource::Audio, &verdict);
        verdict
    }

    // ── Typing path ──────────────────────────────────────────────────

    /// Record one text-change event; completes a cadence cycle when the
    /// analyzer's stride and minimum-text conditions are met.
    pub fn process_keystroke(
        &mut self,
        text: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Option<Verdict> {
        self.cadence.record(text, at);
        if !self.cadence.should_analyze() {
            return None;
        }
        let mood = self.cadence.analyze()?;
        let verdict = Verdict::new(MoodLabel::Typing(mood), 1.0);
        self.mood.complete_detected(verdict, SignalSource::Typing);
        self.log.record_verdict(SignalSource::Typing, &verdict);
        Some(verdict)
    }

    // ── Generic sample ingestion ─────────────────────────────────────

    /// Ingest one transported [`Sample`].
    ///
    /// Probability payloads from the audio source accumulate in the window
    /// without completing a cycle (call [`complete_audio_cycle`] for that);
    /// probability payloads from the face source complete a single-best
    /// cycle immediately; pre-classified payloads pass straight through to
    /// the state machine.
    ///
    /// [`complete_audio_cycle`]: MoodEngine::complete_audio_cycle
    pub fn ingest(&mut self, sample: Sample) -> Result<Option<Verdict>, EngineError> {
        match (sample.source, sample.payload) {
            (SignalSource::Audio, SamplePayload::Probabilities(probs)) => {
                self.audio_window.push(probs)?;
                Ok(None)
            }
            (SignalSource::Face, SamplePayload::Probabilities(probs)) => {
                if probs.len() != FACE_CLASSES {
                    return Err(EngineError::DimensionMismatch {
                        expected: FACE_CLASSES,
                        actual: probs.len(),
                    });
                }
                let verdict = single_best(&probs);
                self.mood.complete_detected(verdict, SignalSource::Face);
                self.log.record_verdict(SignalSource::Face, &verdict);
                Ok(Some(verdict))
            }
            (SignalSource::Typing, SamplePayload::Probabilities(_)) => {
                Err(EngineError::UnsupportedPayload(SignalSource::Typing))
            }
            (source, SamplePayload::LabelConfidence { label, confidence }) => {
                let verdict = Verdict::new(label, confidence);
                self.mood.complete_detected(verdict, source);
                self.log.record_verdict(source, &verdict);
                Ok(Some(verdict))
            }
        }
    }

    /// Start (or restart) the focus session.
    pub fn start_session(&self) -> tokio::task::JoinHandle<()> {
        self.timer.start()
    }

    /// Cancel the focus session and flush the verdict log.
    pub fn shutdown(&self) {
        self.timer.cancel();
        if let Err(e) = self.log.save() {
            tracing::warn!("could not save verdict log: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{AudioEmotion, FaceEmotion};
    use chrono::Utc;

    fn engine() -> MoodEngine {
        MoodEngine::new(400, 10, Duration::from_secs(25 * 60))
    }

    struct FixedDetector(Vec<Detection>);
    impl FaceDetector<()> for FixedDetector {
        fn detect(&self, _frame: &()) -> Vec<Detection> {
            self.0.clone()
        }
    }

    struct FixedModel(Vec<f32>);
    impl ImageEmotionModel<()> for FixedModel {
        fn infer(&self, _frame: &(), _region: &BoundingBox) -> Vec<f32> {
            self.0.clone()
        }
    }

    fn detection() -> Detection {
        Detection {
            bounds: BoundingBox {
                x: 10,
                y: 10,
                width: 64,
                height: 64,
            },
            smile_probability: Some(0.8),
        }
    }

    #[tokio::test]
    async fn test_face_cycle_classifies_primary_only() {
        let mut engine = engine();
        let detector = FixedDetector(vec![detection(), detection(), detection()]);
        let model = FixedModel(vec![0.0, 0.0, 0.0, 0.95, 0.02, 0.02, 0.01]);

        let verdict = engine.process_frame(&(), 640, 480, &detector, &model).unwrap();
        assert_eq!(verdict.label, MoodLabel::Face(FaceEmotion::Happy));

        // All detections survive for overlay even though only one was classified.
        let overlay = engine.overlay().borrow().clone();
        assert_eq!(overlay.detections.len(), 3);
        assert_eq!(overlay.frame_width, 640);
        assert_eq!(engine.log().stats().face_cycles, 1);
    }

    #[tokio::test]
    async fn test_no_face_is_error_not_fatal() {
        let mut engine = engine();
        let detector = FixedDetector(vec![]);
        let model = FixedModel(vec![0.0; 7]);

        assert!(engine.process_frame(&(), 640, 480, &detector, &model).is_none());
        assert_eq!(
            engine.mood().snapshot(),
            MoodState::Error {
                reason: "no face detected".into()
            }
        );

        // The next cycle recovers.
        let detector = FixedDetector(vec![detection()]);
        let model = FixedModel(vec![0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1]);
        let verdict = engine.process_frame(&(), 640, 480, &detector, &model).unwrap();
        assert_eq!(verdict.label, MoodLabel::Face(FaceEmotion::Angry));
    }

    #[tokio::test]
    async fn test_pending_frame_is_latest_wins() {
        let mut engine = engine();
        let mailbox = FrameMailbox::new();
        let detector = FixedDetector(vec![detection()]);

        // The model sees the frame payload, so the verdict tells us which
        // frame was classified.
        struct PayloadModel;
        impl ImageEmotionModel<Vec<f32>> for PayloadModel {
            fn infer(&self, frame: &Vec<f32>, _region: &BoundingBox) -> Vec<f32> {
                frame.clone()
            }
        }
        impl FaceDetector<Vec<f32>> for FixedDetector {
            fn detect(&self, _frame: &Vec<f32>) -> Vec<Detection> {
                self.0.clone()
            }
        }

        mailbox.offer(vec![0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1]);
        mailbox.offer(vec![0.0, 0.0, 0.0, 0.9, 0.0, 0.0, 0.1]);

        let verdict = engine
            .process_pending_frame(&mailbox, 640, 480, &detector, &PayloadModel)
            .unwrap();
        assert_eq!(verdict.label, MoodLabel::Face(FaceEmotion::Happy));

        // The slot is now empty; no further cycle runs.
        assert!(engine
            .process_pending_frame(&mailbox, 640, 480, &detector, &PayloadModel)
            .is_none());
    }

    #[tokio::test]
    async fn test_audio_batch_cycle() {
        let mut engine = engine();
        let steps = vec![vec![0.0, 0.0, 0.8, 0.1, 0.1, 0.0, 0.0, 0.0]; 400];
        let verdict = engine.process_audio_steps(steps).unwrap();
        assert_eq!(verdict.label, MoodLabel::Audio(AudioEmotion::Happy));
        assert_eq!(
            engine.mood().snapshot(),
            MoodState::Detected {
                label: MoodLabel::Audio(AudioEmotion::Happy),
                source: SignalSource::Audio,
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_audio_batch_rejected_whole() {
        let mut engine = engine();
        let mut steps = vec![vec![0.1; 8]; 10];
        steps.push(vec![0.1; 5]);

        assert!(engine.process_audio_steps(steps).is_err());
        // Nothing was published and nothing entered the window.
        assert_eq!(engine.mood().snapshot(), MoodState::Inactive);
    }

    #[tokio::test]
    async fn test_empty_audio_cycle_is_unknown() {
        let mut engine = engine();
        let verdict = engine.complete_audio_cycle();
        assert_eq!(verdict.label, MoodLabel::Unknown);
        assert_eq!(verdict.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_typing_cycle_every_tenth_event() {
        let mut engine = engine();
        let base = Utc::now();
        let text = "a text that is longer than ten characters";

        let mut verdicts = 0;
        for i in 1..=20 {
            let at = base + chrono::Duration::milliseconds(300 * i);
            if engine.process_keystroke(text, at).is_some() {
                verdicts += 1;
            }
        }
        assert_eq!(verdicts, 2);
        assert_eq!(engine.log().stats().typing_cycles, 2);
    }

    #[tokio::test]
    async fn test_ingest_prelabeled_sample() {
        let mut engine = engine();
        let sample = Sample::labeled(
            SignalSource::Face,
            MoodLabel::Face(FaceEmotion::Surprise),
            0.7,
        );
        let verdict = engine.ingest(sample).unwrap().unwrap();
        assert_eq!(verdict.label, MoodLabel::Face(FaceEmotion::Surprise));
    }

    #[tokio::test]
    async fn test_ingest_rejects_wrong_width_face_vector() {
        let mut engine = engine();
        let sample = Sample::probabilities(SignalSource::Face, vec![0.1; 8]);

        let err = engine.ingest(sample).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DimensionMismatch {
                expected: FACE_CLASSES,
                actual: 8,
            }
        ));
        // Nothing was published.
        assert_eq!(engine.mood().snapshot(), MoodState::Inactive);
        assert_eq!(engine.log().stats().face_cycles, 0);
    }

    #[tokio::test]
    async fn test_transcript_cycle() {
        let mut engine = engine();
        let verdict = engine.process_transcript("feeling pretty happy about this");
        assert_eq!(verdict.label, MoodLabel::Audio(AudioEmotion::Happy));
    }
}
