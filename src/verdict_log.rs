//! Verdict accounting and the on-disk feature log.
//!
//! Tracks how many aggregation cycles each modality completed and, when a
//! CSV path is configured, appends one `timestamp,source,label,confidence`
//! line per completed classification so external tooling can inspect what
//! the engine decided over time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::signal::{SignalSource, Verdict};

/// Cycle counters for the current session, persistable across runs.
#[derive(Debug)]
pub struct VerdictLog {
    face_cycles: AtomicU64,
    audio_cycles: AtomicU64,
    typing_cycles: AtomicU64,
    error_cycles: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
    csv_path: Option<PathBuf>,
}

impl VerdictLog {
    pub fn new() -> Self {
        Self {
            face_cycles: AtomicU64::new(0),
            audio_cycles: AtomicU64::new(0),
            typing_cycles: AtomicU64::new(0),
            error_cycles: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
            csv_path: None,
        }
    }

    /// Create a log that persists counters as JSON and appends verdicts to
    /// a CSV file.
    pub fn with_persistence(persist_path: PathBuf, csv_path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(persist_path);
        log.csv_path = Some(csv_path);

        if let Err(e) = log.load() {
            warn!("could not load previous verdict stats: {e}");
        }
        log
    }

    /// Record one completed classification cycle.
    pub fn record_verdict(&self, source: SignalSource, verdict: &Verdict) {
        let counter = match source {
            SignalSource::Face => &self.face_cycles,
            SignalSource::Audio => &self.audio_cycles,
            SignalSource::Typing => &self.typing_cycles,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.append_csv(source, verdict);
    }

    /// Record one cycle that found no eligible subject.
    pub fn record_error_cycle(&self) {
        self.error_cycles.fetch_add(1, Ordering::Relaxed);
    }

    fn append_csv(&self, source: SignalSource, verdict: &Verdict) {
        let Some(ref path) = self.csv_path else {
            return;
        };
        let line = format!(
            "{},{},{},{:.2}\n",
            Utc::now().timestamp_millis(),
            source,
            verdict.label,
            verdict.confidence
        );
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
        if let Err(e) = result {
            warn!("could not append to feature log: {e}");
        }
    }

    pub fn stats(&self) -> VerdictStats {
        VerdictStats {
            face_cycles: self.face_cycles.load(Ordering::Relaxed),
            audio_cycles: self.audio_cycles.load(Ordering::Relaxed),
            typing_cycles: self.typing_cycles.load(Ordering::Relaxed),
            error_cycles: self.error_cycles.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds() as u64,
        }
    }

    /// Summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Face cycles: {}\n\
             - Audio cycles: {}\n\
             - Typing cycles: {}\n\
             - No-subject cycles: {}\n\
             - Session duration: {} seconds",
            stats.face_cycles,
            stats.audio_cycles,
            stats.typing_cycles,
            stats.error_cycles,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let stats = self.stats();
            let persisted = PersistedStats {
                face_cycles: stats.face_cycles,
                audio_cycles: stats.audio_cycles,
                typing_cycles: stats.typing_cycles,
                error_cycles: stats.error_cycles,
                last_updated: Utc::now(),
            };
            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;
                self.face_cycles.store(persisted.face_cycles, Ordering::Relaxed);
                self.audio_cycles.store(persisted.audio_cycles, Ordering::Relaxed);
                self.typing_cycles.store(persisted.typing_cycles, Ordering::Relaxed);
                self.error_cycles.store(persisted.error_cycles, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.face_cycles.store(0, Ordering::Relaxed);
        self.audio_cycles.store(0, Ordering::Relaxed);
        self.typing_cycles.store(0, Ordering::Relaxed);
        self.error_cycles.store(0, Ordering::Relaxed);
    }
}

impl Default for VerdictLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of verdict statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictStats {
    pub face_cycles: u64,
    pub audio_cycles: u64,
    pub typing_cycles: u64,
    pub error_cycles: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    face_cycles: u64,
    audio_cycles: u64,
    typing_cycles: u64,
    error_cycles: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared verdict log.
pub type SharedVerdictLog = Arc<VerdictLog>;

/// Create a new shared verdict log.
pub fn create_shared_log() -> SharedVerdictLog {
    Arc::new(VerdictLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{FaceEmotion, MoodLabel};

    #[test]
    fn test_cycle_counting() {
        let log = VerdictLog::new();
        let verdict = Verdict::new(MoodLabel::Face(FaceEmotion::Happy), 0.8);

        log.record_verdict(SignalSource::Face, &verdict);
        log.record_verdict(SignalSource::Face, &verdict);
        log.record_error_cycle();

        let stats = log.stats();
        assert_eq!(stats.face_cycles, 2);
        assert_eq!(stats.audio_cycles, 0);
        assert_eq!(stats.error_cycles, 1);
    }

    #[test]
    fn test_csv_append() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("feature_log.csv");
        let log = VerdictLog::with_persistence(dir.path().join("stats.json"), csv.clone());

        let verdict = Verdict::new(MoodLabel::Face(FaceEmotion::Happy), 0.87);
        log.record_verdict(SignalSource::Face, &verdict);
        log.record_verdict(
            SignalSource::Audio,
            &Verdict::new(MoodLabel::Audio(crate::signal::AudioEmotion::Calm), 0.5),
        );

        let content = std::fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("face,Happy,0.87"));
        assert!(lines[1].contains("audio,Calm,0.50"));
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let stats_path = dir.path().join("stats.json");
        let csv_path = dir.path().join("feature_log.csv");

        let log = VerdictLog::with_persistence(stats_path.clone(), csv_path.clone());
        log.record_verdict(
            SignalSource::Typing,
            &Verdict::new(MoodLabel::Typing(crate::signal::TypingMood::Focused), 1.0),
        );
        log.save().unwrap();

        let reloaded = VerdictLog::with_persistence(stats_path, csv_path);
        assert_eq!(reloaded.stats().typing_cycles, 1);
    }

    #[test]
    fn test_summary_format() {
        let log = VerdictLog::new();
        let summary = log.summary();
        assert!(summary.contains("Face cycles"));
        assert!(summary.contains("Audio cycles"));
        assert!(summary.contains("No-subject cycles"));
    }
}
