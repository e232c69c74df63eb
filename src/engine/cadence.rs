//! Typing-cadence analysis.
//!
//! Converts raw keystroke timing into a typing-mood estimate. The analyzer
//! accumulates one timestamp per text change plus a running backspace counter
//! and, every `analysis_stride` events once enough text exists, reduces the
//! accumulated cadence to a [`TypingMood`].

use chrono::{DateTime, Utc};

use crate::signal::TypingMood;

/// Minimum typed characters before analysis is considered.
const MIN_CHARS: usize = 10;

/// Words-per-minute above which fast, tight typing reads as focused.
const FOCUSED_WPM: f64 = 50.0;
/// Inter-key interval below which typing reads as focused (ms).
const FOCUSED_INTERVAL_MS: f64 = 200.0;
/// Words-per-minute below which slow typing reads as tired.
const TIRED_WPM: f64 = 20.0;
/// Inter-key interval above which typing reads as tired (ms).
const TIRED_INTERVAL_MS: f64 = 800.0;
/// Backspace count above which heavy correction reads as anxious.
const ANXIOUS_BACKSPACES: u32 = 10;

/// Accumulates keystroke timing and classifies typing mood.
#[derive(Debug, Clone)]
pub struct CadenceAnalyzer {
    started_at: DateTime<Utc>,
    timestamps: Vec<DateTime<Utc>>,
    backspace_count: u32,
    char_count: usize,
    word_count: usize,
    analysis_stride: usize,
}

impl CadenceAnalyzer {
    /// Create an analyzer whose elapsed-time clock starts now.
    pub fn new(analysis_stride: usize) -> Self {
        Self::with_start(analysis_stride, Utc::now())
    }

    /// Create an analyzer with an explicit start instant.
    pub fn with_start(analysis_stride: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            timestamps: Vec::new(),
            backspace_count: 0,
            char_count: 0,
            word_count: 0,
            analysis_stride: analysis_stride.max(1),
        }
    }

    /// Record one text-change event: the full current text and its timestamp.
    ///
    /// A shrink in text length counts as a backspace.
    pub fn record(&mut self, text: &str, at: DateTime<Utc>) {
        self.timestamps.push(at);

        let chars = text.chars().count();
        if chars < self.char_count {
            self.backspace_count += 1;
        }
        self.char_count = chars;
        self.word_count = text.split_whitespace().count();
    }

    /// True precisely every `analysis_stride`-th recorded event once more
    /// than [`MIN_CHARS`] characters have been typed.
    pub fn should_analyze(&self) -> bool {
        self.char_count > MIN_CHARS
            && !self.timestamps.is_empty()
            && self.timestamps.len() % self.analysis_stride == 0
    }

    pub fn backspace_count(&self) -> u32 {
        self.backspace_count
    }

    pub fn event_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Reduce accumulated cadence to a typing mood.
    ///
    /// Returns `None` when fewer than two timestamps exist; with that little
    /// data there is no cadence to measure and the call is a no-op.
    pub fn analyze(&self) -> Option<TypingMood> {
        if self.timestamps.len() < 2 {
            return None;
        }

        let last = *self.timestamps.last().expect("checked non-empty");
        let elapsed_minutes = (last - self.started_at).num_milliseconds() as f64 / 60_000.0;
        let wpm = if elapsed_minutes > 0.0 {
            self.word_count as f64 / elapsed_minutes
        } else {
            0.0
        };

        let intervals: Vec<f64> = self
            .timestamps
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64)
            .collect();
        let avg_interval_ms = intervals.iter().sum::<f64>() / intervals.len() as f64;

        // First match wins.
        let mood = if wpm > FOCUSED_WPM && avg_interval_ms < FOCUSED_INTERVAL_MS {
            TypingMood::Focused
        } else if wpm < TIRED_WPM && avg_interval_ms > TIRED_INTERVAL_MS {
            TypingMood::Tired
        } else if self.backspace_count > ANXIOUS_BACKSPACES {
            TypingMood::Anxious
        } else {
            TypingMood::Neutral
        };

        Some(mood)
    }
}
