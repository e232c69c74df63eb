//! MoodSense - Multi-modal mood estimation engine.
//!
//! This library reduces per-frame classifier outputs from three signal
//! sources — face images, speech audio, and typing cadence — into a single
//! debounced mood verdict, and couples that verdict to a cancellable focus
//! session timer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MoodSense Engine                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────────┐   ┌───────────────┐         │
//! │  │  Face    │──▶│ single-best  │──▶│               │         │
//! │  └──────────┘   └──────────────┘   │               │         │
//! │  ┌──────────┐   ┌──────────────┐   │   MoodCell    │         │
//! │  │  Audio   │──▶│ vector avg   │──▶│ (last-writer- │         │
//! │  └──────────┘   │ (400 steps)  │   │     wins)     │         │
//! │  ┌──────────┐   └──────────────┘   │               │         │
//! │  │  Typing  │──▶│ cadence      │──▶│               │         │
//! │  └──────────┘   └──────────────┘   └───────┬───────┘         │
//! │                                            ▼                 │
//! │  ┌──────────────┐                  ┌───────────────┐         │
//! │  │ PCM Capture  │                  │ SessionTimer  │         │
//! │  │  (WAV out)   │                  │ (25 min)      │         │
//! │  └──────────────┘                  └───────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use moodsense::engine::MoodEngine;
//!
//! let mut engine = MoodEngine::new(400, 10, Duration::from_secs(25 * 60));
//!
//! // Feed one batch of audio model outputs and complete a cycle.
//! let steps = vec![vec![0.1; 8]; 400];
//! let verdict = engine.process_audio_steps(steps).expect("well-formed batch");
//! println!("{}", verdict.label);
//! ```

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod replay;
pub mod signal;
pub mod verdict_log;

// Re-export key types at crate root for convenience
pub use config::{Config, SourceConfig};
pub use engine::{MoodCell, MoodEngine, MoodState, SessionTimer, SessionTimerState};
pub use error::EngineError;
pub use signal::{
    AudioEmotion, Detection, FaceEmotion, MoodLabel, Sample, SignalSource, TypingMood, Verdict,
};
pub use verdict_log::{SharedVerdictLog, VerdictLog, VerdictStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
