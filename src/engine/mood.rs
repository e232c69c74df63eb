//! The canonical mood verdict and its single-writer state machine.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::engine::cell::StateCell;
use crate::signal::{MoodLabel, SignalSource, Verdict};

/// The consolidated mood verdict exposed to observers.
///
/// Exactly one case is active at a time. Only the mood state machine writes
/// this value; every other component reads it. Once `Detected`, the state
/// never reverts to `Inactive` on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum MoodState {
    /// No detection has completed yet.
    Inactive,
    /// An aggregation cycle is in flight; no stale label is shown.
    Processing,
    /// A completed classification, tagged with the modality that produced it.
    Detected {
        label: MoodLabel,
        source: SignalSource,
    },
    /// A cycle completed without an eligible subject.
    Error { reason: String },
}

/// Single-writer cell holding the [`MoodState`].
///
/// Completed cycles from different sources are not fused; each one
/// overwrites the shared state, last writer wins. Every completed cycle
/// emits `Processing` first and then its result as one atomic pair, so an
/// observer of the transition stream always sees the pair uninterleaved.
#[derive(Debug)]
pub struct MoodCell {
    cell: StateCell<MoodState>,
}

impl MoodCell {
    pub fn new() -> Self {
        Self {
            cell: StateCell::new(MoodState::Inactive),
        }
    }

    /// Publish one completed aggregation cycle ending in a detection.
    pub fn complete_detected(&self, verdict: Verdict, source: SignalSource) {
        debug!(%source, label = %verdict.label, confidence = verdict.confidence, "mood detected");
        self.cell.publish_all([
            MoodState::Processing,
            MoodState::Detected {
                label: verdict.label,
                source,
            },
        ]);
    }

    /// Publish one completed aggregation cycle that found no subject.
    pub fn complete_error(&self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(%reason, "mood cycle error");
        self.cell
            .publish_all([MoodState::Processing, MoodState::Error { reason }]);
    }

    pub fn snapshot(&self) -> MoodState {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<MoodState> {
        self.cell.subscribe()
    }

    pub fn observe(&self) -> broadcast::Receiver<MoodState> {
        self.cell.observe()
    }
}

impl Default for MoodCell {
    fn default() -> Self {
        Self::new()
    }
}
