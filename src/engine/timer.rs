//! Cancellable focus-session countdown.
//!
//! A single session runs at a time. Starting a new session revokes the
//! previous one's generation token; the old tick task observes the revoked
//! token before its next emission and exits without emitting `Finished`.
//! Remaining time is decremented in fixed 1000 ms steps and minutes/seconds
//! are derived from it by integer arithmetic, never recomputed from the wall
//! clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::cell::StateCell;
use crate::engine::mood::MoodState;

/// Milliseconds between ticks.
pub const TICK_MS: u64 = 1000;

/// Default session length: the classic 25-minute focus block.
pub const DEFAULT_SESSION: Duration = Duration::from_secs(25 * 60);

/// Closing message for a session that ends on a happy mood.
pub const MESSAGE_HAPPY: &str = "Great job! Keep up the good work!";
/// Closing message for a session that ends on a neutral mood.
pub const MESSAGE_NEUTRAL: &str = "Session complete! Stay focused!";
/// Closing message for every other terminal mood state.
pub const MESSAGE_OTHER: &str = "Well done! Take a short break!";

/// Session timer state. Exactly one case is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SessionTimerState {
    Inactive,
    Running { remaining_ms: u64 },
    Finished { message: String },
}

impl SessionTimerState {
    /// Whole minutes remaining, derived from the millisecond counter.
    pub fn minutes(&self) -> u64 {
        match self {
            SessionTimerState::Running { remaining_ms } => remaining_ms / 60_000,
            _ => 0,
        }
    }

    /// Seconds within the current minute, derived from the counter.
    pub fn seconds(&self) -> u64 {
        match self {
            SessionTimerState::Running { remaining_ms } => (remaining_ms % 60_000) / 1000,
            _ => 0,
        }
    }
}

/// Select the closing message from a mood snapshot taken at tick zero.
fn closing_message(mood: &MoodState) -> &'static str {
    match mood {
        MoodState::Detected { label, .. } if label.is_happy() => MESSAGE_HAPPY,
        MoodState::Detected { label, .. } if label.is_neutral() => MESSAGE_NEUTRAL,
        _ => MESSAGE_OTHER,
    }
}

/// Cancellable countdown coupled to the mood state at completion.
#[derive(Debug)]
pub struct SessionTimer {
    cell: Arc<StateCell<SessionTimerState>>,
    mood: watch::Receiver<MoodState>,
    generation: Arc<AtomicU64>,
    total: Duration,
}

impl SessionTimer {
    /// Create a timer that will read its terminal mood from `mood`.
    pub fn new(mood: watch::Receiver<MoodState>, total: Duration) -> Self {
        Self {
            cell: Arc::new(StateCell::new(SessionTimerState::Inactive)),
            mood,
            generation: Arc::new(AtomicU64::new(0)),
            total,
        }
    }

    /// Start a session, cancelling any session already running.
    ///
    /// The spawned task checks its generation token under the publication
    /// lock before every emission, so a superseded session can never emit
    /// again — in particular it can never emit `Finished`.
    pub fn start(&self) -> JoinHandle<()> {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let cell = Arc::clone(&self.cell);
        let mood = self.mood.clone();
        let total_ms = self.total.as_millis() as u64;

        info!(total_ms, generation = my_generation, "session started");

        tokio::spawn(async move {
            let current = || generation.load(Ordering::SeqCst) == my_generation;
            let mut remaining_ms = total_ms;

            while remaining_ms > 0 {
                if !cell.publish_if(current, SessionTimerState::Running { remaining_ms }) {
                    debug!(generation = my_generation, "session superseded");
                    return;
                }
                tokio::time::sleep(Duration::from_millis(TICK_MS)).await;
                remaining_ms = remaining_ms.saturating_sub(TICK_MS);
            }

            // One snapshot at tick zero; the message is not live-updated.
            let message = closing_message(&mood.borrow().clone()).to_string();
            if cell.publish_if(current, SessionTimerState::Finished { message }) {
                info!(generation = my_generation, "session finished");
            }
        })
    }

    /// Stop the running session without emitting `Finished`.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!("session cancelled");
    }

    pub fn snapshot(&self) -> SessionTimerState {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionTimerState> {
        self.cell.subscribe()
    }

    pub fn observe(&self) -> broadcast::Receiver<SessionTimerState> {
        self.cell.observe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mood::MoodCell;
    use crate::signal::{FaceEmotion, MoodLabel, SignalSource, Verdict};

    fn timer_with_mood(total: Duration) -> (MoodCell, SessionTimer) {
        let mood = MoodCell::new();
        let timer = SessionTimer::new(mood.subscribe(), total);
        (mood, timer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_and_finishes_once() {
        let (_mood, timer) = timer_with_mood(Duration::from_secs(3));
        let mut rx = timer.observe();
        timer.start();

        let mut remaining = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                SessionTimerState::Running { remaining_ms } => remaining.push(remaining_ms),
                SessionTimerState::Finished { message } => {
                    assert_eq!(message, MESSAGE_OTHER);
                    break;
                }
                SessionTimerState::Inactive => unreachable!("timer never re-emits Inactive"),
            }
        }
        assert_eq!(remaining, vec![3000, 2000, 1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_follows_mood_snapshot() {
        let (mood, timer) = timer_with_mood(Duration::from_secs(2));
        mood.complete_detected(
            Verdict::new(MoodLabel::Face(FaceEmotion::Happy), 0.9),
            SignalSource::Face,
        );

        let mut rx = timer.observe();
        timer.start();
        loop {
            if let SessionTimerState::Finished { message } = rx.recv().await.unwrap() {
                assert_eq!(message, MESSAGE_HAPPY);
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_session() {
        let (_mood, timer) = timer_with_mood(Duration::from_secs(2));
        let first = timer.start();
        let mut rx = timer.observe();
        let second = timer.start();

        let mut finished = 0;
        // Drain until both tasks are done.
        let _ = second.await;
        let _ = first.await;
        while let Ok(state) = rx.try_recv() {
            if matches!(state, SessionTimerState::Finished { .. }) {
                finished += 1;
            }
        }
        assert_eq!(finished, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_emissions() {
        let (_mood, timer) = timer_with_mood(Duration::from_secs(60));
        let handle = timer.start();
        timer.cancel();
        let _ = handle.await;

        let mut rx = timer.observe();
        assert!(rx.try_recv().is_err());
        assert!(!matches!(
            timer.snapshot(),
            SessionTimerState::Finished { .. }
        ));
    }

    #[test]
    fn test_minutes_seconds_derivation() {
        let state = SessionTimerState::Running {
            remaining_ms: 25 * 60 * 1000,
        };
        assert_eq!(state.minutes(), 25);
        assert_eq!(state.seconds(), 0);

        let state = SessionTimerState::Running { remaining_ms: 61_000 };
        assert_eq!(state.minutes(), 1);
        assert_eq!(state.seconds(), 1);
    }
}
