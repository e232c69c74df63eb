//! Single-slot mailbox for bursty, best-effort frame delivery.
//!
//! The imaging pipeline delivers frames faster than they can be classified.
//! Rather than queue them, the mailbox holds at most one pending frame: a
//! newer frame overwrites a pending-but-unprocessed one, and taking a frame
//! for processing leaves the slot free for the next arrival.

use std::sync::Mutex;

/// Latest-wins slot holding at most one pending item.
#[derive(Debug)]
pub struct FrameMailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> FrameMailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Deposit a frame, dropping any pending one. Returns true when a
    /// pending frame was overwritten.
    pub fn offer(&self, frame: T) -> bool {
        let mut slot = self.slot.lock().expect("mailbox lock poisoned");
        slot.replace(frame).is_some()
    }

    /// Remove the pending frame, if any.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().expect("mailbox lock poisoned").take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().expect("mailbox lock poisoned").is_none()
    }
}

impl<T> Default for FrameMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_frame_wins() {
        let mailbox = FrameMailbox::new();
        assert!(!mailbox.offer(1));
        assert!(mailbox.offer(2));
        assert_eq!(mailbox.take(), Some(2));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_take_frees_slot() {
        let mailbox = FrameMailbox::new();
        mailbox.offer("a");
        assert_eq!(mailbox.take(), Some("a"));
        assert!(mailbox.is_empty());
        assert!(!mailbox.offer("b"));
    }
}
