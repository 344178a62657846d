//! Time source and one-shot timers for the single-threaded event loop.
//!
//! Timers are keyed by purpose: arming an already armed timer moves its
//! deadline instead of stacking a second callback, and cancelling an idle
//! timer is a no-op.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;

use crate::model::CanvasId;

pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Pending batched displacement of a canvas selection.
    CoalescedMove(CanvasId),
    /// Window in which a second click counts as a double-click.
    DoubleClickWindow,
}

#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    pending: IndexMap<TimerId, u64>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) `id` to fire at `deadline`.
    pub fn arm(&mut self, id: TimerId, deadline: u64) {
        self.pending.insert(id, deadline);
    }

    /// Returns whether the timer was pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.pending.shift_remove(&id).is_some()
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Remove and return every timer due at `now`, in arming order.
    pub fn take_due(&mut self, now: u64) -> Vec<TimerId> {
        let due: Vec<TimerId> = self
            .pending
            .iter()
            .filter(|&(_, &at)| at <= now)
            .map(|(&id, _)| id)
            .collect();
        for id in &due {
            self.pending.shift_remove(id);
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearm_replaces_deadline() {
        let mut q = TimerQueue::new();
        let id = TimerId::CoalescedMove(CanvasId(1));
        q.arm(id, 5);
        q.arm(id, 12);
        assert!(q.take_due(10).is_empty());
        assert_eq!(q.take_due(12), vec![id]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut q = TimerQueue::new();
        q.arm(TimerId::DoubleClickWindow, 250);
        assert!(q.cancel(TimerId::DoubleClickWindow));
        assert!(!q.cancel(TimerId::DoubleClickWindow));
        assert!(q.take_due(1000).is_empty());
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(40);
        assert_eq!(other.now_ms(), 40);
    }
}
