#![forbid(unsafe_code)]

//! Toast auto-dismiss timer.
//!
//! The timer holds no scheduling primitive of its own: the engine asks
//! [`ToastTimer::is_due`] on each tick. Pause and resume are computed from
//! clock deltas, so a hover that lasts 50 ms pushes the deadline out by
//! exactly 50 ms.

use std::time::Duration;

use crate::options::HoverPause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running { started_at: Duration },
    Paused,
}

/// Remaining-time countdown with hover pause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastTimer {
    remaining: Duration,
    phase: Phase,
    hover: Option<HoverPause>,
    hover_cycles: u32,
}

impl ToastTimer {
    /// Start a countdown of `duration`. A zero duration never fires, so no
    /// timer is created. `hover` is `None` when hovering should not pause.
    #[must_use]
    pub fn start(duration: Duration, hover: Option<HoverPause>, now: Duration) -> Option<Self> {
        if duration.is_zero() {
            return None;
        }
        Some(Self {
            remaining: duration,
            phase: Phase::Running { started_at: now },
            hover,
            hover_cycles: 0,
        })
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    /// Time left as of `now`.
    #[must_use]
    pub fn remaining(&self, now: Duration) -> Duration {
        match self.phase {
            Phase::Running { started_at } => self.remaining.saturating_sub(now.saturating_sub(started_at)),
            Phase::Paused => self.remaining,
        }
    }

    /// Absolute deadline, `None` while paused.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        match self.phase {
            Phase::Running { started_at } => Some(started_at + self.remaining),
            Phase::Paused => None,
        }
    }

    #[must_use]
    pub fn is_due(&self, now: Duration) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Pointer entered the toast. Returns `true` if the countdown paused.
    pub fn pointer_enter(&mut self, now: Duration) -> bool {
        let Some(policy) = self.hover else {
            return false;
        };
        let Phase::Running { started_at } = self.phase else {
            return false;
        };
        if policy == HoverPause::Once && self.hover_cycles > 0 {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(now.saturating_sub(started_at));
        self.phase = Phase::Paused;
        self.hover_cycles += 1;
        tracing::trace!(remaining_ms = self.remaining.as_millis() as u64, "toast timer paused");
        true
    }

    /// Pointer left the toast. Returns `true` if the countdown resumed.
    pub fn pointer_leave(&mut self, now: Duration) -> bool {
        if self.phase != Phase::Paused {
            return false;
        }
        self.phase = Phase::Running { started_at: now };
        tracing::trace!(remaining_ms = self.remaining.as_millis() as u64, "toast timer resumed");
        true
    }
}
