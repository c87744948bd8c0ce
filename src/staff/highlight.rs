//! Highlight auto-clear timer
//!
//! The host owns the clock. `TimerScheduler::schedule` asks it for a
//! one-shot timer and the host later reports expiry back through
//! `StaffDisplay::fire_timer`. Only the most recently armed timer is live; an
//! expiry for any other id is stale and ignored.

use std::time::Duration;

/// Default time a highlight stays on the staff
pub const DEFAULT_HIGHLIGHT_DURATION: Duration = Duration::from_millis(600);

pub type TimerId = u32;

/// One-shot timers provided by the host
pub trait TimerScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

/// Scheduler that hands out ids but never fires on its own
///
/// Suitable when the host drives expiry itself.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: TimerId,
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&mut self, _delay: Duration) -> TimerId {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    fn cancel(&mut self, _id: TimerId) {}
}

/// Single cancellable timer slot
pub struct HighlightTimer {
    scheduler: Box<dyn TimerScheduler>,
    active: Option<TimerId>,
}

impl HighlightTimer {
    pub fn new(scheduler: Box<dyn TimerScheduler>) -> Self {
        Self {
            scheduler,
            active: None,
        }
    }

    /// Cancel any pending timer, then arm a new one
    pub fn arm(&mut self, delay: Duration) -> TimerId {
        self.cancel();
        let id = self.scheduler.schedule(delay);
        self.active = Some(id);
        id
    }

    pub fn cancel(&mut self) {
        if let Some(id) = self.active.take() {
            self.scheduler.cancel(id);
        }
    }

    /// Consume an expiry; `true` only for the live timer
    pub fn expire(&mut self, id: TimerId) -> bool {
        if self.active == Some(id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Option<TimerId> {
        self.active
    }
}
