// Debounced auto-save scheduling.
//
// Every structural change re-arms the timer; the save fires once the graph
// has been quiet for `delay`. The host drives it by calling `poll` from its
// own timer, so nothing here blocks or spawns.

use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Clone)]
pub struct AutoSave {
    delay: Duration,
    due_at: Option<Instant>,
}

impl AutoSave {
    pub fn new(delay: Duration) -> Self {
        Self { delay, due_at: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the countdown from `now`.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.due_at = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }

    /// Returns true exactly once per quiet period, when the save is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due_at {
            Some(due) if now >= due => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending save (e.g. after an explicit save).
    pub fn clear(&mut self) {
        self.due_at = None;
    }
}
