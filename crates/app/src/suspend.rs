//! Minimized-window handling.
//!
//! Some platforms send no `Resized` event when a minimized window is
//! restored, so a suspended app re-checks the drawable size on a timer
//! instead of waiting for events alone.

use std::time::{Duration, Instant};

/// How often a suspended app redraws to re-check the drawable size.
pub const SIZE_CHECK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct SuspendState {
    /// Next size check; `None` while rendering normally.
    next_check: Option<Instant>,
}

impl SuspendState {
    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.next_check.is_some()
    }

    /// Enters (or stays in) the suspended state and returns the next deadline.
    pub fn suspend(&mut self, now: Instant) -> Instant {
        let deadline = now + SIZE_CHECK_INTERVAL;
        self.next_check = Some(deadline);
        deadline
    }

    /// Leaves the suspended state. Returns `true` if it was suspended.
    pub fn resume(&mut self) -> bool {
        self.next_check.take().is_some()
    }

    /// Whether the size check deadline has passed.
    pub fn check_due(&self, now: Instant) -> bool {
        matches!(self.next_check, Some(deadline) if now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_app_never_checks() {
        let state = SuspendState::default();
        assert!(!state.is_suspended());
        assert!(!state.check_due(Instant::now() + Duration::from_secs(60)));
    }

    #[test]
    fn test_check_due_after_interval() {
        let mut state = SuspendState::default();
        let now = Instant::now();

        let deadline = state.suspend(now);

        assert!(state.is_suspended());
        assert_eq!(deadline, now + SIZE_CHECK_INTERVAL);
        assert!(!state.check_due(now));
        assert!(state.check_due(deadline));
        assert!(state.check_due(deadline + Duration::from_millis(1)));
    }

    #[test]
    fn test_suspending_again_pushes_deadline() {
        let mut state = SuspendState::default();
        let now = Instant::now();
        let first = state.suspend(now);

        let second = state.suspend(first);

        assert_eq!(second, first + SIZE_CHECK_INTERVAL);
        assert!(!state.check_due(first));
    }

    #[test]
    fn test_resume_reports_previous_state() {
        let mut state = SuspendState::default();
        assert!(!state.resume());

        state.suspend(Instant::now());
        assert!(state.resume());
        assert!(!state.is_suspended());
        assert!(!state.resume());
    }
}
