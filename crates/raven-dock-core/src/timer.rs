use std::time::Duration;
use tokio::time::Instant;

/// Restartable single-shot timer.
///
/// Timers don't own a task: they hold a deadline that the coordinator loop
/// sleeps on and polls. Starting an active timer moves its deadline instead
/// of queueing a second expiry, which coalesces bursts of triggers.
#[derive(Debug, Clone)]
pub struct Timer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval; a running timer restarts with the new interval
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
        if self.is_active() {
            self.start();
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    /// Start with a one-off interval that becomes the new interval
    pub fn start_with(&mut self, interval: Duration) {
        self.interval = interval;
        self.start();
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true exactly once when the deadline has been reached
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of two optional deadlines
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_deadline() {
        let mut timer = Timer::from_millis(100);
        let now = Instant::now();
        timer.start_at(now);

        assert!(!timer.fire_if_due(now + Duration::from_millis(99)));
        assert!(timer.fire_if_due(now + Duration::from_millis(100)));
        assert!(!timer.fire_if_due(now + Duration::from_millis(500)));
        assert!(!timer.is_active());
    }

    #[test]
    fn test_restart_moves_deadline() {
        let mut timer = Timer::from_millis(100);
        let now = Instant::now();
        timer.start_at(now);
        timer.start_at(now + Duration::from_millis(80));

        assert!(!timer.fire_if_due(now + Duration::from_millis(150)));
        assert!(timer.fire_if_due(now + Duration::from_millis(180)));
    }

    #[test]
    fn test_earliest() {
        let now = Instant::now();
        let later = now + Duration::from_secs(1);
        assert_eq!(earliest(Some(later), Some(now)), Some(now));
        assert_eq!(earliest(None, Some(later)), Some(later));
        assert_eq!(earliest(None, None), None);
    }
}
