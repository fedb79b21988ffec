//! Minimum-interval gate for reconnect attempts.

/// Interval between reconnect attempts, in milliseconds.
pub const RETRY_INTERVAL_MS: u64 = 500;

/// Lets an action through at most once per [`RETRY_INTERVAL_MS`].
///
/// A freshly armed gate opens on the first check.
#[derive(Debug, Clone, Copy)]
pub struct RetryGate {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl Default for RetryGate {
    fn default() -> Self {
        Self::new(RETRY_INTERVAL_MS)
    }
}

impl RetryGate {
    /// A gate with a custom interval.
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// Returns `true` if the interval has elapsed since the last opening,
    /// and restarts the interval when it does.
    pub fn check(&mut self, now_ms: u64) -> bool {
        match self.last_ms {
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }

    /// Restart the interval from `now_ms`.
    pub fn reset(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }

    /// Make the next check open regardless of elapsed time.
    pub fn arm(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_check_opens() {
        let mut gate = RetryGate::default();
        assert!(gate.check(0));
        assert!(!gate.check(0));
    }

    #[test]
    fn test_opens_once_per_interval() {
        let mut gate = RetryGate::default();
        assert!(gate.check(1_000));
        assert!(!gate.check(1_499));
        assert!(gate.check(1_500));
        assert!(!gate.check(1_999));
        assert!(gate.check(2_000));
    }

    #[test]
    fn test_reset_restarts_interval() {
        let mut gate = RetryGate::default();
        assert!(gate.check(0));
        gate.reset(400);
        assert!(!gate.check(800));
        assert!(gate.check(900));
    }

    #[test]
    fn test_arm_reopens() {
        let mut gate = RetryGate::new(10_000);
        assert!(gate.check(5));
        gate.arm();
        assert!(gate.check(6));
    }
}
