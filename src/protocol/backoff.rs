//! Connection failure counter
//!
//! Counts failed connection attempts, at most once per window, and decides when the device should
//! re-register with the broker instead of retrying the same session again.
use crate::config::BACKOFF_CAP;

pub struct Backoff {
    count: u8,
    /// start of the current failure streak
    disconnect_time: u32,
    /// last time `count` moved
    fresh_time: u32,
}

impl Backoff {
    pub const fn new() -> Self {
        Self {
            count: 0,
            disconnect_time: 0,
            fresh_time: 0,
        }
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    /// Records a failed attempt: the first one starts a streak, later ones bump the counter once
    /// per `window` ms up to `cap`
    ///
    /// `cap` is kept within `1..=BACKOFF_CAP` whatever the caller passes.
    pub fn record_failure(&mut self, now: u32, window: u32, cap: u8) {
        if self.count == 0 {
            self.count = 1;
            self.disconnect_time = now;
            self.fresh_time = now;
        } else if now.wrapping_sub(self.fresh_time) >= window {
            self.fresh_time = now;
            self.count = self.count.saturating_add(1).min(limit(cap));
            log::debug!("connection failures: {}", self.count);
        }
    }

    /// Connected again, the streak is over
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Re-registration succeeded
    pub fn reset(&mut self, now: u32) {
        self.count = 0;
        self.disconnect_time = now;
    }

    /// Re-registration failed, the streak start is moved `shortcut` ms into the past
    pub fn defer(&mut self, now: u32, shortcut: u32) {
        self.count = 0;
        self.disconnect_time = now.wrapping_sub(shortcut);
    }

    /// `true` once the streak lasted longer than `idle` ms or the counter hit `cap`
    pub fn reregister_due(&self, now: u32, idle: u32, cap: u8) -> bool {
        (now.wrapping_sub(self.disconnect_time) > idle && self.count > 0)
            || self.count >= limit(cap)
    }
}

fn limit(cap: u8) -> u8 {
    cap.clamp(1, BACKOFF_CAP)
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BACKOFF_CAP, BACKOFF_WINDOW, REREGISTER_IDLE};
    use rand::{thread_rng, Rng};

    #[test]
    fn test_first_failure_starts_streak() {
        let mut backoff = Backoff::new();
        backoff.record_failure(1_000, BACKOFF_WINDOW, BACKOFF_CAP);
        assert_eq!(backoff.count(), 1);
        assert!(!backoff.reregister_due(1_000 + REREGISTER_IDLE, REREGISTER_IDLE, BACKOFF_CAP));
        assert!(backoff.reregister_due(1_001 + REREGISTER_IDLE, REREGISTER_IDLE, BACKOFF_CAP));
    }

    #[test]
    fn test_one_increment_per_window() {
        let mut backoff = Backoff::new();
        backoff.record_failure(0, BACKOFF_WINDOW, BACKOFF_CAP);
        for now in (0..BACKOFF_WINDOW).step_by(100) {
            backoff.record_failure(now, BACKOFF_WINDOW, BACKOFF_CAP);
        }
        assert_eq!(backoff.count(), 1);
        backoff.record_failure(BACKOFF_WINDOW, BACKOFF_WINDOW, BACKOFF_CAP);
        assert_eq!(backoff.count(), 2);
        backoff.record_failure(BACKOFF_WINDOW + 1, BACKOFF_WINDOW, BACKOFF_CAP);
        assert_eq!(backoff.count(), 2);
    }

    #[test]
    fn test_count_is_capped() {
        let mut backoff = Backoff::new();
        for i in 0..100 {
            backoff.record_failure(i * BACKOFF_WINDOW, BACKOFF_WINDOW, BACKOFF_CAP);
            assert!(backoff.count() <= BACKOFF_CAP);
        }
        assert_eq!(backoff.count(), BACKOFF_CAP);
        assert!(backoff.reregister_due(0, REREGISTER_IDLE, BACKOFF_CAP));
    }

    #[test]
    fn test_cap_outside_range_is_clamped() {
        let mut backoff = Backoff::new();
        for i in 0..100 {
            backoff.record_failure(i * BACKOFF_WINDOW, BACKOFF_WINDOW, 40);
        }
        assert_eq!(backoff.count(), BACKOFF_CAP);

        let backoff = Backoff::new();
        assert!(!backoff.reregister_due(0, REREGISTER_IDLE, 0));
        let mut backoff = Backoff::new();
        backoff.record_failure(0, BACKOFF_WINDOW, 0);
        assert_eq!(backoff.count(), 1);
        assert!(backoff.reregister_due(0, REREGISTER_IDLE, 0));
    }

    #[test]
    fn test_reset_and_defer() {
        let mut backoff = Backoff::new();
        backoff.record_failure(0, BACKOFF_WINDOW, BACKOFF_CAP);
        backoff.reset(70_000);
        assert_eq!(backoff.count(), 0);
        assert!(!backoff.reregister_due(500_000, REREGISTER_IDLE, BACKOFF_CAP));

        backoff.record_failure(80_000, BACKOFF_WINDOW, BACKOFF_CAP);
        backoff.defer(90_000, 10_000);
        assert_eq!(backoff.count(), 0);
        assert!(!backoff.reregister_due(500_000, REREGISTER_IDLE, BACKOFF_CAP));
    }

    #[test]
    fn test_clear_keeps_streak_start() {
        let mut backoff = Backoff::new();
        backoff.record_failure(100, BACKOFF_WINDOW, BACKOFF_CAP);
        backoff.clear();
        assert_eq!(backoff.count(), 0);
        backoff.record_failure(200, BACKOFF_WINDOW, BACKOFF_CAP);
        assert_eq!(backoff.count(), 1);
    }

    #[test]
    fn test_streak_across_clock_wrap() {
        let mut backoff = Backoff::new();
        let start = u32::MAX - 2_000;
        backoff.record_failure(start, BACKOFF_WINDOW, BACKOFF_CAP);
        backoff.record_failure(start.wrapping_add(BACKOFF_WINDOW), BACKOFF_WINDOW, BACKOFF_CAP);
        assert_eq!(backoff.count(), 2);
        assert!(backoff.reregister_due(
            start.wrapping_add(REREGISTER_IDLE + 1),
            REREGISTER_IDLE,
            BACKOFF_CAP
        ));
    }

    #[test]
    fn test_random_failure_streaks() {
        let mut rng = thread_rng();
        for _ in 0..100 {
            let mut backoff = Backoff::new();
            let mut now: u32 = rng.gen_range(0, 1_000_000);
            let mut last_move = now;
            backoff.record_failure(now, BACKOFF_WINDOW, BACKOFF_CAP);
            for _ in 0..rng.gen_range(1, 200) {
                let before = backoff.count();
                now = now.wrapping_add(rng.gen_range(0, 3 * BACKOFF_WINDOW));
                backoff.record_failure(now, BACKOFF_WINDOW, BACKOFF_CAP);
                let after = backoff.count();
                assert!(after <= BACKOFF_CAP);
                assert!(after == before || after == before + 1);
                if now.wrapping_sub(last_move) >= BACKOFF_WINDOW {
                    last_move = now;
                    assert_eq!(after, (before + 1).min(BACKOFF_CAP));
                } else {
                    assert_eq!(after, before);
                }
            }
        }
    }
}
