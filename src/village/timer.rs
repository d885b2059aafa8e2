//! Tick timer — wall-clock durations advanced by discrete game ticks
//!
//! A timer is started with a duration in seconds and a starting tick, and
//! from then on only ticks matter for completion: the wall-clock fields are
//! carried for serialization, while `end_tick` decides when the countdown
//! snaps to zero. Correctness therefore does not depend on how often the
//! driver polls.

use crate::core::error::{Result, SimError};
use crate::core::types::{seconds_for, ticks_for, Tick};

/// Countdown shared by construction and clearing operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickTimer {
    active: bool,
    complete: bool,
    start_time: i64,
    end_time: i64,
    start_tick: Tick,
    end_tick: Tick,
    original_secs: i64,
    remaining_secs: i64,
    last_tick: Option<Tick>,
}

impl TickTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the timer is currently counting down.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the timer has run to completion (as opposed to being stopped).
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// UNIX time the countdown started; 0 while inactive.
    pub fn start_time(&self) -> i64 {
        if self.active {
            self.start_time
        } else {
            0
        }
    }

    /// UNIX time the countdown will end; 0 while inactive.
    pub fn end_time(&self) -> i64 {
        if self.active {
            self.end_time
        } else {
            0
        }
    }

    /// Tick at which the countdown completes; 0 while inactive.
    pub fn end_tick(&self) -> Tick {
        if self.active {
            self.end_tick
        } else {
            0
        }
    }

    /// Seconds the countdown was started with; 0 while inactive.
    pub fn original_secs(&self) -> i64 {
        if self.active {
            self.original_secs
        } else {
            0
        }
    }

    /// Seconds left on the countdown; 0 while inactive.
    pub fn remaining_secs(&self) -> i64 {
        if self.active {
            self.remaining_secs
        } else {
            0
        }
    }

    /// Start the countdown
    ///
    /// `now_unix` anchors the wall-clock fields; completion itself is
    /// decided against `start_tick + ticks_for(duration_secs)`.
    pub fn start(&mut self, now_unix: i64, start_tick: Tick, duration_secs: i64) -> Result<()> {
        if start_tick < 0 {
            return Err(SimError::InvalidTimerStart(format!(
                "starting tick {start_tick} is negative"
            )));
        }
        if duration_secs < 0 {
            return Err(SimError::InvalidTimerStart(format!(
                "duration {duration_secs}s is negative"
            )));
        }

        self.start_time = now_unix;
        self.end_time = now_unix + duration_secs;
        self.start_tick = start_tick;
        self.end_tick = start_tick + ticks_for(duration_secs);
        self.original_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.active = true;
        self.complete = false;
        self.last_tick = Some(start_tick);

        tracing::debug!(start_tick, end_tick = self.end_tick, "timer started");
        Ok(())
    }

    /// Advance the countdown to the given tick
    ///
    /// Returns `true` exactly when this call completed the timer. Ticks
    /// arriving out of order are logged and tolerated; the countdown is
    /// recomputed from the delivered tick either way.
    pub fn tick(&mut self, current_tick: Tick) -> bool {
        if !self.active {
            return false;
        }

        if let Some(last) = self.last_tick {
            if current_tick < last {
                tracing::warn!(current_tick, last, "tick delivered out of order");
            }
        }
        self.last_tick = Some(current_tick);

        if current_tick >= self.end_tick {
            self.remaining_secs = 0;
            self.active = false;
            self.complete = true;
            return true;
        }

        let elapsed = seconds_for((current_tick - self.start_tick).max(0));
        let remaining = self.original_secs - elapsed;
        if remaining <= 0 {
            self.remaining_secs = 0;
            self.active = false;
            self.complete = true;
            return true;
        }

        self.remaining_secs = remaining;
        false
    }

    /// Deactivate without completing (cancellation path).
    pub fn stop(&mut self) {
        self.active = false;
        self.complete = false;
    }

    /// Return every field to its default (recycling path).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_start_rejects_negative_inputs() {
        let mut timer = TickTimer::new();
        assert!(timer.start(100, -1, 10).is_err());
        assert!(timer.start(100, 0, -10).is_err());
        assert!(!timer.is_active());
    }

    #[test]
    fn test_countdown_and_completion() {
        let mut timer = TickTimer::new();
        timer.start(1_000, 0, 10).unwrap();
        assert!(timer.is_active());
        assert_eq!(timer.remaining_secs(), 10);
        assert_eq!(timer.end_time(), 1_010);
        assert_eq!(timer.end_tick(), ticks_for(10));

        assert!(!timer.tick(ticks_for(4)));
        assert_eq!(timer.remaining_secs(), 6);

        assert!(timer.tick(ticks_for(10)));
        assert!(!timer.is_active());
        assert!(timer.is_complete());
        assert_eq!(timer.remaining_secs(), 0);
    }

    #[test]
    fn test_tick_past_end_completes_once() {
        let mut timer = TickTimer::new();
        timer.start(0, 5, 2).unwrap();
        assert!(timer.tick(5 + ticks_for(2) + 100));
        // Already complete: further ticks are no-ops.
        assert!(!timer.tick(5 + ticks_for(2) + 200));
    }

    #[test]
    fn test_zero_duration_completes_on_first_tick() {
        let mut timer = TickTimer::new();
        timer.start(0, 3, 0).unwrap();
        assert!(timer.tick(3));
    }

    #[test]
    fn test_stop_deactivates_without_completing() {
        let mut timer = TickTimer::new();
        timer.start(0, 0, 60).unwrap();
        timer.stop();
        assert!(!timer.is_active());
        assert!(!timer.is_complete());
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(timer.end_time(), 0);
    }

    #[test]
    fn test_reset_clears_all_fields() {
        let mut timer = TickTimer::new();
        timer.start(500, 2, 30).unwrap();
        timer.tick(10);
        timer.reset();
        assert_eq!(timer, TickTimer::default());
    }

    #[test]
    fn test_out_of_order_tick_tolerated() {
        let mut timer = TickTimer::new();
        timer.start(0, 0, 60).unwrap();
        assert!(!timer.tick(ticks_for(30)));
        assert_eq!(timer.remaining_secs(), 30);

        // Regression is logged, not rejected; the countdown recomputes.
        assert!(!timer.tick(ticks_for(10)));
        assert_eq!(timer.remaining_secs(), 50);
    }

    proptest! {
        #[test]
        fn prop_remaining_is_monotone(duration in 0i64..100_000,
                                      start_tick in 0i64..1_000,
                                      a in 0i64..2_100_000, b in 0i64..2_100_000) {
            let (t1, t2) = if a <= b { (a, b) } else { (b, a) };
            let end = start_tick + ticks_for(duration);

            let mut first = TickTimer::new();
            first.start(0, start_tick, duration).unwrap();
            first.tick((start_tick + t1).min(end));
            let r1 = first.remaining_secs();

            let mut second = TickTimer::new();
            second.start(0, start_tick, duration).unwrap();
            second.tick((start_tick + t2).min(end));
            let r2 = second.remaining_secs();

            prop_assert!(r2 <= r1);
        }

        #[test]
        fn prop_remaining_is_zero_at_end_tick(duration in 0i64..100_000,
                                              start_tick in 0i64..1_000) {
            let mut timer = TickTimer::new();
            timer.start(0, start_tick, duration).unwrap();
            timer.tick(start_tick + ticks_for(duration));
            prop_assert_eq!(timer.remaining_secs(), 0);
            prop_assert!(timer.is_complete());
        }
    }
}
