use std::time::Duration;

use crate::error::{PlinthError, PlinthResult};

/// Fixed slack added to every tick on top of the nominal interval, covering
/// the time the loop spends outside the timed wait.
pub const TICK_MARGIN: Duration = Duration::from_millis(500);

/// Idle/Swapping refresh state machine.
///
/// Idle ticks accumulate elapsed time; once the accumulator reaches the swap
/// interval the scheduler arms itself (Swapping) until `swap_done` resets
/// it. Ticks observed while Swapping are ignored, which is what serializes
/// swaps in the cooperative loop.
#[derive(Clone, Copy, Debug)]
pub struct Scheduler {
    tick: Duration,
    swap_after: Duration,
    elapsed: Duration,
    swapping: bool,
}

impl Scheduler {
    pub fn new(tick: Duration, swap_after: Duration) -> PlinthResult<Self> {
        if tick.is_zero() {
            return Err(PlinthError::config("tick interval must be > 0"));
        }
        if swap_after.is_zero() {
            return Err(PlinthError::config("swap interval must be > 0"));
        }
        Ok(Self {
            tick,
            swap_after,
            elapsed: Duration::ZERO,
            swapping: false,
        })
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    pub fn is_swapping(&self) -> bool {
        self.swapping
    }

    /// Advance the accumulator by one tick. Returns true when a swap became
    /// due, in which case the scheduler stays armed until `swap_done`.
    pub fn on_tick(&mut self) -> bool {
        if self.swapping {
            return false;
        }
        self.elapsed += self.tick + TICK_MARGIN;
        self.check_due()
    }

    /// Make the next attempt due immediately, regardless of accumulated
    /// time. Call `due` (or let the next tick fire) to start the swap.
    pub fn force(&mut self) {
        self.elapsed = self.swap_after;
    }

    /// Arm for a swap if the accumulator has reached the threshold.
    pub fn due(&mut self) -> bool {
        if self.swapping {
            return false;
        }
        self.check_due()
    }

    /// The in-flight swap finished: reset and return to Idle.
    pub fn swap_done(&mut self) {
        self.elapsed = Duration::ZERO;
        self.swapping = false;
    }

    fn check_due(&mut self) -> bool {
        if self.elapsed >= self.swap_after {
            self.swapping = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(tick_ms: u64, swap_ms: u64) -> Scheduler {
        Scheduler::new(
            Duration::from_millis(tick_ms),
            Duration::from_millis(swap_ms),
        )
        .unwrap()
    }

    #[test]
    fn swap_fires_on_the_first_tick_reaching_the_threshold() {
        // Each 500 ms tick accrues 500 + 500 margin = 1000 ms.
        let mut sched = scheduler(500, 10_000);
        for _ in 0..9 {
            assert!(!sched.on_tick());
        }
        assert!(sched.on_tick());
        assert!(sched.is_swapping());
    }

    #[test]
    fn ticks_are_ignored_while_swapping() {
        let mut sched = scheduler(500, 1_000);
        assert!(sched.on_tick());
        assert!(!sched.on_tick());
        assert!(!sched.on_tick());
        sched.swap_done();
        assert!(!sched.is_swapping());
    }

    #[test]
    fn completed_swap_resets_the_accumulator() {
        let mut sched = scheduler(500, 1_000);
        assert!(sched.on_tick());
        sched.swap_done();
        assert!(!sched.due());
        assert!(sched.on_tick());
    }

    #[test]
    fn force_makes_the_next_attempt_due() {
        let mut sched = scheduler(500, 60_000);
        assert!(!sched.on_tick());
        sched.force();
        assert!(sched.due());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        assert!(Scheduler::new(Duration::ZERO, Duration::from_secs(1)).is_err());
        assert!(Scheduler::new(Duration::from_secs(1), Duration::ZERO).is_err());
    }
}
