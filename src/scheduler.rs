//! Deadline-based cooperative scheduling.
//!
//! A [`Scheduler`] is one periodic or one-shot task, queried directly by
//! its owner on every pass of the control loop. There is no task list and
//! no callback registry: the loop asks each task "are you due?" and runs
//! the matching phase itself.
//!
//! ```text
//! loop {
//!     if sensors.is_ready(clock.now_ms()) { /* fast sampling phase */ }
//!     if control.is_ready(clock.now_ms()) { /* slow control phase  */ }
//! }
//! ```
//!
//! Deadlines use wraparound-safe tick arithmetic, so a clock rollover
//! mid-period does not stall or double-fire a task. After each firing,
//! [`delta`](Scheduler::delta) reports the ticks actually elapsed since the
//! previous firing, for rate-independent integration downstream.

use crate::ticks::{ticks_add, ticks_diff, Ticks};

/// A single periodic or one-shot task.
///
/// # Example
///
/// ```rust
/// use rs_shunter::scheduler::Scheduler;
///
/// let mut task = Scheduler::every(100, 0);
/// assert!(!task.is_ready(50));
/// assert!(task.is_ready(100));
/// assert_eq!(task.delta(), 100);
/// // one firing per deadline, not one per query
/// assert!(!task.is_ready(101));
/// assert!(task.is_ready(205));
/// assert_eq!(task.delta(), 105); // actual elapsed, not the nominal period
/// ```
#[derive(Clone, Debug)]
pub struct Scheduler {
    period: Ticks,
    one_shot: bool,
    active: bool,
    deadline: Ticks,
    last: Ticks,
    delta: Ticks,
}

impl Scheduler {
    /// A task firing every `period_ms`, first due at `now + period_ms`.
    pub fn every(period_ms: Ticks, now: Ticks) -> Self {
        Self {
            period: period_ms,
            one_shot: false,
            active: true,
            deadline: ticks_add(now, period_ms),
            last: now,
            delta: 0,
        }
    }

    /// A task firing exactly once, `delay_ms` from `now`.
    pub fn once(delay_ms: Ticks, now: Ticks) -> Self {
        Self {
            one_shot: true,
            ..Self::every(delay_ms, now)
        }
    }

    /// Whether the task is due. Firing reschedules (or, for one-shots,
    /// permanently deactivates) the task.
    pub fn is_ready(&mut self, now: Ticks) -> bool {
        if !self.active {
            return false;
        }
        let ready = ticks_diff(self.deadline, now) <= 0;
        if ready {
            self.delta = ticks_diff(now, self.last) as Ticks;
            self.last = now;
            self.deadline = ticks_add(now, self.period);
            if self.one_shot {
                self.active = false;
            }
        }
        ready
    }

    /// Ticks elapsed between the two most recent firings.
    pub fn delta(&self) -> Ticks {
        self.delta
    }

    /// Whether the task can still fire.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Re-arm the task with a fresh deadline from `now`. Reactivates
    /// expired one-shots.
    pub fn restart(&mut self, now: Ticks) {
        self.active = true;
        self.deadline = ticks_add(now, self.period);
        self.last = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_before_period() {
        let mut task = Scheduler::every(100, 0);
        for now in 0..100 {
            assert!(!task.is_ready(now), "fired early at {now}");
        }
        assert!(task.is_ready(100));
    }

    #[test]
    fn fires_once_per_boundary() {
        let mut task = Scheduler::every(100, 0);
        assert!(task.is_ready(100));
        assert!(!task.is_ready(100));
        assert!(!task.is_ready(150));
        assert!(task.is_ready(200));
    }

    #[test]
    fn delta_tracks_actual_elapsed() {
        let mut task = Scheduler::every(100, 0);
        assert!(task.is_ready(130)); // late poll
        assert_eq!(task.delta(), 130);
        assert!(task.is_ready(230));
        assert_eq!(task.delta(), 100);
    }

    #[test]
    fn late_fire_reschedules_from_now() {
        // deadline is now + period, not deadline + period: the schedule
        // slips rather than bursts after a stall
        let mut task = Scheduler::every(100, 0);
        assert!(task.is_ready(450));
        assert!(!task.is_ready(500));
        assert!(task.is_ready(550));
    }

    #[test]
    fn one_shot_fires_once_then_deactivates() {
        let mut task = Scheduler::once(100, 0);
        assert!(!task.is_ready(99));
        assert!(task.is_ready(100));
        assert!(!task.is_active());
        assert!(!task.is_ready(500));
        assert!(!task.is_ready(10_000));
    }

    #[test]
    fn restart_rearms_one_shot() {
        let mut task = Scheduler::once(100, 0);
        assert!(task.is_ready(100));
        task.restart(200);
        assert!(!task.is_ready(250));
        assert!(task.is_ready(300));
    }

    #[test]
    fn survives_tick_rollover() {
        let start = u32::MAX - 50;
        let mut task = Scheduler::every(100, start);
        assert!(!task.is_ready(start.wrapping_add(99)));
        assert!(task.is_ready(start.wrapping_add(100)));
        assert_eq!(task.delta(), 100);
        assert!(task.is_ready(start.wrapping_add(200)));
    }

    #[test]
    fn zero_period_is_always_due() {
        let mut task = Scheduler::every(0, 10);
        assert!(task.is_ready(10));
        assert!(task.is_ready(10));
    }
}
