//! # Redraw Scheduler
//!
//! Drives once-per-period redraws while the face is visible and interactive.
//!
//! - [`RenderScheduler::on_mode_changed`] is the only place that decides
//!   whether the timer runs: it runs iff `visible && !ambient`.
//! - Each fire requests one redraw and re-arms for the time left until the
//!   next period boundary, `period - (now mod period)`. With the default
//!   1000 ms period redraws land on whole seconds regardless of jitter.
//! - At most one fire is pending. Arming cancels the outstanding instance,
//!   and every fire carries a [`TimerId`] so a fire that raced a cancel is
//!   recognised as stale and dropped.
//!
//! In ambient mode the host sends its own once-per-minute tick instead; that
//! path never touches this timer.

use std::time::Duration;

/// Default interactive update period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1000);

/// Identifies one armed timer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Host timer that calls back `on_timer_fired(id)` after `delay`.
pub trait RedrawTimer {
    fn schedule(&mut self, id: TimerId, delay: Duration);
    fn cancel(&mut self, id: TimerId);
}

/// Cooperative single-pending redraw timer.
pub struct RenderScheduler {
    timer: Box<dyn RedrawTimer>,
    period_ms: i64,
    armed: Option<TimerId>,
    next_id: u64,
}

impl RenderScheduler {
    pub fn new(timer: Box<dyn RedrawTimer>, period: Duration) -> Self {
        let period_ms = i64::try_from(period.as_millis()).unwrap_or(i64::MAX).max(1);
        RenderScheduler {
            timer,
            period_ms,
            armed: None,
            next_id: 0,
        }
    }

    /// Whether interactive redraws should be running.
    pub fn should_run(visible: bool, ambient: bool) -> bool {
        visible && !ambient
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn armed_id(&self) -> Option<TimerId> {
        self.armed
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms as u64)
    }

    /// Re-evaluate after a visibility or ambient change.
    ///
    /// Any pending fire is cancelled; if the timer should run it is armed to
    /// fire immediately.
    pub fn on_mode_changed(&mut self, visible: bool, ambient: bool) {
        self.disarm();
        if Self::should_run(visible, ambient) {
            self.arm(Duration::ZERO);
        }
    }

    /// Handle a timer fire at wall-clock `now_ms` (milliseconds since epoch).
    ///
    /// Returns true if a redraw should be requested. A fire for an id that is
    /// not the armed instance returns false and changes nothing.
    pub fn tick(&mut self, id: TimerId, visible: bool, ambient: bool, now_ms: i64) -> bool {
        if self.armed != Some(id) {
            log::debug!("Ignoring stale timer fire {:?}", id);
            return false;
        }
        self.armed = None;
        if Self::should_run(visible, ambient) {
            let delay = self.delay_until_boundary(now_ms);
            self.arm(delay);
        }
        true
    }

    /// Time left until the next period boundary after `now_ms`.
    pub fn delay_until_boundary(&self, now_ms: i64) -> Duration {
        let remaining = self.period_ms - now_ms.rem_euclid(self.period_ms);
        Duration::from_millis(remaining as u64)
    }

    /// Cancel the pending fire, if any.
    pub fn disarm(&mut self) {
        if let Some(id) = self.armed.take() {
            self.timer.cancel(id);
        }
    }

    fn arm(&mut self, delay: Duration) {
        self.disarm();
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timer.schedule(id, delay);
        self.armed = Some(id);
    }
}
