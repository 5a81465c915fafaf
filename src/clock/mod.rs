//! Clock and timer subsystem.
//!
//! A [`Clock`] supplies the current UTC time and schedules labelled alerts
//! (single-shot) and timers (repeating). Two variants exist:
//!
//! - [`TestClock`](test_clock::TestClock): discrete time advanced by the
//!   caller; `advance_time` returns the events that would have fired without
//!   invoking any handler, keeping backtests deterministic and reorderable
//!   across multiple simulated clocks.
//! - [`LiveClock`](live_clock::LiveClock): wall-clock time; a scheduler
//!   thread fires handlers synchronously as timers come due.

pub mod live_clock;
pub mod test_clock;
mod timer;

use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::rc::Rc;

use crate::orders::Label;

pub use live_clock::LiveClock;
pub use test_clock::TestClock;
pub use timer::{TimeEvent, TimeEventHandler};

/// Shared handle to a clock, single-threaded ownership.
pub type SharedClock = Rc<RefCell<dyn Clock>>;

/// Time source and timer scheduler.
///
/// Labels are unique per clock. Every schedule needs a handler, either its
/// own or the clock's default.
pub trait Clock {
    /// Current UTC time
    fn time_now(&self) -> DateTime<Utc>;

    /// Number of live (unexpired, uncancelled) timers
    fn timer_count(&self) -> usize;

    /// Labels of all live timers
    fn timer_labels(&self) -> Vec<Label>;

    /// Earliest next fire time across all live timers
    fn next_event_time(&self) -> Option<DateTime<Utc>>;

    /// Register the handler used by schedules that do not carry their own
    fn set_default_handler(&mut self, handler: TimeEventHandler);

    /// Schedule a single-shot alert at `alert_time` (which must not be in
    /// the past).
    fn set_time_alert(
        &mut self,
        label: Label,
        alert_time: DateTime<Utc>,
        handler: Option<TimeEventHandler>,
    ) -> Result<(), ClockError>;

    /// Schedule a repeating timer firing at `start + k * interval` for
    /// `k >= 1` while the fire time does not exceed `stop_time` (or forever
    /// when no stop is given).
    fn set_timer(
        &mut self,
        label: Label,
        interval: Duration,
        start_time: Option<DateTime<Utc>>,
        stop_time: Option<DateTime<Utc>>,
        handler: Option<TimeEventHandler>,
    ) -> Result<(), ClockError>;

    /// Cancel the timer or alert with the given label. Idempotent; an
    /// in-flight callback already dispatched is not aborted.
    fn cancel_timer(&mut self, label: &Label);

    /// Cancel every timer and alert
    fn cancel_all_timers(&mut self);
}

/// Errors that can occur scheduling timers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClockError {
    #[error("A timer labelled '{0}' already exists on this clock")]
    DuplicateLabel(Label),

    #[error("Alert time {alert_time} is before the current time {now}")]
    AlertInPast {
        alert_time: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Timer interval must be positive")]
    InvalidInterval,

    #[error("First fire time {first_fire} is after the stop time {stop_time}")]
    StopBeforeFirstFire {
        first_fire: DateTime<Utc>,
        stop_time: DateTime<Utc>,
    },

    #[error("No handler given for '{0}' and no default handler is registered")]
    MissingHandler(Label),

    #[error("Cannot advance time backwards from {time} to {to}")]
    TimeRegression {
        time: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// Shared schedule validation for timer registration.
pub(crate) fn validate_timer(
    interval: Duration,
    start_time: DateTime<Utc>,
    stop_time: Option<DateTime<Utc>>,
) -> Result<(), ClockError> {
    if interval <= Duration::zero() {
        return Err(ClockError::InvalidInterval);
    }
    if let Some(stop) = stop_time {
        let first_fire = start_time + interval;
        if first_fire > stop {
            return Err(ClockError::StopBeforeFirstFire {
                first_fire,
                stop_time: stop,
            });
        }
    }
    Ok(())
}
