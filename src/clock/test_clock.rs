//! Deterministic clock for backtesting.

use chrono::{DateTime, Duration, Utc};

use crate::orders::Label;

use super::timer::{ClockTimer, TimeEvent, TimeEventHandler};
use super::{validate_timer, Clock, ClockError};

/// Discrete clock advanced explicitly by the caller.
///
/// `advance_time` returns the `(event, handler)` pairs that came due, in
/// firing order, without invoking anything: the caller decides whether and
/// when to run the handlers, which keeps multi-clock backtests deterministic.
pub struct TestClock {
    time: DateTime<Utc>,
    timers: Vec<(ClockTimer, TimeEventHandler)>,
    default_handler: Option<TimeEventHandler>,
}

impl TestClock {
    /// Create a test clock starting at the given time.
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            time: initial_time,
            timers: Vec::new(),
            default_handler: None,
        }
    }

    /// Set the current time directly without firing anything.
    pub fn set_time(&mut self, to: DateTime<Utc>) {
        self.time = to;
    }

    /// Advance time to `to`, returning every `(event, handler)` pair that
    /// would have fired in `(previous, to]`, ordered by fire time. Expired
    /// timers are consumed. Handlers are not invoked.
    pub fn advance_time(
        &mut self,
        to: DateTime<Utc>,
    ) -> Result<Vec<(TimeEvent, TimeEventHandler)>, ClockError> {
        if to < self.time {
            return Err(ClockError::TimeRegression {
                time: self.time,
                to,
            });
        }

        let mut fired = Vec::new();
        for (timer, handler) in &mut self.timers {
            for timestamp in timer.advance(to) {
                fired.push((
                    TimeEvent::new(timer.label.clone(), timestamp),
                    handler.clone(),
                ));
            }
        }
        self.timers.retain(|(timer, _)| !timer.is_expired());
        // Stable sort keeps registration order for simultaneous fires.
        fired.sort_by_key(|(event, _)| event.timestamp);

        self.time = to;
        Ok(fired)
    }

    fn resolve_handler(
        &self,
        label: &Label,
        handler: Option<TimeEventHandler>,
    ) -> Result<TimeEventHandler, ClockError> {
        handler
            .or_else(|| self.default_handler.clone())
            .ok_or_else(|| ClockError::MissingHandler(label.clone()))
    }

    fn check_label(&self, label: &Label) -> Result<(), ClockError> {
        if self.timers.iter().any(|(timer, _)| &timer.label == label) {
            return Err(ClockError::DuplicateLabel(label.clone()));
        }
        Ok(())
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

impl Clock for TestClock {
    fn time_now(&self) -> DateTime<Utc> {
        self.time
    }

    fn timer_count(&self) -> usize {
        self.timers.len()
    }

    fn timer_labels(&self) -> Vec<Label> {
        self.timers
            .iter()
            .map(|(timer, _)| timer.label.clone())
            .collect()
    }

    fn next_event_time(&self) -> Option<DateTime<Utc>> {
        self.timers
            .iter()
            .map(|(timer, _)| timer.next_time)
            .min()
    }

    fn set_default_handler(&mut self, handler: TimeEventHandler) {
        self.default_handler = Some(handler);
    }

    fn set_time_alert(
        &mut self,
        label: Label,
        alert_time: DateTime<Utc>,
        handler: Option<TimeEventHandler>,
    ) -> Result<(), ClockError> {
        self.check_label(&label)?;
        if alert_time < self.time {
            return Err(ClockError::AlertInPast {
                alert_time,
                now: self.time,
            });
        }
        let handler = self.resolve_handler(&label, handler)?;
        self.timers
            .push((ClockTimer::alert(label, alert_time), handler));
        Ok(())
    }

    fn set_timer(
        &mut self,
        label: Label,
        interval: Duration,
        start_time: Option<DateTime<Utc>>,
        stop_time: Option<DateTime<Utc>>,
        handler: Option<TimeEventHandler>,
    ) -> Result<(), ClockError> {
        self.check_label(&label)?;
        let start = start_time.unwrap_or(self.time);
        validate_timer(interval, start, stop_time)?;
        let handler = self.resolve_handler(&label, handler)?;
        self.timers
            .push((ClockTimer::repeating(label, interval, start, stop_time), handler));
        Ok(())
    }

    fn cancel_timer(&mut self, label: &Label) {
        self.timers.retain(|(timer, _)| &timer.label != label);
    }

    fn cancel_all_timers(&mut self) {
        self.timers.clear();
    }
}
