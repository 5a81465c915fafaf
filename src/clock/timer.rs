//! Time events and shared timer bookkeeping.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::orders::{EventId, Label};

/// Handler invoked (or returned, for the test clock) when a timer fires.
pub type TimeEventHandler = Arc<dyn Fn(TimeEvent) + Send + Sync>;

/// Event describing a single timer or alert firing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEvent {
    pub event_id: EventId,
    pub label: Label,
    pub timestamp: DateTime<Utc>,
}

impl TimeEvent {
    pub fn new(label: Label, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            label,
            timestamp,
        }
    }
}

impl fmt::Display for TimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeEvent({} @ {})", self.label, self.timestamp)
    }
}

/// Schedule entry shared by the clock implementations.
///
/// A single-shot alert has no interval; a repeating timer re-arms after each
/// fire until the next fire time would pass its stop time.
#[derive(Debug, Clone)]
pub(crate) struct ClockTimer {
    pub label: Label,
    pub next_time: DateTime<Utc>,
    interval: Option<Duration>,
    stop_time: Option<DateTime<Utc>>,
    expired: bool,
}

impl ClockTimer {
    /// Single-shot alert firing at `alert_time`.
    pub fn alert(label: Label, alert_time: DateTime<Utc>) -> Self {
        Self {
            label,
            next_time: alert_time,
            interval: None,
            stop_time: None,
            expired: false,
        }
    }

    /// Repeating timer firing at `start + k * interval` for `k >= 1`,
    /// while the fire time does not exceed `stop_time`.
    pub fn repeating(
        label: Label,
        interval: Duration,
        start_time: DateTime<Utc>,
        stop_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            label,
            next_time: start_time + interval,
            interval: Some(interval),
            stop_time,
            expired: false,
        }
    }

    /// Pop every fire time up to and including `to`, re-arming or expiring
    /// the timer as it goes.
    pub fn advance(&mut self, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut fired = Vec::new();
        while !self.expired && self.next_time <= to {
            fired.push(self.next_time);
            match self.interval {
                None => self.expired = true,
                Some(interval) => {
                    self.next_time += interval;
                    if let Some(stop) = self.stop_time {
                        if self.next_time > stop {
                            self.expired = true;
                        }
                    }
                }
            }
        }
        fired
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::UNIX_EPOCH
    }

    #[test]
    fn test_alert_fires_once() {
        let mut timer = ClockTimer::alert(Label::from("alert"), epoch() + Duration::seconds(10));

        assert!(timer.advance(epoch() + Duration::seconds(9)).is_empty());
        assert!(!timer.is_expired());

        let fired = timer.advance(epoch() + Duration::seconds(10));
        assert_eq!(fired, vec![epoch() + Duration::seconds(10)]);
        assert!(timer.is_expired());
    }

    #[test]
    fn test_repeating_timer_respects_stop() {
        let mut timer = ClockTimer::repeating(
            Label::from("timer"),
            Duration::seconds(3),
            epoch(),
            Some(epoch() + Duration::seconds(9)),
        );

        let fired = timer.advance(epoch() + Duration::seconds(10));
        assert_eq!(
            fired,
            vec![
                epoch() + Duration::seconds(3),
                epoch() + Duration::seconds(6),
                epoch() + Duration::seconds(9),
            ]
        );
        assert!(timer.is_expired());
    }

    #[test]
    fn test_repeating_timer_without_stop_rearms() {
        let mut timer =
            ClockTimer::repeating(Label::from("timer"), Duration::seconds(5), epoch(), None);

        let fired = timer.advance(epoch() + Duration::seconds(12));
        assert_eq!(fired.len(), 2);
        assert!(!timer.is_expired());
        assert_eq!(timer.next_time, epoch() + Duration::seconds(15));
    }
}
