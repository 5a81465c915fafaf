//! Wall-clock clock with a scheduler thread.

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::orders::Label;

use super::timer::{ClockTimer, TimeEvent, TimeEventHandler};
use super::{validate_timer, Clock, ClockError};

struct LiveTimer {
    timer: ClockTimer,
    handler: TimeEventHandler,
    cancelled: bool,
}

#[derive(Default)]
struct SchedulerState {
    timers: Vec<LiveTimer>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<SchedulerState>,
    condvar: Condvar,
}

/// Real-time clock.
///
/// Timers are driven by a dedicated scheduler thread: when a timer comes
/// due, a `TimeEvent` is built and the registered handler is invoked
/// synchronously on that thread, then the timer re-arms or is removed.
/// Cancellation is best-effort; a callback already dispatched is not
/// aborted.
pub struct LiveClock {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
    default_handler: Option<TimeEventHandler>,
}

impl LiveClock {
    /// Create the clock and start its scheduler thread.
    pub fn new() -> Self {
        let shared = Arc::new(Shared::default());
        let worker = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("live-clock".to_string())
            .spawn(move || scheduler_loop(worker))
            .ok();
        if thread.is_none() {
            tracing::error!("live clock scheduler thread failed to spawn; timers will not fire");
        }
        Self {
            shared,
            thread,
            default_handler: None,
        }
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

    fn register(&self, timer: ClockTimer, handler: TimeEventHandler) -> Result<(), ClockError> {
        let mut state = self.shared.state.lock();
        if state
            .timers
            .iter()
            .any(|t| !t.cancelled && t.timer.label == timer.label)
        {
            return Err(ClockError::DuplicateLabel(timer.label));
        }
        state.timers.push(LiveTimer {
            timer,
            handler,
            cancelled: false,
        });
        drop(state);
        self.shared.condvar.notify_one();
        Ok(())
    }
}

impl Default for LiveClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LiveClock {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.condvar.notify_one();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Clock for LiveClock {
    fn time_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timer_count(&self) -> usize {
        self.shared
            .state
            .lock()
            .timers
            .iter()
            .filter(|t| !t.cancelled && !t.timer.is_expired())
            .count()
    }

    fn timer_labels(&self) -> Vec<Label> {
        self.shared
            .state
            .lock()
            .timers
            .iter()
            .filter(|t| !t.cancelled && !t.timer.is_expired())
            .map(|t| t.timer.label.clone())
            .collect()
    }

    fn next_event_time(&self) -> Option<DateTime<Utc>> {
        self.shared
            .state
            .lock()
            .timers
            .iter()
            .filter(|t| !t.cancelled && !t.timer.is_expired())
            .map(|t| t.timer.next_time)
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
        let now = Utc::now();
        if alert_time < now {
            return Err(ClockError::AlertInPast { alert_time, now });
        }
        let handler = self.resolve_handler(&label, handler)?;
        self.register(ClockTimer::alert(label, alert_time), handler)
    }

    fn set_timer(
        &mut self,
        label: Label,
        interval: Duration,
        start_time: Option<DateTime<Utc>>,
        stop_time: Option<DateTime<Utc>>,
        handler: Option<TimeEventHandler>,
    ) -> Result<(), ClockError> {
        let start = start_time.unwrap_or_else(Utc::now);
        validate_timer(interval, start, stop_time)?;
        let handler = self.resolve_handler(&label, handler)?;
        self.register(
            ClockTimer::repeating(label, interval, start, stop_time),
            handler,
        )
    }

    fn cancel_timer(&mut self, label: &Label) {
        let mut state = self.shared.state.lock();
        for t in state.timers.iter_mut() {
            if &t.timer.label == label {
                t.cancelled = true;
            }
        }
        drop(state);
        self.shared.condvar.notify_one();
    }

    fn cancel_all_timers(&mut self) {
        let mut state = self.shared.state.lock();
        for t in state.timers.iter_mut() {
            t.cancelled = true;
        }
        drop(state);
        self.shared.condvar.notify_one();
    }
}

fn scheduler_loop(shared: Arc<Shared>) {
    loop {
        let mut state = shared.state.lock();
        if state.shutdown {
            return;
        }
        state
            .timers
            .retain(|t| !t.cancelled && !t.timer.is_expired());

        let next = state.timers.iter().map(|t| t.timer.next_time).min();
        let Some(next_time) = next else {
            shared.condvar.wait(&mut state);
            continue;
        };

        let now = Utc::now();
        if next_time > now {
            let wait = (next_time - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            let _ = shared.condvar.wait_for(&mut state, wait);
            continue;
        }

        // Collect due fires, then release the lock so handlers can call
        // back into the clock (cancel, reschedule) without deadlocking.
        let mut due: Vec<(TimeEvent, TimeEventHandler)> = Vec::new();
        for t in state.timers.iter_mut() {
            if t.cancelled {
                continue;
            }
            for timestamp in t.timer.advance(now) {
                due.push((
                    TimeEvent::new(t.timer.label.clone(), timestamp),
                    t.handler.clone(),
                ));
            }
        }
        drop(state);

        due.sort_by_key(|(event, _)| event.timestamp);
        for (event, handler) in due {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_live_timer_fires_repeatedly() {
        let mut clock = LiveClock::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        clock
            .set_timer(
                Label::from("tick"),
                Duration::milliseconds(10),
                None,
                None,
                Some(Arc::new(move |_event| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();
        assert_eq!(clock.timer_count(), 1);

        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(count.load(Ordering::SeqCst) >= 5);
    }

    #[test]
    fn test_live_alert_fires_once_and_expires() {
        let mut clock = LiveClock::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        clock
            .set_time_alert(
                Label::from("alert"),
                Utc::now() + Duration::milliseconds(20),
                Some(Arc::new(move |_event| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(200));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(clock.timer_count(), 0);
    }

    #[test]
    fn test_cancel_suppresses_further_firings() {
        let mut clock = LiveClock::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        clock
            .set_timer(
                Label::from("tick"),
                Duration::milliseconds(10),
                None,
                None,
                Some(Arc::new(move |_event| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(50));
        clock.cancel_timer(&Label::from("tick"));
        // Drain any in-flight callback before snapshotting.
        std::thread::sleep(std::time::Duration::from_millis(30));
        let after_cancel = count.load(Ordering::SeqCst);

        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
        assert_eq!(clock.timer_count(), 0);
    }

    #[test]
    fn test_alert_in_past_rejected() {
        let mut clock = LiveClock::new();
        let result = clock.set_time_alert(
            Label::from("late"),
            Utc::now() - Duration::seconds(1),
            Some(Arc::new(|_| {})),
        );
        assert!(matches!(result, Err(ClockError::AlertInPast { .. })));
    }
}
