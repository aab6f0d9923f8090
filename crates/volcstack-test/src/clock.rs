//! Virtual clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use volcstack_core::{BoxFuture, Clock, TimerCallback, TimerId};

/// Unix timestamp of the default start time, 2024-01-01T00:00:00Z.
pub const DEFAULT_START_SECS: i64 = 1_704_067_200;

struct Timer {
    id: u64,
    due: DateTime<Utc>,
    callback: TimerCallback,
}

struct ClockState {
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    next_id: u64,
    timers: Vec<Timer>,
    sleeps: Vec<Duration>,
}

/// A [`Clock`] whose time only moves when a test moves it.
///
/// In the default *auto-advance* mode, [`sleep`](Clock::sleep) moves the
/// clock forward by the requested duration and completes at once, so retry
/// backoffs cost no real time. In *manual* mode, sleeps stay pending until
/// [`advance`](Self::advance) passes their due time.
///
/// Every requested sleep is recorded and can be read back with
/// [`sleeps`](Self::sleeps).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use volcstack_core::Clock;
/// use volcstack_test::MockClock;
///
/// let clock = MockClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(5));
/// assert_eq!((clock.now() - start).num_seconds(), 5);
/// ```
#[derive(Clone)]
pub struct MockClock {
    state: Arc<Mutex<ClockState>>,
    auto_advance: bool,
}

impl MockClock {
    /// Creates an auto-advancing clock at 2024-01-01T00:00:00Z.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(default_start(), true)
    }

    /// Creates a clock whose sleeps wait for [`advance`](Self::advance).
    #[must_use]
    pub fn manual() -> Self {
        Self::starting_at(default_start(), false)
    }

    /// Creates a clock at `start`.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>, auto_advance: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                start,
                now: start,
                next_id: 1,
                timers: Vec::new(),
                sleeps: Vec::new(),
            })),
            auto_advance,
        }
    }

    /// Jumps to `time` without firing timers.
    pub fn set_time(&self, time: DateTime<Utc>) {
        self.state.lock().now = time;
    }

    /// Moves time forward and fires every timer that became due, earliest first.
    pub fn advance(&self, duration: Duration) {
        let due = {
            let mut state = self.state.lock();
            state.now = offset(state.now, duration);
            let now = state.now;

            let (mut due, pending): (Vec<_>, Vec<_>) =
                state.timers.drain(..).partition(|timer| timer.due <= now);
            state.timers = pending;
            due.sort_by_key(|timer| (timer.due, timer.id));
            due
        };

        for timer in due {
            (timer.callback)();
        }
    }

    /// Time elapsed since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let state = self.state.lock();
        (state.now - state.start).to_std().unwrap_or_default()
    }

    /// Number of timers that have neither fired nor been cleared.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Durations of every sleep requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }

    /// Drops all pending timers without firing them.
    pub fn clear_timers(&self) {
        self.state.lock().timers.clear();
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockClock")
            .field("now", &state.now)
            .field("pending_timers", &state.timers.len())
            .field("auto_advance", &self.auto_advance)
            .finish()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().now
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.state.lock().sleeps.push(duration);

        if self.auto_advance {
            self.advance(duration);
            return Box::pin(tokio::task::yield_now());
        }

        let (tx, rx) = oneshot::channel();
        let id = self.set_timeout(
            Box::new(move || {
                let _ = tx.send(());
            }),
            duration,
        );
        let guard = TimerGuard {
            state: Arc::clone(&self.state),
            id,
        };
        Box::pin(async move {
            let _guard = guard;
            let _ = rx.await;
        })
    }

    fn set_timeout(&self, callback: TimerCallback, duration: Duration) -> TimerId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        let due = offset(state.now, duration);
        state.timers.push(Timer { id, due, callback });
        TimerId::new(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        self.state
            .lock()
            .timers
            .retain(|timer| timer.id != id.value());
    }
}

/// Removes the timer of an abandoned sleep.
struct TimerGuard {
    state: Arc<Mutex<ClockState>>,
    id: TimerId,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.state
            .lock()
            .timers
            .retain(|timer| timer.id != self.id.value());
    }
}

fn default_start() -> DateTime<Utc> {
    DateTime::from_timestamp(DEFAULT_START_SECS, 0).unwrap_or_default()
}

fn offset(time: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| time.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
