//! Time abstraction.
//!
//! The pipeline reads the current time when signing and sleeps between retry
//! attempts. Both go through [`Clock`] so that tests can substitute virtual
//! time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::AbortHandle;

use crate::types::BoxFuture;

/// Identifier of a timer registered with [`Clock::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Creates a timer id from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// A callback fired by a timer.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Source of time and timers.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Completes after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;

    /// Schedules `callback` to run once after `duration`.
    fn set_timeout(&self, callback: TimerCallback, duration: Duration) -> TimerId;

    /// Cancels a pending timer. Unknown or already fired ids are ignored.
    fn clear_timeout(&self, id: TimerId);
}

/// Wall-clock implementation backed by the Tokio timer.
///
/// Timers are spawned onto the current Tokio runtime, so
/// [`set_timeout`](Clock::set_timeout) must be called from within one.
#[derive(Debug, Default)]
pub struct SystemClock {
    next_id: AtomicU64,
    timers: Arc<DashMap<u64, AbortHandle>>,
}

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of timers that have not fired or been cleared.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }

    fn set_timeout(&self, callback: TimerCallback, duration: Duration) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);
        // Holding the entry keeps the task's removal ordered after registration.
        let entry = self.timers.entry(id);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            timers.remove(&id);
            callback();
        });
        entry.insert(handle.abort_handle());
        TimerId(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        if let Some((_, handle)) = self.timers.remove(&id.0) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn test_now_is_close_to_wall_clock() {
        let clock = SystemClock::new();
        let delta = (Utc::now() - clock.now()).num_seconds().abs();
        assert!(delta < 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_waits_for_duration() {
        let clock = SystemClock::new();
        let start = tokio::time::Instant::now();
        clock.sleep(Duration::from_millis(300)).await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_timeout_fires() {
        let clock = SystemClock::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        clock.set_timeout(Box::new(move || flag.store(true, Ordering::SeqCst)), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(clock.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_timeout_prevents_callback() {
        let clock = SystemClock::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let id = clock.set_timeout(Box::new(move || flag.store(true, Ordering::SeqCst)), Duration::from_millis(50));
        clock.clear_timeout(id);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_timer_id_roundtrip() {
        assert_eq!(TimerId::new(7).value(), 7);
    }
}
