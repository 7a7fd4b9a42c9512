//! Wall-clock rate limiting for repeated calls.
//!
//! [`Throttle`] gates a closure so it runs at most once per interval. It is
//! a plain time comparison, not a scheduled task: there is no timer thread
//! and nothing to cancel. A call suppressed by the gate is remembered, and
//! [`Throttle::flush`] runs it immediately.
//!
//! The widget layer uses this to rate-limit persistence writes triggered by
//! rapid value changes.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct ThrottleState {
    last_run: Option<Instant>,
    pending: bool,
}

/// Invoke a closure at most once per interval.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
/// use autoform_core::Throttle;
///
/// let count = Arc::new(AtomicUsize::new(0));
/// let count_clone = count.clone();
/// let throttle = Throttle::new(Duration::from_secs(60), move || {
///     count_clone.fetch_add(1, Ordering::SeqCst);
/// });
///
/// throttle.call(); // runs
/// throttle.call(); // gated
/// assert_eq!(count.load(Ordering::SeqCst), 1);
///
/// throttle.flush(); // runs the suppressed call
/// assert_eq!(count.load(Ordering::SeqCst), 2);
/// ```
pub struct Throttle {
    interval: Duration,
    func: Box<dyn Fn() + Send + Sync>,
    state: Mutex<ThrottleState>,
}

impl Throttle {
    /// Create a throttle around `func` with the given minimum interval.
    pub fn new<F>(interval: Duration, func: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            interval,
            func: Box::new(func),
            state: Mutex::new(ThrottleState {
                last_run: None,
                pending: false,
            }),
        }
    }

    /// Invoke the closure if the interval has elapsed since the last run.
    ///
    /// Returns `true` if the closure ran. A gated call sets the pending
    /// flag so a later [`flush`](Self::flush) can deliver it.
    pub fn call(&self) -> bool {
        let now = Instant::now();
        let run = {
            let mut state = self.state.lock();
            match state.last_run {
                Some(last) if now.duration_since(last) < self.interval => {
                    state.pending = true;
                    false
                }
                _ => {
                    state.last_run = Some(now);
                    state.pending = false;
                    true
                }
            }
        };
        if run {
            (self.func)();
        }
        run
    }

    /// Run the closure now if a call was suppressed by the gate.
    ///
    /// Returns `true` if a pending call was delivered.
    pub fn flush(&self) -> bool {
        let run = {
            let mut state = self.state.lock();
            if state.pending {
                state.pending = false;
                state.last_run = Some(Instant::now());
                true
            } else {
                false
            }
        };
        if run {
            (self.func)();
        }
        run
    }

    /// Whether a suppressed call is waiting for `flush`.
    pub fn has_pending(&self) -> bool {
        self.state.lock().pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_throttle(interval: Duration) -> (Throttle, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let throttle = Throttle::new(interval, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (throttle, count)
    }

    #[test]
    fn first_call_runs_immediately() {
        let (throttle, count) = counting_throttle(Duration::from_secs(60));
        assert!(throttle.call());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rapid_calls_are_gated() {
        let (throttle, count) = counting_throttle(Duration::from_secs(60));
        throttle.call();
        assert!(!throttle.call());
        assert!(!throttle.call());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(throttle.has_pending());
    }

    #[test]
    fn flush_delivers_suppressed_call() {
        let (throttle, count) = counting_throttle(Duration::from_secs(60));
        throttle.call();
        throttle.call();
        assert!(throttle.flush());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!throttle.flush());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn elapsed_interval_reopens_gate() {
        let (throttle, count) = counting_throttle(Duration::from_millis(0));
        throttle.call();
        assert!(throttle.call());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
