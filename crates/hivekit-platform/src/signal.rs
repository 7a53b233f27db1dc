//! Waitable signal objects.
//!
//! A [`WaitableSignal`] is a manual-reset flag that threads can poll, block
//! on, or await. The platform sets it when a subscribed change happens and
//! clears it when a new subscription is accepted.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

#[derive(Default)]
struct SignalState {
    set: bool,
    /// Number of times the signal has been set. Never reset.
    fired: u64,
}

struct SignalInner {
    state: Mutex<SignalState>,
    cond: Condvar,
    notify: Notify,
}

/// A cloneable handle to one waitable signal object.
///
/// Clones refer to the same underlying object; [`WaitableSignal::same_as`]
/// compares identity.
#[derive(Clone)]
pub struct WaitableSignal {
    inner: Arc<SignalInner>,
}

impl WaitableSignal {
    /// Create an unset signal.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                state: Mutex::new(SignalState::default()),
                cond: Condvar::new(),
                notify: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SignalState> {
        // The guarded state is always valid, so a poisoned lock is still usable.
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the signal and wake every waiter.
    pub fn set(&self) {
        let mut state = self.state();
        state.set = true;
        state.fired += 1;
        self.inner.cond.notify_all();
        self.inner.notify.notify_waiters();
    }

    /// Clear the signal. The fire count is unaffected.
    pub fn reset(&self) {
        self.state().set = false;
    }

    /// Zero-timeout poll.
    pub fn is_set(&self) -> bool {
        self.state().set
    }

    /// How many times the signal has been set since it was created.
    pub fn fire_count(&self) -> u64 {
        self.state().fired
    }

    /// Block until the signal is set.
    pub fn wait(&self) {
        let mut state = self.state();
        while !state.set {
            state = self
                .inner
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the signal is set or `timeout` elapses. Returns whether
    /// the signal was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        while !state.set {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
        true
    }

    /// Wait for the signal from async code without blocking the executor.
    pub async fn wait_async(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent `set` cannot be missed.
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }

    /// Returns `true` if both handles refer to the same signal object.
    pub fn same_as(&self, other: &WaitableSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for WaitableSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WaitableSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitableSignal")
            .field("set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn new_signal_is_unset() {
        let signal = WaitableSignal::new();
        assert!(!signal.is_set());
        assert!(!signal.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn set_and_reset() {
        let signal = WaitableSignal::new();
        signal.set();
        assert!(signal.is_set());
        assert!(signal.wait_timeout(Duration::ZERO));
        signal.reset();
        assert!(!signal.is_set());
    }

    #[test]
    fn reset_keeps_fire_count() {
        let signal = WaitableSignal::new();
        assert_eq!(signal.fire_count(), 0);
        signal.set();
        signal.reset();
        assert_eq!(signal.fire_count(), 1);
        signal.set();
        assert_eq!(signal.fire_count(), 2);
    }

    #[test]
    fn clones_share_state() {
        let a = WaitableSignal::new();
        let b = a.clone();
        b.set();
        assert!(a.is_set());
        assert!(a.same_as(&b));
        assert!(!a.same_as(&WaitableSignal::new()));
    }

    #[test]
    fn wait_wakes_on_set_from_another_thread() {
        let signal = WaitableSignal::new();
        let setter = signal.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set();
        });
        signal.wait();
        assert!(signal.is_set());
        handle.join().expect("setter thread should not panic");
    }

    #[test]
    fn wait_timeout_expires() {
        let signal = WaitableSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn wait_async_wakes_on_set() {
        let signal = WaitableSignal::new();
        let setter = signal.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            setter.set();
        });
        signal.wait_async().await;
        assert!(signal.is_set());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn wait_async_returns_immediately_when_set() {
        let signal = WaitableSignal::new();
        signal.set();
        signal.wait_async().await;
    }
}
