//! Condition-variable style waiting on state guarded by a tokio mutex
//!
//! A waiter registers with the [`Signal`] *before* it takes the lock and
//! checks its predicate, then releases the lock and sleeps. A mutator changes
//! the state under the lock and calls [`Signal::notify_all`]. Because the
//! registration precedes the check, a broadcast sent after the check but before
//! the sleep still wakes the waiter. Every wake-up re-checks the predicate.

use std::pin::Pin;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Default)]
pub struct Signal {
    notify: Notify,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in the next broadcast
    pub fn listen(&self) -> Pin<Box<Notified<'_>>> {
        let mut notified = Box::pin(self.notify.notified());
        notified.as_mut().enable();
        notified
    }

    /// Wakes every task currently waiting on this signal
    pub fn notify_all(&self) {
        self.notify.notify_waiters();
    }

    /// Blocks until `ready` returns Some for the state behind `lock`
    ///
    /// The lock is held only while `ready` runs.
    pub async fn wait_until<T, R, F>(&self, lock: &Mutex<T>, mut ready: F) -> R
    where
        F: FnMut(&T) -> Option<R>,
    {
        loop {
            let listener = self.listen();
            {
                let guard = lock.lock().await;
                if let Some(result) = ready(&guard) {
                    return result;
                }
            }
            listener.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[tokio::test]
    async fn test_returns_immediately_when_ready() {
        let signal = Signal::new();
        let lock = Mutex::new(5);
        let value = signal.wait_until(&lock, |v| (*v == 5).then_some(*v * 2)).await;
        assert_eq!(value, 10);
    }

    #[tokio::test]
    async fn test_wakes_after_mutation() {
        let signal = Arc::new(Signal::new());
        let lock = Arc::new(Mutex::new(0));

        let waiter = {
            let signal = Arc::clone(&signal);
            let lock = Arc::clone(&lock);
            tokio::spawn(async move { signal.wait_until(&lock, |v| (*v > 0).then_some(*v)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        *lock.lock().await = 7;
        signal.notify_all();

        let value = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter was not woken")
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_spurious_wakeup_keeps_waiting() {
        let signal = Signal::new();
        let lock = Mutex::new(0);

        let mut wait = task::spawn(signal.wait_until(&lock, |v| (*v == 2).then_some("done")));
        assert_pending!(wait.poll());

        // notified, but the predicate is still false
        *lock.lock().await = 1;
        signal.notify_all();
        assert!(wait.is_woken());
        assert_pending!(wait.poll());

        *lock.lock().await = 2;
        signal.notify_all();
        assert!(wait.is_woken());
        assert_ready_eq!(wait.poll(), "done");
    }

    #[tokio::test]
    async fn test_notify_between_check_and_sleep_is_not_lost() {
        let signal = Signal::new();
        let listener = signal.listen();
        signal.notify_all();

        let mut listener = task::spawn(listener);
        assert_ready_eq!(listener.poll(), ());
    }
}
