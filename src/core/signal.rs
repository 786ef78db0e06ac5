//! One-shot signals with typed cancellation.
//!
//! [`Signal`] is the crate's replacement for a deferred promise: it can be
//! resolved or cancelled exactly once, cloned freely, and awaited by any
//! number of tasks.  Cancellation delivers the typed [`Superseded`] marker
//! instead of an error string, so render chains can tell "a newer
//! navigation took over" apart from real failures.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Superseded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Resolved,
    Cancelled,
}

/// A cloneable one-shot signal.  The first `resolve()` or `cancel()` wins;
/// later transitions are no-ops.
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<State>>,
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(State::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Wake all waiters with success.  No-op if already settled.
    pub fn resolve(&self) {
        self.tx.send_if_modified(|s| {
            if *s == State::Pending {
                *s = State::Resolved;
                true
            } else {
                false
            }
        });
    }

    /// Wake all waiters with [`Superseded`].  No-op if already settled.
    pub fn cancel(&self) {
        self.tx.send_if_modified(|s| {
            if *s == State::Pending {
                *s = State::Cancelled;
                true
            } else {
                false
            }
        });
    }

    pub fn is_resolved(&self) -> bool {
        *self.tx.borrow() == State::Resolved
    }

    /// Wait until the signal settles.  Returns `Err(Superseded)` when the
    /// signal was cancelled (or every handle to it was dropped mid-wait).
    pub async fn wait(&self) -> Result<(), Superseded> {
        let mut rx = self.tx.subscribe();
        loop {
            match *rx.borrow_and_update() {
                State::Resolved => return Ok(()),
                State::Cancelled => return Err(Superseded),
                State::Pending => {}
            }
            if rx.changed().await.is_err() {
                return Err(Superseded);
            }
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_wakes_waiters() {
        let signal = Signal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };
        signal.resolve();
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn cancel_delivers_superseded() {
        let signal = Signal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };
        signal.cancel();
        assert_eq!(waiter.await.unwrap(), Err(Superseded));
    }

    #[tokio::test]
    async fn late_wait_on_settled_signal_returns_immediately() {
        let signal = Signal::new();
        signal.resolve();
        assert_eq!(signal.wait().await, Ok(()));
        // First transition wins; a cancel after resolve changes nothing.
        signal.cancel();
        assert_eq!(signal.wait().await, Ok(()));
        assert!(signal.is_resolved());
    }
}
