//! Approach-to-viewport detection.
//!
//! Stories stay prerendered until the player's root element comes close
//! to the visible viewport; render chains block on the arrival signal
//! before promoting visibility.  The watch prefers the platform's native
//! one-shot subscription and falls back to polling when no intersection
//! primitive exists.  Arrival is latched: once the signal resolves the
//! watch ends and never re-arms.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::signal::Signal;
use crate::host::ViewportProbe;

/// Policy constants, preserved as configuration.
#[derive(Debug, Clone)]
pub struct ArrivalTuning {
    /// How far outside the viewport still counts as "approaching".
    pub margin_px: f64,
    /// Poll interval for the fallback path.
    pub poll_interval: Duration,
}

impl Default for ArrivalTuning {
    fn default() -> Self {
        Self {
            margin_px: 1000.0,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Resolve `arrived` once the player's root element nears the viewport.
pub(crate) fn spawn_arrival_watch(
    probe: Arc<dyn ViewportProbe>,
    tuning: ArrivalTuning,
    arrived: Signal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(subscription) = probe.subscribe(tuning.margin_px) {
            subscription.await;
        } else {
            debug!("no native viewport subscription, polling");
            while !probe.is_near_viewport(tuning.margin_px) {
                tokio::time::sleep(tuning.poll_interval).await;
            }
        }
        arrived.resolve();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct PollingProbe {
        near: AtomicBool,
        polls: AtomicUsize,
    }

    impl ViewportProbe for PollingProbe {
        fn subscribe(&self, _margin_px: f64) -> Option<BoxFuture<'static, ()>> {
            None
        }
        fn is_near_viewport(&self, _margin_px: f64) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.near.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polling_fallback_resolves_on_approach() {
        let probe = Arc::new(PollingProbe {
            near: AtomicBool::new(false),
            polls: AtomicUsize::new(0),
        });
        let arrived = Signal::new();
        let handle = spawn_arrival_watch(probe.clone(), ArrivalTuning::default(), arrived.clone());

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!arrived.is_resolved());
        assert!(probe.polls.load(Ordering::SeqCst) >= 2);

        probe.near.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(arrived.is_resolved());
        assert!(handle.is_finished());
    }

    struct NativeProbe {
        fired: Signal,
    }

    impl ViewportProbe for NativeProbe {
        fn subscribe(&self, _margin_px: f64) -> Option<BoxFuture<'static, ()>> {
            let fired = self.fired.clone();
            Some(Box::pin(async move {
                let _ = fired.wait().await;
            }))
        }
        fn is_near_viewport(&self, _margin_px: f64) -> bool {
            unreachable!("native subscription available")
        }
    }

    #[tokio::test]
    async fn native_subscription_is_preferred() {
        let fired = Signal::new();
        let probe = Arc::new(NativeProbe {
            fired: fired.clone(),
        });
        let arrived = Signal::new();
        let handle = spawn_arrival_watch(probe, ArrivalTuning::default(), arrived.clone());

        fired.resolve();
        handle.await.unwrap();
        assert!(arrived.is_resolved());
    }
}
