//! Momentum scrolling for vertical drags.
//!
//! While a vertical gesture is active the host page follows the finger
//! 1:1 and the instantaneous speed is re-estimated on every move sample.
//! On release, if the last move was recent enough and the projected
//! offset (speed², clamped to a fraction of the viewport height, signed
//! by drag direction, scaled by the repeat-swipe multiplier) is large
//! enough, an eased residual scroll is animated over a duration
//! proportional to the viewport height.  A new drag supersedes the
//! animation via the `running` flag, checked every frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::host::ScrollSurface;

/// Policy constants, preserved as configuration.
#[derive(Debug, Clone)]
pub struct ScrollerTuning {
    /// Minimum finger travel before the page scrolls at all.
    pub min_delta_px: f64,
    /// Minimum projected offset for momentum to kick in.
    pub offset_threshold_px: f64,
    /// The last move must be at most this old at release.
    pub recency_window_ms: f64,
    /// A new drag within this window of the previous release compounds
    /// the multiplier.
    pub repeat_window_ms: f64,
    /// Projected offset cap, as a fraction of the viewport height.
    pub speed_limit: f64,
    /// Multiplier increment per repeat swipe.
    pub acceleration: f64,
    /// Animation duration per viewport pixel, in milliseconds.
    pub duration_ms_per_px: f64,
    /// Animation frame interval.
    pub frame: Duration,
}

impl Default for ScrollerTuning {
    fn default() -> Self {
        Self {
            min_delta_px: 5.0,
            offset_threshold_px: 30.0,
            recency_window_ms: 100.0,
            repeat_window_ms: 250.0,
            speed_limit: 0.3,
            acceleration: 1.0,
            duration_ms_per_px: 0.5,
            frame: Duration::from_millis(16),
        }
    }
}

/// Ease-out quartic: fast start, long tail.
fn ease_out_quart(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(4)
}

/// Momentum scroller over a [`ScrollSurface`].
pub struct MomentumScroller {
    surface: Arc<dyn ScrollSurface>,
    tuning: ScrollerTuning,
    touch_move_ms: f64,
    touch_end_ms: f64,
    start_client_y: f64,
    last_client_y: f64,
    scroll_origin: f64,
    delta_y: f64,
    /// Instantaneous speed in px/ms, re-estimated per move sample.
    speed: f64,
    meets_delta_threshold: bool,
    multiplier: f64,
    running: Arc<AtomicBool>,
}

impl MomentumScroller {
    pub fn new(surface: Arc<dyn ScrollSurface>, tuning: ScrollerTuning) -> Self {
        Self {
            surface,
            tuning,
            touch_move_ms: 0.0,
            touch_end_ms: 0.0,
            start_client_y: 0.0,
            last_client_y: 0.0,
            scroll_origin: 0.0,
            delta_y: 0.0,
            speed: 0.0,
            meets_delta_threshold: false,
            multiplier: 1.0,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a momentum animation is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn on_touch_start(&mut self, timestamp_ms: f64, client_y: f64) {
        // A swipe chained onto a still-running animation compounds the
        // multiplier; anything else resets it.
        self.multiplier = if self.is_running()
            && timestamp_ms - self.touch_end_ms < self.tuning.repeat_window_ms
        {
            self.multiplier + self.tuning.acceleration
        } else {
            1.0
        };
        // Halt any in-flight animation; the drag takes over.
        self.running.store(false, Ordering::Relaxed);

        self.touch_move_ms = timestamp_ms;
        self.start_client_y = client_y;
        self.last_client_y = client_y;
        self.scroll_origin = self.surface.scroll_top();
        self.delta_y = 0.0;
        self.speed = 0.0;
        self.meets_delta_threshold = false;
    }

    pub fn on_touch_move(&mut self, timestamp_ms: f64, client_y: f64) {
        let interval_ms = timestamp_ms - self.touch_move_ms;
        if interval_ms > 0.0 {
            self.speed = (client_y - self.last_client_y) / interval_ms;
        }
        self.touch_move_ms = timestamp_ms;
        self.last_client_y = client_y;
        self.delta_y = client_y - self.start_client_y;
        self.meets_delta_threshold = self.delta_y.abs() > self.tuning.min_delta_px;
        if self.meets_delta_threshold {
            self.surface.scroll_to(self.scroll_origin - self.delta_y);
        }
    }

    pub fn on_touch_end(&mut self, timestamp_ms: f64) {
        self.touch_end_ms = timestamp_ms;
        if !self.meets_delta_threshold {
            return;
        }

        let cap = self.tuning.speed_limit * self.surface.viewport_height();
        let offset =
            (self.speed * self.speed).min(cap) * self.delta_y.signum() * self.multiplier;

        let move_age_ms = timestamp_ms - self.touch_move_ms;
        if move_age_ms < self.tuning.recency_window_ms
            && offset.abs() > self.tuning.offset_threshold_px
        {
            self.animate(offset);
        }
    }

    /// Animate an additional eased scroll of `offset` pixels.
    fn animate(&self, offset: f64) {
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Relaxed);

        let surface = Arc::clone(&self.surface);
        let from = surface.scroll_top();
        let duration_ms =
            (surface.viewport_height() * self.tuning.duration_ms_per_px).max(1.0);
        let frame = self.tuning.frame;

        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            loop {
                // Superseded by a new drag.
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let t = (started.elapsed().as_secs_f64() * 1000.0 / duration_ms).min(1.0);
                surface.scroll_to(from - offset * ease_out_quart(t));
                if t >= 1.0 {
                    running.store(false, Ordering::Relaxed);
                    break;
                }
                tokio::time::sleep(frame).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSurface {
        top: Mutex<f64>,
        viewport: f64,
    }

    impl FakeSurface {
        fn new(viewport: f64) -> Arc<Self> {
            Arc::new(Self {
                top: Mutex::new(0.0),
                viewport,
            })
        }
    }

    impl ScrollSurface for FakeSurface {
        fn scroll_top(&self) -> f64 {
            *self.top.lock().unwrap()
        }
        fn scroll_to(&self, top: f64) {
            *self.top.lock().unwrap() = top;
        }
        fn viewport_height(&self) -> f64 {
            self.viewport
        }
    }

    #[tokio::test]
    async fn drag_scrolls_one_to_one_past_min_delta() {
        let surface = FakeSurface::new(1000.0);
        let mut scroller = MomentumScroller::new(surface.clone(), ScrollerTuning::default());

        scroller.on_touch_start(0.0, 500.0);
        scroller.on_touch_move(16.0, 503.0); // 3 px, below the threshold
        assert_eq!(surface.scroll_top(), 0.0);

        scroller.on_touch_move(32.0, 520.0); // 20 px
        assert_eq!(surface.scroll_top(), -20.0);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_release_animates_the_projected_offset() {
        let surface = FakeSurface::new(1000.0);
        let mut scroller = MomentumScroller::new(surface.clone(), ScrollerTuning::default());

        scroller.on_touch_start(0.0, 500.0);
        scroller.on_touch_move(40.0, 900.0); // 400 px in 40 ms
        scroller.on_touch_end(50.0);
        assert!(scroller.is_running());

        // speed = 400/40 = 10 px/ms, offset = 100 px (below the 300 px cap).
        let release_pos = surface.scroll_top();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!scroller.is_running());
        assert!((surface.scroll_top() - (release_pos - 100.0)).abs() < 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn momentum_follows_the_final_flick_not_the_whole_drag() {
        let surface = FakeSurface::new(1000.0);
        let mut scroller = MomentumScroller::new(surface.clone(), ScrollerTuning::default());

        scroller.on_touch_start(0.0, 500.0);
        // A long slow drag...
        scroller.on_touch_move(500.0, 550.0);
        scroller.on_touch_move(1000.0, 600.0);
        // ...ending in a fast flick: 80 px in 10 ms.
        scroller.on_touch_move(1010.0, 680.0);
        scroller.on_touch_end(1015.0);
        assert!(scroller.is_running());

        // speed = 80/10 = 8 px/ms, offset = 64 px.
        let release_pos = surface.scroll_top();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!((surface.scroll_top() - (release_pos - 64.0)).abs() < 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_release_applies_no_momentum() {
        let surface = FakeSurface::new(1000.0);
        let mut scroller = MomentumScroller::new(surface.clone(), ScrollerTuning::default());

        scroller.on_touch_start(0.0, 500.0);
        scroller.on_touch_move(40.0, 900.0);
        scroller.on_touch_end(300.0); // last move is 260 ms old
        assert!(!scroller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn new_drag_supersedes_the_animation_and_compounds() {
        let surface = FakeSurface::new(1000.0);
        let mut scroller = MomentumScroller::new(surface.clone(), ScrollerTuning::default());

        scroller.on_touch_start(0.0, 500.0);
        scroller.on_touch_move(40.0, 900.0);
        scroller.on_touch_end(50.0);
        assert!(scroller.is_running());

        // Chained swipe within the repeat window: halts the animation and
        // bumps the multiplier.
        scroller.on_touch_start(100.0, 500.0);
        assert!(!scroller.is_running());
        assert_eq!(scroller.multiplier, 2.0);

        // A drag after the window resets it.
        scroller.on_touch_start(1000.0, 500.0);
        assert_eq!(scroller.multiplier, 1.0);
    }
}
