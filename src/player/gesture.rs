//! Touch-sample accumulator.
//!
//! Converts raw touch samples into a classified gesture: the first move
//! fixes the axis (horizontal = navigation, vertical = page scroll) for
//! the remainder of the sequence.  The tracker only classifies; the
//! commit/spring-back decision on release belongs to the orchestrator,
//! which knows about thresholds, destinations and vetoes.

use crate::core::protocol::TouchEvent;

/// Fixed axis of an active gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Horizontal,
    Vertical,
}

/// Direction of an in-flight horizontal swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SwipingState {
    #[default]
    NotSwiping,
    ToLeft,
    ToRight,
}

/// What a move sample asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GestureSample {
    None,
    /// Horizontal drag in flight; update the live-drag visuals.
    Drag { delta_px: f64 },
    /// Vertical gesture; forward to the momentum scroller.
    Scroll { timestamp_ms: f64, client_y: f64 },
}

/// What a release asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GestureRelease {
    None,
    /// Horizontal gesture ended; decide commit vs spring-back.
    Horizontal { total_delta_px: f64 },
    /// Vertical gesture ended; let the scroller project momentum.
    Scroll { timestamp_ms: f64 },
}

/// Per-touch-sequence state machine: IDLE → SAMPLING → axis-locked → IDLE.
#[derive(Debug, Default)]
pub(crate) struct GestureTracker {
    start_x: f64,
    start_y: f64,
    last_x: f64,
    axis: Option<Axis>,
    active: bool,
}

impl GestureTracker {
    /// Record start coordinates.  Returns `false` when the event carries
    /// no touches (the sample is ignored).
    pub fn on_start(&mut self, event: &TouchEvent) -> bool {
        let Some(touch) = event.primary() else {
            return false;
        };
        self.active = true;
        self.start_x = touch.screen_x;
        self.start_y = touch.screen_y;
        self.last_x = touch.screen_x;
        self.axis = None;
        true
    }

    pub fn on_move(&mut self, event: &TouchEvent) -> GestureSample {
        let Some(touch) = event.primary() else {
            return GestureSample::None;
        };
        if !self.active {
            return GestureSample::None;
        }

        if self.axis == Some(Axis::Vertical) {
            return GestureSample::Scroll {
                timestamp_ms: event.timestamp_ms,
                client_y: touch.client_y,
            };
        }

        self.last_x = touch.screen_x;

        if self.axis.is_none() {
            // First move past the origin classifies the axis; it stays
            // fixed for the rest of the gesture.
            let dx = (self.start_x - touch.screen_x).abs();
            let dy = (self.start_y - touch.screen_y).abs();
            // No displacement yet: keep sampling.
            if dx == 0.0 && dy == 0.0 {
                return GestureSample::None;
            }
            self.axis = Some(if dx > dy {
                Axis::Horizontal
            } else {
                Axis::Vertical
            });
            if self.axis == Some(Axis::Vertical) {
                return GestureSample::Scroll {
                    timestamp_ms: event.timestamp_ms,
                    client_y: touch.client_y,
                };
            }
        }

        GestureSample::Drag {
            delta_px: touch.screen_x - self.start_x,
        }
    }

    /// Classify the release and reset to IDLE.
    pub fn on_end(&mut self, event: &TouchEvent) -> GestureRelease {
        let release = match self.axis {
            Some(Axis::Horizontal) if self.active => GestureRelease::Horizontal {
                total_delta_px: self.last_x - self.start_x,
            },
            Some(Axis::Vertical) if self.active => GestureRelease::Scroll {
                timestamp_ms: event.timestamp_ms,
            },
            _ => GestureRelease::None,
        };
        self.reset();
        release
    }

    /// `Some(true)` once classified horizontal, `Some(false)` once
    /// vertical, `None` while still sampling.
    pub fn is_navigational(&self) -> Option<bool> {
        self.axis.map(|a| a == Axis::Horizontal)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::TouchPoint;

    fn touch(screen_x: f64, screen_y: f64, timestamp_ms: f64) -> TouchEvent {
        TouchEvent {
            touches: vec![TouchPoint {
                client_x: screen_x,
                client_y: screen_y,
                screen_x,
                screen_y,
            }],
            timestamp_ms,
        }
    }

    #[test]
    fn horizontal_classification_is_sticky() {
        let mut tracker = GestureTracker::default();
        assert!(tracker.on_start(&touch(100.0, 100.0, 0.0)));
        assert_eq!(
            tracker.on_move(&touch(80.0, 95.0, 16.0)),
            GestureSample::Drag { delta_px: -20.0 }
        );
        // A later move dominated by vertical displacement stays
        // horizontal.
        assert_eq!(
            tracker.on_move(&touch(75.0, 10.0, 32.0)),
            GestureSample::Drag { delta_px: -25.0 }
        );
        assert_eq!(
            tracker.on_end(&touch(75.0, 10.0, 48.0)),
            GestureRelease::Horizontal {
                total_delta_px: -25.0
            }
        );
    }

    #[test]
    fn vertical_gestures_feed_the_scroller() {
        let mut tracker = GestureTracker::default();
        tracker.on_start(&touch(100.0, 100.0, 0.0));
        assert_eq!(
            tracker.on_move(&touch(101.0, 140.0, 16.0)),
            GestureSample::Scroll {
                timestamp_ms: 16.0,
                client_y: 140.0
            }
        );
        assert_eq!(tracker.is_navigational(), Some(false));
        assert_eq!(
            tracker.on_end(&touch(101.0, 150.0, 32.0)),
            GestureRelease::Scroll { timestamp_ms: 32.0 }
        );
    }

    #[test]
    fn zero_displacement_moves_do_not_fix_the_axis() {
        let mut tracker = GestureTracker::default();
        tracker.on_start(&touch(100.0, 100.0, 0.0));
        assert_eq!(
            tracker.on_move(&touch(100.0, 100.0, 8.0)),
            GestureSample::None
        );
        assert_eq!(tracker.is_navigational(), None);
        // The first real displacement classifies.
        assert_eq!(
            tracker.on_move(&touch(60.0, 90.0, 16.0)),
            GestureSample::Drag { delta_px: -40.0 }
        );
        assert_eq!(tracker.is_navigational(), Some(true));
    }

    #[test]
    fn release_resets_to_idle() {
        let mut tracker = GestureTracker::default();
        tracker.on_start(&touch(0.0, 0.0, 0.0));
        tracker.on_move(&touch(-60.0, 0.0, 16.0));
        tracker.on_end(&touch(-60.0, 0.0, 32.0));
        assert_eq!(tracker.is_navigational(), None);
        assert_eq!(tracker.on_move(&touch(-80.0, 0.0, 48.0)), GestureSample::None);
    }

    #[test]
    fn empty_touch_lists_are_ignored() {
        let mut tracker = GestureTracker::default();
        let empty = TouchEvent {
            touches: vec![],
            timestamp_ms: 0.0,
        };
        assert!(!tracker.on_start(&empty));
        assert_eq!(tracker.on_move(&empty), GestureSample::None);
    }
}
