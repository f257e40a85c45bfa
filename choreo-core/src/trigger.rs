//! Triggers
//!
//! A trigger converts a raw event stream into patches on the
//! [`StateStore`]. The scroll model here is shared with the continuous
//! driver, which keeps its own copy so that it never waits on the store.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::platform::{ListenerId, Platform, ScrollMetrics};
use crate::store::{StatePatch, StateStore};

/// Below this speed (px/ms) a decaying velocity snaps to rest.
const VELOCITY_EPSILON: f64 = 0.001;

/// Scroll progress and signed velocity derived from position samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollModel {
    pub progress: f64,
    /// Pixels per millisecond; positive when scrolling down.
    pub velocity: f64,
    last_y: f64,
    last_time: Option<f64>,
}

impl ScrollModel {
    /// Fold in a position sample taken at `now` (ms).
    pub fn sample(&mut self, metrics: ScrollMetrics, now: f64) {
        self.progress = metrics.progress();
        match self.last_time {
            Some(last) if now > last => {
                self.velocity = (metrics.scroll_y - self.last_y) / (now - last);
            }
            // Same timestamp: keep the previous velocity.
            Some(_) => {}
            None => self.velocity = 0.0,
        }
        self.last_y = metrics.scroll_y;
        self.last_time = Some(now);
    }

    /// Let velocity settle when no sample arrived for `idle_ms`.
    pub fn decay(&mut self, now: f64, idle_ms: f64, factor: f64) {
        let Some(last) = self.last_time else {
            return;
        };
        if now - last <= idle_ms || self.velocity == 0.0 {
            return;
        }
        self.velocity *= factor;
        if self.velocity.abs() < VELOCITY_EPSILON {
            self.velocity = 0.0;
        }
    }
}

/// Feeds platform scroll events into the store.
///
/// Detaches its listener when dropped.
pub struct ScrollTrigger {
    platform: Arc<dyn Platform>,
    listener: ListenerId,
    model: Arc<Mutex<ScrollModel>>,
}

impl ScrollTrigger {
    /// Attach a passive scroll listener that patches `store` on every event.
    pub fn attach(store: Arc<StateStore>, platform: Arc<dyn Platform>) -> Self {
        let model = Arc::new(Mutex::new(ScrollModel::default()));

        let listener = {
            let model = Arc::clone(&model);
            let source = Arc::clone(&platform);
            platform.add_scroll_listener(Arc::new(move || {
                let (progress, velocity) = {
                    let mut model = model.lock();
                    model.sample(source.scroll_metrics(), source.now());
                    (model.progress, model.velocity)
                };
                trace!(progress, velocity, "scroll trigger");
                store.patch(StatePatch::scroll(progress, velocity));
            }))
        };

        Self {
            platform,
            listener,
            model,
        }
    }

    /// Current scroll model.
    pub fn model(&self) -> ScrollModel {
        *self.model.lock()
    }
}

impl Drop for ScrollTrigger {
    fn drop(&mut self) {
        self.platform.remove_scroll_listener(self.listener);
    }
}
