//! Headless Platform
//!
//! An in-memory [`Platform`] with a manually pumped frame clock. Scrolling,
//! intersection changes and frames only happen when the owner asks for them,
//! which makes driver behaviour fully deterministic in tests and benchmarks.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use choreo_core::platform::headless::HeadlessPlatform;
//! use choreo_core::platform::Platform;
//!
//! let platform = Arc::new(HeadlessPlatform::new(3000.0, 1000.0));
//! platform.scroll_to(1000.0);
//! platform.advance_frame(16.0);
//! assert_eq!(platform.now(), 16.0);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{
    Element, ElementId, ElementRef, FrameCallback, FrameId, IntersectionCallback,
    IntersectionEntry, IntersectionObserver, ListenerId, Platform, ScrollListener, ScrollMetrics,
};

struct ObserverShared {
    thresholds: Vec<f64>,
    callback: IntersectionCallback,
    observed: Mutex<HashSet<ElementId>>,
    connected: AtomicBool,
}

struct HeadlessObserver(Arc<ObserverShared>);

impl IntersectionObserver for HeadlessObserver {
    fn observe(&self, element: &ElementRef) {
        if self.0.connected.load(Ordering::SeqCst) {
            self.0.observed.lock().insert(element.id());
        }
    }

    fn unobserve(&self, element: &ElementRef) {
        self.0.observed.lock().remove(&element.id());
    }

    fn disconnect(&self) {
        self.0.connected.store(false, Ordering::SeqCst);
        self.0.observed.lock().clear();
    }
}

#[derive(Default)]
struct HeadlessState {
    now: f64,
    metrics: ScrollMetrics,
    reduced_motion: bool,
    next_id: u64,
    frames: Vec<(FrameId, FrameCallback)>,
    frames_requested: u64,
    listeners: IndexMap<ListenerId, ScrollListener>,
    observers: Vec<Arc<ObserverShared>>,
}

/// Deterministic in-memory platform.
pub struct HeadlessPlatform {
    state: Mutex<HeadlessState>,
}

impl HeadlessPlatform {
    /// A document of `scroll_height` pixels seen through a viewport of
    /// `viewport_height` pixels, scrolled to the top.
    pub fn new(scroll_height: f64, viewport_height: f64) -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                metrics: ScrollMetrics {
                    scroll_y: 0.0,
                    scroll_height,
                    viewport_height,
                },
                ..Default::default()
            }),
        }
    }

    pub fn set_reduced_motion(&self, enabled: bool) {
        self.state.lock().reduced_motion = enabled;
    }

    /// Move the clock forward without running frames.
    pub fn advance_time(&self, ms: f64) {
        self.state.lock().now += ms;
    }

    /// Scroll to `y` and fire every scroll listener.
    pub fn scroll_to(&self, y: f64) {
        let listeners: Vec<ScrollListener> = {
            let mut state = self.state.lock();
            let max = (state.metrics.scroll_height - state.metrics.viewport_height).max(0.0);
            state.metrics.scroll_y = y.clamp(0.0, max);
            state.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener();
        }
    }

    /// Advance the clock by `ms` and run every frame callback that was
    /// pending at the start of the call. Returns how many ran.
    pub fn advance_frame(&self, ms: f64) -> usize {
        let (now, frames) = {
            let mut state = self.state.lock();
            state.now += ms;
            (state.now, std::mem::take(&mut state.frames))
        };
        let count = frames.len();
        for (_, callback) in frames {
            callback(now);
        }
        count
    }

    /// Report a new visibility ratio for `element` to every connected
    /// observer watching it.
    pub fn set_intersection(&self, element: ElementId, ratio: f64) {
        let observers: Vec<Arc<ObserverShared>> = self.state.lock().observers.clone();
        let entry = [IntersectionEntry {
            element,
            ratio: ratio.clamp(0.0, 1.0),
        }];
        for observer in observers {
            let watching = observer.connected.load(Ordering::SeqCst)
                && observer.observed.lock().contains(&element);
            if watching {
                (observer.callback)(&entry);
            }
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.state.lock().frames.len()
    }

    /// Total frames ever requested.
    pub fn frames_requested(&self) -> u64 {
        self.state.lock().frames_requested
    }

    pub fn scroll_listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Observers that are still connected.
    pub fn active_observer_count(&self) -> usize {
        self.state
            .lock()
            .observers
            .iter()
            .filter(|o| o.connected.load(Ordering::SeqCst))
            .count()
    }

    /// Elements watched by connected observers.
    pub fn observed_count(&self) -> usize {
        self.state
            .lock()
            .observers
            .iter()
            .filter(|o| o.connected.load(Ordering::SeqCst))
            .map(|o| o.observed.lock().len())
            .sum()
    }

    /// Threshold list of the most recently created observer.
    pub fn last_thresholds(&self) -> Option<Vec<f64>> {
        self.state
            .lock()
            .observers
            .last()
            .map(|o| o.thresholds.clone())
    }
}

impl Platform for HeadlessPlatform {
    fn now(&self) -> f64 {
        self.state.lock().now
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.state.lock().metrics
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.state.lock().reduced_motion
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let mut state = self.state.lock();
        state.next_id += 1;
        state.frames_requested += 1;
        let id = FrameId(state.next_id);
        state.frames.push((id, callback));
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        self.state.lock().frames.retain(|(frame, _)| *frame != id);
    }

    fn add_scroll_listener(&self, listener: ScrollListener) -> ListenerId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = ListenerId(state.next_id);
        state.listeners.insert(id, listener);
        id
    }

    fn remove_scroll_listener(&self, id: ListenerId) {
        self.state.lock().listeners.shift_remove(&id);
    }

    fn create_intersection_observer(
        &self,
        thresholds: Vec<f64>,
        callback: IntersectionCallback,
    ) -> Box<dyn IntersectionObserver> {
        let shared = Arc::new(ObserverShared {
            thresholds,
            callback,
            observed: Mutex::new(HashSet::new()),
            connected: AtomicBool::new(true),
        });
        let mut state = self.state.lock();
        // Forget observers that were disconnected and dropped.
        state
            .observers
            .retain(|o| o.connected.load(Ordering::SeqCst) || Arc::strong_count(o) > 1);
        state.observers.push(Arc::clone(&shared));
        Box::new(HeadlessObserver(shared))
    }
}

/// An element that records what was written to it.
#[derive(Default)]
pub struct HeadlessElement {
    id: ElementId,
    style: Mutex<IndexMap<String, String>>,
    attributes: Mutex<IndexMap<String, String>>,
    writes: Mutex<u64>,
}

impl HeadlessElement {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn style(&self, name: &str) -> Option<String> {
        self.style.lock().get(name).cloned()
    }

    pub fn style_snapshot(&self) -> IndexMap<String, String> {
        self.style.lock().clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.lock().get(name).cloned()
    }

    /// Number of style writes received.
    pub fn write_count(&self) -> u64 {
        *self.writes.lock()
    }
}

impl Element for HeadlessElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn set_style_property(&self, name: &str, value: &str) {
        self.style.lock().insert(name.to_string(), value.to_string());
        *self.writes.lock() += 1;
    }

    fn remove_style_property(&self, name: &str) {
        self.style.lock().shift_remove(name);
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .lock()
            .insert(name.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn frames_run_once_and_in_order() {
        let platform = HeadlessPlatform::new(2000.0, 1000.0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3 {
            let seen = seen.clone();
            platform.request_frame(Box::new(move |now| seen.lock().push((tag, now))));
        }
        let cancelled = platform.request_frame(Box::new(|_| panic!("cancelled frame ran")));
        platform.cancel_frame(cancelled);

        assert_eq!(platform.advance_frame(16.0), 3);
        assert_eq!(platform.advance_frame(16.0), 0);
        assert_eq!(*seen.lock(), vec![(0, 16.0), (1, 16.0), (2, 16.0)]);
    }

    #[test]
    fn scroll_is_clamped_and_notifies() {
        let platform = HeadlessPlatform::new(2000.0, 1000.0);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let id = platform.add_scroll_listener(Arc::new(move || {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));

        platform.scroll_to(5000.0);
        assert_eq!(platform.scroll_metrics().scroll_y, 1000.0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        platform.remove_scroll_listener(id);
        platform.scroll_to(0.0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disconnected_observer_is_silent() {
        let platform = HeadlessPlatform::new(2000.0, 1000.0);
        let element: ElementRef = HeadlessElement::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        let observer = platform.create_intersection_observer(
            vec![0.0, 1.0],
            Arc::new(move |entries| {
                hits_clone.fetch_add(entries.len(), Ordering::SeqCst);
            }),
        );
        observer.observe(&element);
        platform.set_intersection(element.id(), 0.5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        observer.disconnect();
        platform.set_intersection(element.id(), 0.9);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(platform.active_observer_count(), 0);
    }
}
