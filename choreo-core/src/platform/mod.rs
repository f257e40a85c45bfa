//! Platform Seams
//!
//! The engine never touches a document directly. Element handles, the scroll
//! listener, the viewport-intersection observer and the frame scheduler are
//! all reached through the traits in this module, so the same driver runs
//! against a browser binding or against [`headless::HeadlessPlatform`].

pub mod headless;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a live element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Generate a new unique element ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el{}", self.0)
    }
}

/// A live element whose inline style the engine writes to.
pub trait Element: Send + Sync {
    fn id(&self) -> ElementId;

    /// Set an inline style property, e.g. a `--name` custom property.
    fn set_style_property(&self, name: &str, value: &str);

    fn remove_style_property(&self, name: &str);

    /// Set a (debug) attribute.
    fn set_attribute(&self, name: &str, value: &str);
}

/// Shared element handle.
pub type ElementRef = Arc<dyn Element>;

/// Document scroll geometry, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_y: f64,
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    /// Fraction of the scrollable range covered, in `[0, 1]`.
    ///
    /// A document that cannot scroll reports 0.
    pub fn progress(&self) -> f64 {
        let scrollable = self.scroll_height - self.viewport_height;
        if scrollable <= 0.0 {
            return 0.0;
        }
        (self.scroll_y / scrollable).clamp(0.0, 1.0)
    }
}

/// One visibility change reported by an intersection observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub element: ElementId,
    pub ratio: f64,
}

/// Handle for a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// Handle for a registered scroll listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Frame callback; receives the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64) + Send>;

/// Passive scroll listener.
pub type ScrollListener = Arc<dyn Fn() + Send + Sync>;

/// Batched intersection callback.
pub type IntersectionCallback = Arc<dyn Fn(&[IntersectionEntry]) + Send + Sync>;

/// A viewport-intersection observer.
pub trait IntersectionObserver: Send + Sync {
    fn observe(&self, element: &ElementRef);
    fn unobserve(&self, element: &ElementRef);
    /// Stop observing everything. The observer never fires afterwards.
    fn disconnect(&self);
}

/// Host services the continuous driver needs.
pub trait Platform: Send + Sync {
    /// Monotonic clock in milliseconds.
    fn now(&self) -> f64;

    fn scroll_metrics(&self) -> ScrollMetrics;

    fn prefers_reduced_motion(&self) -> bool;

    /// Schedule `callback` for the next display refresh.
    fn request_frame(&self, callback: FrameCallback) -> FrameId;

    fn cancel_frame(&self, id: FrameId);

    /// Attach a passive, non-blocking scroll listener.
    fn add_scroll_listener(&self, listener: ScrollListener) -> ListenerId;

    fn remove_scroll_listener(&self, id: ListenerId);

    /// Create an observer firing whenever an observed element crosses one of
    /// `thresholds`.
    fn create_intersection_observer(
        &self,
        thresholds: Vec<f64>,
        callback: IntersectionCallback,
    ) -> Box<dyn IntersectionObserver>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_ids_are_unique() {
        assert_ne!(ElementId::new(), ElementId::new());
    }

    #[test]
    fn progress_of_unscrollable_document_is_zero() {
        let metrics = ScrollMetrics {
            scroll_y: 10.0,
            scroll_height: 800.0,
            viewport_height: 900.0,
        };
        assert_eq!(metrics.progress(), 0.0);
    }

    #[test]
    fn progress_is_fraction_of_scrollable_range() {
        let metrics = ScrollMetrics {
            scroll_y: 1000.0,
            scroll_height: 3000.0,
            viewport_height: 1000.0,
        };
        assert_eq!(metrics.progress(), 0.5);
    }
}
