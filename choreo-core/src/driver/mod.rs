//! Continuous Driver
//!
//! Recomputes and writes variables for every registered target once per
//! animation frame, bypassing the render tree. Used for effects whose inputs
//! change on every scroll event, where per-render computation would stutter.
//!
//! # Inputs
//!
//! - A passive scroll listener feeds an internal [`ScrollModel`].
//! - One shared intersection observer keeps a visibility ratio per element.
//! - The platform frame scheduler calls [`Driver::tick`].
//!
//! # Tick
//!
//! 1. Snapshot scroll progress, velocity and the reduced-motion preference
//!    once; every target in this tick sees the same values. Reduced motion is
//!    on when either the shared [`StateStore`] or the platform reports it, so
//!    a trigger patching the store settles driven targets as well.
//! 2. For each target, build a [`BehaviourState`] with `section_progress`
//!    defaulted to the global progress and `section_visibility` set to the
//!    element's own ratio, compute, and write every variable onto the element.
//! 3. Request the next frame unless destroyed.
//!
//! Removals take effect on the next tick. The destroyed flag is checked at
//! the top of each tick and before rescheduling, which ends the frame chain.

mod shared;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::behaviour::{Behaviour, BehaviourState, Options};
use crate::config::DriverConfig;
use crate::error::{MotionError, Result};
use crate::platform::{
    ElementId, ElementRef, FrameId, IntersectionEntry, IntersectionObserver, ListenerId, Platform,
};
use crate::store::StateStore;
use crate::trigger::ScrollModel;

pub use shared::{DriverLease, SharedDriver};

/// An element bound to a behaviour, owned by the driver while registered.
struct Target {
    element: ElementRef,
    behaviour: Arc<Behaviour>,
    options: Options,
}

#[derive(Default)]
struct DriverState {
    scroll: ScrollModel,
    visibility: HashMap<ElementId, f64>,
    targets: IndexMap<String, Target>,
    frame: Option<FrameId>,
    listener: Option<ListenerId>,
    observer: Option<Box<dyn IntersectionObserver>>,
}

/// Frame-scheduled variable writer.
pub struct Driver {
    platform: Arc<dyn Platform>,
    store: Arc<StateStore>,
    config: DriverConfig,
    destroyed: AtomicBool,
    ticks: AtomicU64,
    state: Mutex<DriverState>,
}

impl Driver {
    /// Create a driver, attach its listener and observer, and schedule the
    /// first frame.
    pub fn start(
        platform: Arc<dyn Platform>,
        store: Arc<StateStore>,
        config: DriverConfig,
    ) -> Arc<Self> {
        let driver = Arc::new(Self {
            platform: Arc::clone(&platform),
            store,
            config,
            destroyed: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            state: Mutex::new(DriverState::default()),
        });

        let weak = Arc::downgrade(&driver);
        let listener = platform.add_scroll_listener(Arc::new(move || {
            if let Some(driver) = weak.upgrade() {
                driver.on_scroll();
            }
        }));

        let weak = Arc::downgrade(&driver);
        let observer = platform.create_intersection_observer(
            driver.config.thresholds(),
            Arc::new(move |entries: &[IntersectionEntry]| {
                if let Some(driver) = weak.upgrade() {
                    driver.on_intersection(entries);
                }
            }),
        );

        {
            let mut state = driver.state.lock();
            state.listener = Some(listener);
            state.observer = Some(observer);
            state.scroll.sample(platform.scroll_metrics(), platform.now());
        }

        debug!("continuous driver started");
        driver.schedule_frame();
        driver
    }

    /// Register `element` under a stable `id`.
    ///
    /// Replaces an earlier target with the same id. Rejected with a warning
    /// once the driver is destroyed.
    pub fn register(
        &self,
        id: impl Into<String>,
        element: ElementRef,
        behaviour: Arc<Behaviour>,
        options: Options,
    ) -> Result<()> {
        let id = id.into();
        if self.is_destroyed() {
            warn!(%id, "register on destroyed driver ignored");
            return Err(MotionError::DriverDestroyed(id));
        }

        let options = behaviour.resolve_options(&options);
        let mut state = self.state.lock();
        if let Some(observer) = &state.observer {
            observer.observe(&element);
        }
        // Never let the first tick read an unobserved ratio.
        state.visibility.entry(element.id()).or_insert(0.0);

        if let Some(previous) = state.targets.insert(
            id.clone(),
            Target {
                element,
                behaviour,
                options,
            },
        ) {
            self.forget_element(&mut state, &previous.element);
        }
        trace!(%id, targets = state.targets.len(), "target registered");
        Ok(())
    }

    /// Drop a target. Unknown ids are ignored.
    pub fn unregister(&self, id: &str) {
        let mut state = self.state.lock();
        if let Some(target) = state.targets.shift_remove(id) {
            self.forget_element(&mut state, &target.element);
            trace!(%id, targets = state.targets.len(), "target unregistered");
        }
    }

    /// Stop observing an element unless another target still uses it.
    fn forget_element(&self, state: &mut DriverState, element: &ElementRef) {
        let element_id = element.id();
        let still_used = state
            .targets
            .values()
            .any(|target| target.element.id() == element_id);
        if still_used {
            return;
        }
        if let Some(observer) = &state.observer {
            observer.unobserve(element);
        }
        state.visibility.remove(&element_id);
    }

    pub fn target_count(&self) -> usize {
        self.state.lock().targets.len()
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Current scroll progress and velocity.
    pub fn scroll(&self) -> (f64, f64) {
        let state = self.state.lock();
        (state.scroll.progress, state.scroll.velocity)
    }

    /// Last known visibility ratio for an element.
    pub fn visibility(&self, element: ElementId) -> Option<f64> {
        self.state.lock().visibility.get(&element).copied()
    }

    /// Recompute and write every target's variables.
    pub fn tick(self: &Arc<Self>, now: f64) {
        if self.is_destroyed() {
            return;
        }

        {
            let mut state = self.state.lock();
            // A direct call supersedes the scheduled frame.
            if let Some(pending) = state.frame.take() {
                self.platform.cancel_frame(pending);
            }
            state
                .scroll
                .decay(now, self.config.velocity_idle_ms, self.config.velocity_decay);

            let scroll_progress = state.scroll.progress;
            let scroll_velocity = state.scroll.velocity;
            let reduced =
                self.store.prefers_reduced_motion() || self.platform.prefers_reduced_motion();
            let total = state.targets.len();

            for (index, target) in state.targets.values().enumerate() {
                let visibility = state
                    .visibility
                    .get(&target.element.id())
                    .copied()
                    .unwrap_or(0.0);
                let input = BehaviourState {
                    scroll_progress,
                    scroll_velocity,
                    section_progress: scroll_progress,
                    section_visibility: visibility,
                    section_index: index,
                    total_sections: total,
                    is_active: visibility > 0.0,
                    prefers_reduced_motion: reduced,
                    ..Default::default()
                };
                for (name, value) in target.behaviour.compute(&input, &target.options) {
                    target.element.set_style_property(&name, &value.to_css());
                }
            }
            trace!(now, targets = total, "driver tick");
        }

        self.ticks.fetch_add(1, Ordering::SeqCst);
        self.schedule_frame();
    }

    fn schedule_frame(self: &Arc<Self>) {
        if self.is_destroyed() {
            return;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let frame = self.platform.request_frame(Box::new(move |now| {
            if let Some(driver) = weak.upgrade() {
                driver.tick(now);
            }
        }));

        let mut state = self.state.lock();
        state.frame = Some(frame);
        // Lost a race with destroy: take the frame back.
        if self.is_destroyed() {
            if let Some(frame) = state.frame.take() {
                self.platform.cancel_frame(frame);
            }
        }
    }

    fn on_scroll(&self) {
        if self.is_destroyed() {
            return;
        }
        let metrics = self.platform.scroll_metrics();
        let now = self.platform.now();
        self.state.lock().scroll.sample(metrics, now);
    }

    fn on_intersection(&self, entries: &[IntersectionEntry]) {
        if self.is_destroyed() {
            return;
        }
        let mut state = self.state.lock();
        for entry in entries {
            // Only elements still registered keep an entry.
            if let Some(ratio) = state.visibility.get_mut(&entry.element) {
                *ratio = entry.ratio;
            }
        }
    }

    /// Tear down: remove the listener, disconnect the observer, cancel the
    /// pending frame and clear every map. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.lock();
        if let Some(listener) = state.listener.take() {
            self.platform.remove_scroll_listener(listener);
        }
        if let Some(observer) = state.observer.take() {
            observer.disconnect();
        }
        if let Some(frame) = state.frame.take() {
            self.platform.cancel_frame(frame);
        }
        state.targets.clear();
        state.visibility.clear();
        debug!("continuous driver destroyed");
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("targets", &self.target_count())
            .field("ticks", &self.tick_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::{BehaviourRegistry, VariableMap};
    use crate::platform::headless::{HeadlessElement, HeadlessPlatform};
    use crate::platform::Element;
    use crate::store::StatePatch;

    fn setup_with_store() -> (Arc<HeadlessPlatform>, Arc<StateStore>, Arc<Driver>) {
        let platform = Arc::new(HeadlessPlatform::new(3000.0, 1000.0));
        let store = Arc::new(StateStore::new());
        let driver = Driver::start(platform.clone(), store.clone(), DriverConfig::default());
        (platform, store, driver)
    }

    fn setup() -> (Arc<HeadlessPlatform>, Arc<Driver>) {
        let (platform, _store, driver) = setup_with_store();
        (platform, driver)
    }

    fn echo() -> Arc<Behaviour> {
        Arc::new(
            Behaviour::new("test/echo", |state, _| {
                let mut vars = VariableMap::new();
                vars.insert("--progress".into(), state.scroll_progress.into());
                vars.insert("--visibility".into(), state.section_visibility.into());
                vars.insert("--section".into(), state.section_progress.into());
                vars
            })
            .requires(["scrollProgress"]),
        )
    }

    #[test]
    fn counts_follow_register_and_unregister() {
        let (_platform, driver) = setup();
        for i in 0..5 {
            driver
                .register(format!("t{i}"), HeadlessElement::new(), echo(), Options::new())
                .unwrap();
        }
        driver.unregister("t1");
        driver.unregister("t3");
        driver.unregister("unknown");
        assert_eq!(driver.target_count(), 3);
    }

    #[test]
    fn tick_writes_scroll_progress() {
        let (platform, driver) = setup();
        let element = HeadlessElement::new();
        driver
            .register("progress", element.clone(), echo(), Options::new())
            .unwrap();

        platform.scroll_to(1000.0);
        platform.advance_frame(16.0);

        let progress: f64 = element.style("--progress").unwrap().parse().unwrap();
        assert!((progress - 0.5).abs() <= 0.01);
        assert_eq!(element.style("--section").as_deref(), Some("0.5"));
    }

    #[test]
    fn visibility_starts_at_zero_and_follows_observer() {
        let (platform, driver) = setup();
        let element = HeadlessElement::new();
        driver
            .register("v", element.clone(), echo(), Options::new())
            .unwrap();
        assert_eq!(driver.visibility(element.id()), Some(0.0));

        platform.advance_frame(16.0);
        assert_eq!(element.style("--visibility").as_deref(), Some("0"));

        platform.set_intersection(element.id(), 0.6);
        platform.advance_frame(16.0);
        assert_eq!(element.style("--visibility").as_deref(), Some("0.6"));

        driver.unregister("v");
        assert_eq!(driver.visibility(element.id()), None);
        assert_eq!(platform.observed_count(), 0);
    }

    #[test]
    fn frames_keep_coming_until_destroyed() {
        let (platform, driver) = setup();
        assert_eq!(platform.pending_frames(), 1);
        platform.advance_frame(16.0);
        platform.advance_frame(16.0);
        assert_eq!(driver.tick_count(), 2);
        assert_eq!(platform.pending_frames(), 1);

        driver.destroy();
        assert_eq!(platform.pending_frames(), 0);
        assert_eq!(platform.scroll_listener_count(), 0);
        assert_eq!(platform.active_observer_count(), 0);
        platform.advance_frame(16.0);
        assert_eq!(driver.tick_count(), 2);
    }

    #[test]
    fn destroyed_driver_rejects_registration() {
        let (_platform, driver) = setup();
        driver
            .register("a", HeadlessElement::new(), echo(), Options::new())
            .unwrap();
        driver.destroy();
        assert_eq!(driver.target_count(), 0);

        let err = driver
            .register("b", HeadlessElement::new(), echo(), Options::new())
            .unwrap_err();
        assert!(matches!(err, MotionError::DriverDestroyed(id) if id == "b"));
        assert_eq!(driver.target_count(), 0);
    }

    #[test]
    fn all_targets_share_one_snapshot() {
        let (platform, driver) = setup();
        let elements: Vec<_> = (0..4).map(|_| HeadlessElement::new()).collect();
        for (i, element) in elements.iter().enumerate() {
            driver
                .register(format!("t{i}"), element.clone(), echo(), Options::new())
                .unwrap();
        }
        platform.scroll_to(400.0);
        platform.advance_frame(16.0);

        let values: Vec<_> = elements.iter().map(|e| e.style("--progress")).collect();
        assert!(values.iter().all(|v| v == &values[0]));
        assert_eq!(values[0].as_deref(), Some("0.2"));
    }

    #[test]
    fn builtin_parallax_runs_on_driver() {
        let (platform, driver) = setup();
        let registry = BehaviourRegistry::with_builtins();
        let element = HeadlessElement::new();
        let behaviour = registry.get("scroll/parallax").unwrap();
        driver
            .register("hero", element.clone(), behaviour, Options::new())
            .unwrap();

        platform.scroll_to(2000.0);
        platform.advance_frame(16.0);
        assert_eq!(element.style("--parallax-y").as_deref(), Some("36px"));

        platform.set_reduced_motion(true);
        platform.advance_frame(16.0);
        assert_eq!(element.style("--parallax-y").as_deref(), Some("0px"));
    }

    #[test]
    fn store_reduced_motion_settles_driven_targets() {
        let (platform, store, driver) = setup_with_store();
        let element = HeadlessElement::new();
        let behaviour = BehaviourRegistry::with_builtins().get("scroll/parallax").unwrap();
        driver
            .register("hero", element.clone(), behaviour, Options::new())
            .unwrap();

        platform.scroll_to(2000.0);
        platform.advance_frame(16.0);
        assert_eq!(element.style("--parallax-y").as_deref(), Some("36px"));

        store.patch(StatePatch::reduced_motion(true));
        platform.advance_frame(16.0);
        assert_eq!(element.style("--parallax-y").as_deref(), Some("0px"));
        assert_eq!(element.style("--parallax-duration").as_deref(), Some("0ms"));
    }
}
