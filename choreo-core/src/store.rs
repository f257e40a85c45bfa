//! State Store
//!
//! Process-wide state populated by triggers (scroll, section visibility,
//! cursor, reduced-motion preference) and read by behaviours.
//!
//! # Trigger Contract
//!
//! Every trigger calls [`StateStore::patch`] with a partial update. Triggers
//! own disjoint fields, so they never coordinate: scalar fields sit behind one
//! lock, per-section entries live in a concurrent map so visibility callbacks
//! for different sections never contend with each other or with scroll.
//!
//! # Reading
//!
//! [`StateStore::snapshot`] builds a fresh [`BehaviourState`] for one section.
//! Nothing in the store is ever handed out by reference, so a compute call
//! always sees a consistent copy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::trace;

use crate::behaviour::{BehaviourState, StateValue};

/// Unique identifier for a store subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Update for a single section.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SectionPatch {
    pub index: usize,
    pub visibility: Option<f64>,
    pub progress: Option<f64>,
}

/// A partial state update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub scroll_progress: Option<f64>,
    pub scroll_velocity: Option<f64>,
    pub section: Option<SectionPatch>,
    pub active_section: Option<usize>,
    pub total_sections: Option<usize>,
    pub cursor: Option<(f64, f64)>,
    pub prefers_reduced_motion: Option<bool>,
    pub extras: IndexMap<String, StateValue>,
}

impl StatePatch {
    pub fn scroll(progress: f64, velocity: f64) -> Self {
        Self {
            scroll_progress: Some(progress),
            scroll_velocity: Some(velocity),
            ..Default::default()
        }
    }

    pub fn section_visibility(index: usize, ratio: f64) -> Self {
        Self {
            section: Some(SectionPatch {
                index,
                visibility: Some(ratio),
                progress: None,
            }),
            ..Default::default()
        }
    }

    pub fn reduced_motion(enabled: bool) -> Self {
        Self {
            prefers_reduced_motion: Some(enabled),
            ..Default::default()
        }
    }

    pub fn cursor(x: f64, y: f64) -> Self {
        Self {
            cursor: Some((x, y)),
            ..Default::default()
        }
    }

    pub fn extra(key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        let mut extras = IndexMap::new();
        extras.insert(key.into(), value.into());
        Self {
            extras,
            ..Default::default()
        }
    }

    /// Apply this patch directly onto a state record.
    ///
    /// A section patch is applied regardless of its index; callers use this
    /// for state that is already scoped to one element.
    pub fn apply_to(&self, state: &mut BehaviourState) {
        if let Some(progress) = self.scroll_progress {
            state.scroll_progress = progress.clamp(0.0, 1.0);
        }
        if let Some(velocity) = self.scroll_velocity {
            state.scroll_velocity = velocity;
        }
        if let Some(section) = self.section {
            state.section_index = section.index;
            if let Some(visibility) = section.visibility {
                state.section_visibility = visibility.clamp(0.0, 1.0);
            }
            if let Some(progress) = section.progress {
                state.section_progress = progress.clamp(0.0, 1.0);
            }
        }
        if let Some(active) = self.active_section {
            state.is_active = active == state.section_index;
        }
        if let Some(total) = self.total_sections {
            state.total_sections = total;
        }
        if let Some(cursor) = self.cursor {
            state.cursor = Some(cursor);
        }
        if let Some(reduced) = self.prefers_reduced_motion {
            state.prefers_reduced_motion = reduced;
        }
        for (key, value) in &self.extras {
            state.extras.insert(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Default)]
struct Scalars {
    scroll_progress: f64,
    scroll_velocity: f64,
    active_section: Option<usize>,
    total_sections: usize,
    cursor: Option<(f64, f64)>,
    prefers_reduced_motion: bool,
    extras: IndexMap<String, StateValue>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SectionEntry {
    visibility: f64,
    progress: Option<f64>,
}

type Notify = Arc<dyn Fn() + Send + Sync>;
type Subscribers = Arc<RwLock<Vec<(SubscriberId, Notify)>>>;

/// Shared runtime state.
#[derive(Default)]
pub struct StateStore {
    scalars: RwLock<Scalars>,
    sections: DashMap<usize, SectionEntry>,
    subscribers: Subscribers,
    version: AtomicU64,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a partial update and notify subscribers.
    pub fn patch(&self, patch: StatePatch) {
        {
            let mut scalars = self.scalars.write();
            if let Some(progress) = patch.scroll_progress {
                scalars.scroll_progress = progress.clamp(0.0, 1.0);
            }
            if let Some(velocity) = patch.scroll_velocity {
                scalars.scroll_velocity = velocity;
            }
            if let Some(active) = patch.active_section {
                scalars.active_section = Some(active);
            }
            if let Some(total) = patch.total_sections {
                scalars.total_sections = total;
            }
            if let Some(cursor) = patch.cursor {
                scalars.cursor = Some(cursor);
            }
            if let Some(reduced) = patch.prefers_reduced_motion {
                scalars.prefers_reduced_motion = reduced;
            }
            scalars.extras.extend(patch.extras);
        }

        if let Some(section) = patch.section {
            let mut entry = self.sections.entry(section.index).or_default();
            if let Some(visibility) = section.visibility {
                entry.visibility = visibility.clamp(0.0, 1.0);
            }
            if let Some(progress) = section.progress {
                entry.progress = Some(progress.clamp(0.0, 1.0));
            }
        }

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(version, "state patched");
        self.notify();
    }

    /// Build the state one section's behaviours see.
    ///
    /// `section_progress` falls back to the global scroll progress for
    /// sections no trigger has reported yet; visibility falls back to 0.
    pub fn snapshot(&self, section_index: usize) -> BehaviourState {
        let section = self
            .sections
            .get(&section_index)
            .map(|entry| *entry)
            .unwrap_or_default();

        let scalars = self.scalars.read();
        BehaviourState {
            scroll_progress: scalars.scroll_progress,
            scroll_velocity: scalars.scroll_velocity,
            section_progress: section.progress.unwrap_or(scalars.scroll_progress),
            section_visibility: section.visibility,
            section_index,
            total_sections: scalars.total_sections,
            is_active: scalars.active_section == Some(section_index),
            cursor: scalars.cursor,
            prefers_reduced_motion: scalars.prefers_reduced_motion,
            extras: scalars.extras.clone(),
            ..Default::default()
        }
    }

    pub fn prefers_reduced_motion(&self) -> bool {
        self.scalars.read().prefers_reduced_motion
    }

    /// Number of patches applied so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Register a callback invoked after every patch.
    ///
    /// The callback stays registered until the returned guard is dropped.
    pub fn subscribe<F>(&self, notify: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.subscribers.write().push((id, Arc::new(notify)));
        Subscription {
            id,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn notify(&self) {
        // Clone out so callbacks may patch or subscribe without deadlocking.
        let callbacks: Vec<Notify> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, notify)| Arc::clone(notify))
            .collect();
        for notify in callbacks {
            notify();
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("version", &self.version())
            .field("sections", &self.sections.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Guard returned by [`StateStore::subscribe`]; unsubscribes on drop.
pub struct Subscription {
    id: SubscriberId,
    subscribers: Subscribers,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.subscribers.write().retain(|(id, _)| *id != self.id);
    }
}
