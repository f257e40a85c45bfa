//! Behaviour Registry
//!
//! Keyed store of behaviour definitions. Definitions are inserted by an
//! explicit startup step ([`BehaviourRegistry::with_builtins`] or repeated
//! [`register`](BehaviourRegistry::register) calls) rather than by module
//! load order.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use super::{builtin, Behaviour};

/// Registry of behaviours keyed by id.
#[derive(Debug, Default)]
pub struct BehaviourRegistry {
    entries: RwLock<IndexMap<String, Arc<Behaviour>>>,
}

impl BehaviourRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in catalogue.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for behaviour in builtin::all() {
            registry.register(behaviour);
        }
        registry
    }

    /// Insert a behaviour, replacing any previous definition with the same id.
    pub fn register(&self, behaviour: Behaviour) {
        let id = behaviour.id().to_string();
        let replaced = self
            .entries
            .write()
            .insert(id.clone(), Arc::new(behaviour))
            .is_some();
        if replaced {
            debug!(%id, "behaviour re-registered");
        }
    }

    /// Remove a behaviour. No-op if absent.
    pub fn unregister(&self, id: &str) {
        self.entries.write().shift_remove(id);
    }

    /// Direct lookup, bypassing alias resolution.
    pub fn get(&self, id: &str) -> Option<Arc<Behaviour>> {
        self.entries.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Registered ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
