//! Behaviour Resolver
//!
//! Maps legacy identifiers to canonical ones and expands a set of ids into
//! the behaviours they need, dependencies first.
//!
//! # Aliases
//!
//! Older content names behaviours by their visual effect (`fade-in`) or by
//! the widget that used them (`hero-parallax`). Canonical ids are named by
//! trigger (`visibility/fade-in`, `scroll/parallax`). The alias table is
//! append-only: entries are never removed, so authored content keeps working.
//!
//! # Expansion
//!
//! [`resolve_with_dependencies`] walks `requires` depth-first with a seen-set
//! keyed by the resolved id. Every behaviour is emitted after everything it
//! requires, each at most once, and a cycle simply stops at the first
//! revisit. Entries in `requires` that are state field names rather than
//! behaviour ids resolve to nothing and are skipped.

use std::collections::HashSet;
use std::sync::Arc;

use super::{Behaviour, BehaviourRegistry};

/// Legacy id → canonical id.
pub const ALIASES: &[(&str, &str)] = &[
    // named by effect
    ("fade-in", "visibility/fade-in"),
    ("reveal", "visibility/fade-in"),
    ("parallax", "scroll/parallax"),
    ("progress", "scroll/progress"),
    ("skew", "scroll/velocity-skew"),
    ("velocity-skew", "scroll/velocity-skew"),
    ("lift", "hover/lift"),
    ("press", "press/scale"),
    ("mask-reveal", "modal/mask-wipe"),
    ("fade", "modal/fade"),
    ("zoom", "modal/scale"),
    // named by consuming widget
    ("hero-parallax", "scroll/parallax"),
    ("reading-progress", "scroll/progress"),
    ("progress-bar", "scroll/progress"),
    ("card-hover", "hover/lift"),
    ("button-press", "press/scale"),
    ("section-reveal", "visibility/fade-in"),
    ("background-slider", "section/background-cycle"),
    ("lightbox", "modal/mask-wipe"),
];

/// Sentinel that authored content uses to mean "no behaviour".
pub const NONE_ID: &str = "none";

/// Map an id through the alias table.
pub fn canonical_id(id: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == id)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(id)
}

/// Resolve a possibly-aliased id to its registered definition.
///
/// Empty, absent and `"none"` ids resolve to `None`, as do ids that are not
/// registered. The alias table takes precedence over a registry entry with
/// the same name as the alias.
pub fn resolve(registry: &BehaviourRegistry, id: Option<&str>) -> Option<Arc<Behaviour>> {
    let id = id?.trim();
    if id.is_empty() || id == NONE_ID {
        return None;
    }
    registry.get(canonical_id(id))
}

/// Expand `ids` into themselves plus their requirements, dependency-first.
pub fn resolve_with_dependencies<S: AsRef<str>>(
    registry: &BehaviourRegistry,
    ids: &[S],
) -> Vec<Arc<Behaviour>> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for id in ids {
        visit(registry, id.as_ref(), &mut seen, &mut ordered);
    }
    ordered
}

fn visit(
    registry: &BehaviourRegistry,
    id: &str,
    seen: &mut HashSet<String>,
    ordered: &mut Vec<Arc<Behaviour>>,
) {
    let Some(behaviour) = resolve(registry, Some(id)) else {
        return;
    };
    // Mark before descending so cycles terminate.
    if !seen.insert(behaviour.id().to_string()) {
        return;
    }
    for dependency in behaviour.required() {
        visit(registry, dependency, seen, ordered);
    }
    ordered.push(behaviour);
}
