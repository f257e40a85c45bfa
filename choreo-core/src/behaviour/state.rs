//! Behaviour State
//!
//! The record every behaviour's `compute` receives. It is never persisted:
//! the driver and the bindings rebuild it for each evaluation from the state
//! store, the driver's own scroll model and local interaction flags.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Discrete state in the modal open/close lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPhase {
    /// No modal is mounted. Initial and terminal state.
    #[default]
    Closed,
    /// The open animation is running.
    Opening,
    /// Fully open and interactive.
    Open,
    /// The close animation is running; the active modal is still retained.
    Closing,
}

impl TransitionPhase {
    /// Whether a modal occupies the screen in this phase.
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// The phase this one settles into once its animation completes.
    pub fn settled(self) -> Self {
        match self {
            Self::Opening | Self::Open => Self::Open,
            Self::Closing | Self::Closed => Self::Closed,
        }
    }

    /// Lowercase name, as exposed to style rules.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
        }
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value written into the open-ended `extras` part of the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl StateValue {
    /// Numeric view; booleans map to 0/1, text never converts.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Runtime state handed to [`Behaviour::compute`](super::Behaviour::compute).
///
/// Fractions (`scroll_progress`, `section_progress`, `section_visibility`)
/// are in `[0, 1]`. `scroll_velocity` is signed, in pixels per millisecond.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviourState {
    pub scroll_progress: f64,
    pub scroll_velocity: f64,
    pub section_progress: f64,
    pub section_visibility: f64,
    pub section_index: usize,
    pub total_sections: usize,
    pub is_active: bool,
    pub is_hovered: bool,
    pub is_pressed: bool,
    pub prefers_reduced_motion: bool,

    /// Cursor position in viewport pixels, once a cursor trigger has fired.
    pub cursor: Option<(f64, f64)>,

    /// Modal lifecycle phase, bridged in by the modal host.
    pub modal_phase: TransitionPhase,

    /// Derived from `modal_phase`: true while opening or open.
    pub modal_open: bool,

    /// Trigger-specific keys, e.g. a background-index counter.
    pub extras: IndexMap<String, StateValue>,
}

impl BehaviourState {
    /// Read a numeric extra, falling back to `default`.
    pub fn extra_f64(&self, key: &str, default: f64) -> f64 {
        self.extras
            .get(key)
            .and_then(StateValue::as_f64)
            .unwrap_or(default)
    }

    /// Set the modal phase together with its derived `modal_open` flag.
    pub fn set_modal_phase(&mut self, phase: TransitionPhase) {
        self.modal_phase = phase;
        self.modal_open = matches!(phase, TransitionPhase::Opening | TransitionPhase::Open);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modal_open_follows_phase() {
        let mut state = BehaviourState::default();
        assert!(!state.modal_open);

        state.set_modal_phase(TransitionPhase::Opening);
        assert!(state.modal_open);

        state.set_modal_phase(TransitionPhase::Closing);
        assert!(!state.modal_open);
        assert_eq!(state.modal_phase, TransitionPhase::Closing);
    }

    #[test]
    fn settled_phase() {
        assert_eq!(TransitionPhase::Opening.settled(), TransitionPhase::Open);
        assert_eq!(TransitionPhase::Closing.settled(), TransitionPhase::Closed);
        assert!(!TransitionPhase::Closed.is_visible());
        assert!(TransitionPhase::Closing.is_visible());
    }

    #[test]
    fn extras_fall_back_to_default() {
        let mut state = BehaviourState::default();
        assert_eq!(state.extra_f64("backgroundIndex", 3.0), 3.0);

        state.extras.insert("backgroundIndex".into(), 2.0.into());
        state.extras.insert("label".into(), "hero".into());
        assert_eq!(state.extra_f64("backgroundIndex", 0.0), 2.0);
        assert_eq!(state.extra_f64("label", -1.0), -1.0);
    }
}
