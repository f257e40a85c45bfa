//! Modal Transitions
//!
//! Owns the single active overlay's open/close lifecycle.
//!
//! # States
//!
//! ```text
//! closed  --open(id, config)--> opening
//! opening --complete----------> open      (on_open_complete)
//! open    --close()-----------> closing   (on_before_close fires first)
//! closing --complete----------> closed    (on_close, active modal cleared)
//! ```
//!
//! Only one modal exists at a time: `open` is rejected in every phase but
//! `closed`, including `closing` (requests are dropped, not queued). `close`
//! is honoured only from `open`. The active modal is kept through `closing`
//! so the close animation can still read its config.
//!
//! Phase advancement is driven from outside by transition-completion events
//! ([`TransitionEvents`]); the controller never assumes a duration.
//!
//! Behaviours see the lifecycle only through the synthetic
//! `modal_phase`/`modal_open` fields of [`BehaviourState`].

mod completion;
mod host;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::behaviour::builtin::{MODAL_FADE, MODAL_MASK_WIPE, MODAL_SCALE};
use crate::behaviour::{BehaviourState, TransitionPhase};
use crate::error::{MotionError, Result};

pub use completion::{TransitionEnd, TransitionEvents};
pub use host::ModalHost;

/// Animation family used to open and close a modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModalAnimation {
    #[default]
    MaskWipe,
    Fade,
    Scale,
}

impl ModalAnimation {
    /// Behaviour emitting this family's variables.
    pub fn behaviour_id(self) -> &'static str {
        match self {
            Self::MaskWipe => MODAL_MASK_WIPE,
            Self::Fade => MODAL_FADE,
            Self::Scale => MODAL_SCALE,
        }
    }

    /// Style property whose transition end marks completion.
    pub fn transition_property(self) -> &'static str {
        match self {
            Self::MaskWipe => "clip-path",
            Self::Fade => "opacity",
            Self::Scale => "transform",
        }
    }
}

/// Rectangle the modal grows out of, in percent of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SourceRect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Lifecycle callback; receives the modal id.
pub type ModalCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Lifecycle hooks.
#[derive(Clone, Default)]
pub struct ModalCallbacks {
    pub on_open_complete: Option<ModalCallback>,
    pub on_before_close: Option<ModalCallback>,
    pub on_close: Option<ModalCallback>,
}

impl fmt::Debug for ModalCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalCallbacks")
            .field("on_open_complete", &self.on_open_complete.is_some())
            .field("on_before_close", &self.on_before_close.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

/// How a modal opens, closes and reports back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalConfig {
    pub animation: ModalAnimation,
    pub source_rect: Option<SourceRect>,
    pub duration_ms: Option<f64>,
    pub easing: Option<String>,
    /// Consumed by the host's backdrop/escape handling, not by this module.
    pub close_on_backdrop: bool,
    #[serde(skip)]
    pub callbacks: ModalCallbacks,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            animation: ModalAnimation::default(),
            source_rect: None,
            duration_ms: None,
            easing: None,
            close_on_backdrop: true,
            callbacks: ModalCallbacks::default(),
        }
    }
}

impl ModalConfig {
    pub fn with_animation(mut self, animation: ModalAnimation) -> Self {
        self.animation = animation;
        self
    }

    pub fn on_open_complete(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.callbacks.on_open_complete = Some(Arc::new(callback));
        self
    }

    pub fn on_before_close(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.callbacks.on_before_close = Some(Arc::new(callback));
        self
    }

    pub fn on_close(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.callbacks.on_close = Some(Arc::new(callback));
        self
    }
}

/// The modal currently holding the single slot.
#[derive(Debug, Clone)]
pub struct ActiveModal {
    pub id: String,
    pub config: ModalConfig,
}

#[derive(Debug, Default)]
struct Inner {
    phase: TransitionPhase,
    active: Option<ActiveModal>,
}

/// The modal open/close state machine.
///
/// Callbacks run with no lock held, so they may call back into the
/// controller.
#[derive(Debug, Default)]
pub struct ModalController {
    inner: Mutex<Inner>,
}

impl ModalController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start opening `id`. Rejected unless the slot is free.
    pub fn open(&self, id: impl Into<String>, config: ModalConfig) -> Result<()> {
        let id = id.into();
        let mut inner = self.inner.lock();
        if inner.phase != TransitionPhase::Closed {
            let active = inner
                .active
                .as_ref()
                .map(|modal| modal.id.clone())
                .unwrap_or_default();
            warn!(requested = %id, %active, phase = %inner.phase, "open rejected: a modal is already active");
            return Err(MotionError::ModalBusy {
                active,
                phase: inner.phase,
            });
        }

        debug!(%id, "modal opening");
        inner.active = Some(ActiveModal { id, config });
        inner.phase = TransitionPhase::Opening;
        Ok(())
    }

    /// Start closing. Only honoured from `open`.
    ///
    /// `on_before_close` runs synchronously before the phase changes.
    pub fn close(&self) -> Result<()> {
        let (id, before_close) = {
            let inner = self.inner.lock();
            match (&inner.active, inner.phase) {
                (Some(active), TransitionPhase::Open) => (
                    active.id.clone(),
                    active.config.callbacks.on_before_close.clone(),
                ),
                (_, phase) => {
                    warn!(%phase, "close ignored: modal is not open");
                    return Err(MotionError::InvalidClose { phase });
                }
            }
        };

        if let Some(callback) = before_close {
            callback(&id);
        }

        let mut inner = self.inner.lock();
        // The callback may have force-closed or replaced the modal.
        let same_modal = inner.active.as_ref().is_some_and(|active| active.id == id);
        if inner.phase == TransitionPhase::Open && same_modal {
            inner.phase = TransitionPhase::Closing;
            debug!(%id, "modal closing");
        }
        Ok(())
    }

    /// Finish the animation of `expected` (`opening` or `closing`).
    ///
    /// Returns false, changing nothing, when the controller is no longer in
    /// that phase.
    pub fn complete(&self, expected: TransitionPhase) -> bool {
        let fire = {
            let mut inner = self.inner.lock();
            if inner.phase != expected {
                return false;
            }
            match expected {
                TransitionPhase::Opening => {
                    inner.phase = TransitionPhase::Open;
                    inner.active.as_ref().map(|active| {
                        debug!(id = %active.id, "modal open");
                        (active.id.clone(), active.config.callbacks.on_open_complete.clone())
                    })
                }
                TransitionPhase::Closing => {
                    inner.phase = TransitionPhase::Closed;
                    inner.active.take().map(|active| {
                        debug!(id = %active.id, "modal closed");
                        (active.id, active.config.callbacks.on_close)
                    })
                }
                TransitionPhase::Open | TransitionPhase::Closed => return false,
            }
        };

        if let Some((id, Some(callback))) = fire {
            callback(&id);
        }
        true
    }

    /// Complete whichever animation is running, if any.
    pub fn advance(&self) -> bool {
        let phase = self.phase();
        match phase {
            TransitionPhase::Opening | TransitionPhase::Closing => self.complete(phase),
            TransitionPhase::Open | TransitionPhase::Closed => false,
        }
    }

    /// Jump straight to `closed` from any phase, firing `on_close`.
    ///
    /// Returns false if nothing was open.
    pub fn force_close(&self) -> bool {
        let active = {
            let mut inner = self.inner.lock();
            if inner.phase == TransitionPhase::Closed {
                return false;
            }
            inner.phase = TransitionPhase::Closed;
            inner.active.take()
        };
        if let Some(active) = active {
            debug!(id = %active.id, "modal force-closed");
            if let Some(callback) = active.config.callbacks.on_close {
                callback(&active.id);
            }
        }
        true
    }

    pub fn phase(&self) -> TransitionPhase {
        self.inner.lock().phase
    }

    pub fn is_visible(&self) -> bool {
        self.phase().is_visible()
    }

    pub fn active(&self) -> Option<ActiveModal> {
        self.inner.lock().active.clone()
    }

    pub fn active_id(&self) -> Option<String> {
        self.inner.lock().active.as_ref().map(|modal| modal.id.clone())
    }

    pub fn config(&self) -> Option<ModalConfig> {
        self.inner.lock().active.as_ref().map(|modal| modal.config.clone())
    }

    /// The synthetic state modal-transition behaviours compute from.
    pub fn behaviour_state(&self) -> BehaviourState {
        let inner = self.inner.lock();
        let mut state = BehaviourState::default();
        state.set_modal_phase(inner.phase);
        if let Some(rect) = inner
            .active
            .as_ref()
            .and_then(|modal| modal.config.source_rect)
        {
            let (x, y) = rect.center();
            state.extras.insert("sourceX".into(), x.into());
            state.extras.insert("sourceY".into(), y.into());
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&str) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = count.clone();
        (count, move |_: &str| {
            clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn full_lifecycle() {
        let (opened, on_open) = counter();
        let (closed, on_close) = counter();
        let controller = ModalController::new();

        controller
            .open("m1", ModalConfig::default().on_open_complete(on_open).on_close(on_close))
            .unwrap();
        assert_eq!(controller.phase(), TransitionPhase::Opening);
        assert!(controller.is_visible());

        assert!(controller.advance());
        assert_eq!(controller.phase(), TransitionPhase::Open);
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        controller.close().unwrap();
        assert_eq!(controller.phase(), TransitionPhase::Closing);
        assert_eq!(controller.active_id().as_deref(), Some("m1"));

        assert!(controller.advance());
        assert_eq!(controller.phase(), TransitionPhase::Closed);
        assert!(controller.active().is_none());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(!controller.advance());
    }

    #[test]
    fn second_open_is_rejected() {
        let controller = ModalController::new();
        controller.open("m1", ModalConfig::default()).unwrap();

        let err = controller
            .open("m2", ModalConfig::default().with_animation(ModalAnimation::Fade))
            .unwrap_err();
        assert!(matches!(
            err,
            MotionError::ModalBusy { ref active, phase: TransitionPhase::Opening } if active == "m1"
        ));
        assert_eq!(controller.active_id().as_deref(), Some("m1"));
        assert_eq!(controller.config().unwrap().animation, ModalAnimation::MaskWipe);
        assert_eq!(controller.phase(), TransitionPhase::Opening);
    }

    #[test]
    fn open_during_closing_is_dropped() {
        let controller = ModalController::new();
        controller.open("m1", ModalConfig::default()).unwrap();
        controller.advance();
        controller.close().unwrap();

        assert!(controller.open("m2", ModalConfig::default()).is_err());
        assert_eq!(controller.phase(), TransitionPhase::Closing);

        controller.advance();
        assert!(controller.active().is_none());
    }

    #[test]
    fn close_only_from_open() {
        let controller = ModalController::new();
        assert!(controller.close().is_err());

        controller.open("m1", ModalConfig::default()).unwrap();
        assert!(matches!(
            controller.close(),
            Err(MotionError::InvalidClose { phase: TransitionPhase::Opening })
        ));
        assert_eq!(controller.phase(), TransitionPhase::Opening);
    }

    #[test]
    fn before_close_sees_open_phase() {
        let controller = Arc::new(ModalController::new());
        let seen = Arc::new(Mutex::new(None));
        let (controller_clone, seen_clone) = (controller.clone(), seen.clone());

        controller
            .open(
                "m1",
                ModalConfig::default().on_before_close(move |_| {
                    *seen_clone.lock() = Some(controller_clone.phase());
                }),
            )
            .unwrap();
        controller.advance();
        controller.close().unwrap();

        assert_eq!(*seen.lock(), Some(TransitionPhase::Open));
        assert_eq!(controller.phase(), TransitionPhase::Closing);
    }

    #[test]
    fn complete_checks_expected_phase() {
        let controller = ModalController::new();
        controller.open("m1", ModalConfig::default()).unwrap();
        assert!(!controller.complete(TransitionPhase::Closing));
        assert_eq!(controller.phase(), TransitionPhase::Opening);
        assert!(controller.complete(TransitionPhase::Opening));
    }

    #[test]
    fn force_close_fires_on_close() {
        let (closed, on_close) = counter();
        let controller = ModalController::new();
        assert!(!controller.force_close());

        controller.open("m1", ModalConfig::default().on_close(on_close)).unwrap();
        assert!(controller.force_close());
        assert_eq!(controller.phase(), TransitionPhase::Closed);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn synthetic_state_carries_phase_and_source() {
        let controller = ModalController::new();
        let config = ModalConfig {
            source_rect: Some(SourceRect { x: 10.0, y: 20.0, width: 20.0, height: 10.0 }),
            ..Default::default()
        };
        controller.open("m1", config).unwrap();

        let state = controller.behaviour_state();
        assert_eq!(state.modal_phase, TransitionPhase::Opening);
        assert!(state.modal_open);
        assert_eq!(state.extra_f64("sourceX", 0.0), 20.0);
        assert_eq!(state.extra_f64("sourceY", 0.0), 25.0);
    }

    #[test]
    fn config_parses_from_json() {
        let config: ModalConfig =
            serde_json::from_str(r#"{"animation":"scale","durationMs":250,"closeOnBackdrop":false}"#)
                .unwrap();
        assert_eq!(config.animation, ModalAnimation::Scale);
        assert_eq!(config.duration_ms, Some(250.0));
        assert!(!config.close_on_backdrop);
        assert!(config.callbacks.on_close.is_none());
    }
}
