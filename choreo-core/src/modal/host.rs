//! Async modal host.
//!
//! Wraps [`ModalController`] and sequences each phase against
//! transition-completion events. Every open/close/force-close stamps a new
//! attempt number; a continuation that wakes up under a stale number drops
//! its work, so a late completion can never advance a newer modal.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use super::{ModalConfig, ModalController};
use crate::behaviour::resolver::resolve;
use crate::behaviour::{BehaviourRegistry, BehaviourState, OptionValue, TransitionPhase, VariableMap};
use crate::config::ModalDefaults;
use crate::error::Result;
use crate::platform::ElementRef;
use crate::store::StateStore;

use super::TransitionEvents;

pub struct ModalHost {
    controller: ModalController,
    transitions: Arc<TransitionEvents>,
    store: Arc<StateStore>,
    defaults: ModalDefaults,
    attempt: AtomicU64,
}

impl ModalHost {
    pub fn new(transitions: Arc<TransitionEvents>, store: Arc<StateStore>, defaults: ModalDefaults) -> Self {
        Self {
            controller: ModalController::new(),
            transitions,
            store,
            defaults,
            attempt: AtomicU64::new(0),
        }
    }

    pub fn controller(&self) -> &ModalController {
        &self.controller
    }

    pub fn is_visible(&self) -> bool {
        self.controller.is_visible()
    }

    pub fn config(&self) -> Option<ModalConfig> {
        self.controller.config()
    }

    /// Open `id` on `element`.
    ///
    /// The phase change happens before this returns; rejection is reported
    /// synchronously. The returned future settles `opening -> open` once the
    /// element's transition ends.
    pub fn open(
        &self,
        id: impl Into<String>,
        config: ModalConfig,
        element: &ElementRef,
    ) -> Result<impl Future<Output = ()> + '_> {
        let property = config.animation.transition_property();
        self.controller.open(id, config)?;
        Ok(self.settle(TransitionPhase::Opening, element, property))
    }

    /// Close the open modal. The returned future settles `closing -> closed`.
    pub fn close(&self, element: &ElementRef) -> Result<impl Future<Output = ()> + '_> {
        let property = self
            .controller
            .config()
            .map(|config| config.animation.transition_property())
            .unwrap_or_default();
        self.controller.close()?;
        Ok(self.settle(TransitionPhase::Closing, element, property))
    }

    /// Skip any running animation and close now.
    pub fn force_close(&self) -> bool {
        self.attempt.fetch_add(1, Ordering::SeqCst);
        self.controller.force_close()
    }

    fn settle(
        &self,
        phase: TransitionPhase,
        element: &ElementRef,
        property: &'static str,
    ) -> impl Future<Output = ()> + '_ {
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let done = self
            .transitions
            .wait_for(element, property, self.store.prefers_reduced_motion());

        async move {
            let ended = done.await;
            if self.attempt.load(Ordering::SeqCst) != attempt {
                trace!(attempt, %phase, "stale modal continuation dropped");
                return;
            }
            if ended.is_err() {
                trace!(%phase, "transition wait cancelled");
                return;
            }
            self.controller.complete(phase);
        }
    }

    /// Synthetic state for the active animation, honouring reduced motion.
    pub fn behaviour_state(&self) -> BehaviourState {
        let mut state = self.controller.behaviour_state();
        state.prefers_reduced_motion = self.store.prefers_reduced_motion();
        state
    }

    /// Variables of the active modal's animation behaviour.
    ///
    /// Duration and easing come from the modal's config, falling back to
    /// the host defaults. Empty when no modal is active.
    pub fn variables(&self, registry: &BehaviourRegistry) -> VariableMap {
        let Some(config) = self.controller.config() else {
            return VariableMap::new();
        };
        let Some(behaviour) = resolve(registry, Some(config.animation.behaviour_id())) else {
            return VariableMap::new();
        };

        let mut options = behaviour.resolve_options(&Default::default());
        options.insert(
            "duration".into(),
            OptionValue::Number(config.duration_ms.unwrap_or(self.defaults.duration_ms)),
        );
        options.insert(
            "easing".into(),
            OptionValue::Text(config.easing.unwrap_or_else(|| self.defaults.easing.clone())),
        );
        behaviour.compute(&self.behaviour_state(), &options)
    }
}

impl std::fmt::Debug for ModalHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalHost")
            .field("controller", &self.controller)
            .field("attempt", &self.attempt.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::VarValue;
    use crate::modal::ModalAnimation;
    use crate::platform::headless::HeadlessElement;
    use crate::store::StatePatch;
    use parking_lot::Mutex;

    fn host() -> (Arc<TransitionEvents>, Arc<StateStore>, ModalHost) {
        let transitions = Arc::new(TransitionEvents::new());
        let store = Arc::new(StateStore::new());
        let host = ModalHost::new(transitions.clone(), store.clone(), ModalDefaults::default());
        (transitions, store, host)
    }

    #[tokio::test]
    async fn open_then_close_follows_transition_events() {
        let (transitions, _store, host) = host();
        let el: ElementRef = HeadlessElement::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let config = {
            let (a, b, c) = (log.clone(), log.clone(), log.clone());
            ModalConfig::default()
                .on_open_complete(move |id| a.lock().push(format!("open:{id}")))
                .on_before_close(move |id| b.lock().push(format!("before:{id}")))
                .on_close(move |id| c.lock().push(format!("close:{id}")))
        };

        let opened = host.open("m1", config, &el).unwrap();
        assert_eq!(host.controller().phase(), TransitionPhase::Opening);
        transitions.dispatch(el.id(), "clip-path");
        opened.await;
        assert_eq!(host.controller().phase(), TransitionPhase::Open);

        let closed = host.close(&el).unwrap();
        assert_eq!(host.controller().phase(), TransitionPhase::Closing);
        transitions.dispatch(el.id(), "clip-path");
        closed.await;

        assert_eq!(host.controller().phase(), TransitionPhase::Closed);
        assert!(!host.is_visible());
        assert_eq!(*log.lock(), ["open:m1", "before:m1", "close:m1"]);
    }

    #[tokio::test]
    async fn stale_completion_does_not_advance_newer_modal() {
        let (transitions, _store, host) = host();
        let el: ElementRef = HeadlessElement::new();
        let opened = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let opened = opened.clone();
            host.open("m1", ModalConfig::default().on_open_complete(move |id| opened.lock().push(id.to_owned())), &el)
                .unwrap()
        };
        host.force_close();
        let second = {
            let opened = opened.clone();
            host.open("m2", ModalConfig::default().on_open_complete(move |id| opened.lock().push(id.to_owned())), &el)
                .unwrap()
        };

        // One event wakes both waiters; only the current attempt may act.
        assert_eq!(transitions.dispatch(el.id(), "clip-path"), 2);
        first.await;
        assert_eq!(host.controller().phase(), TransitionPhase::Opening);
        second.await;
        assert_eq!(host.controller().phase(), TransitionPhase::Open);
        assert_eq!(*opened.lock(), ["m2"]);
    }

    #[tokio::test]
    async fn reduced_motion_settles_without_events() {
        let (transitions, store, host) = host();
        store.patch(StatePatch::reduced_motion(true));
        let el: ElementRef = HeadlessElement::new();

        host.open("m1", ModalConfig::default(), &el).unwrap().await;
        assert_eq!(host.controller().phase(), TransitionPhase::Open);
        assert_eq!(transitions.pending(), 0);

        let vars = host.variables(&BehaviourRegistry::with_builtins());
        assert_eq!(vars["--modal-duration"].to_css(), "0ms");

        host.close(&el).unwrap().await;
        assert_eq!(host.controller().phase(), TransitionPhase::Closed);
    }

    #[tokio::test]
    async fn rejected_open_leaves_state_alone() {
        let (_transitions, _store, host) = host();
        let el: ElementRef = HeadlessElement::new();
        let _pending = host.open("m1", ModalConfig::default(), &el).unwrap();
        assert!(host.open("m2", ModalConfig::default(), &el).is_err());
        assert!(host.close(&el).is_err());
        assert_eq!(host.controller().active_id().as_deref(), Some("m1"));
    }

    #[test]
    fn variables_use_config_then_defaults() {
        let (_transitions, _store, host) = host();
        let registry = BehaviourRegistry::with_builtins();
        assert!(host.variables(&registry).is_empty());

        let el: ElementRef = HeadlessElement::new();
        let config = ModalConfig {
            duration_ms: Some(250.0),
            ..ModalConfig::default().with_animation(ModalAnimation::Fade)
        };
        let _pending = host.open("m1", config, &el).unwrap();

        let vars = host.variables(&registry);
        assert_eq!(vars["--modal-duration"].to_css(), "250ms");
        assert_eq!(
            vars["--modal-easing"],
            VarValue::Text("cubic-bezier(0.22, 1, 0.36, 1)".into())
        );
        assert_eq!(vars["--modal-phase"].to_css(), "opening");
        assert_eq!(vars["--modal-opacity"].to_css(), "1");
    }
}
