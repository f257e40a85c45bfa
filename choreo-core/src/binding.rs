//! Reactive Binding
//!
//! Per-element adapter between a behaviour and the element it styles.
//!
//! # Two Paths
//!
//! On mount the binding resolves its behaviour id and inspects `requires`:
//!
//! - Scroll-class requirements (see [`SCROLL_CLASS`]) hand the element to the
//!   shared continuous driver for the binding's lifetime. The binding never
//!   computes variables itself; the driver writes them every frame.
//! - Everything else is computed inline, on mount and whenever local pointer
//!   state or the externally supplied state changes, and merged with the
//!   caller's static style.
//!
//! An unknown or `"none"` id leaves the element unstyled.
//!
//! # Pointer State
//!
//! ```text
//! idle --enter--> hovered --down--> pressed
//!  ^                 |                 |
//!  +-----leave-------+                 +--up--> hovered
//!  +-----------------leave-------------+
//! ```
//!
//! Leaving resets hover and press together so a drag that exits the element
//! never leaves it stuck pressed.
//!
//! [`SCROLL_CLASS`]: crate::behaviour::SCROLL_CLASS

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::behaviour::{resolver, Behaviour, BehaviourRegistry, OptionValue, Options};
use crate::config::DriverConfig;
use crate::driver::{DriverLease, SharedDriver};
use crate::platform::{ElementRef, Platform};
use crate::store::{StatePatch, StateStore};

static NEXT_TARGET: AtomicU64 = AtomicU64::new(1);

/// Inline style, property name to value.
pub type Style = IndexMap<String, String>;

/// Pointer events the binding reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter,
    Leave,
    Down,
    Up,
}

/// Local interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Hovered,
    Pressed,
}

impl Interaction {
    /// Apply one pointer event.
    pub fn next(self, event: PointerEvent) -> Self {
        match (self, event) {
            (_, PointerEvent::Leave) => Self::Idle,
            (Self::Idle, PointerEvent::Enter) => Self::Hovered,
            (Self::Hovered, PointerEvent::Down) => Self::Pressed,
            (Self::Pressed, PointerEvent::Up) => Self::Hovered,
            (state, _) => state,
        }
    }

    pub fn is_hovered(self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn is_pressed(self) -> bool {
        matches!(self, Self::Pressed)
    }
}

/// Services a binding needs.
#[derive(Debug, Clone)]
pub struct BindingContext {
    pub registry: Arc<BehaviourRegistry>,
    pub store: Arc<StateStore>,
    pub drivers: Arc<SharedDriver>,
}

impl BindingContext {
    /// Build a context whose shared driver reads the same `store` as inline
    /// bindings.
    pub fn new(
        registry: Arc<BehaviourRegistry>,
        store: Arc<StateStore>,
        platform: Arc<dyn Platform>,
        config: DriverConfig,
    ) -> Self {
        let drivers = SharedDriver::new(platform, Arc::clone(&store), config);
        Self {
            registry,
            store,
            drivers,
        }
    }
}

/// What the caller asks a binding to do.
#[derive(Debug, Clone, Default)]
pub struct BindingProps {
    /// Behaviour id, possibly a legacy alias. `None` or `"none"` disables.
    pub behaviour: Option<String>,
    pub options: Options,
    /// Static style merged under the computed variables.
    pub style: Style,
    /// Section whose store entry feeds inline computation.
    pub section_index: usize,
    /// Externally supplied state layered over the store snapshot.
    pub initial_state: StatePatch,
}

impl BindingProps {
    pub fn new(behaviour: impl Into<String>) -> Self {
        Self {
            behaviour: Some(behaviour.into()),
            ..Self::default()
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

enum Mode {
    Unstyled,
    Inline {
        behaviour: Arc<Behaviour>,
        options: Options,
    },
    Driven {
        behaviour: Arc<Behaviour>,
        lease: DriverLease,
        target: String,
    },
}

impl Mode {
    fn label(&self) -> &'static str {
        match self {
            Self::Unstyled => "none",
            Self::Inline { .. } => "inline",
            Self::Driven { .. } => "driver",
        }
    }

    fn behaviour_id(&self) -> &str {
        match self {
            Self::Unstyled => resolver::NONE_ID,
            Self::Inline { behaviour, .. } | Self::Driven { behaviour, .. } => behaviour.id(),
        }
    }
}

/// A behaviour bound to one element.
pub struct BehaviourBinding {
    context: BindingContext,
    element: ElementRef,
    props: BindingProps,
    mode: Mode,
    interaction: Interaction,
    /// Variable names written by the previous inline render.
    written: Vec<String>,
    renders: u64,
}

impl BehaviourBinding {
    /// Resolve the behaviour, pick a path and render once.
    pub fn mount(context: &BindingContext, element: ElementRef, props: BindingProps) -> Self {
        let resolved = resolver::resolve(&context.registry, props.behaviour.as_deref());

        let mode = match resolved {
            None => {
                debug!(requested = ?props.behaviour, "no behaviour resolved; rendering unstyled");
                Mode::Unstyled
            }
            Some(behaviour) if behaviour.is_scroll_driven() => {
                let lease = context.drivers.acquire();
                // Unique per binding: two bindings on one element may resolve
                // to the same behaviour through an alias.
                let target = format!(
                    "{}#{}#{}",
                    behaviour.id(),
                    element.id(),
                    NEXT_TARGET.fetch_add(1, Ordering::Relaxed)
                );
                match lease.register(
                    target.clone(),
                    Arc::clone(&element),
                    Arc::clone(&behaviour),
                    props.options.clone(),
                ) {
                    Ok(()) => Mode::Driven {
                        behaviour,
                        lease,
                        target,
                    },
                    // Already logged by the driver.
                    Err(_) => {
                        lease.release();
                        Mode::Unstyled
                    }
                }
            }
            Some(behaviour) => {
                let options = behaviour.resolve_options(&props.options);
                Mode::Inline { behaviour, options }
            }
        };

        let mut binding = Self {
            context: context.clone(),
            element,
            props,
            mode,
            interaction: Interaction::default(),
            written: Vec::new(),
            renders: 0,
        };
        binding.render();
        binding
    }

    /// Feed a pointer event; re-renders if the interaction state changed.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Interaction {
        let next = self.interaction.next(event);
        if next != self.interaction {
            self.interaction = next;
            self.render();
        }
        next
    }

    /// Replace the externally supplied state and re-render.
    pub fn set_initial_state(&mut self, state: StatePatch) {
        if self.props.initial_state != state {
            self.props.initial_state = state;
            self.render();
        }
    }

    /// Re-render against the current store contents.
    pub fn refresh(&mut self) -> Style {
        self.render()
    }

    /// Compute the merged style and write it onto the element.
    fn render(&mut self) -> Style {
        let mut style = self.props.style.clone();

        if let Mode::Inline { behaviour, options } = &self.mode {
            let mut state = self.context.store.snapshot(self.props.section_index);
            self.props.initial_state.apply_to(&mut state);
            state.is_hovered = self.interaction.is_hovered();
            state.is_pressed = self.interaction.is_pressed();

            let variables = behaviour.compute(&state, options);
            let names: Vec<String> = variables.keys().cloned().collect();
            for stale in self.written.iter().filter(|name| !variables.contains_key(*name)) {
                self.element.remove_style_property(stale);
            }
            for (name, value) in variables {
                style.insert(name, value.to_css());
            }
            self.written = names;
        }

        for (name, value) in &style {
            self.element.set_style_property(name, value);
        }
        self.write_debug_attributes();
        self.renders += 1;
        style
    }

    fn write_debug_attributes(&self) {
        let flag = |on: bool| if on { "true" } else { "false" };
        self.element
            .set_attribute("data-behaviour", self.mode.behaviour_id());
        self.element
            .set_attribute("data-behaviour-mode", self.mode.label());
        self.element
            .set_attribute("data-hovered", flag(self.interaction.is_hovered()));
        self.element
            .set_attribute("data-pressed", flag(self.interaction.is_pressed()));
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// Whether the continuous driver owns this element's variables.
    pub fn is_driven(&self) -> bool {
        matches!(self.mode, Mode::Driven { .. })
    }

    /// Resolved behaviour id, if any.
    pub fn behaviour_id(&self) -> Option<&str> {
        match &self.mode {
            Mode::Unstyled => None,
            mode => Some(mode.behaviour_id()),
        }
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Release the driver target and lease. Idempotent; also runs on drop.
    pub fn unmount(&mut self) {
        if let Mode::Driven { lease, target, .. } =
            std::mem::replace(&mut self.mode, Mode::Unstyled)
        {
            lease.unregister(&target);
            lease.release();
        }
    }
}

impl Drop for BehaviourBinding {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for BehaviourBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviourBinding")
            .field("element", &self.element.id())
            .field("behaviour", &self.mode.behaviour_id())
            .field("mode", &self.mode.label())
            .field("interaction", &self.interaction)
            .finish()
    }
}
