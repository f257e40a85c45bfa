//! Choreo Core
//!
//! Headless motion engine for declarative UI animation. It implements:
//!
//! - A registry of named behaviours (pure state-to-variables functions)
//! - Alias resolution and dependency-first expansion
//! - A state store fed by triggers
//! - A reactive binding that renders behaviours onto elements
//! - A single refcounted 60 Hz driver for scroll-driven behaviours
//! - A modal open/close state machine sequenced by transition events
//!
//! Rendering and input live behind the [`platform::Platform`] and
//! [`platform::Element`] traits; [`platform::headless`] is a deterministic
//! implementation used by tests and benches.
//!
//! # Architecture
//!
//! - `behaviour`: behaviour model, registry, resolver and built-ins
//! - `store` / `trigger`: shared input state and the scroll trigger
//! - `binding`: per-element inline or driven rendering
//! - `driver`: continuous frame loop and its shared lease
//! - `modal`: modal lifecycle, completion events and async host
//! - `config`: JSON-loadable engine settings
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use choreo_core::behaviour::BehaviourRegistry;
//! use choreo_core::binding::{BehaviourBinding, BindingContext, BindingProps, PointerEvent};
//! use choreo_core::config::DriverConfig;
//! use choreo_core::platform::headless::{HeadlessElement, HeadlessPlatform};
//! use choreo_core::store::StateStore;
//!
//! let platform = Arc::new(HeadlessPlatform::new(2000.0, 1000.0));
//! let ctx = BindingContext::new(
//!     Arc::new(BehaviourRegistry::with_builtins()),
//!     Arc::new(StateStore::new()),
//!     platform,
//!     DriverConfig::default(),
//! );
//!
//! let card = HeadlessElement::new();
//! let mut binding = BehaviourBinding::mount(&ctx, card.clone(), BindingProps::new("card-hover"));
//! binding.handle_pointer(PointerEvent::Enter);
//! assert_eq!(card.style("--lift-y").as_deref(), Some("-6px"));
//! ```

pub mod behaviour;
pub mod binding;
pub mod config;
pub mod driver;
pub mod error;
pub mod modal;
pub mod platform;
pub mod store;
pub mod trigger;

pub use behaviour::{Behaviour, BehaviourRegistry, BehaviourState, TransitionPhase, VarValue, VariableMap};
pub use error::{MotionError, Result};
