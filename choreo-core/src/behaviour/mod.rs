//! Behaviours
//!
//! A behaviour is a small pure function that turns runtime state (scroll,
//! visibility, pointer interaction, modal phase) into a set of named style
//! variables. Behaviours are looked up by string id so that authored content
//! can name them, and they declare the state or other behaviours they need
//! through `requires`.
//!
//! # Pieces
//!
//! - [`Behaviour`]: the definition (id, compute function, option schema).
//! - [`BehaviourState`]: the input record.
//! - [`VariableMap`]: the output, variable name to value.
//! - [`BehaviourRegistry`]: keyed store of definitions, built once at startup.
//! - [`resolver`]: alias lookup and dependency-first expansion.
//! - [`builtin`]: the stock catalogue.

pub mod builtin;
mod registry;
pub mod resolver;
mod state;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub use registry::BehaviourRegistry;
pub use state::{BehaviourState, StateValue, TransitionPhase};

/// State fields whose change rate demands the continuous driver.
///
/// A behaviour requiring any of these is delegated to the driver instead of
/// being recomputed on every render.
pub const SCROLL_CLASS: [&str; 3] = ["scrollProgress", "scrollVelocity", "sectionProgress"];

/// A single style variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Number(f64),
    Text(String),
}

impl VarValue {
    /// Render as a CSS custom property value.
    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => {
                let rounded = (n * 10_000.0).round() / 10_000.0;
                // avoid "-0"
                let rounded = if rounded == 0.0 { 0.0 } else { rounded };
                write!(f, "{rounded}")
            }
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Variables produced by one `compute` call, in emission order.
pub type VariableMap = IndexMap<String, VarValue>;

/// A primitive option value passed by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Options map handed to `compute`.
pub type Options = IndexMap<String, OptionValue>;

/// Read a numeric option or fall back to `default`.
pub fn option_f64(options: &Options, key: &str, default: f64) -> f64 {
    match options.get(key) {
        Some(OptionValue::Number(n)) => *n,
        _ => default,
    }
}

/// Read a text option or fall back to `default`.
pub fn option_str<'a>(options: &'a Options, key: &str, default: &'a str) -> &'a str {
    match options.get(key) {
        Some(OptionValue::Text(s)) => s,
        _ => default,
    }
}

/// UI-facing description of one option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OptionSpec {
    Range {
        min: f64,
        max: f64,
        step: f64,
        default: f64,
    },
    Select {
        choices: Vec<String>,
        default: String,
    },
    Toggle {
        default: bool,
    },
    Color {
        default: String,
    },
}

impl OptionSpec {
    /// The value used when the caller supplies none.
    pub fn default_value(&self) -> OptionValue {
        match self {
            Self::Range { default, .. } => OptionValue::Number(*default),
            Self::Select { default, .. } | Self::Color { default } => {
                OptionValue::Text(default.clone())
            }
            Self::Toggle { default } => OptionValue::Bool(*default),
        }
    }

    /// Coerce a supplied value to fit this option: ranges clamp, unknown select
    /// choices and mistyped values fall back to the default.
    pub fn normalize(&self, value: &OptionValue) -> OptionValue {
        match (self, value) {
            (Self::Range { min, max, .. }, OptionValue::Number(n)) => {
                OptionValue::Number(n.clamp(*min, *max))
            }
            (Self::Select { choices, .. }, OptionValue::Text(s)) if choices.contains(s) => {
                value.clone()
            }
            (Self::Toggle { .. }, OptionValue::Bool(_)) => value.clone(),
            (Self::Color { .. }, OptionValue::Text(_)) => value.clone(),
            _ => self.default_value(),
        }
    }
}

/// Signature of a behaviour's compute function.
pub type ComputeFn = Arc<dyn Fn(&BehaviourState, &Options) -> VariableMap + Send + Sync>;

/// A registered behaviour definition. Immutable once built; identity is `id`.
#[derive(Clone)]
pub struct Behaviour {
    id: String,
    name: Option<String>,
    requires: SmallVec<[String; 4]>,
    compute: ComputeFn,
    css_template: Option<String>,
    option_config: IndexMap<String, OptionSpec>,
}

impl Behaviour {
    /// Create a behaviour with the given id and compute function.
    pub fn new<F>(id: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&BehaviourState, &Options) -> VariableMap + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            name: None,
            requires: SmallVec::new(),
            compute: Arc::new(compute),
            css_template: None,
            option_config: IndexMap::new(),
        }
    }

    /// Human-readable name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare required state fields or behaviour ids.
    pub fn requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(requires.into_iter().map(Into::into));
        self
    }

    /// Companion style rules consuming the emitted variables.
    pub fn css_template(mut self, template: impl Into<String>) -> Self {
        self.css_template = Some(template.into());
        self
    }

    /// Add an option to the schema.
    pub fn option(mut self, key: impl Into<String>, spec: OptionSpec) -> Self {
        self.option_config.insert(key.into(), spec);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn required(&self) -> &[String] {
        &self.requires
    }

    pub fn template(&self) -> Option<&str> {
        self.css_template.as_deref()
    }

    pub fn option_config(&self) -> &IndexMap<String, OptionSpec> {
        &self.option_config
    }

    /// Run the compute function. Side-effect free apart from the result.
    pub fn compute(&self, state: &BehaviourState, options: &Options) -> VariableMap {
        (self.compute)(state, options)
    }

    /// Whether this behaviour must run on the continuous driver.
    pub fn is_scroll_driven(&self) -> bool {
        self.requires
            .iter()
            .any(|r| SCROLL_CLASS.contains(&r.as_str()))
    }

    /// Merge caller options with schema defaults.
    ///
    /// Keys the schema knows are normalized against it; unknown keys pass
    /// through untouched.
    pub fn resolve_options(&self, given: &Options) -> Options {
        let mut resolved: Options = self
            .option_config
            .iter()
            .map(|(key, spec)| {
                let value = match given.get(key) {
                    Some(value) => spec.normalize(value),
                    None => spec.default_value(),
                };
                (key.clone(), value)
            })
            .collect();

        for (key, value) in given {
            if !resolved.contains_key(key) {
                resolved.insert(key.clone(), value.clone());
            }
        }
        resolved
    }
}

impl fmt::Debug for Behaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behaviour")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("options", &self.option_config.keys().collect::<Vec<_>>())
            .finish()
    }
}
