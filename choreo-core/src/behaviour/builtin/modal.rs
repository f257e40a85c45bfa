//! Modal transition behaviours.
//!
//! These read only the synthetic modal fields of the state (`modal_phase`,
//! `modal_open`, and the `sourceX`/`sourceY` extras). While opening or open
//! they emit the open values, while closing or closed the closed values; the
//! companion style rules transition between them.

use super::{duration, duration_option, duration_spec};
use crate::behaviour::{
    option_f64, option_str, Behaviour, BehaviourState, OptionSpec, Options, VarValue, VariableMap,
};

pub const MODAL_MASK_WIPE: &str = "modal/mask-wipe";
pub const MODAL_FADE: &str = "modal/fade";
pub const MODAL_SCALE: &str = "modal/scale";

const DEFAULT_EASING: &str = "cubic-bezier(0.22, 1, 0.36, 1)";

fn easing_spec() -> OptionSpec {
    OptionSpec::Select {
        choices: vec![
            DEFAULT_EASING.into(),
            "ease".into(),
            "ease-in-out".into(),
            "linear".into(),
        ],
        default: DEFAULT_EASING.into(),
    }
}

/// Timing and phase variables shared by every modal transition.
fn timing(state: &BehaviourState, options: &Options) -> VariableMap {
    let mut vars = VariableMap::new();
    vars.insert("--modal-phase".into(), state.modal_phase.as_str().into());
    vars.insert(
        "--modal-duration".into(),
        duration(state, duration_option(options, 600.0)),
    );
    vars.insert(
        "--modal-easing".into(),
        option_str(options, "easing", DEFAULT_EASING).into(),
    );
    vars
}

pub(super) fn mask_wipe() -> Behaviour {
    Behaviour::new(MODAL_MASK_WIPE, |state, options| {
        let x = state.extra_f64("sourceX", 50.0);
        let y = state.extra_f64("sourceY", 50.0);
        let radius = if state.modal_open { 150.0 } else { 0.0 };

        let mut vars = timing(state, options);
        vars.insert(
            "--modal-clip".into(),
            format!(
                "circle({}% at {}% {}%)",
                VarValue::Number(radius),
                VarValue::Number(x),
                VarValue::Number(y)
            )
            .into(),
        );
        vars
    })
    .named("Mask wipe")
    .requires(["modalPhase", "modalOpen"])
    .option("duration", duration_spec(600.0))
    .option("easing", easing_spec())
    .css_template(".modal { clip-path: var(--modal-clip); transition: clip-path var(--modal-duration) var(--modal-easing); }")
}

pub(super) fn fade() -> Behaviour {
    Behaviour::new(MODAL_FADE, |state, options| {
        let mut vars = timing(state, options);
        vars.insert(
            "--modal-opacity".into(),
            VarValue::Number(if state.modal_open { 1.0 } else { 0.0 }),
        );
        vars
    })
    .named("Fade")
    .requires(["modalPhase", "modalOpen"])
    .option("duration", duration_spec(300.0))
    .option("easing", easing_spec())
    .css_template(".modal { opacity: var(--modal-opacity); transition: opacity var(--modal-duration) var(--modal-easing); }")
}

pub(super) fn scale() -> Behaviour {
    Behaviour::new(MODAL_SCALE, |state, options| {
        let from = option_f64(options, "from", 0.92);

        let mut vars = timing(state, options);
        let (scale, opacity) = if state.modal_open { (1.0, 1.0) } else { (from, 0.0) };
        vars.insert("--modal-scale".into(), scale.into());
        vars.insert("--modal-opacity".into(), opacity.into());
        vars
    })
    .named("Scale")
    .requires(["modalPhase", "modalOpen"])
    .option("duration", duration_spec(400.0))
    .option("easing", easing_spec())
    .option("from", OptionSpec::Range { min: 0.5, max: 1.0, step: 0.01, default: 0.92 })
    .css_template(".modal { transform: scale(var(--modal-scale)); opacity: var(--modal-opacity); transition: transform var(--modal-duration) var(--modal-easing), opacity var(--modal-duration) var(--modal-easing); }")
}
