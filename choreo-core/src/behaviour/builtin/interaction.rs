//! Pointer-interaction behaviours. These never need the driver.

use super::{duration, duration_option, duration_spec, px};
use crate::behaviour::{option_f64, Behaviour, OptionSpec, VariableMap};

pub(super) fn lift() -> Behaviour {
    Behaviour::new("hover/lift", |state, options| {
        let lift = option_f64(options, "lift", 6.0);
        let y = if state.is_pressed {
            -lift / 2.0
        } else if state.is_hovered {
            -lift
        } else {
            0.0
        };
        let shadow: f64 = if state.is_hovered { 0.18 } else { 0.08 };

        let mut vars = VariableMap::new();
        vars.insert("--lift-y".into(), px(y));
        vars.insert("--lift-shadow".into(), shadow.into());
        vars.insert(
            "--lift-duration".into(),
            duration(state, duration_option(options, 200.0)),
        );
        vars
    })
    .named("Hover lift")
    .requires(["isHovered", "isPressed"])
    .option("lift", OptionSpec::Range { min: 0.0, max: 32.0, step: 1.0, default: 6.0 })
    .option("duration", duration_spec(200.0))
}

pub(super) fn press() -> Behaviour {
    Behaviour::new("press/scale", |state, options| {
        let pressed = option_f64(options, "scale", 0.96);
        let scale = if state.is_pressed { pressed } else { 1.0 };

        let mut vars = VariableMap::new();
        vars.insert("--press-scale".into(), scale.into());
        vars.insert(
            "--press-duration".into(),
            duration(state, duration_option(options, 120.0)),
        );
        vars
    })
    .named("Press scale")
    .requires(["isPressed"])
    .option("scale", OptionSpec::Range { min: 0.8, max: 1.0, step: 0.01, default: 0.96 })
    .option("duration", duration_spec(120.0))
}
