//! Built-in behaviour catalogue.
//!
//! The catalogue is a static table assembled by [`all`]; the registry loads it
//! in one explicit step at startup. Every entry honours
//! `prefers_reduced_motion` by settling on its final values with a zero
//! duration.

mod interaction;
mod modal;
mod scroll;

use super::{option_f64, Behaviour, BehaviourState, OptionSpec, Options, VarValue};

pub use modal::{MODAL_FADE, MODAL_MASK_WIPE, MODAL_SCALE};

/// Every built-in behaviour, in registration order.
pub fn all() -> Vec<Behaviour> {
    vec![
        scroll::progress(),
        scroll::parallax(),
        scroll::velocity_skew(),
        scroll::fade_in(),
        scroll::background_cycle(),
        interaction::lift(),
        interaction::press(),
        modal::mask_wipe(),
        modal::fade(),
        modal::scale(),
    ]
}

/// Duration in ms as a CSS time, collapsed to zero under reduced motion.
fn duration(state: &BehaviourState, ms: f64) -> VarValue {
    if state.prefers_reduced_motion {
        "0ms".into()
    } else {
        format!("{}ms", VarValue::Number(ms)).into()
    }
}

fn duration_option(options: &Options, default: f64) -> f64 {
    option_f64(options, "duration", default)
}

fn duration_spec(default: f64) -> OptionSpec {
    OptionSpec::Range { min: 0.0, max: 3000.0, step: 10.0, default }
}

fn px(value: f64) -> VarValue {
    format!("{}px", VarValue::Number(value)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::TransitionPhase;

    fn reduced() -> BehaviourState {
        BehaviourState {
            prefers_reduced_motion: true,
            ..Default::default()
        }
    }

    #[test]
    fn ids_are_unique() {
        let behaviours = all();
        let mut ids: Vec<_> = behaviours.iter().map(|b| b.id().to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), behaviours.len());
    }

    #[test]
    fn reduced_motion_zeroes_every_duration() {
        let phases = [
            TransitionPhase::Closed,
            TransitionPhase::Opening,
            TransitionPhase::Open,
            TransitionPhase::Closing,
        ];
        for behaviour in all() {
            for phase in phases {
                for velocity in [-5.0, 0.0, 5.0] {
                    let mut state = reduced();
                    state.set_modal_phase(phase);
                    state.scroll_velocity = velocity;
                    state.section_progress = 0.2;
                    state.is_hovered = true;

                    let options = behaviour.resolve_options(&Options::new());
                    let vars = behaviour.compute(&state, &options);
                    let timing: Vec<_> = vars
                        .iter()
                        .filter(|(name, _)| name.ends_with("-duration"))
                        .collect();
                    assert!(!timing.is_empty(), "{} emits no duration", behaviour.id());
                    for (name, value) in timing {
                        assert_eq!(value.to_css(), "0ms", "{} {name}", behaviour.id());
                    }
                }
            }
        }
    }

    #[test]
    fn reduced_motion_settles_on_final_values() {
        for behaviour in all() {
            let mut state = reduced();
            state.set_modal_phase(TransitionPhase::Opening);
            state.section_visibility = 0.0;
            state.scroll_velocity = 4.0;
            state.section_progress = 0.9;

            let vars = behaviour.compute(&state, &behaviour.resolve_options(&Options::new()));
            if let Some(opacity) = vars.get("--reveal-opacity") {
                assert_eq!(opacity.to_css(), "1");
            }
            if let Some(opacity) = vars.get("--modal-opacity") {
                assert_eq!(opacity.to_css(), "1");
            }
            if let Some(scale) = vars.get("--modal-scale") {
                assert_eq!(scale.to_css(), "1");
            }
            if let Some(skew) = vars.get("--skew") {
                assert_eq!(skew.to_css(), "0deg");
            }
            if let Some(offset) = vars.get("--parallax-y") {
                assert_eq!(offset.to_css(), "0px");
            }
        }
    }
}
