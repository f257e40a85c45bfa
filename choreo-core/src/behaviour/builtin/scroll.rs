//! Scroll- and visibility-triggered behaviours.

use super::{duration, duration_option, duration_spec, px};
use crate::behaviour::{option_f64, Behaviour, OptionSpec, VarValue, VariableMap};

pub(super) fn progress() -> Behaviour {
    Behaviour::new("scroll/progress", |state, options| {
        let progress = state.scroll_progress.clamp(0.0, 1.0);
        let mut vars = VariableMap::new();
        vars.insert("--scroll-progress".into(), progress.into());
        vars.insert(
            "--scroll-progress-pct".into(),
            format!("{}%", VarValue::Number(progress * 100.0)).into(),
        );
        vars.insert(
            "--scroll-progress-duration".into(),
            duration(state, duration_option(options, 80.0)),
        );
        vars
    })
    .named("Scroll progress")
    .requires(["scrollProgress"])
    .option("duration", duration_spec(80.0))
    .css_template(".progress-bar { transform: scaleX(var(--scroll-progress)); transition: transform var(--scroll-progress-duration) linear; }")
}

pub(super) fn parallax() -> Behaviour {
    Behaviour::new("scroll/parallax", |state, options| {
        let speed = option_f64(options, "speed", 0.3);
        let distance = option_f64(options, "distance", 120.0);
        let offset = if state.prefers_reduced_motion {
            0.0
        } else {
            (state.section_progress.clamp(0.0, 1.0) - 0.5) * 2.0 * distance * speed
        };

        let mut vars = VariableMap::new();
        vars.insert("--parallax-y".into(), px(offset));
        vars.insert("--parallax-duration".into(), duration(state, 0.0));
        vars
    })
    .named("Parallax")
    .requires(["sectionProgress"])
    .option("speed", OptionSpec::Range { min: -1.0, max: 1.0, step: 0.05, default: 0.3 })
    .option("distance", OptionSpec::Range { min: 0.0, max: 400.0, step: 4.0, default: 120.0 })
    .css_template("[data-behaviour=\"scroll/parallax\"] { transform: translate3d(0, var(--parallax-y), 0); }")
}

pub(super) fn velocity_skew() -> Behaviour {
    Behaviour::new("scroll/velocity-skew", |state, options| {
        let max = option_f64(options, "max", 8.0);
        let intensity = option_f64(options, "intensity", 2.0);
        let skew = if state.prefers_reduced_motion {
            0.0
        } else {
            (state.scroll_velocity * intensity).clamp(-max, max)
        };

        let mut vars = VariableMap::new();
        vars.insert("--skew".into(), format!("{}deg", VarValue::Number(skew)).into());
        vars.insert(
            "--skew-duration".into(),
            duration(state, duration_option(options, 120.0)),
        );
        vars
    })
    .named("Velocity skew")
    .requires(["scrollVelocity"])
    .option("max", OptionSpec::Range { min: 0.0, max: 20.0, step: 0.5, default: 8.0 })
    .option("intensity", OptionSpec::Range { min: 0.0, max: 10.0, step: 0.1, default: 2.0 })
    .option("duration", duration_spec(120.0))
}

pub(super) fn fade_in() -> Behaviour {
    Behaviour::new("visibility/fade-in", |state, options| {
        let threshold = option_f64(options, "threshold", 0.2).max(f64::EPSILON);
        let distance = option_f64(options, "distance", 24.0);
        let progress = if state.prefers_reduced_motion {
            1.0
        } else {
            (state.section_visibility / threshold).clamp(0.0, 1.0)
        };

        let mut vars = VariableMap::new();
        vars.insert("--reveal-opacity".into(), progress.into());
        vars.insert("--reveal-offset".into(), px((1.0 - progress) * distance));
        vars.insert(
            "--reveal-duration".into(),
            duration(state, duration_option(options, 600.0)),
        );
        vars
    })
    .named("Fade in on reveal")
    .requires(["sectionVisibility"])
    .option("threshold", OptionSpec::Range { min: 0.0, max: 1.0, step: 0.05, default: 0.2 })
    .option("distance", OptionSpec::Range { min: 0.0, max: 200.0, step: 2.0, default: 24.0 })
    .option("duration", duration_spec(600.0))
}

pub(super) fn background_cycle() -> Behaviour {
    Behaviour::new("section/background-cycle", |state, options| {
        let count = option_f64(options, "count", 3.0).max(1.0).round();
        let index = state.extra_f64("backgroundIndex", 0.0).round().rem_euclid(count);

        let mut vars = VariableMap::new();
        vars.insert("--bg-index".into(), index.into());
        vars.insert(
            "--bg-duration".into(),
            duration(state, duration_option(options, 800.0)),
        );
        vars
    })
    .named("Background cycle")
    .requires(["isActive", "backgroundIndex"])
    .option("count", OptionSpec::Range { min: 1.0, max: 12.0, step: 1.0, default: 3.0 })
    .option("duration", duration_spec(800.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::{BehaviourState, Options};

    fn run(behaviour: &Behaviour, state: &BehaviourState) -> VariableMap {
        behaviour.compute(state, &behaviour.resolve_options(&Options::new()))
    }

    #[test]
    fn progress_tracks_scroll() {
        let state = BehaviourState { scroll_progress: 0.25, ..Default::default() };
        let vars = run(&progress(), &state);
        assert_eq!(vars["--scroll-progress"].to_css(), "0.25");
        assert_eq!(vars["--scroll-progress-pct"].to_css(), "25%");
        assert_eq!(vars["--scroll-progress-duration"].to_css(), "80ms");
    }

    #[test]
    fn parallax_is_centred_mid_section() {
        let behaviour = parallax();
        let state = BehaviourState { section_progress: 0.5, ..Default::default() };
        assert_eq!(run(&behaviour, &state)["--parallax-y"].to_css(), "0px");

        let state = BehaviourState { section_progress: 1.0, ..Default::default() };
        assert_eq!(run(&behaviour, &state)["--parallax-y"].to_css(), "36px");
    }

    #[test]
    fn skew_is_clamped() {
        let state = BehaviourState { scroll_velocity: -50.0, ..Default::default() };
        assert_eq!(run(&velocity_skew(), &state)["--skew"].to_css(), "-8deg");
    }

    #[test]
    fn fade_in_reaches_full_opacity_at_threshold() {
        let behaviour = fade_in();
        let state = BehaviourState { section_visibility: 0.1, ..Default::default() };
        let vars = run(&behaviour, &state);
        assert_eq!(vars["--reveal-opacity"].to_css(), "0.5");
        assert_eq!(vars["--reveal-offset"].to_css(), "12px");

        let state = BehaviourState { section_visibility: 0.9, ..Default::default() };
        assert_eq!(run(&behaviour, &state)["--reveal-opacity"].to_css(), "1");
    }

    #[test]
    fn background_index_wraps() {
        let mut state = BehaviourState::default();
        state.extras.insert("backgroundIndex".into(), 4.0.into());
        assert_eq!(run(&background_cycle(), &state)["--bg-index"].to_css(), "1");
    }
}
