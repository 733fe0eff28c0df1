//! Multi-property timelines.
//!
//! A timeline is a list of [`TimelineStep`]s, each animating one property
//! independently with its own offset, duration, easing and repeat settings.
//! Planning turns steps into [`Track`]s (one primitive animation each) and
//! computes a single completion time across all of them. Per-property
//! transition maps go through the same machinery.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::easing::{EasingFunction, EasingInput, SpringParams};
use crate::options::{AnimationOptions, Repeat, RepeatType, TransitionConfig, normalize_times};
use crate::value::{PropertyValue, StyleMap};

/// One property's independent animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    /// Animated property.
    pub property: String,
    /// Target value or keyframe array.
    pub value: PropertyValue,
    /// Duration in seconds; falls back to the base options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Delay in seconds, added after `at_time`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    /// Offset in seconds from the timeline start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_time: Option<f64>,
    /// Easing; falls back to the base options.
    #[serde(default, alias = "easing", skip_serializing_if = "Option::is_none")]
    pub ease: Option<EasingInput>,
    /// Repeat count or flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    /// Direction across repeats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_type: Option<RepeatType>,
    /// Pause between repeats in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_delay: Option<f64>,
    /// Keyframe times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<f64>>,
}

impl TimelineStep {
    /// Step with only a property, value and duration.
    pub fn new(property: impl Into<String>, value: impl Into<PropertyValue>, duration: f64) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            duration: Some(duration),
            delay: None,
            at_time: None,
            ease: None,
            repeat: None,
            repeat_type: None,
            repeat_delay: None,
            times: None,
        }
    }

    /// Set the offset from the timeline start.
    pub fn at(mut self, at_time: f64) -> Self {
        self.at_time = Some(at_time);
        self
    }

    fn timing(&self) -> TransitionConfig {
        TransitionConfig {
            duration: self.duration,
            delay: self.delay,
            ease: self.ease.clone(),
            repeat: self.repeat,
            repeat_type: self.repeat_type,
            repeat_delay: self.repeat_delay,
            times: self.times.clone(),
            ..TransitionConfig::default()
        }
    }
}

/// Properties animated together with one set of options.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Raw (uncomposed) target properties.
    pub properties: StyleMap,
    /// Resolved options, delay is absolute from the transition start.
    pub options: AnimationOptions,
}

/// Planned tracks for one transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimelinePlan {
    /// Tracks in start order (ties keep input order).
    pub tracks: Vec<Track>,
}

impl TimelinePlan {
    /// Single track with the base options.
    pub fn single(properties: StyleMap, options: AnimationOptions) -> Self {
        Self {
            tracks: vec![Track {
                properties,
                options,
            }],
        }
    }

    /// Completion time in seconds: the latest track end.
    ///
    /// `None` when any track repeats forever.
    pub fn end_time(&self) -> Option<f64> {
        self.tracks
            .iter()
            .map(|track| track.options.end_time())
            .try_fold(0.0_f64, |latest, end| end.map(|end| latest.max(end)))
    }

    fn sort(&mut self) {
        self.tracks
            .sort_by(|a, b| a.options.delay.total_cmp(&b.options.delay));
    }
}

/// Plan a step list against `target`.
///
/// Target properties that no step animates run concurrently at the base
/// delay with the base options.
pub fn plan_steps<F>(
    steps: &[TimelineStep],
    target: &StyleMap,
    base: &AnimationOptions,
    times_epsilon: f64,
    spring: &F,
) -> TimelinePlan
where
    F: Fn(SpringParams) -> EasingFunction,
{
    let mut plan = TimelinePlan::default();

    for step in steps {
        let timing = step.timing();
        let offset = step.at_time.unwrap_or(0.0).max(0.0);
        let options = override_options(
            &timing,
            offset,
            step.value.is_keyframes(),
            base,
            times_epsilon,
            spring,
        );
        let mut properties = StyleMap::new();
        properties.insert(step.property.clone(), step.value.clone());
        plan.tracks.push(Track {
            properties,
            options,
        });
    }

    let remaining: StyleMap = target
        .iter()
        .filter(|(key, _)| !steps.iter().any(|step| &step.property == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if !remaining.is_empty() {
        plan.tracks.push(Track {
            properties: remaining,
            options: base.clone(),
        });
    }

    plan.sort();
    plan
}

/// Plan a per-property transition map against `target`.
///
/// Each listed property gets its own options on top of `base`; the rest
/// share one track with the base options.
pub fn plan_per_property<F>(
    target: &StyleMap,
    per_property: &BTreeMap<String, TransitionConfig>,
    base: &AnimationOptions,
    times_epsilon: f64,
    spring: &F,
) -> TimelinePlan
where
    F: Fn(SpringParams) -> EasingFunction,
{
    let mut plan = TimelinePlan::default();
    let mut shared = StyleMap::new();

    for (property, value) in target {
        match per_property.get(property) {
            Some(timing) => {
                let options =
                    override_options(timing, 0.0, value.is_keyframes(), base, times_epsilon, spring);
                let mut properties = StyleMap::new();
                properties.insert(property.clone(), value.clone());
                plan.tracks.push(Track {
                    properties,
                    options,
                });
            }
            None => {
                shared.insert(property.clone(), value.clone());
            }
        }
    }

    if !shared.is_empty() {
        plan.tracks.push(Track {
            properties: shared,
            options: base.clone(),
        });
    }

    plan.sort();
    plan
}

/// Layer one property's timing on top of the base options.
///
/// Duration and easing fall back to the base; repeat settings are
/// property-local. Delays add up: `base.delay + offset + timing.delay`.
fn override_options<F>(
    timing: &TransitionConfig,
    offset: f64,
    has_keyframes: bool,
    base: &AnimationOptions,
    times_epsilon: f64,
    spring: &F,
) -> AnimationOptions
where
    F: Fn(SpringParams) -> EasingFunction,
{
    let duration = timing.duration.unwrap_or(base.duration).max(0.0);
    let easing = match &timing.ease {
        Some(input) => input.resolve(has_keyframes, spring),
        None if has_keyframes && base.easing.is_spring() => EasingFunction::EaseInOut,
        None => base.easing,
    };

    AnimationOptions {
        duration,
        delay: base.delay + offset + timing.delay.unwrap_or(0.0).max(0.0),
        easing,
        repeat: timing.repeat.map(Repeat::resolve).unwrap_or_default(),
        direction: timing.repeat_type.map(Into::into).unwrap_or_default(),
        repeat_delay: timing.repeat_delay.unwrap_or(0.0).max(0.0),
        times: timing
            .times
            .as_deref()
            .map(|times| normalize_times(times, duration, times_epsilon)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{AnimationDirection, RepeatCount};

    fn base(delay: f64) -> AnimationOptions {
        AnimationOptions {
            duration: 0.5,
            delay,
            ..Default::default()
        }
    }

    fn spring(params: SpringParams) -> EasingFunction {
        EasingFunction::spring(params)
    }

    #[test]
    fn test_steps_start_at_offsets() {
        let mut late = TimelineStep::new("x", 100.0, 1.0).at(0.5);
        late.delay = Some(0.25);
        let steps = vec![TimelineStep::new("opacity", 1.0, 0.2), late];

        let plan = plan_steps(&steps, &StyleMap::new(), &base(0.1), 0.001, &spring);

        assert_eq!(plan.tracks.len(), 2);
        assert!(plan.tracks[0].properties.contains_key("opacity"));
        assert!((plan.tracks[0].options.delay - 0.1).abs() < 1e-9);
        assert!((plan.tracks[1].options.delay - 0.85).abs() < 1e-9);
        assert!((plan.end_time().unwrap() - 1.85).abs() < 1e-9);
    }

    #[test]
    fn test_remaining_target_properties_run_at_base() {
        let mut target = StyleMap::new();
        target.insert("x".into(), 10.0.into());
        target.insert("color".into(), "red".into());
        let steps = vec![TimelineStep::new("x", 50.0, 2.0).at(1.0)];

        let plan = plan_steps(&steps, &target, &base(0.0), 0.001, &spring);

        assert_eq!(plan.tracks.len(), 2);
        let shared = &plan.tracks[0];
        assert_eq!(shared.properties.len(), 1);
        assert!(shared.properties.contains_key("color"));
        assert_eq!(shared.options.delay, 0.0);
        assert_eq!(plan.end_time(), Some(3.0));
    }

    #[test]
    fn test_step_repeat_and_times() {
        let mut step = TimelineStep::new("scale", vec![1.0, 1.2, 1.0], 1.0);
        step.repeat = Some(Repeat::Count(2.0));
        step.repeat_type = Some(RepeatType::Mirror);
        step.repeat_delay = Some(0.5);
        step.times = Some(vec![0.0, 250.0, 1000.0]);

        let plan = plan_steps(&[step], &StyleMap::new(), &base(0.0), 0.001, &spring);
        let options = &plan.tracks[0].options;

        assert_eq!(options.repeat, RepeatCount::Finite(2));
        assert_eq!(options.direction, AnimationDirection::Alternate);
        assert_eq!(options.times.as_deref(), Some(&[0.0, 0.25, 1.0][..]));
        assert_eq!(plan.end_time(), Some(4.0));
    }

    #[test]
    fn test_infinite_step_has_no_end() {
        let mut step = TimelineStep::new("rotate", 360.0, 2.0);
        step.repeat = Some(Repeat::Flag(true));
        let plan = plan_steps(&[step], &StyleMap::new(), &base(0.0), 0.001, &spring);
        assert_eq!(plan.end_time(), None);
    }

    #[test]
    fn test_keyframe_step_drops_inherited_spring() {
        let spring_base = AnimationOptions {
            easing: EasingFunction::spring(SpringParams::default()),
            ..base(0.0)
        };
        let steps = vec![
            TimelineStep::new("x", vec![0.0, 10.0], 1.0),
            TimelineStep::new("y", 10.0, 1.0),
        ];
        let plan = plan_steps(&steps, &StyleMap::new(), &spring_base, 0.001, &spring);
        assert_eq!(plan.tracks[0].options.easing, EasingFunction::EaseInOut);
        assert!(plan.tracks[1].options.easing.is_spring());
    }

    #[test]
    fn test_per_property_map() {
        let mut target = StyleMap::new();
        target.insert("opacity".into(), 1.0.into());
        target.insert("x".into(), 0.0.into());
        target.insert("color".into(), "blue".into());

        let mut map = BTreeMap::new();
        map.insert("opacity".to_string(), TransitionConfig::with_duration(0.2));
        map.insert(
            "x".to_string(),
            TransitionConfig {
                duration: Some(1.0),
                delay: Some(0.3),
                ..Default::default()
            },
        );

        let plan = plan_per_property(&target, &map, &base(0.1), 0.001, &spring);

        assert_eq!(plan.tracks.len(), 3);
        let x = plan
            .tracks
            .iter()
            .find(|track| track.properties.contains_key("x"))
            .unwrap();
        assert!((x.options.delay - 0.4).abs() < 1e-9);
        assert!((plan.end_time().unwrap() - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_step_deserializes_camel_case() {
        let step: TimelineStep = serde_json::from_value(serde_json::json!({
            "property": "x",
            "value": [0, 100],
            "duration": 0.6,
            "atTime": 0.4,
            "easing": "linear",
            "repeatType": "pingPong"
        }))
        .unwrap();
        assert_eq!(step.at_time, Some(0.4));
        assert_eq!(step.ease, Some(EasingInput::Named("linear".into())));
        assert_eq!(step.repeat_type, Some(RepeatType::PingPong));
    }
}
