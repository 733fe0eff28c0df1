//! Transition configuration and the animation options builder.
//!
//! This module provides:
//! - `TransitionConfig`: timing input as written by hosts, every field optional
//! - `Transition`: either one uniform config or a per-property config map
//! - `AnimationOptions`: the concrete options handed to the primitive
//! - `OptionsBuilder`: merges the precedence levels into `AnimationOptions`
//!
//! # Precedence
//!
//! From highest to lowest:
//! 1. an externally-set stagger delay (delay only; `Some(0.0)` counts)
//! 2. the target variant's embedded transition
//! 3. the node's global `transition` input
//! 4. the node's directive inputs (`duration`, `delay`, `easing`, `repeat`, ...)
//! 5. engine defaults from [`TimingConfig`]

use choreo_config::TimingConfig;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::easing::{EasingFunction, EasingInput, SpringParams};

/// Top-level keys whose presence marks a transition object as uniform.
const UNIFORM_KEYS: [&str; 4] = ["duration", "delay", "ease", "easing"];

/// Repeat request as written by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Repeat {
    /// `true` repeats forever, `false` never.
    Flag(bool),
    /// Number of extra iterations.
    Count(f64),
}

impl Repeat {
    /// Resolve into a concrete repeat count.
    pub fn resolve(self) -> RepeatCount {
        match self {
            Self::Flag(true) => RepeatCount::Infinite,
            Self::Flag(false) => RepeatCount::Finite(0),
            Self::Count(count) if count.is_infinite() && count > 0.0 => RepeatCount::Infinite,
            Self::Count(count) if count.is_finite() && count > 0.0 => {
                RepeatCount::Finite(count.round().min(u32::MAX as f64) as u32)
            }
            Self::Count(_) => RepeatCount::Finite(0),
        }
    }
}

/// How many times an animation repeats after its first run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "count", rename_all = "snake_case")]
pub enum RepeatCount {
    /// Repeat a fixed number of times (0 = play once).
    Finite(u32),
    /// Repeat indefinitely.
    Infinite,
}

impl Default for RepeatCount {
    fn default() -> Self {
        Self::Finite(0)
    }
}

/// Repeat type vocabulary accepted from hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatType {
    Forwards,
    Loop,
    Reverse,
    PingPong,
    Mirror,
}

/// Direction of playback across repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationDirection {
    /// Play forward each iteration.
    #[default]
    Normal,
    /// Play backward each iteration.
    Reverse,
    /// Alternate between forward and backward.
    Alternate,
}

impl AnimationDirection {
    /// Determine if a specific iteration plays in reverse.
    pub fn is_reversed(&self, iteration: u32) -> bool {
        match self {
            Self::Normal => false,
            Self::Reverse => true,
            Self::Alternate => iteration % 2 == 1,
        }
    }
}

impl From<RepeatType> for AnimationDirection {
    fn from(kind: RepeatType) -> Self {
        match kind {
            RepeatType::Forwards | RepeatType::Loop => Self::Normal,
            RepeatType::Reverse => Self::Reverse,
            RepeatType::PingPong | RepeatType::Mirror => Self::Alternate,
        }
    }
}

/// Parent/child ordering for staggered children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum When {
    /// Parent and children start together (children at their stagger slots).
    #[default]
    Together,
    /// Parent starts first; scheduled like `Together`.
    BeforeChildren,
    /// Parent waits until the last child's stagger slot has begun.
    AfterChildren,
}

/// Timing input at any precedence level. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransitionConfig {
    /// Duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Delay in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    /// Easing descriptor.
    #[serde(alias = "easing", skip_serializing_if = "Option::is_none")]
    pub ease: Option<EasingInput>,
    /// Repeat count or flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    /// Repeat type (mapped onto [`AnimationDirection`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_type: Option<RepeatType>,
    /// Pause between repeats in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_delay: Option<f64>,
    /// Delay step between consecutive children, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stagger_children: Option<f64>,
    /// Negative values stagger from the last child.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stagger_direction: Option<f64>,
    /// Parent/child ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<When>,
    /// Offset added to every child's delay, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_children: Option<f64>,
    /// Keyframe times, normalized or absolute seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<f64>>,
}

impl TransitionConfig {
    /// Config with only a duration.
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Whether any stagger/orchestration field is set.
    pub fn orchestrates_children(&self) -> bool {
        self.stagger_children.is_some() || self.delay_children.is_some() || self.when.is_some()
    }
}

/// A variant's or node's `transition` value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Transition {
    /// One config for every property.
    Uniform(TransitionConfig),
    /// Config keyed by property name.
    PerProperty(BTreeMap<String, TransitionConfig>),
}

impl Default for Transition {
    fn default() -> Self {
        Self::Uniform(TransitionConfig::default())
    }
}

impl Transition {
    /// Interpret a JSON value as a transition.
    ///
    /// An object is per-property when it has none of the uniform timing keys
    /// and every value is itself an object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let per_property = match &value {
            serde_json::Value::Object(map) => {
                !map.is_empty()
                    && !UNIFORM_KEYS.iter().any(|key| map.contains_key(*key))
                    && map.values().all(serde_json::Value::is_object)
            }
            _ => false,
        };

        if per_property {
            serde_json::from_value(value).map(Self::PerProperty)
        } else {
            serde_json::from_value(value).map(Self::Uniform)
        }
    }

    /// The uniform config, if this is not a per-property map.
    pub fn uniform(&self) -> Option<&TransitionConfig> {
        match self {
            Self::Uniform(config) => Some(config),
            Self::PerProperty(_) => None,
        }
    }

    /// The per-property map, if any.
    pub fn per_property(&self) -> Option<&BTreeMap<String, TransitionConfig>> {
        match self {
            Self::Uniform(_) => None,
            Self::PerProperty(map) => Some(map),
        }
    }
}

impl<'de> Deserialize<'de> for Transition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(D::Error::custom)
    }
}

/// Concrete options for one primitive animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationOptions {
    /// Duration of one iteration in seconds.
    pub duration: f64,
    /// Delay before the first iteration in seconds.
    pub delay: f64,
    /// Resolved timing curve.
    pub easing: EasingFunction,
    /// Extra iterations.
    pub repeat: RepeatCount,
    /// Direction across iterations.
    pub direction: AnimationDirection,
    /// Pause between iterations in seconds.
    pub repeat_delay: f64,
    /// Normalized keyframe offsets in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<f64>>,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            duration: 0.3,
            delay: 0.0,
            easing: EasingFunction::EaseInOut,
            repeat: RepeatCount::Finite(0),
            direction: AnimationDirection::Normal,
            repeat_delay: 0.0,
            times: None,
        }
    }
}

impl AnimationOptions {
    /// Options that apply values immediately.
    pub fn instant() -> Self {
        Self {
            duration: 0.0,
            ..Self::default()
        }
    }

    /// Time from start (after delay) to completion, `None` when repeating forever.
    pub fn active_duration(&self) -> Option<f64> {
        match self.repeat {
            RepeatCount::Infinite => None,
            RepeatCount::Finite(extra) => {
                let extra = f64::from(extra);
                Some(self.duration * (extra + 1.0) + self.repeat_delay * extra)
            }
        }
    }

    /// Delay plus active duration, `None` when repeating forever.
    pub fn end_time(&self) -> Option<f64> {
        self.active_duration().map(|active| self.delay + active)
    }
}

/// Resolved parent/child ordering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orchestration {
    /// Delay step between children in seconds.
    pub stagger: f64,
    /// Sign selects forward (≥ 0) or reverse (< 0) order.
    pub direction: f64,
    /// Offset added to every child delay.
    pub delay_children: f64,
    /// Parent/child ordering.
    pub when: When,
}

/// Merges the precedence levels into concrete [`AnimationOptions`].
#[derive(Debug, Clone, Copy)]
pub struct OptionsBuilder<'a> {
    target: Option<&'a TransitionConfig>,
    node: Option<&'a TransitionConfig>,
    directive: Option<&'a TransitionConfig>,
    stagger_override: Option<f64>,
    defaults: &'a TimingConfig,
}

impl<'a> OptionsBuilder<'a> {
    /// Builder with only engine defaults.
    pub fn new(defaults: &'a TimingConfig) -> Self {
        Self {
            target: None,
            node: None,
            directive: None,
            stagger_override: None,
            defaults,
        }
    }

    /// Set the target variant's embedded transition.
    pub fn target(mut self, config: Option<&'a TransitionConfig>) -> Self {
        self.target = config;
        self
    }

    /// Set the node's global transition input.
    pub fn node(mut self, config: Option<&'a TransitionConfig>) -> Self {
        self.node = config;
        self
    }

    /// Set the node's directive-level defaults.
    pub fn directive(mut self, config: Option<&'a TransitionConfig>) -> Self {
        self.directive = config;
        self
    }

    /// Set an externally computed stagger delay.
    pub fn stagger_override(mut self, delay: Option<f64>) -> Self {
        self.stagger_override = delay;
        self
    }

    fn pick<T>(&self, field: impl Fn(&TransitionConfig) -> Option<T>) -> Option<T> {
        [self.target, self.node, self.directive]
            .into_iter()
            .flatten()
            .find_map(field)
    }

    /// Resolved delay, honouring the stagger override first.
    pub fn delay(&self) -> f64 {
        match self.stagger_override {
            Some(delay) if delay >= 0.0 => delay,
            _ => self.pick(|c| c.delay).unwrap_or(0.0).max(0.0),
        }
    }

    /// Build the options for a target with or without keyframe arrays.
    ///
    /// `spring` is the primitive's spring constructor.
    pub fn build<F>(&self, has_keyframes: bool, spring: F) -> AnimationOptions
    where
        F: FnOnce(SpringParams) -> EasingFunction,
    {
        let duration = self
            .pick(|c| c.duration)
            .unwrap_or(self.defaults.default_duration_secs)
            .max(0.0);
        let easing = self
            .pick(|c| c.ease.clone())
            .unwrap_or_else(|| EasingInput::Named(self.defaults.default_easing.clone()))
            .resolve(has_keyframes, spring);
        let times = self
            .pick(|c| c.times.clone())
            .map(|times| normalize_times(&times, duration, self.defaults.times_epsilon));

        AnimationOptions {
            duration,
            delay: self.delay(),
            easing,
            repeat: self.pick(|c| c.repeat).map(Repeat::resolve).unwrap_or_default(),
            direction: self.pick(|c| c.repeat_type).map(Into::into).unwrap_or_default(),
            repeat_delay: self.pick(|c| c.repeat_delay).unwrap_or(0.0).max(0.0),
            times,
        }
    }

    /// Resolved stagger/orchestration parameters.
    pub fn orchestration(&self) -> Orchestration {
        Orchestration {
            stagger: self.pick(|c| c.stagger_children).unwrap_or(0.0).max(0.0),
            direction: self.pick(|c| c.stagger_direction).unwrap_or(1.0),
            delay_children: self.pick(|c| c.delay_children).unwrap_or(0.0).max(0.0),
            when: self.pick(|c| c.when).unwrap_or_default(),
        }
    }
}

/// Normalize keyframe `times` into [0, 1].
///
/// Values above `1 + epsilon` mark the list as absolute seconds; it is then
/// divided by the larger of `duration` and the largest time.
pub fn normalize_times(times: &[f64], duration: f64, epsilon: f64) -> Vec<f64> {
    let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 1.0 + epsilon) {
        return times.to_vec();
    }

    let divisor = duration.max(max);
    times
        .iter()
        .map(|t| (t / divisor).clamp(0.0, 1.0))
        .collect()
}
