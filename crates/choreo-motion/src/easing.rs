//! Easing descriptors and resolved timing curves.
//!
//! Hosts describe easing in one of three shapes ([`EasingInput`]):
//! - a name (`"ease-in"`, `"ease-out"`, `"ease-in-out"`, `"ease"`, `"linear"`, `"spring"`)
//! - a cubic-bezier control point array (`[0.4, 0.0, 0.2, 1.0]`)
//! - a spring descriptor (`{"type": "spring", "stiffness": 300, "damping": 20}`)
//!
//! Resolution turns that into an [`EasingFunction`] the primitive understands.
//! Springs are built by the primitive's own constructor and are mutually
//! exclusive with keyframe arrays: when the target animates keyframes the
//! spring is dropped in favour of the default curve.
//!
//! # Usage
//!
//! ```
//! use choreo_motion::easing::{EasingFunction, EasingInput, SpringParams};
//!
//! let input = EasingInput::Named("ease-out".into());
//! let curve = input.resolve(false, |params: SpringParams| EasingFunction::spring(params));
//! assert_eq!(curve, EasingFunction::EaseOut);
//! ```

use serde::{Deserialize, Serialize};

/// Spring stiffness used when a descriptor omits it.
pub const DEFAULT_STIFFNESS: f64 = 100.0;
/// Spring damping used when a descriptor omits it.
pub const DEFAULT_DAMPING: f64 = 10.0;

/// Physical parameters handed to the primitive's spring constructor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringParams {
    /// Spring stiffness (k).
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    /// Damping coefficient.
    #[serde(default = "default_damping")]
    pub damping: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            stiffness: DEFAULT_STIFFNESS,
            damping: DEFAULT_DAMPING,
        }
    }
}

fn default_stiffness() -> f64 {
    DEFAULT_STIFFNESS
}

fn default_damping() -> f64 {
    DEFAULT_DAMPING
}

/// Tag value that marks an object as a spring descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpringTag {
    /// `"type": "spring"`
    Spring,
}

/// Spring descriptor as written by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringDescriptor {
    /// Must be `"spring"`.
    #[serde(rename = "type")]
    pub tag: SpringTag,
    /// Stiffness and damping.
    #[serde(flatten)]
    pub params: SpringParams,
}

/// Easing as supplied in host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EasingInput {
    /// Named curve.
    Named(String),
    /// Cubic-bezier control points `[x1, y1, x2, y2]`.
    CubicBezier([f64; 4]),
    /// Spring descriptor.
    Spring(SpringDescriptor),
}

impl EasingInput {
    /// Shorthand for a spring descriptor.
    pub fn spring(stiffness: f64, damping: f64) -> Self {
        Self::Spring(SpringDescriptor {
            tag: SpringTag::Spring,
            params: SpringParams { stiffness, damping },
        })
    }

    /// Resolve this input into a concrete curve.
    ///
    /// `has_keyframes` reports whether the target variant animates any keyframe
    /// array; springs are only built when it does not. `spring` is the
    /// primitive's spring constructor.
    pub fn resolve<F>(&self, has_keyframes: bool, spring: F) -> EasingFunction
    where
        F: FnOnce(SpringParams) -> EasingFunction,
    {
        match self {
            Self::CubicBezier([x1, y1, x2, y2]) => EasingFunction::CubicBezier {
                x1: *x1,
                y1: *y1,
                x2: *x2,
                y2: *y2,
            },
            Self::Spring(descriptor) => spring_or_fallback(descriptor.params, has_keyframes, spring),
            Self::Named(name) => match name.as_str() {
                "linear" => EasingFunction::Linear,
                "ease-in" | "easeIn" => EasingFunction::EaseIn,
                "ease-out" | "easeOut" => EasingFunction::EaseOut,
                "ease-in-out" | "easeInOut" | "ease" => EasingFunction::EaseInOut,
                "spring" => spring_or_fallback(SpringParams::default(), has_keyframes, spring),
                other => {
                    tracing::debug!(easing = other, "unrecognized easing name, using ease-in-out");
                    EasingFunction::EaseInOut
                }
            },
        }
    }
}

fn spring_or_fallback<F>(params: SpringParams, has_keyframes: bool, spring: F) -> EasingFunction
where
    F: FnOnce(SpringParams) -> EasingFunction,
{
    if has_keyframes {
        tracing::debug!("spring easing ignored for keyframe target");
        EasingFunction::EaseInOut
    } else {
        spring(params)
    }
}

/// Resolved timing curve for one animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    Linear,

    /// Slow start, accelerating.
    /// Equivalent to `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,

    /// Fast start, decelerating.
    /// Equivalent to `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,

    /// Slow start and end, fast middle.
    /// Equivalent to `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,

    /// Custom cubic bezier curve.
    /// x values should be in [0, 1], y values can be any float.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },

    /// Spring built by the primitive; timing is owned by the primitive.
    Spring { stiffness: f64, damping: f64 },
}

impl Default for EasingFunction {
    fn default() -> Self {
        Self::EaseInOut
    }
}

impl EasingFunction {
    /// Default spring representation, used by backends without a native constructor.
    pub fn spring(params: SpringParams) -> Self {
        Self::Spring {
            stiffness: params.stiffness,
            damping: params.damping,
        }
    }

    /// Evaluate the curve at the given progress.
    ///
    /// Returns `None` for springs, whose progression depends on physics the
    /// primitive owns.
    pub fn evaluate(&self, t: f64) -> Option<f64> {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => Some(t),
            Self::EaseIn => Some(cubic_bezier(0.42, 0.0, 1.0, 1.0, t)),
            Self::EaseOut => Some(cubic_bezier(0.0, 0.0, 0.58, 1.0, t)),
            Self::EaseInOut => Some(cubic_bezier(0.42, 0.0, 0.58, 1.0, t)),
            Self::CubicBezier { x1, y1, x2, y2 } => Some(cubic_bezier(*x1, *y1, *x2, *y2, t)),
            Self::Spring { .. } => None,
        }
    }

    /// Whether this is a spring curve.
    pub fn is_spring(&self) -> bool {
        matches!(self, Self::Spring { .. })
    }

    /// CSS timing-function text for curve easings.
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Linear => Some("linear".to_string()),
            Self::EaseIn => Some("ease-in".to_string()),
            Self::EaseOut => Some("ease-out".to_string()),
            Self::EaseInOut => Some("ease-in-out".to_string()),
            Self::CubicBezier { x1, y1, x2, y2 } => {
                Some(format!("cubic-bezier({x1}, {y1}, {x2}, {y2})"))
            }
            Self::Spring { .. } => None,
        }
    }
}

/// Evaluate a cubic bezier curve at time t.
///
/// Uses Newton-Raphson iteration to find the curve parameter for the input
/// progress, then evaluates the y coordinate at that parameter.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_component(y1, y2, t)
}

fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_component(x1, x2, t) - target_x;
        if x.abs() < 1e-7 {
            break;
        }

        let dx = bezier_derivative(x1, x2, t);
        if dx.abs() < 1e-7 {
            break;
        }

        t -= x / dx;
        t = t.clamp(0.0, 1.0);
    }

    t
}

/// One coordinate of the bezier at parameter t:
/// c(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_component(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
}

/// dc/dt = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_derivative(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.001;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn no_spring(_: SpringParams) -> EasingFunction {
        panic!("spring constructor must not be called")
    }

    #[test]
    fn test_named_resolution() {
        let resolve = |name: &str| EasingInput::Named(name.into()).resolve(false, no_spring);
        assert_eq!(resolve("linear"), EasingFunction::Linear);
        assert_eq!(resolve("ease-in"), EasingFunction::EaseIn);
        assert_eq!(resolve("ease-out"), EasingFunction::EaseOut);
        assert_eq!(resolve("ease-in-out"), EasingFunction::EaseInOut);
        assert_eq!(resolve("ease"), EasingFunction::EaseInOut);
        assert_eq!(resolve("wobbly"), EasingFunction::EaseInOut);
    }

    #[test]
    fn test_bezier_array_passes_through() {
        let input: EasingInput = serde_json::from_str("[0.4, 0.0, 0.2, 1.0]").unwrap();
        assert_eq!(
            input.resolve(false, no_spring),
            EasingFunction::CubicBezier {
                x1: 0.4,
                y1: 0.0,
                x2: 0.2,
                y2: 1.0
            }
        );
    }

    #[test]
    fn test_spring_descriptor_defaults() {
        let input: EasingInput = serde_json::from_str(r#"{"type": "spring"}"#).unwrap();
        let curve = input.resolve(false, EasingFunction::spring);
        assert_eq!(
            curve,
            EasingFunction::Spring {
                stiffness: 100.0,
                damping: 10.0
            }
        );

        let input: EasingInput =
            serde_json::from_str(r#"{"type": "spring", "stiffness": 300}"#).unwrap();
        let curve = input.resolve(false, EasingFunction::spring);
        assert_eq!(
            curve,
            EasingFunction::Spring {
                stiffness: 300.0,
                damping: 10.0
            }
        );
    }

    #[test]
    fn test_spring_yields_to_keyframes() {
        let curve = EasingInput::spring(200.0, 5.0).resolve(true, no_spring);
        assert_eq!(curve, EasingFunction::EaseInOut);

        let curve = EasingInput::Named("spring".into()).resolve(true, no_spring);
        assert_eq!(curve, EasingFunction::EaseInOut);
    }

    #[test]
    fn test_ease_in_out_symmetry() {
        let ease = EasingFunction::EaseInOut;
        assert!(approx_eq(ease.evaluate(0.0).unwrap(), 0.0));
        assert!(approx_eq(ease.evaluate(1.0).unwrap(), 1.0));
        assert!(approx_eq(ease.evaluate(0.5).unwrap(), 0.5));

        let early = ease.evaluate(0.25).unwrap();
        let late = ease.evaluate(0.75).unwrap();
        assert!(approx_eq(early + late, 1.0));
    }

    #[test]
    fn test_ease_in_and_out_shapes() {
        assert!(EasingFunction::EaseIn.evaluate(0.25).unwrap() < 0.25);
        assert!(EasingFunction::EaseOut.evaluate(0.25).unwrap() > 0.25);
    }

    #[test]
    fn test_clamping_and_springs() {
        let ease = EasingFunction::Linear;
        assert!(approx_eq(ease.evaluate(-0.5).unwrap(), 0.0));
        assert!(approx_eq(ease.evaluate(1.5).unwrap(), 1.0));
        assert_eq!(EasingFunction::spring(SpringParams::default()).evaluate(0.5), None);
    }

    #[test]
    fn test_css_text() {
        assert_eq!(EasingFunction::EaseOut.to_css().as_deref(), Some("ease-out"));
        assert_eq!(
            EasingFunction::CubicBezier {
                x1: 0.4,
                y1: 0.0,
                x2: 0.2,
                y2: 1.0
            }
            .to_css()
            .as_deref(),
            Some("cubic-bezier(0.4, 0, 0.2, 1)")
        );
        assert!(EasingFunction::spring(SpringParams::default()).to_css().is_none());
    }
}
