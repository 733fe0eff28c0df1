//! Interface to the native animation primitive.
//!
//! The engine decides *when* and *with what options* an element animates;
//! a [`MotionBackend`] does the pixel work. Every method may fail, but the
//! engine treats failures as diagnostics: a failed start becomes a
//! [`NoopHandle`], a failed stop is logged and dropped.

use serde::{Deserialize, Serialize};

use crate::easing::{EasingFunction, SpringParams};
use crate::error::Result;
use crate::options::AnimationOptions;
use crate::value::{ElementRef, ObserverId, StyleMap};

/// Handle to a running native animation.
pub trait NativeHandle: std::fmt::Debug {
    /// Stop the animation where it is.
    ///
    /// Stopping an animation that already finished may fail; callers log
    /// and ignore that.
    fn stop(&mut self) -> Result<()>;
}

/// Handle that controls nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandle;

impl NativeHandle for NoopHandle {
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// How styles are written by [`MotionBackend::apply_styles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Plain style write.
    Direct,
    /// Write with transitions suppressed, then force a reflow so the next
    /// animation starts from these values.
    NoTransition,
}

/// Visibility observer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserveOptions {
    /// Root margin, CSS syntax (`"0px"`, `"-100px 0px"`).
    pub margin: String,
    /// Visible fraction in [0, 1] that counts as "in view".
    pub amount: f64,
}

/// The native animation primitive.
pub trait MotionBackend {
    /// Start animating `target` towards `keyframes`.
    fn start_animation(
        &mut self,
        target: ElementRef,
        keyframes: &StyleMap,
        options: &AnimationOptions,
    ) -> Result<Box<dyn NativeHandle>>;

    /// Write styles synchronously.
    fn apply_styles(&mut self, target: ElementRef, styles: &StyleMap, mode: ApplyMode)
    -> Result<()>;

    /// Start observing visibility of `target`.
    fn observe_visibility(
        &mut self,
        target: ElementRef,
        options: &ObserveOptions,
    ) -> Result<ObserverId>;

    /// Stop an observer created by [`observe_visibility`](Self::observe_visibility).
    fn unobserve(&mut self, observer: ObserverId) -> Result<()>;

    /// The primitive's spring constructor.
    fn spring(&self, params: SpringParams) -> EasingFunction {
        EasingFunction::spring(params)
    }
}
