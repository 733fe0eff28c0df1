//! Element nodes: host configuration, tree role and lifecycle state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::backend::{NativeHandle, ObserveOptions};
use crate::easing::EasingInput;
use crate::error::Result;
use crate::events::Phase;
use crate::gesture::GestureKind;
use crate::options::{Repeat, Transition, TransitionConfig};
use crate::scheduler::TimerToken;
use crate::timeline::TimelineStep;
use crate::value::{ElementRef, NodeId};
use crate::variant::{Variant, VariantRef, VariantTable};
use crate::viewport::{RunInView, ViewportMode};
use choreo_config::ViewportConfig;

/// Host inputs for one element, as written in templates.
///
/// Validation is by shape only: anything unusable resolves to "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    pub initial: VariantRef,
    pub animate: VariantRef,
    pub exit: VariantRef,
    pub in_view: VariantRef,
    pub while_in_view: VariantRef,
    pub while_hover: VariantRef,
    pub while_tap: VariantRef,
    pub while_focus: VariantRef,
    pub variants: VariantTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easing: Option<EasingInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stagger_children: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stagger_direction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_children: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    /// Viewport root margin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    /// Visible fraction that counts as "in view".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_in_view: Option<RunInView>,
    /// Route key used by registry queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

impl NodeConfig {
    /// Parse a JSON node configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The directive-level inputs as a transition config.
    pub fn directive_transition(&self) -> TransitionConfig {
        TransitionConfig {
            duration: self.duration,
            delay: self.delay,
            ease: self.easing.clone(),
            repeat: self.repeat,
            stagger_children: self.stagger_children,
            stagger_direction: self.stagger_direction,
            delay_children: self.delay_children,
            ..TransitionConfig::default()
        }
    }

    /// The global `transition` input when uniform.
    pub fn node_transition(&self) -> Option<&TransitionConfig> {
        self.transition.as_ref().and_then(Transition::uniform)
    }

    /// The global `transition` input when keyed by property.
    pub fn node_per_property(&self) -> Option<&BTreeMap<String, TransitionConfig>> {
        self.transition.as_ref().and_then(Transition::per_property)
    }

    /// Viewport behaviour, if any.
    pub fn viewport_mode(&self) -> Option<ViewportMode> {
        match self.run_in_view {
            Some(mode) => Some(ViewportMode::RunInView(mode)),
            None if self.in_view.is_set() || self.while_in_view.is_set() => {
                Some(ViewportMode::InView)
            }
            None => None,
        }
    }

    /// Variant animated to on `inView` entry.
    pub fn in_view_target(&self) -> &VariantRef {
        if self.in_view.is_set() {
            &self.in_view
        } else {
            &self.while_in_view
        }
    }

    /// Variant for a gesture.
    pub fn gesture_target(&self, kind: GestureKind) -> &VariantRef {
        match kind {
            GestureKind::Hover => &self.while_hover,
            GestureKind::Tap => &self.while_tap,
            GestureKind::Focus => &self.while_focus,
        }
    }

    /// Variant a phase animates to by default.
    pub fn target_for(&self, phase: Phase) -> &VariantRef {
        match phase {
            Phase::Exit => &self.exit,
            Phase::Enter | Phase::Update | Phase::Gesture | Phase::Viewport => &self.animate,
        }
    }

    /// Observer settings with engine fallbacks.
    pub fn observe_options(&self, defaults: &ViewportConfig) -> ObserveOptions {
        ObserveOptions {
            margin: self
                .offset
                .clone()
                .unwrap_or_else(|| defaults.default_margin.clone()),
            amount: self.amount.unwrap_or(defaults.default_amount).clamp(0.0, 1.0),
        }
    }

    fn resolve(&self, reference: &VariantRef) -> Variant {
        reference.resolve(&self.variants).into_owned()
    }

    /// Whether any timing level asks to orchestrate children.
    pub fn coordinates_stagger(&self) -> bool {
        let embedded = |reference: &VariantRef| {
            self.resolve(reference)
                .uniform_transition()
                .is_some_and(TransitionConfig::orchestrates_children)
        };
        self.directive_transition().orchestrates_children()
            || self
                .node_transition()
                .is_some_and(TransitionConfig::orchestrates_children)
            || embedded(&self.animate)
            || embedded(self.in_view_target())
    }

    /// Whether this node drives its children from its own viewport events.
    pub fn coordinates_viewport(&self) -> bool {
        self.run_in_view == Some(RunInView::Always)
    }
}

/// A node's place in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Drives its own transitions.
    Standalone,
    /// Started by its parent with a stagger delay.
    StaggerChild,
    /// Reset and replayed by a `runInView: always` parent.
    ViewportChild,
}

impl NodeRole {
    /// Whether a parent drives this node.
    pub fn is_managed(&self) -> bool {
        !matches!(self, Self::Standalone)
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Mounted, not animating (viewport-gated or waiting for a parent).
    Idle,
    /// Transitioning towards its target.
    Entering,
    /// At rest on its target.
    Settled,
    /// Under a gesture.
    Gesture(GestureKind),
    /// Playing its exit.
    Exiting,
    /// Torn down.
    Destroyed,
}

/// Inputs to [`NodeState::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// First start; gated nodes stay idle.
    Mount { gated: bool },
    /// The current transition finished.
    Complete,
    GestureStart(GestureKind),
    /// `animating` when the node heads back to an `animate` target.
    GestureEnd { animating: bool },
    /// Gesture released on a node that had not entered yet.
    GestureEndIdle,
    ViewportEnter,
    ViewportExit,
    /// `animate` changed.
    Update,
    Exit,
    Destroy,
}

impl NodeState {
    /// Next state, or `None` when the event is not legal here.
    pub fn on(self, event: NodeEvent) -> Option<Self> {
        use NodeEvent as E;
        use NodeState as S;

        match (self, event) {
            (S::Destroyed, _) => None,
            (S::Exiting, E::Destroy) => Some(S::Destroyed),
            (_, E::Destroy) => None,
            (_, E::Exit) => Some(S::Exiting),
            (S::Exiting, E::Complete) => Some(S::Exiting),
            (S::Exiting, _) => None,

            (S::Idle, E::Mount { gated: true }) => Some(S::Idle),
            (S::Idle, E::Mount { gated: false }) => Some(S::Entering),
            (_, E::Mount { .. }) => None,

            (S::Entering, E::Complete) => Some(S::Settled),
            (S::Gesture(kind), E::Complete) => Some(S::Gesture(kind)),
            (S::Settled, E::Complete) => Some(S::Settled),
            (S::Idle, E::Complete) => None,

            (_, E::GestureStart(kind)) => Some(S::Gesture(kind)),
            (S::Gesture(_), E::GestureEnd { animating: true }) => Some(S::Entering),
            (S::Gesture(_), E::GestureEnd { animating: false }) => Some(S::Settled),
            (S::Gesture(_), E::GestureEndIdle) => Some(S::Idle),
            (_, E::GestureEnd { .. }) | (_, E::GestureEndIdle) => None,

            (_, E::ViewportEnter) | (_, E::Update) => Some(S::Entering),
            (_, E::ViewportExit) => Some(S::Idle),
        }
    }

    /// Whether the node can still start non-exit transitions.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Exiting | Self::Destroyed)
    }
}

/// Per-element engine state.
#[derive(Debug)]
pub struct ElementNode {
    pub id: NodeId,
    pub element: ElementRef,
    pub config: NodeConfig,
    pub role: NodeRole,
    /// Nearest ancestor node.
    pub parent: Option<NodeId>,
    /// Adopted child nodes in registration order.
    pub children: Vec<NodeId>,
    /// Non-participating child elements animated with this node's variants.
    pub plain_children: Vec<ElementRef>,
    /// Own running animations.
    pub handles: Vec<Box<dyn NativeHandle>>,
    /// Animations running on plain children.
    pub child_handles: Vec<Box<dyn NativeHandle>>,
    /// Delay set by a staggering parent, consumed by the next transition.
    pub stagger_override: Option<f64>,
    /// Outstanding timers.
    pub timers: Vec<TimerToken>,
    /// Bumped on every transition start; completions carry it.
    pub generation: u64,
    /// Viewport-gated (own observer or gated parent).
    pub gated: bool,
    /// Entrance waits for `content_children_ready`.
    pub deferred: bool,
    pub children_ready: bool,
    /// The current gesture began while the node was `Idle`.
    pub gesture_from_idle: bool,
    state: NodeState,
}

impl ElementNode {
    /// Create a node in the `Idle` state.
    pub fn new(id: NodeId, element: ElementRef, config: NodeConfig, role: NodeRole) -> Self {
        Self {
            id,
            element,
            config,
            role,
            parent: None,
            children: Vec::new(),
            plain_children: Vec::new(),
            handles: Vec::new(),
            child_handles: Vec::new(),
            stagger_override: None,
            timers: Vec::new(),
            generation: 0,
            gated: false,
            deferred: false,
            children_ready: false,
            gesture_from_idle: false,
            state: NodeState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Apply a lifecycle event. Illegal events are logged and ignored.
    pub fn apply(&mut self, event: NodeEvent) -> bool {
        match self.state.on(event) {
            Some(next) => {
                tracing::trace!(node = %self.id, from = ?self.state, to = ?next, "state change");
                self.state = next;
                true
            }
            None => {
                tracing::debug!(node = %self.id, state = ?self.state, ?event, "ignored lifecycle event");
                false
            }
        }
    }

    /// Resolve a reference against this node's own table.
    pub fn resolve(&self, reference: &VariantRef) -> Variant {
        self.config.resolve(reference)
    }

    /// Stop own handles. Failures are logged and dropped.
    pub fn stop_handles(&mut self) {
        stop_all(self.id, &mut self.handles);
    }

    /// Stop handles running on plain children.
    pub fn stop_child_handles(&mut self) {
        stop_all(self.id, &mut self.child_handles);
    }
}

fn stop_all(node: NodeId, handles: &mut Vec<Box<dyn NativeHandle>>) {
    for mut handle in handles.drain(..) {
        if let Err(error) = handle.stop() {
            tracing::debug!(?error, node = %node, "failed to stop native handle");
        }
    }
}
