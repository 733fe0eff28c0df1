//! The motion engine: per-element orchestration on top of a [`MotionBackend`].
//!
//! `MotionEngine` is the central coordinator. It handles:
//! - mounting nodes, adopting them into the nearest ancestor node and the
//!   session registry
//! - entrance, update, gesture, viewport and exit transitions
//! - stagger cascades into managed children and plain child elements
//! - completion timers, viewport settle delays and teardown
//!
//! The engine is single-threaded. The host drives its clock with
//! [`advance`](MotionEngine::advance) and drains [`MotionEvent`]s afterwards.
//!
//! # Usage
//!
//! ```
//! use choreo_motion::{HeadlessBackend, MotionEngine, MotionEvent, NodeConfig, ElementRef};
//!
//! let backend = HeadlessBackend::new();
//! let mut engine = MotionEngine::with_defaults(backend.clone());
//!
//! let config = NodeConfig::from_json(r#"{
//!     "initial": { "opacity": 0 },
//!     "animate": { "opacity": 1 },
//!     "transition": { "duration": 0.5 }
//! }"#).unwrap();
//! let node = engine.mount(ElementRef(1), config, &[]);
//!
//! engine.advance(500.0);
//! assert!(engine.drain_events().any(|event| event == MotionEvent::Completed {
//!     node,
//!     phase: choreo_motion::Phase::Enter,
//! }));
//! assert_eq!(backend.starts().len(), 1);
//! ```

use std::collections::HashMap;

use choreo_config::ChoreoConfig;

use crate::backend::{ApplyMode, MotionBackend, NativeHandle, NoopHandle};
use crate::compositor::compose;
use crate::easing::SpringParams;
use crate::error::{MotionError, Result};
use crate::events::{EventQueue, MotionEvent, Phase};
use crate::gesture::{GestureDecision, GestureKind, GestureTracker};
use crate::node::{ElementNode, NodeConfig, NodeEvent, NodeRole, NodeState};
use crate::options::{AnimationOptions, OptionsBuilder};
use crate::registry::Registry;
use crate::scheduler::{Scheduler, TimerToken};
use crate::stagger::{self, StaggerPlan};
use crate::timeline::{self, TimelinePlan};
use crate::value::{ElementRef, NodeId, ObserverId, StyleMap};
use crate::variant::{Variant, VariantRef};
use crate::viewport::{ViewportAction, ViewportController, ViewportMode};

/// Work queued on the engine clock.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TimerAction {
    /// A transition's planned end.
    Complete {
        node: NodeId,
        generation: u64,
        phase: Phase,
    },
    /// Replay after a viewport reset has settled.
    ViewportReplay { node: NodeId },
}

struct PlannedTransition {
    base: AnimationOptions,
    plan: TimelinePlan,
    stagger: Option<StaggerPlan>,
}

/// Orchestrates element animations for one session.
#[derive(Debug)]
pub struct MotionEngine<B: MotionBackend> {
    backend: B,
    config: ChoreoConfig,
    clock_ms: f64,
    scheduler: Scheduler<TimerAction>,
    registry: Registry,
    nodes: HashMap<NodeId, ElementNode>,
    element_index: HashMap<ElementRef, NodeId>,
    gestures: GestureTracker,
    viewport: ViewportController,
    events: EventQueue,
}

impl<B: MotionBackend> MotionEngine<B> {
    /// Create an engine driving `backend`.
    pub fn new(backend: B, config: ChoreoConfig) -> Self {
        let gestures = GestureTracker::new(config.gestures.debounce_ms);
        Self {
            backend,
            config,
            clock_ms: 0.0,
            scheduler: Scheduler::new(),
            registry: Registry::new(),
            nodes: HashMap::new(),
            element_index: HashMap::new(),
            gestures,
            viewport: ViewportController::new(),
            events: EventQueue::new(),
        }
    }

    /// Create an engine with default configuration.
    pub fn with_defaults(backend: B) -> Self {
        Self::new(backend, ChoreoConfig::default())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &ChoreoConfig {
        &self.config
    }

    /// Engine clock in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Look up a live node.
    pub fn node(&self, id: NodeId) -> Option<&ElementNode> {
        self.nodes.get(&id)
    }

    /// Lifecycle state of a live node.
    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.nodes.get(&id).map(ElementNode::state)
    }

    /// Node mounted on `element`.
    pub fn node_for_element(&self, element: ElementRef) -> Option<NodeId> {
        self.element_index.get(&element).copied()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of pending timers.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    /// Drain all queued events.
    pub fn drain_events(&mut self) -> impl Iterator<Item = MotionEvent> + '_ {
        self.events.drain()
    }

    /// Mount a node on `element`.
    ///
    /// `ancestors` lists the element's ancestors nearest first; the first one
    /// hosting a node adopts the new node. Initial styles are written before
    /// this returns.
    pub fn mount(
        &mut self,
        element: ElementRef,
        config: NodeConfig,
        ancestors: &[ElementRef],
    ) -> NodeId {
        let id = NodeId::next();
        let parent = ancestors
            .iter()
            .find_map(|ancestor| self.element_index.get(ancestor).copied());

        let (role, parent_gated, parent_running) = match parent.and_then(|p| self.nodes.get(&p)) {
            Some(p) => {
                let role = if p.config.coordinates_viewport() {
                    NodeRole::ViewportChild
                } else if p.config.coordinates_stagger() {
                    NodeRole::StaggerChild
                } else {
                    NodeRole::Standalone
                };
                let running = p.children_ready
                    && matches!(
                        p.state(),
                        NodeState::Entering | NodeState::Settled | NodeState::Gesture(_)
                    );
                (role, p.gated, running)
            }
            None => (NodeRole::Standalone, false, false),
        };

        let viewport_mode = config.viewport_mode();
        let suppressed = role == NodeRole::ViewportChild && config.run_in_view.is_some();
        let gated = viewport_mode.is_some() || (role.is_managed() && parent_gated);
        let orchestrates = config.coordinates_stagger();
        let route = config.route.clone();

        let mut node = ElementNode::new(id, element, config, role);
        node.parent = parent;
        node.gated = gated;
        let initial = node.resolve(&node.config.initial);
        let mode = if gated {
            ApplyMode::NoTransition
        } else {
            ApplyMode::Direct
        };

        self.registry.add(id, element, route);
        self.nodes.insert(id, node);
        self.element_index.insert(element, id);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        self.apply_variant_styles(element, &initial, mode);
        tracing::debug!(node = %id, ?role, gated, "node mounted");

        match viewport_mode {
            Some(_) if suppressed => {
                tracing::debug!(node = %id, "viewport observer suppressed, parent drives replays");
            }
            Some(viewport_mode) => self.observe(id, viewport_mode),
            None => {}
        }

        if role.is_managed() && !parent_running {
            // The parent starts this node.
        } else if gated && viewport_mode.is_some() {
            // Waits for its observer.
        } else if orchestrates {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.deferred = true;
            }
        } else {
            self.start_entrance(id);
        }

        id
    }

    /// Report a node's content children.
    ///
    /// `plain_children` are child elements without their own node; they get
    /// the node's initial styles now and follow its transitions.
    pub fn content_children_ready(
        &mut self,
        id: NodeId,
        plain_children: &[ElementRef],
    ) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(MotionError::UnknownNode(id))?;
        node.plain_children = plain_children.to_vec();
        node.children_ready = true;

        let initial = node.resolve(&node.config.initial);
        let mode = if node.gated {
            ApplyMode::NoTransition
        } else {
            ApplyMode::Direct
        };
        let start_deferred = node.deferred && !node.role.is_managed();
        let running = matches!(node.state(), NodeState::Entering | NodeState::Settled);
        let target = node.config.animate.clone();

        for element in plain_children {
            self.apply_variant_styles(*element, &initial, mode);
        }

        if start_deferred {
            self.start_entrance(id);
        } else if running && !plain_children.is_empty() {
            self.catch_up_plain_children(id, &target);
        }
        Ok(())
    }

    /// Change a node's `animate` target and transition to it.
    ///
    /// Nodes that are exiting, under a gesture, or still waiting for a
    /// trigger only record the new target.
    pub fn set_animate(&mut self, id: NodeId, target: VariantRef) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(MotionError::UnknownNode(id))?;
        node.config.animate = target.clone();

        let waiting = node.state() == NodeState::Idle
            && (node.gated || node.role.is_managed() || node.deferred);
        if !node.state().is_active() || matches!(node.state(), NodeState::Gesture(_)) || waiting {
            tracing::debug!(node = %id, state = ?node.state(), "animate target recorded without transition");
            return Ok(());
        }

        node.apply(NodeEvent::Update);
        self.transition(id, &target, Phase::Update);
        Ok(())
    }

    /// Start a gesture. Returns whether it was accepted.
    pub fn gesture_start(&mut self, id: NodeId, kind: GestureKind) -> Result<bool> {
        let node = self.nodes.get(&id).ok_or(MotionError::UnknownNode(id))?;
        let target = node.config.gesture_target(kind).clone();
        if !target.is_set() {
            tracing::trace!(node = %id, %kind, "no gesture variant configured");
            return Ok(false);
        }
        if !node.state().is_active() {
            tracing::debug!(node = %id, %kind, "gesture ignored while exiting");
            return Ok(false);
        }

        match self.gestures.begin(id, kind, self.clock_ms) {
            GestureDecision::Rejected => {
                self.events.push(MotionEvent::GestureRejected { node: id, kind });
                Ok(false)
            }
            GestureDecision::Accepted { .. } => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.gesture_from_idle = match node.state() {
                        NodeState::Idle => true,
                        NodeState::Gesture(_) => node.gesture_from_idle,
                        _ => false,
                    };
                    node.apply(NodeEvent::GestureStart(kind));
                }
                self.events.push(MotionEvent::GestureStarted { node: id, kind });
                self.transition(id, &target, Phase::Gesture);
                Ok(true)
            }
        }
    }

    /// End a gesture and head back to the `animate` target.
    ///
    /// A node that was still `Idle` when the gesture began returns to its
    /// initial styles instead, leaving the entrance to its trigger.
    pub fn gesture_end(&mut self, id: NodeId, kind: GestureKind) -> Result<()> {
        if !self.nodes.contains_key(&id) {
            return Err(MotionError::UnknownNode(id));
        }
        if !self.gestures.end(id, kind) {
            return Ok(());
        }

        let node = self.nodes.get_mut(&id).ok_or(MotionError::UnknownNode(id))?;
        if std::mem::take(&mut node.gesture_from_idle)
            && matches!(node.state(), NodeState::Gesture(_))
        {
            for token in node.timers.drain(..) {
                self.scheduler.cancel(token);
            }
            node.generation += 1;
            node.stop_handles();
            node.apply(NodeEvent::GestureEndIdle);

            let element = node.element;
            let initial = node.resolve(&node.config.initial);
            tracing::debug!(node = %id, %kind, "gesture released before entry, back to initial");
            self.apply_variant_styles(element, &initial, ApplyMode::NoTransition);
            return Ok(());
        }

        let target = node.config.animate.clone();
        let animating = target.is_set();
        if node.apply(NodeEvent::GestureEnd { animating }) && animating {
            self.transition(id, &target, Phase::Gesture);
        }
        Ok(())
    }

    /// Feed a visibility callback for `element`.
    pub fn notify_intersection(&mut self, element: ElementRef, visible: bool) {
        let Some(id) = self.node_for_element(element) else {
            tracing::debug!(element = element.0, "visibility for unknown element ignored");
            return;
        };

        let response = self.viewport.on_visibility(id, visible);
        if let Some(observer) = response.release {
            self.release_observer(id, observer);
        }

        let exiting = self.state(id).is_some_and(|state| !state.is_active());
        if exiting && response.action != ViewportAction::Ignore {
            tracing::debug!(node = %id, action = ?response.action, "visibility change ignored while exiting");
            return;
        }

        match response.action {
            ViewportAction::Ignore => {}
            ViewportAction::AnimateInView => {
                self.events.push(MotionEvent::ViewportEntered { node: id });
                let Some(node) = self.nodes.get_mut(&id) else {
                    return;
                };
                if node.apply(NodeEvent::ViewportEnter) {
                    let target = node.config.in_view_target().clone();
                    self.transition(id, &target, Phase::Viewport);
                }
            }
            ViewportAction::ResetThenReplay => {
                self.events.push(MotionEvent::ViewportEntered { node: id });
                self.reset_to_initial(id);
                let token = self.scheduler.schedule(
                    self.clock_ms,
                    self.config.viewport.settle_delay_ms,
                    TimerAction::ViewportReplay { node: id },
                );
                self.track_timer(id, token);
            }
            ViewportAction::ResetToInitial => {
                self.events.push(MotionEvent::ViewportExited { node: id });
                self.reset_to_initial(id);
            }
        }
    }

    /// Play the exit variant.
    ///
    /// Returns the exit duration in seconds so navigation can wait for it,
    /// `None` when the exit repeats forever.
    pub fn exit(&mut self, id: NodeId) -> Result<Option<f64>> {
        let node = self.nodes.get_mut(&id).ok_or(MotionError::UnknownNode(id))?;
        node.apply(NodeEvent::Exit);
        let target = node.config.exit.clone();

        if !target.is_set() {
            self.events.push(MotionEvent::Completed {
                node: id,
                phase: Phase::Exit,
            });
            return Ok(Some(0.0));
        }
        Ok(self.transition(id, &target, Phase::Exit))
    }

    /// Tear a node down.
    ///
    /// Cancels its timers, disconnects its observer, stops every handle it
    /// owns and removes it from the registry and its parent.
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        let mut node = self.nodes.remove(&id).ok_or(MotionError::UnknownNode(id))?;
        if node.state() != NodeState::Exiting {
            node.apply(NodeEvent::Exit);
        }
        node.apply(NodeEvent::Destroy);

        for token in node.timers.drain(..) {
            self.scheduler.cancel(token);
        }
        if let Some(observer) = self.viewport.remove(id) {
            self.release_observer(id, observer);
        }
        node.stop_handles();
        node.stop_child_handles();
        self.gestures.forget(id);
        self.registry.remove(id);
        if self.element_index.get(&node.element) == Some(&id) {
            self.element_index.remove(&node.element);
        }

        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        for child in &node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = None;
                child.role = NodeRole::Standalone;
            }
        }

        tracing::debug!(node = %id, "node destroyed");
        Ok(())
    }

    /// Destroy the node mounted on `element`, if any.
    pub fn unmount(&mut self, element: ElementRef) -> Option<NodeId> {
        let id = self.node_for_element(element)?;
        self.destroy(id).ok()?;
        Some(id)
    }

    /// Advance the engine clock and fire due timers.
    pub fn advance(&mut self, delta_ms: f64) {
        self.clock_ms += delta_ms.max(0.0);

        while let Some((token, action)) = self.scheduler.pop_due(self.clock_ms) {
            match action {
                TimerAction::Complete {
                    node,
                    generation,
                    phase,
                } => self.complete(token, node, generation, phase),
                TimerAction::ViewportReplay { node } => self.replay(token, node),
            }
        }
    }

    /// Nodes registered under `route`, or all nodes.
    pub fn nodes_for_route(&self, route: Option<&str>) -> Vec<NodeId> {
        self.registry.nodes_for_route(route)
    }

    /// Longest enter (`Phase::Enter`) or exit (`Phase::Exit`) duration in
    /// seconds across the route's nodes, stagger included.
    ///
    /// Transitions that repeat forever do not count.
    pub fn longest_duration(&self, route: Option<&str>, phase: Phase) -> f64 {
        self.registry
            .nodes_for_route(route)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .filter(|node| !node.role.is_managed())
            .map(|node| self.estimate(node, node.config.target_for(phase), phase, None))
            .fold(0.0, f64::max)
    }

    /// Run the enter or exit animations of the route's top-level nodes.
    ///
    /// Returns the nodes that started a transition.
    pub fn run_route_animations(&mut self, route: Option<&str>, phase: Phase) -> Vec<NodeId> {
        let mut affected = Vec::new();

        for id in self.registry.nodes_for_route(route) {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if node.role.is_managed() {
                continue;
            }

            match phase {
                Phase::Exit => {
                    if node.config.exit.is_set() && self.exit(id).is_ok() {
                        affected.push(id);
                    }
                }
                _ => {
                    let target = node.config.animate.clone();
                    let waiting = node.gated && node.state() == NodeState::Idle;
                    if !target.is_set() || !node.state().is_active() || waiting {
                        continue;
                    }
                    let event = phase_event(node.state(), Phase::Enter);
                    if let Some(node) = self.nodes.get_mut(&id)
                        && node.apply(event)
                    {
                        self.transition(id, &target, Phase::Enter);
                        affected.push(id);
                    }
                }
            }
        }

        affected
    }

    fn start_entrance(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.deferred = false;
        let event = phase_event(node.state(), Phase::Enter);
        if !node.apply(event) {
            return;
        }
        let target = node.config.animate.clone();
        self.transition(id, &target, Phase::Enter);
    }

    /// Start a transition to `target`, cascading into managed children and
    /// plain children unless it is a gesture. Returns the planned end in
    /// seconds.
    fn transition(&mut self, id: NodeId, target: &VariantRef, phase: Phase) -> Option<f64> {
        let stagger_override = self.nodes.get_mut(&id)?.stagger_override.take();
        let cascade = phase != Phase::Gesture;
        let managed = if cascade {
            self.managed_children(id)
        } else {
            Vec::new()
        };

        let node = self.nodes.get(&id)?;
        let element = node.element;
        let plain = if cascade {
            node.plain_children.clone()
        } else {
            Vec::new()
        };
        let variant = node.resolve(target);
        let planned = self.plan_for(
            node,
            &variant,
            stagger_override,
            managed.len() + plain.len(),
            uses_timeline(phase),
        );

        if let Some(node) = self.nodes.get_mut(&id) {
            node.stop_handles();
            if cascade {
                node.stop_child_handles();
            }
        }

        let handles: Vec<Box<dyn NativeHandle>> = planned
            .plan
            .tracks
            .iter()
            .map(|track| self.start_track(element, &track.properties, &track.options))
            .collect();

        let child_delays = planned
            .stagger
            .as_ref()
            .map(|stagger| stagger.child_delays.clone())
            .unwrap_or_default();
        let (managed_delays, plain_delays) = child_delays.split_at(managed.len().min(child_delays.len()));
        let child_handles = self.start_plain_children(&variant, &planned.base, &plain, plain_delays);

        let end = planned.plan.end_time();
        let node = self.nodes.get_mut(&id)?;
        node.handles = handles;
        node.child_handles.extend(child_handles);
        node.generation += 1;
        let generation = node.generation;
        if let Some(end) = end {
            let token = self.scheduler.schedule(
                self.clock_ms,
                end * 1000.0,
                TimerAction::Complete {
                    node: id,
                    generation,
                    phase,
                },
            );
            node.timers.push(token);
        }

        tracing::debug!(
            node = %id,
            ?phase,
            tracks = planned.plan.tracks.len(),
            children = managed.len() + plain.len(),
            ?end,
            "transition started"
        );
        self.events.push(MotionEvent::Started {
            node: id,
            phase,
            duration: end,
        });

        for (child, delay) in managed.iter().zip(managed_delays) {
            self.cascade(*child, target, phase, *delay);
        }

        end
    }

    fn cascade(&mut self, child: NodeId, parent_target: &VariantRef, phase: Phase, delay: f64) {
        let Some(node) = self.nodes.get_mut(&child) else {
            return;
        };
        let target = child_target(node, parent_target, phase);
        if !target.is_set() {
            tracing::trace!(node = %child, ?phase, "child has no target for cascade");
            return;
        }
        let event = phase_event(node.state(), phase);
        if !node.apply(event) {
            return;
        }
        node.stagger_override = Some(delay);
        self.transition(child, &target, phase);
    }

    /// Bring plain children along when they arrive after the node started.
    fn catch_up_plain_children(&mut self, id: NodeId, target: &VariantRef) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let plain = node.plain_children.clone();
        let variant = node.resolve(target);
        let planned = self.plan_for(node, &variant, None, plain.len(), false);
        let delays = planned
            .stagger
            .map(|stagger| stagger.child_delays)
            .unwrap_or_default();

        let handles = self.start_plain_children(&variant, &planned.base, &plain, &delays);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.child_handles.extend(handles);
        }
    }

    fn start_plain_children(
        &mut self,
        variant: &Variant,
        base: &AnimationOptions,
        elements: &[ElementRef],
        delays: &[f64],
    ) -> Vec<Box<dyn NativeHandle>> {
        let style = variant.style_properties();
        elements
            .iter()
            .zip(delays)
            .map(|(element, delay)| {
                let options = AnimationOptions {
                    delay: *delay,
                    ..base.clone()
                };
                self.start_track(*element, &style, &options)
            })
            .collect()
    }

    fn start_track(
        &mut self,
        element: ElementRef,
        properties: &StyleMap,
        options: &AnimationOptions,
    ) -> Box<dyn NativeHandle> {
        let keyframes = compose(properties);
        if keyframes.is_empty() {
            return Box::new(NoopHandle);
        }

        match self.backend.start_animation(element, &keyframes, options) {
            Ok(handle) => handle,
            Err(error) => {
                tracing::warn!(?error, element = element.0, "animation primitive failed, continuing without handle");
                Box::new(NoopHandle)
            }
        }
    }

    fn plan_for(
        &self,
        node: &ElementNode,
        variant: &Variant,
        stagger_override: Option<f64>,
        child_count: usize,
        use_timeline: bool,
    ) -> PlannedTransition {
        let directive = node.config.directive_transition();
        let builder = OptionsBuilder::new(&self.config.timing)
            .target(variant.uniform_transition())
            .node(node.config.node_transition())
            .directive(Some(&directive))
            .stagger_override(stagger_override);
        let spring = |params: SpringParams| self.backend.spring(params);

        let mut base = builder.build(variant.has_keyframes(), &spring);
        let stagger = (child_count > 0)
            .then(|| stagger::plan(child_count, &builder.orchestration(), base.delay));
        if let Some(stagger) = &stagger {
            base.delay = stagger.parent_delay;
        }
        base.delay += variant.at.unwrap_or(0.0).max(0.0);

        let style = variant.style_properties();
        let epsilon = self.config.timing.times_epsilon;
        let steps = node
            .config
            .timeline
            .as_deref()
            .filter(|steps| use_timeline && !steps.is_empty());
        let per_property = variant
            .per_property_transition()
            .or_else(|| node.config.node_per_property());

        let plan = if let Some(steps) = steps {
            timeline::plan_steps(steps, &style, &base, epsilon, &spring)
        } else if let Some(per_property) = per_property {
            timeline::plan_per_property(&style, per_property, &base, epsilon, &spring)
        } else if style.is_empty() {
            TimelinePlan::default()
        } else {
            TimelinePlan::single(style, base.clone())
        };

        PlannedTransition {
            base,
            plan,
            stagger,
        }
    }

    /// Planned end of a transition including staggered descendants.
    fn estimate(
        &self,
        node: &ElementNode,
        target: &VariantRef,
        phase: Phase,
        stagger_override: Option<f64>,
    ) -> f64 {
        if !target.is_set() {
            return 0.0;
        }
        let cascade = phase != Phase::Gesture;
        let children = if cascade {
            self.managed_children(node.id)
        } else {
            Vec::new()
        };
        let plain = if cascade { node.plain_children.len() } else { 0 };

        let variant = node.resolve(target);
        let planned = self.plan_for(
            node,
            &variant,
            stagger_override,
            children.len() + plain,
            uses_timeline(phase),
        );
        let mut longest = planned.plan.end_time().unwrap_or(0.0);

        let delays = planned
            .stagger
            .map(|stagger| stagger.child_delays)
            .unwrap_or_default();
        for (index, delay) in delays.iter().enumerate() {
            match children.get(index).and_then(|child| self.nodes.get(child)) {
                Some(child) => {
                    let next = child_target(child, target, phase);
                    longest = longest.max(self.estimate(child, &next, phase, Some(*delay)));
                }
                None => {
                    let active = planned.base.active_duration().unwrap_or(0.0);
                    longest = longest.max(delay + active);
                }
            }
        }

        longest
    }

    fn reset_to_initial(&mut self, id: NodeId) {
        let children = self.managed_children(id);
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if !node.state().is_active() {
            tracing::debug!(node = %id, "reset skipped for exiting node");
            return;
        }

        for token in node.timers.drain(..) {
            self.scheduler.cancel(token);
        }
        node.generation += 1;
        node.stagger_override = None;
        node.stop_handles();
        node.stop_child_handles();
        node.apply(NodeEvent::ViewportExit);

        let element = node.element;
        let plain = node.plain_children.clone();
        let initial = node.resolve(&node.config.initial);
        for target in std::iter::once(element).chain(plain) {
            self.apply_variant_styles(target, &initial, ApplyMode::NoTransition);
        }

        for child in children {
            self.reset_to_initial(child);
        }
    }

    fn complete(&mut self, token: TimerToken, id: NodeId, generation: u64, phase: Phase) {
        let Some(node) = self.nodes.get_mut(&id) else {
            tracing::debug!(node = %id, "completion for destroyed node dropped");
            return;
        };
        node.timers.retain(|t| *t != token);
        if node.generation != generation {
            tracing::debug!(node = %id, ?phase, "stale completion dropped");
            return;
        }

        node.apply(NodeEvent::Complete);
        self.events.push(MotionEvent::Completed { node: id, phase });
    }

    fn replay(&mut self, token: TimerToken, id: NodeId) {
        let observed = self.viewport.is_registered(id);
        let Some(node) = self.nodes.get_mut(&id) else {
            tracing::debug!(node = %id, "viewport replay for destroyed node dropped");
            return;
        };
        node.timers.retain(|t| *t != token);
        if !observed {
            tracing::debug!(node = %id, "viewport replay without observer dropped");
            return;
        }

        if node.apply(NodeEvent::ViewportEnter) {
            let target = node.config.animate.clone();
            self.transition(id, &target, Phase::Viewport);
        }
    }

    fn observe(&mut self, id: NodeId, mode: ViewportMode) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let element = node.element;
        let options = node.config.observe_options(&self.config.viewport);

        match self.backend.observe_visibility(element, &options) {
            Ok(observer) => self.viewport.register(id, mode, observer),
            Err(error) => {
                tracing::warn!(?error, node = %id, "visibility observer unavailable, node keeps initial styles");
            }
        }
    }

    fn release_observer(&mut self, id: NodeId, observer: ObserverId) {
        if let Err(error) = self.backend.unobserve(observer) {
            tracing::debug!(?error, node = %id, "failed to disconnect observer");
        }
    }

    fn apply_variant_styles(&mut self, element: ElementRef, variant: &Variant, mode: ApplyMode) {
        let styles = compose(&variant.style_properties());
        if styles.is_empty() {
            return;
        }
        if let Err(error) = self.backend.apply_styles(element, &styles, mode) {
            tracing::warn!(?error, element = element.0, "failed to apply styles");
        }
    }

    fn track_timer(&mut self, id: NodeId, token: TimerToken) {
        match self.nodes.get_mut(&id) {
            Some(node) => node.timers.push(token),
            None => {
                self.scheduler.cancel(token);
            }
        }
    }

    fn managed_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        node.children
            .iter()
            .copied()
            .filter(|child| {
                self.nodes
                    .get(child)
                    .is_some_and(|c| c.role.is_managed() && c.parent == Some(id))
            })
            .collect()
    }
}

fn uses_timeline(phase: Phase) -> bool {
    matches!(phase, Phase::Enter | Phase::Update | Phase::Viewport)
}

/// Lifecycle event that starts a transition of `phase` from `state`.
fn phase_event(state: NodeState, phase: Phase) -> NodeEvent {
    match phase {
        Phase::Enter if state == NodeState::Idle => NodeEvent::Mount { gated: false },
        Phase::Enter | Phase::Update | Phase::Gesture => NodeEvent::Update,
        Phase::Viewport => NodeEvent::ViewportEnter,
        Phase::Exit => NodeEvent::Exit,
    }
}

/// A child follows its parent's variant name when it defines one, otherwise
/// its own target for the phase.
fn child_target(child: &ElementNode, parent_target: &VariantRef, phase: Phase) -> VariantRef {
    match parent_target.name() {
        Some(name) if child.config.variants.get(name).is_some() => VariantRef::named(name),
        _ => child.config.target_for(phase).clone(),
    }
}
