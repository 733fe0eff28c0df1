//! Engine events for lifecycle callbacks.
//!
//! The engine pushes events while handling host calls and inside
//! [`MotionEngine::advance`](crate::engine::MotionEngine::advance); hosts
//! drain them afterwards to learn when transitions finished (for example to
//! let navigation proceed once an exit animation is done).
//!
//! # Usage
//!
//! ```ignore
//! engine.advance(16.0);
//! for event in engine.drain_events() {
//!     if let MotionEvent::Completed { node, phase: Phase::Exit } = event {
//!         host.finish_navigation(node);
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::gesture::GestureKind;
use crate::value::NodeId;

/// Which trigger produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Initial mount (initial → animate).
    Enter,
    /// Reactive `animate` change.
    Update,
    /// Gesture start or end.
    Gesture,
    /// Exit before unmount.
    Exit,
    /// Viewport-triggered entry or replay.
    Viewport,
}

/// Event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionEvent {
    /// A transition was handed to the primitive.
    Started {
        /// Node being animated.
        node: NodeId,
        /// Trigger.
        phase: Phase,
        /// Expected length in seconds, `None` when repeating forever.
        duration: Option<f64>,
    },
    /// A transition finished.
    Completed {
        /// Node that finished.
        node: NodeId,
        /// Trigger.
        phase: Phase,
    },
    /// A gesture was accepted.
    GestureStarted {
        /// Node under the gesture.
        node: NodeId,
        /// Gesture type.
        kind: GestureKind,
    },
    /// A gesture was dropped by the debounce window.
    GestureRejected {
        /// Node under the gesture.
        node: NodeId,
        /// Gesture type.
        kind: GestureKind,
    },
    /// The node's element entered the viewport.
    ViewportEntered {
        /// Observed node.
        node: NodeId,
    },
    /// The node's element left the viewport.
    ViewportExited {
        /// Observed node.
        node: NodeId,
    },
}

impl MotionEvent {
    /// Get the node for this event.
    pub fn node(&self) -> NodeId {
        match self {
            Self::Started { node, .. }
            | Self::Completed { node, .. }
            | Self::GestureStarted { node, .. }
            | Self::GestureRejected { node, .. }
            | Self::ViewportEntered { node }
            | Self::ViewportExited { node } => *node,
        }
    }

    /// Check if this is a "completed" event.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Queue for collecting engine events between host polls.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<MotionEvent>,
}

impl EventQueue {
    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event onto the queue.
    pub fn push(&mut self, event: MotionEvent) {
        self.events.push_back(event);
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Pop the next event from the queue.
    pub fn pop(&mut self) -> Option<MotionEvent> {
        self.events.pop_front()
    }

    /// Drain all events from the queue, returning an iterator.
    pub fn drain(&mut self) -> impl Iterator<Item = MotionEvent> + '_ {
        self.events.drain(..)
    }

    /// Get events for a specific node.
    pub fn events_for_node(&self, node: NodeId) -> Vec<&MotionEvent> {
        self.events.iter().filter(|e| e.node() == node).collect()
    }
}
