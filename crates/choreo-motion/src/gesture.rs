//! Gesture tracking for hover, tap and focus.
//!
//! `GestureTracker` keeps, per node, the active gesture and when the last
//! gesture started. A gesture of the same kind as the last one that arrives
//! inside the debounce window is rejected; a different kind always goes
//! through. The engine stops the node's running handles before animating
//! the accepted gesture.
//!
//! # Usage
//!
//! ```
//! use choreo_motion::gesture::{GestureDecision, GestureKind, GestureTracker};
//! use choreo_motion::NodeId;
//!
//! let mut tracker = GestureTracker::new(100.0);
//! let node = NodeId(1);
//!
//! assert!(tracker.begin(node, GestureKind::Hover, 0.0).is_accepted());
//! assert_eq!(tracker.begin(node, GestureKind::Hover, 40.0), GestureDecision::Rejected);
//! assert!(tracker.begin(node, GestureKind::Tap, 50.0).is_accepted());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::value::NodeId;

/// Gesture types a node can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    /// Pointer over the element (`whileHover`).
    Hover,
    /// Pointer pressed on the element (`whileTap`).
    Tap,
    /// Element has keyboard focus (`whileFocus`).
    Focus,
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hover => "hover",
            Self::Tap => "tap",
            Self::Focus => "focus",
        })
    }
}

/// Outcome of [`GestureTracker::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureDecision {
    /// The gesture should animate; `previous` was active and is superseded.
    Accepted { previous: Option<GestureKind> },
    /// Same-kind repeat inside the debounce window.
    Rejected,
}

impl GestureDecision {
    /// Whether the gesture went through.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GestureEntry {
    active: Option<GestureKind>,
    last_start: Option<(GestureKind, f64)>,
}

/// Per-node gesture state.
#[derive(Debug, Default)]
pub struct GestureTracker {
    entries: HashMap<NodeId, GestureEntry>,
    debounce_ms: f64,
}

impl GestureTracker {
    /// Create a tracker with the given debounce window.
    pub fn new(debounce_ms: f64) -> Self {
        Self {
            entries: HashMap::new(),
            debounce_ms: debounce_ms.max(0.0),
        }
    }

    /// Register a gesture start at `now_ms`.
    pub fn begin(&mut self, node: NodeId, kind: GestureKind, now_ms: f64) -> GestureDecision {
        let entry = self.entries.entry(node).or_default();

        if let Some((last_kind, started_at)) = entry.last_start
            && last_kind == kind
            && now_ms - started_at < self.debounce_ms
        {
            tracing::debug!(node = %node, %kind, "gesture debounced");
            return GestureDecision::Rejected;
        }

        let previous = entry.active.replace(kind);
        entry.last_start = Some((kind, now_ms));
        GestureDecision::Accepted { previous }
    }

    /// Register a gesture end. Returns whether `kind` was the active gesture.
    pub fn end(&mut self, node: NodeId, kind: GestureKind) -> bool {
        match self.entries.get_mut(&node) {
            Some(entry) if entry.active == Some(kind) => {
                entry.active = None;
                true
            }
            _ => false,
        }
    }

    /// The node's active gesture.
    pub fn active(&self, node: NodeId) -> Option<GestureKind> {
        self.entries.get(&node).and_then(|entry| entry.active)
    }

    /// Drop all state for a node.
    pub fn forget(&mut self, node: NodeId) {
        self.entries.remove(&node);
    }

    /// Number of nodes with gesture state.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no node has gesture state.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_kind_debounced() {
        let mut tracker = GestureTracker::new(100.0);
        let node = NodeId(1);

        assert_eq!(
            tracker.begin(node, GestureKind::Hover, 0.0),
            GestureDecision::Accepted { previous: None }
        );
        assert_eq!(tracker.begin(node, GestureKind::Hover, 99.0), GestureDecision::Rejected);
        assert!(tracker.begin(node, GestureKind::Hover, 100.0).is_accepted());
    }

    #[test]
    fn test_rejection_keeps_original_start() {
        let mut tracker = GestureTracker::new(100.0);
        let node = NodeId(2);

        tracker.begin(node, GestureKind::Hover, 0.0);
        tracker.begin(node, GestureKind::Hover, 60.0);
        // The window is measured from the accepted start, not the rejected one.
        assert!(tracker.begin(node, GestureKind::Hover, 120.0).is_accepted());
    }

    #[test]
    fn test_different_kind_always_accepted() {
        let mut tracker = GestureTracker::new(100.0);
        let node = NodeId(3);

        tracker.begin(node, GestureKind::Hover, 0.0);
        assert_eq!(
            tracker.begin(node, GestureKind::Tap, 10.0),
            GestureDecision::Accepted {
                previous: Some(GestureKind::Hover)
            }
        );
        assert_eq!(tracker.active(node), Some(GestureKind::Tap));
    }

    #[test]
    fn test_end_only_clears_matching_gesture() {
        let mut tracker = GestureTracker::new(100.0);
        let node = NodeId(4);

        tracker.begin(node, GestureKind::Focus, 0.0);
        assert!(!tracker.end(node, GestureKind::Hover));
        assert!(tracker.end(node, GestureKind::Focus));
        assert_eq!(tracker.active(node), None);
        assert!(!tracker.end(NodeId(99), GestureKind::Focus));
    }

    #[test]
    fn test_forget() {
        let mut tracker = GestureTracker::new(0.0);
        tracker.begin(NodeId(5), GestureKind::Tap, 0.0);
        assert_eq!(tracker.len(), 1);
        tracker.forget(NodeId(5));
        assert!(tracker.is_empty());
    }
}
