//! Viewport-triggered animation.
//!
//! One observer per triggering node. The controller turns raw visibility
//! callbacks into [`ViewportAction`]s and decides when the observer can be
//! released; the engine performs the styles, timers and stagger work.
//!
//! Modes:
//! - [`ViewportMode::InView`]: animate once to the in-view variant on the
//!   first entry, then release the observer.
//! - [`ViewportMode::RunInView`] with [`RunInView::Once`]: reset to initial,
//!   replay the entrance once, then release the observer.
//! - [`ViewportMode::RunInView`] with [`RunInView::Always`]: replay on every
//!   entry and reset to initial on every exit.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::value::{NodeId, ObserverId};

/// Replay frequency for `runInView`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunInView {
    /// Replay on the first entry only.
    Once,
    /// Replay on every entry, reset on every exit.
    Always,
}

/// How a node reacts to visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportMode {
    /// `inView` / `whileInView`.
    InView,
    /// `runInView`.
    RunInView(RunInView),
}

/// What the engine should do after a visibility change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportAction {
    /// Animate to the in-view variant.
    AnimateInView,
    /// Reset to initial without transition, wait the settle delay, replay.
    ResetThenReplay,
    /// Reset to initial without transition.
    ResetToInitial,
    /// Nothing to do.
    Ignore,
}

/// Result of [`ViewportController::on_visibility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportResponse {
    /// Work to perform.
    pub action: ViewportAction,
    /// Observer the engine should disconnect now.
    pub release: Option<ObserverId>,
}

impl ViewportResponse {
    fn ignore() -> Self {
        Self {
            action: ViewportAction::Ignore,
            release: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ViewportEntry {
    mode: ViewportMode,
    observer: Option<ObserverId>,
    visible: bool,
}

/// Visibility state for all observed nodes.
#[derive(Debug, Default)]
pub struct ViewportController {
    entries: HashMap<NodeId, ViewportEntry>,
}

impl ViewportController {
    /// Create an empty controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a node and the observer created for it.
    pub fn register(&mut self, node: NodeId, mode: ViewportMode, observer: ObserverId) {
        self.entries.insert(
            node,
            ViewportEntry {
                mode,
                observer: Some(observer),
                visible: false,
            },
        );
    }

    /// Whether the node is tracked (observer live or entrance pending).
    pub fn is_registered(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    /// The node's live observer.
    pub fn observer(&self, node: NodeId) -> Option<ObserverId> {
        self.entries.get(&node).and_then(|entry| entry.observer)
    }

    /// The node's mode.
    pub fn mode(&self, node: NodeId) -> Option<ViewportMode> {
        self.entries.get(&node).map(|entry| entry.mode)
    }

    /// Whether the node's element was last reported visible.
    pub fn is_visible(&self, node: NodeId) -> bool {
        self.entries.get(&node).is_some_and(|entry| entry.visible)
    }

    /// Handle a visibility callback.
    ///
    /// Repeated reports of the same visibility are ignored.
    pub fn on_visibility(&mut self, node: NodeId, visible: bool) -> ViewportResponse {
        let Some(entry) = self.entries.get_mut(&node) else {
            tracing::debug!(node = %node, "visibility for untracked node ignored");
            return ViewportResponse::ignore();
        };
        if entry.observer.is_none() || entry.visible == visible {
            return ViewportResponse::ignore();
        }
        entry.visible = visible;

        match (entry.mode, visible) {
            (ViewportMode::InView, true) => ViewportResponse {
                action: ViewportAction::AnimateInView,
                release: entry.observer.take(),
            },
            (ViewportMode::RunInView(RunInView::Once), true) => ViewportResponse {
                action: ViewportAction::ResetThenReplay,
                release: entry.observer.take(),
            },
            (ViewportMode::RunInView(RunInView::Always), true) => ViewportResponse {
                action: ViewportAction::ResetThenReplay,
                release: None,
            },
            (ViewportMode::RunInView(RunInView::Always), false) => ViewportResponse {
                action: ViewportAction::ResetToInitial,
                release: None,
            },
            (ViewportMode::InView | ViewportMode::RunInView(RunInView::Once), false) => {
                ViewportResponse::ignore()
            }
        }
    }

    /// Stop tracking a node, returning its observer if still live.
    pub fn remove(&mut self, node: NodeId) -> Option<ObserverId> {
        self.entries.remove(&node).and_then(|entry| entry.observer)
    }

    /// Number of tracked nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no node is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_view_fires_once_and_releases() {
        let mut controller = ViewportController::new();
        let node = NodeId(1);
        controller.register(node, ViewportMode::InView, ObserverId(10));

        let response = controller.on_visibility(node, true);
        assert_eq!(response.action, ViewportAction::AnimateInView);
        assert_eq!(response.release, Some(ObserverId(10)));

        assert_eq!(controller.on_visibility(node, false).action, ViewportAction::Ignore);
        assert_eq!(controller.on_visibility(node, true).action, ViewportAction::Ignore);
        assert!(controller.is_registered(node));
        assert_eq!(controller.remove(node), None);
    }

    #[test]
    fn test_run_once_does_not_reset_on_exit() {
        let mut controller = ViewportController::new();
        let node = NodeId(2);
        controller.register(node, ViewportMode::RunInView(RunInView::Once), ObserverId(20));

        let entry = controller.on_visibility(node, true);
        assert_eq!(entry.action, ViewportAction::ResetThenReplay);
        assert_eq!(entry.release, Some(ObserverId(20)));
        assert_eq!(controller.on_visibility(node, false).action, ViewportAction::Ignore);
    }

    #[test]
    fn test_run_always_cycles() {
        let mut controller = ViewportController::new();
        let node = NodeId(3);
        controller.register(node, ViewportMode::RunInView(RunInView::Always), ObserverId(30));

        // An initial "not visible" report is not an exit.
        assert_eq!(controller.on_visibility(node, false).action, ViewportAction::Ignore);

        for _ in 0..2 {
            let entry = controller.on_visibility(node, true);
            assert_eq!(entry.action, ViewportAction::ResetThenReplay);
            assert_eq!(entry.release, None);
            assert!(controller.is_visible(node));
            assert_eq!(controller.on_visibility(node, true).action, ViewportAction::Ignore);
            assert_eq!(
                controller.on_visibility(node, false).action,
                ViewportAction::ResetToInitial
            );
        }
        assert_eq!(controller.remove(node), Some(ObserverId(30)));
        assert!(controller.is_empty());
    }

    #[test]
    fn test_untracked_node_ignored() {
        let mut controller = ViewportController::new();
        assert_eq!(
            controller.on_visibility(NodeId(4), true),
            ViewportResponse::ignore()
        );
    }

    #[test]
    fn test_run_in_view_parses_lowercase() {
        let mode: RunInView = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(mode, RunInView::Always);
    }
}
