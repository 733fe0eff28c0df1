//! Error types for the motion engine.

use thiserror::Error;

use crate::value::NodeId;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors that can occur while orchestrating animations.
///
/// Primitive failures are reported through this type by [`crate::MotionBackend`]
/// implementations, but the engine never forwards them to its own callers: they
/// are logged and replaced with a no-op handle.
#[derive(Error, Debug)]
pub enum MotionError {
    /// The node id does not refer to a live node.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The animation primitive refused to start an animation.
    #[error("animation primitive failed to start: {0}")]
    StartFailed(String),

    /// Stopping a native handle failed (usually because it already finished).
    #[error("failed to stop native handle: {0}")]
    StopFailed(String),

    /// The visibility observer could not be created.
    #[error("visibility observer failed: {0}")]
    ObserveFailed(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
