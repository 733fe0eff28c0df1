//! Variant-driven animation orchestration for element trees.
//!
//! This crate provides:
//! - **Variants**: named or inline style targets with embedded transitions
//! - **Timing resolution**: layered transition options, timelines and
//!   per-property overrides
//! - **Stagger**: parent-driven delays for child nodes and plain children
//! - **Triggers**: viewport entry, gestures and route-level enter/exit runs
//! - **Composition**: transform shorthands folded into one 2D matrix
//!
//! # Architecture
//!
//! ```text
//! MotionEngine<B: MotionBackend>
//!   ├── Registry (live nodes, route queries)
//!   ├── ElementNode tree (config, role, lifecycle state, handles)
//!   ├── Scheduler (completion timers, viewport replays)
//!   ├── GestureTracker / ViewportController
//!   └── EventQueue (Started / Completed / gesture / viewport events)
//!
//! MotionBackend
//!   └── start_animation / apply_styles / observe_visibility
//! ```

pub mod backend;
pub mod compositor;
pub mod easing;
pub mod engine;
pub mod error;
pub mod events;
pub mod gesture;
pub mod headless;
pub mod node;
pub mod options;
pub mod registry;
pub mod scheduler;
pub mod stagger;
pub mod timeline;
pub mod transform;
pub mod value;
pub mod variant;
pub mod viewport;

pub use backend::{ApplyMode, MotionBackend, NativeHandle, NoopHandle, ObserveOptions};
pub use compositor::compose;
pub use easing::{EasingFunction, EasingInput, SpringParams};
pub use engine::MotionEngine;
pub use error::{MotionError, Result};
pub use events::{EventQueue, MotionEvent, Phase};
pub use gesture::GestureKind;
pub use headless::HeadlessBackend;
pub use node::{NodeConfig, NodeRole, NodeState};
pub use options::{AnimationOptions, Repeat, Transition, TransitionConfig, When};
pub use timeline::TimelineStep;
pub use transform::Transform2D;
pub use value::{ElementRef, NodeId, ObserverId, PropertyValue, StyleMap};
pub use variant::{Variant, VariantRef, VariantTable};
pub use viewport::RunInView;
