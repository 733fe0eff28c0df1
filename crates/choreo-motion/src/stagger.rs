//! Stagger delay computation for parent/child orchestration.

use crate::options::{Orchestration, When};

/// Start delays for a parent and its ordered children, in seconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaggerPlan {
    /// Delay per child, indexed by registration order.
    pub child_delays: Vec<f64>,
    /// Delay for the parent's own transition.
    pub parent_delay: f64,
}

impl StaggerPlan {
    /// Latest child start, `None` without children.
    pub fn last_child_delay(&self) -> Option<f64> {
        self.child_delays.iter().copied().reduce(f64::max)
    }
}

/// Compute delays for `count` children.
///
/// Child `i` is scheduled at index `i` (forward) or `count - 1 - i`
/// (negative `direction`) and starts at
/// `parent_delay + delay_children + index * stagger`. With
/// [`When::AfterChildren`] the parent waits until one step past the last
/// child slot.
pub fn plan(count: usize, orchestration: &Orchestration, parent_delay: f64) -> StaggerPlan {
    let Orchestration {
        stagger,
        direction,
        delay_children,
        when,
    } = *orchestration;
    let base = parent_delay + delay_children;

    let child_delays = (0..count)
        .map(|i| {
            let index = if direction >= 0.0 { i } else { count - 1 - i };
            base + index as f64 * stagger
        })
        .collect();

    let parent_delay = match when {
        When::AfterChildren => base + count as f64 * stagger,
        When::Together | When::BeforeChildren => parent_delay,
    };

    tracing::trace!(count, stagger, ?when, parent_delay, "stagger planned");

    StaggerPlan {
        child_delays,
        parent_delay,
    }
}
