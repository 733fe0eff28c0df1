//! Cancellable timers on the engine clock.
//!
//! The engine owns one [`Scheduler`] and stores the tokens it hands out per
//! node. Tasks carry a plain action value instead of a closure so teardown can
//! cancel them by token without touching captured state.

use std::collections::BTreeMap;

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct Task<A> {
    due: f64,
    action: A,
}

/// Timer queue keyed by token, fired in (due time, scheduling order).
#[derive(Debug)]
pub struct Scheduler<A> {
    tasks: BTreeMap<TimerToken, Task<A>>,
    next_token: u64,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_token: 1,
        }
    }
}

impl<A> Scheduler<A> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to fire `delay_ms` after `now_ms`.
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, action: A) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        let due = now_ms + delay_ms.max(0.0);
        tracing::trace!(token = token.0, due, "timer scheduled");
        self.tasks.insert(token, Task { due, action });
        token
    }

    /// Cancel a task. Returns whether it was still pending.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        self.tasks.remove(&token).is_some()
    }

    /// Whether a task is still pending.
    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.tasks.contains_key(&token)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Earliest due time.
    pub fn next_due(&self) -> Option<f64> {
        self.tasks.values().map(|task| task.due).reduce(f64::min)
    }

    /// Remove and return the earliest task due at or before `now_ms`.
    ///
    /// Ties on due time fire in scheduling order.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(TimerToken, A)> {
        let token = self
            .tasks
            .iter()
            .filter(|(_, task)| task.due <= now_ms)
            .min_by(|(a_token, a), (b_token, b)| {
                a.due.total_cmp(&b.due).then_with(|| a_token.cmp(b_token))
            })
            .map(|(token, _)| *token)?;
        self.tasks.remove(&token).map(|task| (token, task.action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.0, 30.0, "late");
        scheduler.schedule(0.0, 10.0, "early");
        scheduler.schedule(0.0, 10.0, "early-second");

        assert!(scheduler.pop_due(5.0).is_none());
        let fired: Vec<_> = std::iter::from_fn(|| scheduler.pop_due(40.0))
            .map(|(_, action)| action)
            .collect();
        assert_eq!(fired, vec!["early", "early-second", "late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let token = scheduler.schedule(0.0, 10.0, 1);
        assert!(scheduler.is_pending(token));
        assert!(scheduler.cancel(token));
        assert!(!scheduler.cancel(token));
        assert!(scheduler.pop_due(100.0).is_none());
    }

    #[test]
    fn test_negative_delay_clamped() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(50.0, -20.0, ());
        assert_eq!(scheduler.next_due(), Some(50.0));
        assert!(scheduler.pop_due(50.0).is_some());
    }
}
