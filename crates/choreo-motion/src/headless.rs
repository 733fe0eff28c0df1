//! In-memory animation primitive.
//!
//! [`HeadlessBackend`] records every command the engine issues instead of
//! animating anything. Hosts without a renderer (servers, snapshot tools)
//! can use it to inspect the plan, and tests use it to assert on timing.
//! Start and stop failures can be injected to exercise the engine's
//! fallback paths.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::backend::{ApplyMode, MotionBackend, NativeHandle, ObserveOptions};
use crate::error::{MotionError, Result};
use crate::options::AnimationOptions;
use crate::value::{ElementRef, ObserverId, StyleMap};

/// A recorded `start_animation` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StartRecord {
    /// Handle id assigned by the backend.
    pub handle: u64,
    /// Animated element.
    pub target: ElementRef,
    /// Composed keyframes.
    pub keyframes: StyleMap,
    /// Options as handed over.
    pub options: AnimationOptions,
}

/// A recorded `apply_styles` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRecord {
    /// Styled element.
    pub target: ElementRef,
    /// Composed styles.
    pub styles: StyleMap,
    /// Write mode.
    pub mode: ApplyMode,
}

#[derive(Debug, Default)]
struct Log {
    starts: Vec<StartRecord>,
    stopped: Vec<u64>,
    styles: Vec<StyleRecord>,
    observers: BTreeMap<u64, (ElementRef, ObserveOptions)>,
    observed_total: usize,
    next_id: u64,
    fail_starts: usize,
    fail_stops: bool,
}

impl Log {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Recording [`MotionBackend`].
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    log: Rc<RefCell<Log>>,
}

#[derive(Debug)]
struct HeadlessHandle {
    id: u64,
    log: Rc<RefCell<Log>>,
}

impl NativeHandle for HeadlessHandle {
    fn stop(&mut self) -> Result<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_stops {
            return Err(MotionError::StopFailed(format!("handle {} already finished", self.id)));
        }
        log.stopped.push(self.id);
        Ok(())
    }
}

impl HeadlessBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` starts fail.
    pub fn fail_next_starts(&self, count: usize) {
        self.log.borrow_mut().fail_starts = count;
    }

    /// Make every stop fail (or succeed again).
    pub fn fail_stops(&self, fail: bool) {
        self.log.borrow_mut().fail_stops = fail;
    }

    /// All recorded starts.
    pub fn starts(&self) -> Vec<StartRecord> {
        self.log.borrow().starts.clone()
    }

    /// Starts issued for one element.
    pub fn starts_for(&self, target: ElementRef) -> Vec<StartRecord> {
        self.log
            .borrow()
            .starts
            .iter()
            .filter(|record| record.target == target)
            .cloned()
            .collect()
    }

    /// Ids of handles that were stopped successfully.
    pub fn stopped(&self) -> Vec<u64> {
        self.log.borrow().stopped.clone()
    }

    /// All recorded style writes.
    pub fn style_writes(&self) -> Vec<StyleRecord> {
        self.log.borrow().styles.clone()
    }

    /// Style writes for one element.
    pub fn style_writes_for(&self, target: ElementRef) -> Vec<StyleRecord> {
        self.log
            .borrow()
            .styles
            .iter()
            .filter(|record| record.target == target)
            .cloned()
            .collect()
    }

    /// Number of live observers.
    pub fn active_observers(&self) -> usize {
        self.log.borrow().observers.len()
    }

    /// Live observer id for an element, if any.
    pub fn observer_for(&self, target: ElementRef) -> Option<ObserverId> {
        self.log
            .borrow()
            .observers
            .iter()
            .find(|(_, (element, _))| *element == target)
            .map(|(id, _)| ObserverId(*id))
    }

    /// Observers ever created.
    pub fn observed_total(&self) -> usize {
        self.log.borrow().observed_total
    }

    /// Forget recorded starts, stops and style writes.
    pub fn clear_records(&self) {
        let mut log = self.log.borrow_mut();
        log.starts.clear();
        log.stopped.clear();
        log.styles.clear();
    }
}

impl MotionBackend for HeadlessBackend {
    fn start_animation(
        &mut self,
        target: ElementRef,
        keyframes: &StyleMap,
        options: &AnimationOptions,
    ) -> Result<Box<dyn NativeHandle>> {
        let mut log = self.log.borrow_mut();
        if log.fail_starts > 0 {
            log.fail_starts -= 1;
            return Err(MotionError::StartFailed("injected failure".into()));
        }

        let handle = log.next_id();
        log.starts.push(StartRecord {
            handle,
            target,
            keyframes: keyframes.clone(),
            options: options.clone(),
        });
        Ok(Box::new(HeadlessHandle {
            id: handle,
            log: Rc::clone(&self.log),
        }))
    }

    fn apply_styles(&mut self, target: ElementRef, styles: &StyleMap, mode: ApplyMode) -> Result<()> {
        self.log.borrow_mut().styles.push(StyleRecord {
            target,
            styles: styles.clone(),
            mode,
        });
        Ok(())
    }

    fn observe_visibility(
        &mut self,
        target: ElementRef,
        options: &ObserveOptions,
    ) -> Result<ObserverId> {
        let mut log = self.log.borrow_mut();
        let id = log.next_id();
        log.observers.insert(id, (target, options.clone()));
        log.observed_total += 1;
        Ok(ObserverId(id))
    }

    fn unobserve(&mut self, observer: ObserverId) -> Result<()> {
        match self.log.borrow_mut().observers.remove(&observer.0) {
            Some(_) => Ok(()),
            None => Err(MotionError::ObserveFailed(format!(
                "observer {} not active",
                observer.0
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_starts_and_stops() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.clone();

        let mut handle = backend
            .start_animation(ElementRef(1), &StyleMap::new(), &AnimationOptions::default())
            .unwrap();
        assert_eq!(probe.starts().len(), 1);

        handle.stop().unwrap();
        assert_eq!(probe.stopped(), vec![probe.starts()[0].handle]);
    }

    #[test]
    fn test_injected_failures() {
        let mut backend = HeadlessBackend::new();
        backend.fail_next_starts(1);
        assert!(
            backend
                .start_animation(ElementRef(1), &StyleMap::new(), &AnimationOptions::default())
                .is_err()
        );

        let mut handle = backend
            .start_animation(ElementRef(1), &StyleMap::new(), &AnimationOptions::default())
            .unwrap();
        backend.fail_stops(true);
        assert!(matches!(handle.stop(), Err(MotionError::StopFailed(_))));
        assert!(backend.stopped().is_empty());
    }

    #[test]
    fn test_observers() {
        let mut backend = HeadlessBackend::new();
        let options = ObserveOptions {
            margin: "0px".into(),
            amount: 0.1,
        };
        let id = backend.observe_visibility(ElementRef(3), &options).unwrap();
        assert_eq!(backend.observer_for(ElementRef(3)), Some(id));
        assert_eq!(backend.active_observers(), 1);

        backend.unobserve(id).unwrap();
        assert_eq!(backend.active_observers(), 0);
        assert!(backend.unobserve(id).is_err());
        assert_eq!(backend.observed_total(), 1);
    }
}
