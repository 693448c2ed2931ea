//! Shared-state fixtures for observing callbacks from test code.
//!
//! Scenario callbacks are `'static` closures owned by the harness, so
//! tests hand them a clone of one of these and inspect the original
//! afterwards.
//!
//! - [`Counter`]: counts calls.
//! - [`TickLog`]: records labelled ticks in call order.
//! - [`FailFirst`]: decides pass/fail per attempt for retry tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gantry_core::TickId;

/// Shared call counter.
#[derive(Clone, Debug, Default)]
pub struct Counter(Rc<Cell<u64>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new count.
    pub fn bump(&self) -> u64 {
        let n = self.0.get() + 1;
        self.0.set(n);
        n
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// Shared log of `(label, tick)` entries.
#[derive(Clone, Debug, Default)]
pub struct TickLog(Rc<RefCell<Vec<(String, TickId)>>>);

impl TickLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: impl Into<String>, tick: TickId) {
        self.0.borrow_mut().push((label.into(), tick));
    }

    /// All entries in recording order.
    pub fn entries(&self) -> Vec<(String, TickId)> {
        self.0.borrow().clone()
    }

    /// Ticks recorded under `label`.
    pub fn ticks_of(&self, label: &str) -> Vec<TickId> {
        self.0
            .borrow()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, t)| *t)
            .collect()
    }
}

/// Fails the first `failures` attempts, then passes.
///
/// Call [`next_attempt`](Self::next_attempt) once at the start of every
/// attempt's body.
#[derive(Clone, Debug)]
pub struct FailFirst {
    failures: u64,
    attempts: Counter,
}

impl FailFirst {
    pub fn new(failures: u64) -> Self {
        Self {
            failures,
            attempts: Counter::new(),
        }
    }

    /// Register a new attempt; returns whether it should pass.
    pub fn next_attempt(&self) -> bool {
        self.attempts.bump() > self.failures
    }

    /// Attempts registered so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let counter = Counter::new();
        let other = counter.clone();
        other.bump();
        other.bump();
        assert_eq!(counter.get(), 2);

        let log = TickLog::new();
        log.clone().record("poll", TickId(3));
        log.record("act", TickId(4));
        log.record("poll", TickId(5));
        assert_eq!(log.ticks_of("poll"), vec![TickId(3), TickId(5)]);
        assert_eq!(log.entries().len(), 3);
    }

    #[test]
    fn fail_first_passes_after_budget() {
        let script = FailFirst::new(2);
        assert!(!script.next_attempt());
        assert!(!script.next_attempt());
        assert!(script.next_attempt());
        assert_eq!(script.attempts(), 3);
    }
}
