//! Assertion polling.
//!
//! A polling assertion is a [`Callback`] re-evaluated once per tick until it
//! returns `Ok`. An `Err` is never fatal here: it only means "not yet", and
//! the most recent failure is kept so a later timeout can say what the
//! instance was still waiting for.

use gantry_core::{AssertionFailure, TickId};

use crate::context::TestContext;

/// A scenario callback: a one-shot action or a polled predicate.
///
/// Whether an `Err` fails the test or means "retry next tick" depends on
/// the step the callback is attached to.
pub type Callback = Box<dyn FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure>>;

/// Result of one evaluation of a polled predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The predicate held.
    Satisfied,
    /// The predicate failed; poll again next tick.
    Pending,
}

/// Per-predicate polling bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollState {
    polls: u64,
    first_polled: Option<TickId>,
    last_failure: Option<AssertionFailure>,
}

impl PollState {
    /// Fresh state for a predicate that has not been polled yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of evaluations so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Tick of the first evaluation.
    pub fn first_polled(&self) -> Option<TickId> {
        self.first_polled
    }

    /// Failure reported by the most recent unsuccessful evaluation.
    pub fn last_failure(&self) -> Option<&AssertionFailure> {
        self.last_failure.as_ref()
    }

    /// Evaluate `predicate` once against `ctx`.
    pub fn poll(&mut self, predicate: &mut Callback, ctx: &mut TestContext<'_>) -> PollOutcome {
        let tick = ctx.tick();
        self.polls += 1;
        self.first_polled.get_or_insert(tick);
        match predicate(ctx) {
            Ok(()) => {
                self.last_failure = None;
                PollOutcome::Satisfied
            }
            Err(failure) => {
                self.last_failure = Some(failure.observed_at(tick));
                PollOutcome::Pending
            }
        }
    }
}
