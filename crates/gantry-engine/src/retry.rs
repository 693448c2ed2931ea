//! Attempt accounting and the retry decision.
//!
//! Every attempt of a test gets the next [`AttemptNumber`] from the
//! [`AttemptLedger`]. When an attempt finishes, the ledger decides whether
//! the test is done: the first success is final, and a failure is final
//! once the attempt budget is spent.

use std::rc::Rc;

use gantry_core::{AttemptNumber, Simulation, TestKey};
use indexmap::IndexMap;

use crate::config::HarnessConfig;
use crate::instance::FinishedAttempt;
use crate::registry::TestDefinition;
use crate::report::FinalOutcome;
use crate::runner::{RunError, SuiteRunner};

/// What happens after an attempt finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptDecision {
    /// Run the test again.
    Retry {
        /// Number of the attempt to run next.
        next: AttemptNumber,
        /// Why the finished attempt failed.
        reason: String,
    },
    /// The test is decided.
    Final(FinalOutcome),
}

/// Attempts started per test.
#[derive(Clone, Debug, Default)]
pub struct AttemptLedger {
    started: IndexMap<TestKey, AttemptNumber>,
}

impl AttemptLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of another attempt of `key` and return its number.
    pub fn begin(&mut self, key: &TestKey) -> AttemptNumber {
        let number = match self.started.get(key) {
            Some(previous) => previous.next(),
            None => AttemptNumber::FIRST,
        };
        self.started.insert(key.clone(), number);
        number
    }

    /// Attempts started so far for `key`.
    pub fn attempts(&self, key: &TestKey) -> u32 {
        self.started.get(key).map_or(0, |n| n.0)
    }

    /// Decide what follows `finished`.
    pub fn decide(&self, finished: &FinishedAttempt) -> AttemptDecision {
        let budget = finished.definition.max_attempts();
        if finished.succeeded() || finished.attempt.0 >= budget {
            return AttemptDecision::Final(FinalOutcome::from_attempt(finished));
        }
        AttemptDecision::Retry {
            next: finished.attempt.next(),
            reason: finished.message().unwrap_or_default(),
        }
    }
}

/// Run one test, retrying up to its attempt budget, and return its final
/// outcome.
///
/// # Errors
///
/// Any [`RunError`] a full suite run could raise.
pub fn run_with_retries(
    definition: &Rc<TestDefinition>,
    world: &mut dyn Simulation,
    config: &HarnessConfig,
) -> Result<FinalOutcome, RunError> {
    let runner = SuiteRunner::new(config.clone())?;
    let report = runner.run_definitions(vec![Rc::clone(definition)], world)?;
    report
        .outcome(definition.key())
        .cloned()
        .ok_or_else(|| RunError::RunBudgetExhausted {
            ticks: report.ticks,
            unfinished: vec![definition.key().clone()],
        })
}
