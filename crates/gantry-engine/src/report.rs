//! Final outcomes, per-suite tallies and the text report.

use std::fmt::{self, Write as _};

use gantry_core::{AttemptNumber, BatchId, InstanceId, TestKey};
use indexmap::IndexMap;

use crate::instance::{FinishedAttempt, TestStatus};
use crate::registry::SUITE_DEFAULT;

// ── FinalOutcome ──────────────────────────────────────────────────

/// Final classification of a test after all its attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    /// Some attempt succeeded.
    Passed,
    /// The last attempt failed.
    Failed,
    /// The last attempt timed out.
    TimedOut,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed => f.write_str("failed"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// One test's result, as recorded by the reporter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalOutcome {
    /// Suite and test name.
    pub key: TestKey,
    /// Tags the test was registered with.
    pub tags: Vec<String>,
    /// Whether a failure fails the suite.
    pub required: bool,
    /// Batch the test ran in.
    pub batch: BatchId,
    /// Final classification.
    pub status: OutcomeStatus,
    /// Attempts used, including the deciding one.
    pub attempts: u32,
    /// Failure reason of the deciding attempt.
    pub message: Option<String>,
    /// Instance ticks used by the deciding attempt.
    pub ticks: u64,
}

impl FinalOutcome {
    /// Outcome decided by `finished`.
    pub fn from_attempt(finished: &FinishedAttempt) -> Self {
        let definition = &finished.definition;
        let status = match finished.status {
            TestStatus::Succeeded => OutcomeStatus::Passed,
            TestStatus::TimedOut => OutcomeStatus::TimedOut,
            _ => OutcomeStatus::Failed,
        };
        Self {
            key: definition.key().clone(),
            tags: definition.tags().iter().cloned().collect(),
            required: definition.required(),
            batch: definition
                .batch()
                .cloned()
                .unwrap_or_else(BatchId::default_batch),
            status,
            attempts: finished.attempt.0,
            message: finished.message(),
            ticks: finished.ticks,
        }
    }

    /// Whether the test passed.
    pub fn passed(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }

    fn matches_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag) || (tag == SUITE_DEFAULT && self.tags.is_empty())
    }
}

// ── SuiteSummary ──────────────────────────────────────────────────

/// Tallies for one suite, or for a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    /// Tests that passed.
    pub passed: usize,
    /// Tests whose last attempt failed.
    pub failed: usize,
    /// Tests whose last attempt timed out.
    pub timed_out: usize,
    /// Failed or timed-out tests marked required.
    pub required_failures: usize,
    /// Failed or timed-out tests marked optional.
    pub optional_failures: usize,
}

impl SuiteSummary {
    fn add(&mut self, outcome: &FinalOutcome) {
        match outcome.status {
            OutcomeStatus::Passed => {
                self.passed += 1;
                return;
            }
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::TimedOut => self.timed_out += 1,
        }
        if outcome.required {
            self.required_failures += 1;
        } else {
            self.optional_failures += 1;
        }
    }

    /// Tests counted.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.timed_out
    }

    /// Whether no required test failed.
    pub fn is_success(&self) -> bool {
        self.required_failures == 0
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} timed out",
            self.passed, self.failed, self.timed_out
        )?;
        if self.total() > self.passed {
            write!(
                f,
                " ({} required, {} optional)",
                self.required_failures, self.optional_failures
            )?;
        }
        Ok(())
    }
}

// ── OutcomeReporter ───────────────────────────────────────────────

/// Collects final outcomes and summarizes them by suite.
#[derive(Clone, Debug, Default)]
pub struct OutcomeReporter {
    outcomes: Vec<FinalOutcome>,
    tag_filter: Option<String>,
}

impl OutcomeReporter {
    /// A reporter that counts every outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only count outcomes of tests tagged `tag`. Filtering by
    /// [`SUITE_DEFAULT`] also counts untagged tests.
    pub fn with_tag_filter(mut self, tag: impl Into<String>) -> Self {
        self.tag_filter = Some(tag.into());
        self
    }

    /// Add one outcome.
    pub fn record(&mut self, outcome: FinalOutcome) {
        self.outcomes.push(outcome);
    }

    /// Counted outcomes in recording order.
    pub fn outcomes(&self) -> impl Iterator<Item = &FinalOutcome> {
        self.outcomes
            .iter()
            .filter(|o| self.tag_filter.as_deref().is_none_or(|tag| o.matches_tag(tag)))
    }

    /// Counted outcomes that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &FinalOutcome> {
        self.outcomes().filter(|o| !o.passed())
    }

    /// Tallies per suite, in order of first appearance.
    pub fn summaries(&self) -> IndexMap<String, SuiteSummary> {
        let mut summaries: IndexMap<String, SuiteSummary> = IndexMap::new();
        for outcome in self.outcomes() {
            summaries
                .entry(outcome.key.suite.clone())
                .or_default()
                .add(outcome);
        }
        summaries
    }

    /// Tallies over every counted outcome.
    pub fn totals(&self) -> SuiteSummary {
        let mut totals = SuiteSummary::default();
        for outcome in self.outcomes() {
            totals.add(outcome);
        }
        totals
    }

    /// Whether no required test failed.
    pub fn is_success(&self) -> bool {
        self.totals().is_success()
    }

    /// Plain-text report: one line per suite, one per failure, and a
    /// total line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (suite, summary) in self.summaries() {
            let _ = writeln!(out, "suite {suite}: {summary}");
        }
        for failure in self.failures() {
            let label = match failure.status {
                OutcomeStatus::TimedOut => "TIMED OUT",
                _ => "FAILED",
            };
            let optional = if failure.required { "" } else { ", optional" };
            let _ = write!(
                out,
                "{label} {} (attempts: {}{optional})",
                failure.key, failure.attempts
            );
            match &failure.message {
                Some(message) => {
                    let _ = writeln!(out, ": {message}");
                }
                None => out.push('\n'),
            }
        }
        let _ = writeln!(out, "total: {}", self.totals());
        out
    }
}

// ── Run notifications ─────────────────────────────────────────────

/// Progress notifications streamed while a run executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunEvent {
    /// A batch is about to place its first instance.
    BatchStarted {
        /// The batch.
        batch: BatchId,
    },
    /// An attempt was placed and spawned.
    AttemptStarted {
        /// Test being attempted.
        key: TestKey,
        /// Attempt number.
        attempt: AttemptNumber,
        /// Instance running it.
        instance: InstanceId,
    },
    /// An attempt failed and another one will run.
    Retrying {
        /// Test being retried.
        key: TestKey,
        /// The attempt about to run.
        next: AttemptNumber,
        /// Why the previous attempt failed.
        reason: String,
    },
    /// A test reached its final outcome.
    TestFinished(FinalOutcome),
    /// Every test of a batch has finished.
    BatchFinished {
        /// The batch.
        batch: BatchId,
    },
    /// The run is over.
    RunFinished {
        /// Tallies over the whole run.
        totals: SuiteSummary,
    },
}

/// Result of a completed run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Every final outcome.
    pub reporter: OutcomeReporter,
    /// Global ticks the run took.
    pub ticks: u64,
}

impl RunReport {
    /// Whether no required test failed.
    pub fn is_success(&self) -> bool {
        self.reporter.is_success()
    }

    /// Outcome of one test, if it ran.
    pub fn outcome(&self, key: &TestKey) -> Option<&FinalOutcome> {
        self.reporter.outcomes().find(|o| &o.key == key)
    }

    /// See [`OutcomeReporter::render`].
    pub fn render(&self) -> String {
        self.reporter.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(suite: &str, name: &str, status: OutcomeStatus, required: bool) -> FinalOutcome {
        FinalOutcome {
            key: TestKey::new(suite, name),
            tags: Vec::new(),
            required,
            batch: BatchId::default_batch(),
            status,
            attempts: 1,
            message: (status != OutcomeStatus::Passed).then(|| format!("{name} broke")),
            ticks: 10,
        }
    }

    fn sample() -> OutcomeReporter {
        let mut reporter = OutcomeReporter::new();
        reporter.record(outcome("redstone", "torch", OutcomeStatus::Passed, true));
        reporter.record(outcome("redstone", "repeater", OutcomeStatus::Failed, true));
        reporter.record(outcome("piston", "slime", OutcomeStatus::TimedOut, false));
        reporter.record(outcome("piston", "honey", OutcomeStatus::Passed, true));
        reporter
    }

    #[test]
    fn summaries_tally_per_suite() {
        let summaries = sample().summaries();
        assert_eq!(summaries.keys().collect::<Vec<_>>(), vec!["redstone", "piston"]);
        assert_eq!(
            summaries["redstone"],
            SuiteSummary {
                passed: 1,
                failed: 1,
                timed_out: 0,
                required_failures: 1,
                optional_failures: 0,
            }
        );
        assert_eq!(summaries["piston"].timed_out, 1);
        assert_eq!(summaries["piston"].optional_failures, 1);
        assert!(summaries["piston"].is_success());
    }

    #[test]
    fn required_failure_fails_the_run() {
        let reporter = sample();
        assert!(!reporter.is_success());
        assert_eq!(reporter.totals().total(), 4);
        assert_eq!(reporter.failures().count(), 2);
    }

    #[test]
    fn tag_filter_restricts_counted_outcomes() {
        let mut reporter = OutcomeReporter::new().with_tag_filter("slow");
        let mut tagged = outcome("piston", "slime", OutcomeStatus::Failed, true);
        tagged.tags.push("slow".into());
        reporter.record(tagged);
        reporter.record(outcome("piston", "honey", OutcomeStatus::Failed, true));
        assert_eq!(reporter.totals().failed, 1);
    }

    #[test]
    fn default_tag_filter_counts_untagged_outcomes() {
        let mut reporter = OutcomeReporter::new().with_tag_filter(SUITE_DEFAULT);
        reporter.record(outcome("redstone", "torch", OutcomeStatus::Passed, true));
        let mut other = outcome("redstone", "observer", OutcomeStatus::Passed, true);
        other.tags.push("suite:java_parity".into());
        reporter.record(other);
        assert_eq!(reporter.totals().passed, 1);
    }

    #[test]
    fn render_lists_each_failure() {
        let text = sample().render();
        assert_eq!(
            text,
            "suite redstone: 1 passed, 1 failed, 0 timed out (1 required, 0 optional)\n\
             suite piston: 1 passed, 0 failed, 1 timed out (0 required, 1 optional)\n\
             FAILED redstone:repeater (attempts: 1): repeater broke\n\
             TIMED OUT piston:slime (attempts: 1, optional): slime broke\n\
             total: 2 passed, 1 failed, 1 timed out (1 required, 1 optional)\n"
        );
    }
}
