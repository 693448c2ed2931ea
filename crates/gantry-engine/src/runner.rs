//! Suite execution: batching, admission, ticking and retries.
//!
//! [`SuiteRunner::run`] selects tests from a frozen catalog and runs them
//! batch by batch. Within a batch, attempts are admitted in registration
//! order while the concurrency limit and the placement grid allow; the
//! world and the scheduler then tick in lockstep until every test of the
//! batch has a final outcome.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use crossbeam_channel::Sender;
use gantry_core::{BatchId, Rotation, Simulation, TestKey};
use gantry_space::{PlacementError, PlacementManager, PlacementRequest, RotationPolicy};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, HarnessConfig};
use crate::instance::FinishedAttempt;
use crate::registry::{TestCatalog, TestDefinition, TestFilter};
use crate::report::{FinalOutcome, OutcomeReporter, RunEvent, RunReport};
use crate::retry::{AttemptDecision, AttemptLedger};
use crate::scheduler::TickScheduler;

// ── RunError ──────────────────────────────────────────────────────

/// Conditions that abort a whole run.
///
/// Test failures are never run errors; they are outcomes.
#[derive(Debug, PartialEq, Eq)]
pub enum RunError {
    /// Invalid harness configuration.
    Config(ConfigError),
    /// A test's footprint cannot be placed even on an empty grid.
    NoSpace {
        /// The test that could not be placed.
        key: TestKey,
        /// Placement failure.
        source: PlacementError,
    },
    /// `max_run_ticks` elapsed with tests still unfinished.
    RunBudgetExhausted {
        /// Global ticks executed.
        ticks: u64,
        /// Tests running or waiting for admission.
        unfinished: Vec<TestKey>,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::NoSpace { key, source } => write!(f, "cannot place {key}: {source}"),
            Self::RunBudgetExhausted { ticks, unfinished } => write!(
                f,
                "run stopped after {ticks} ticks with {} unfinished tests",
                unfinished.len()
            ),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::NoSpace { source, .. } => Some(source),
            Self::RunBudgetExhausted { .. } => None,
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ── SuiteRunner ───────────────────────────────────────────────────

/// Runs selected tests against a world.
#[derive(Debug)]
pub struct SuiteRunner {
    config: HarnessConfig,
    events: Option<Sender<RunEvent>>,
}

impl SuiteRunner {
    /// Validate `config` and build a runner.
    pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            events: None,
        })
    }

    /// The runner's configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Stream [`RunEvent`]s to `sender` while running. Events are dropped
    /// once the receiver disconnects.
    pub fn with_event_sink(mut self, sender: Sender<RunEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Run every test in `catalog` selected by `filter`.
    pub fn run(
        &self,
        catalog: &TestCatalog,
        filter: &TestFilter,
        world: &mut dyn Simulation,
    ) -> Result<RunReport, RunError> {
        self.run_definitions(catalog.select(filter), world)
    }

    /// Run `definitions`, grouped by batch in order of first appearance.
    pub fn run_definitions(
        &self,
        definitions: Vec<Rc<TestDefinition>>,
        world: &mut dyn Simulation,
    ) -> Result<RunReport, RunError> {
        let mut batches: IndexMap<BatchId, VecDeque<Rc<TestDefinition>>> = IndexMap::new();
        for definition in definitions {
            let batch = definition
                .batch()
                .cloned()
                .unwrap_or_else(BatchId::default_batch);
            batches.entry(batch).or_default().push_back(definition);
        }
        info!(
            tests = batches.values().map(VecDeque::len).sum::<usize>(),
            batches = batches.len(),
            "run started"
        );

        let mut run = Run {
            runner: self,
            scheduler: TickScheduler::new(),
            placement: PlacementManager::new(self.config.placement.clone()),
            ledger: AttemptLedger::new(),
            reporter: OutcomeReporter::new(),
        };
        for (batch, pending) in batches {
            run.run_batch(&batch, pending, world)?;
        }

        let totals = run.reporter.totals();
        let ticks = run.scheduler.clock().0;
        info!(%totals, ticks, "run finished");
        self.emit(RunEvent::RunFinished { totals });
        Ok(RunReport {
            reporter: run.reporter,
            ticks,
        })
    }

    fn emit(&self, event: RunEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                debug!("run event receiver disconnected");
            }
        }
    }
}

// ── Run state ─────────────────────────────────────────────────────

struct Run<'r> {
    runner: &'r SuiteRunner,
    scheduler: TickScheduler,
    placement: PlacementManager,
    ledger: AttemptLedger,
    reporter: OutcomeReporter,
}

impl Run<'_> {
    fn run_batch(
        &mut self,
        batch: &BatchId,
        mut pending: VecDeque<Rc<TestDefinition>>,
        world: &mut dyn Simulation,
    ) -> Result<(), RunError> {
        debug!(%batch, tests = pending.len(), "batch started");
        world.begin_batch(batch);
        self.runner.emit(RunEvent::BatchStarted {
            batch: batch.clone(),
        });

        loop {
            self.admit(&mut pending, world)?;
            if pending.is_empty() && self.scheduler.is_idle() {
                break;
            }
            if self.scheduler.clock().0 >= self.runner.config.max_run_ticks {
                let unfinished = self
                    .scheduler
                    .instances()
                    .map(|i| i.definition().key().clone())
                    .chain(pending.iter().map(|d| d.key().clone()))
                    .collect();
                return Err(RunError::RunBudgetExhausted {
                    ticks: self.scheduler.clock().0,
                    unfinished,
                });
            }
            for finished in self.scheduler.tick(world) {
                self.settle(finished, &mut pending, world);
            }
        }

        world.end_batch(batch);
        self.runner.emit(RunEvent::BatchFinished {
            batch: batch.clone(),
        });
        debug!(%batch, "batch finished");
        Ok(())
    }

    // Place and spawn queued attempts until the queue empties, the
    // concurrency limit is reached, or the grid is full.
    fn admit(
        &mut self,
        pending: &mut VecDeque<Rc<TestDefinition>>,
        world: &mut dyn Simulation,
    ) -> Result<(), RunError> {
        let runner = self.runner;
        let config = &runner.config;
        while self.scheduler.live_count() < config.max_concurrent {
            let Some(definition) = pending.front().cloned() else {
                break;
            };
            let id = self.scheduler.allocate_id();

            let extent = match definition.structure() {
                Some(structure) => match world.structure_extent(structure) {
                    Some(extent) => extent,
                    None => {
                        pending.pop_front();
                        let attempt = self.ledger.begin(definition.key());
                        let reason = format!("unknown structure template {structure}");
                        let failed =
                            FinishedAttempt::setup_failure(id, definition, attempt, reason, None);
                        self.settle(failed, pending, world);
                        continue;
                    }
                },
                None => config.default_structure_extent,
            };
            let request = PlacementRequest {
                extent,
                padding: definition.padding().unwrap_or(config.default_padding),
                rotation: if definition.rotatable() {
                    RotationPolicy::Random
                } else {
                    RotationPolicy::Fixed(Rotation::None)
                },
            };

            let placement = match self.placement.place(id, &request) {
                Ok(placement) => placement,
                Err(PlacementError::NoSpace { .. }) if !self.scheduler.is_idle() => {
                    warn!(
                        test = %definition.key(),
                        live = self.scheduler.live_count(),
                        "grid full, deferring admission"
                    );
                    break;
                }
                Err(source) => {
                    return Err(RunError::NoSpace {
                        key: definition.key().clone(),
                        source,
                    });
                }
            };

            pending.pop_front();
            let attempt = self.ledger.begin(definition.key());
            let rotation = placement.frame.rotation();
            if let Err(reason) =
                world.place_structure(definition.structure(), &placement.structure, rotation)
            {
                let reason = format!("failed to place structure: {reason}");
                let failed = FinishedAttempt::setup_failure(
                    id,
                    definition,
                    attempt,
                    reason,
                    Some(placement.reserved),
                );
                self.settle(failed, pending, world);
                continue;
            }

            self.scheduler
                .spawn(Rc::clone(&definition), attempt, &placement);
            self.runner.emit(RunEvent::AttemptStarted {
                key: definition.key().clone(),
                attempt,
                instance: id,
            });
        }
        Ok(())
    }

    // Free the attempt's region and either requeue or record the test.
    fn settle(
        &mut self,
        finished: FinishedAttempt,
        pending: &mut VecDeque<Rc<TestDefinition>>,
        world: &mut dyn Simulation,
    ) {
        if let Some(region) = &finished.reserved {
            world.clear_region(region);
        }
        self.placement.release(finished.instance);

        let key = finished.definition.key();
        match self.ledger.decide(&finished) {
            AttemptDecision::Retry { next, reason } => {
                warn!(
                    test = %key,
                    attempt = %finished.attempt,
                    %reason,
                    "attempt failed, retrying"
                );
                self.runner.emit(RunEvent::Retrying {
                    key: key.clone(),
                    next,
                    reason,
                });
                pending.push_front(Rc::clone(&finished.definition));
            }
            AttemptDecision::Final(outcome) => {
                self.record(outcome);
            }
        }
    }

    fn record(&mut self, outcome: FinalOutcome) {
        info!(
            test = %outcome.key,
            status = %outcome.status,
            attempts = outcome.attempts,
            ticks = outcome.ticks,
            "test finished"
        );
        self.runner.emit(RunEvent::TestFinished(outcome.clone()));
        self.reporter.record(outcome);
    }
}
