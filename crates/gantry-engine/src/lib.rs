//! Test orchestration for tick-driven world simulations.
//!
//! Scenario authors register tests in a [`TestRegistry`]; a
//! [`SuiteRunner`] places each running attempt in its own padded region,
//! advances one shared clock, and drives every instance's sequences,
//! polling assertions, continuations and event handlers in lockstep on a
//! single thread. Failed attempts are retried up to the test's budget and
//! final outcomes are aggregated by the [`OutcomeReporter`].
//!
//! # Tick model
//!
//! Instance clocks start at 0; the body runs on tick 1 (after any setup
//! ticks). Work registered during tick `t` is first evaluated on tick
//! `t + 1`. An instance whose clock passes `max_ticks` is timed out
//! before any of that tick's steps run.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod continuation;
pub mod events;
pub mod instance;
pub mod polling;
pub mod registry;
pub mod report;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod sequence;

pub use config::{ConfigError, HarnessConfig};
pub use context::TestContext;
pub use continuation::{Continuation, Stages, Suspend};
pub use events::{EventBus, SubscriptionHandle};
pub use instance::{FinishedAttempt, TestInstance, TestStatus};
pub use polling::{Callback, PollOutcome, PollState};
pub use registry::{
    RegistrationHandle, TestBody, TestCatalog, TestDefinition, TestFilter, TestRegistry,
    SUITE_DEFAULT, SUITE_DISABLED,
};
pub use report::{FinalOutcome, OutcomeReporter, OutcomeStatus, RunEvent, RunReport, SuiteSummary};
pub use retry::{run_with_retries, AttemptDecision, AttemptLedger};
pub use runner::{RunError, SuiteRunner};
pub use scheduler::TickScheduler;
pub use sequence::{SequenceHandle, SequenceStep};
