//! One running attempt of a test and its lifecycle state.

use std::fmt;
use std::rc::Rc;

use gantry_core::{AssertionFailure, AttemptNumber, BlockBox, InstanceId, TickId};
use gantry_space::InstanceFrame;
use smallvec::SmallVec;

use crate::context::Registrations;
use crate::continuation::Continuation;
use crate::polling::{Callback, PollState};
use crate::registry::TestDefinition;
use crate::sequence::StepList;

// ── TestStatus ────────────────────────────────────────────────────

/// Lifecycle state of an instance.
///
/// `Pending -> Running -> {Succeeded | Failed | TimedOut}`. The three
/// terminal states are absorbing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestStatus {
    /// Placed, counting down setup ticks.
    Pending,
    /// Clock is advancing.
    Running,
    /// A success verdict was reached.
    Succeeded,
    /// A fail verdict or a fatal callback error.
    Failed(AssertionFailure),
    /// The clock passed `max_ticks` first.
    TimedOut,
}

impl TestStatus {
    /// Whether the instance has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_) | Self::TimedOut)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Running => f.write_str("running"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

// ── Parked continuation ───────────────────────────────────────────

pub(crate) enum Wake {
    At(TickId),
    Until(Callback, PollState),
}

pub(crate) struct Parked {
    pub(crate) continuation: Box<dyn Continuation>,
    pub(crate) wake: Wake,
}

// ── TestInstance ──────────────────────────────────────────────────

/// A placed, possibly running attempt.
pub struct TestInstance {
    pub(crate) id: InstanceId,
    pub(crate) definition: Rc<TestDefinition>,
    pub(crate) attempt: AttemptNumber,
    pub(crate) frame: InstanceFrame,
    pub(crate) reserved: BlockBox,
    pub(crate) current_tick: TickId,
    pub(crate) setup_remaining: u64,
    pub(crate) started: bool,
    pub(crate) status: TestStatus,
    pub(crate) lists: SmallVec<[StepList; 4]>,
    pub(crate) parked: Option<Parked>,
    pub(crate) registrations: Registrations,
}

impl TestInstance {
    pub(crate) fn new(
        id: InstanceId,
        definition: Rc<TestDefinition>,
        attempt: AttemptNumber,
        frame: InstanceFrame,
        reserved: BlockBox,
    ) -> Self {
        let setup_remaining = definition.setup_ticks();
        Self {
            id,
            definition,
            attempt,
            frame,
            reserved,
            current_tick: TickId(0),
            setup_remaining,
            started: false,
            status: TestStatus::Pending,
            lists: SmallVec::new(),
            parked: None,
            registrations: Registrations::default(),
        }
    }

    /// Instance id.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The test being run.
    pub fn definition(&self) -> &TestDefinition {
        &self.definition
    }

    /// Attempt number of this run.
    pub fn attempt(&self) -> AttemptNumber {
        self.attempt
    }

    /// Coordinate frame of the structure.
    pub fn frame(&self) -> &InstanceFrame {
        &self.frame
    }

    /// Region reserved in the placement grid, padding included.
    pub fn reserved(&self) -> BlockBox {
        self.reserved
    }

    /// Instance-local clock.
    pub fn current_tick(&self) -> TickId {
        self.current_tick
    }

    /// Current status.
    pub fn status(&self) -> &TestStatus {
        &self.status
    }

    /// Number of live step lists.
    pub fn live_sequences(&self) -> usize {
        self.lists.len()
    }

    // Most recent unmet predicate, used to explain a timeout.
    pub(crate) fn waiting_on(&self) -> Option<AssertionFailure> {
        let parked = self.parked.as_ref().and_then(|p| match &p.wake {
            Wake::Until(_, state) => state.last_failure(),
            Wake::At(_) => None,
        });
        parked
            .or_else(|| self.lists.iter().find_map(StepList::last_failure))
            .cloned()
    }

    pub(crate) fn finish(self, status: TestStatus) -> FinishedAttempt {
        let timeout_hint = match status {
            TestStatus::TimedOut => self.waiting_on(),
            _ => None,
        };
        FinishedAttempt {
            instance: self.id,
            definition: self.definition,
            attempt: self.attempt,
            status,
            ticks: self.current_tick.0,
            reserved: Some(self.reserved),
            timeout_hint,
        }
    }
}

impl fmt::Debug for TestInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestInstance")
            .field("id", &self.id)
            .field("test", self.definition.key())
            .field("attempt", &self.attempt)
            .field("tick", &self.current_tick)
            .field("status", &self.status)
            .field("sequences", &self.lists.len())
            .field("parked", &self.parked.is_some())
            .finish()
    }
}

// ── FinishedAttempt ───────────────────────────────────────────────

/// A terminated instance, handed back by the scheduler.
#[derive(Clone, Debug)]
pub struct FinishedAttempt {
    /// The instance that ran.
    pub instance: InstanceId,
    /// The test it ran.
    pub definition: Rc<TestDefinition>,
    /// Which attempt this was.
    pub attempt: AttemptNumber,
    /// Terminal status.
    pub status: TestStatus,
    /// Instance ticks elapsed, including the timeout tick.
    pub ticks: u64,
    /// Region to clear and release. `None` when the attempt failed
    /// before a region was reserved.
    pub reserved: Option<BlockBox>,
    /// For timeouts, the last unmet predicate.
    pub timeout_hint: Option<AssertionFailure>,
}

impl FinishedAttempt {
    // An attempt that failed while its structure was being prepared.
    pub(crate) fn setup_failure(
        instance: InstanceId,
        definition: Rc<TestDefinition>,
        attempt: AttemptNumber,
        reason: String,
        reserved: Option<BlockBox>,
    ) -> Self {
        Self {
            instance,
            definition,
            attempt,
            status: TestStatus::Failed(AssertionFailure::new(reason)),
            ticks: 0,
            reserved,
            timeout_hint: None,
        }
    }

    /// Whether the attempt succeeded.
    pub fn succeeded(&self) -> bool {
        self.status == TestStatus::Succeeded
    }

    /// Human-readable reason for a failed or timed-out attempt.
    pub fn message(&self) -> Option<String> {
        match &self.status {
            TestStatus::Failed(failure) => Some(failure.to_string()),
            TestStatus::TimedOut => Some(match &self.timeout_hint {
                Some(hint) => format!(
                    "timed out after {} ticks, still waiting: {hint}",
                    self.definition.max_ticks()
                ),
                None => format!("timed out after {} ticks", self.definition.max_ticks()),
            }),
            _ => None,
        }
    }
}
