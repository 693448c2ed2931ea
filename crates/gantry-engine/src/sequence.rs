//! Ordered step lists driven by the instance clock.
//!
//! A sequence is a queue of [`SequenceStep`]s. On every tick the scheduler
//! advances each live list: completed steps are popped and the next step
//! becomes active on the same tick, so a run of satisfied steps cascades
//! until one has to wait. Timed steps measure their delay from the tick
//! they became active.

use std::collections::VecDeque;
use std::fmt;

use gantry_core::{AssertionFailure, TickId};

use crate::context::{TestContext, Verdict};
use crate::polling::{Callback, PollOutcome, PollState};

// ── SequenceStep ──────────────────────────────────────────────────

/// One step of a sequence.
pub enum SequenceStep {
    /// Do nothing for this many ticks.
    Idle(u64),
    /// Run the action once. An `Err` fails the test.
    ExecuteNow(Callback),
    /// Wait this many ticks, then run the action once.
    ExecuteAfter(u64, Callback),
    /// Poll the predicate every tick until it returns `Ok`.
    WaitUntil(Callback),
    /// Wait this many ticks, then poll the predicate every tick.
    WaitAfter(u64, Callback),
    /// End the test as succeeded.
    Succeed,
    /// End the test as failed with this reason.
    Fail(String),
}

impl SequenceStep {
    fn delay(&self) -> u64 {
        match self {
            Self::Idle(n) | Self::ExecuteAfter(n, _) | Self::WaitAfter(n, _) => *n,
            _ => 0,
        }
    }
}

impl fmt::Debug for SequenceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle(n) => write!(f, "Idle({n})"),
            Self::ExecuteNow(_) => f.write_str("ExecuteNow(..)"),
            Self::ExecuteAfter(n, _) => write!(f, "ExecuteAfter({n}, ..)"),
            Self::WaitUntil(_) => f.write_str("WaitUntil(..)"),
            Self::WaitAfter(n, _) => write!(f, "WaitAfter({n}, ..)"),
            Self::Succeed => f.write_str("Succeed"),
            Self::Fail(reason) => write!(f, "Fail({reason:?})"),
        }
    }
}

// ── StepList ──────────────────────────────────────────────────────

/// Where a list stands after one advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StepProgress {
    /// The head step is still waiting.
    Waiting,
    /// Every step ran and none was terminal.
    Exhausted,
    /// A verdict was given, by a terminal step or by a callback.
    Concluded,
}

/// A live sequence owned by one instance.
pub(crate) struct StepList {
    steps: VecDeque<SequenceStep>,
    activated_at: TickId,
    poll: PollState,
}

impl StepList {
    /// An empty list whose first step becomes active at `now`.
    pub(crate) fn new(now: TickId) -> Self {
        Self {
            steps: VecDeque::new(),
            activated_at: now,
            poll: PollState::new(),
        }
    }

    pub(crate) fn push(&mut self, step: SequenceStep) {
        self.steps.push_back(step);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    /// Failure from the most recent poll of the active wait step.
    pub(crate) fn last_failure(&self) -> Option<&AssertionFailure> {
        self.poll.last_failure()
    }

    /// Run as many steps as complete on this tick.
    ///
    /// # Errors
    ///
    /// Returns the failure of an action step. Predicate failures are not
    /// errors; they leave the list waiting.
    pub(crate) fn advance(
        &mut self,
        ctx: &mut TestContext<'_>,
    ) -> Result<StepProgress, AssertionFailure> {
        let now = ctx.tick();
        loop {
            if ctx.has_verdict() {
                return Ok(StepProgress::Concluded);
            }
            let Some(step) = self.steps.front_mut() else {
                return Ok(StepProgress::Exhausted);
            };
            if now.since(self.activated_at) < step.delay() {
                return Ok(StepProgress::Waiting);
            }
            match step {
                SequenceStep::Idle(_) => {}
                SequenceStep::ExecuteNow(action) | SequenceStep::ExecuteAfter(_, action) => {
                    action(ctx)?;
                }
                SequenceStep::WaitUntil(predicate) | SequenceStep::WaitAfter(_, predicate) => {
                    if self.poll.poll(predicate, ctx) == PollOutcome::Pending {
                        return Ok(StepProgress::Waiting);
                    }
                }
                SequenceStep::Succeed => {
                    ctx.conclude(Verdict::Succeed);
                    return Ok(StepProgress::Concluded);
                }
                SequenceStep::Fail(reason) => {
                    let failure = AssertionFailure::new(std::mem::take(reason)).observed_at(now);
                    ctx.conclude(Verdict::Fail(failure));
                    return Ok(StepProgress::Concluded);
                }
            }
            self.steps.pop_front();
            self.activated_at = now;
            self.poll = PollState::new();
        }
    }
}

impl fmt::Debug for StepList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepList")
            .field("steps", &self.steps)
            .field("activated_at", &self.activated_at)
            .field("polls", &self.poll.polls())
            .finish()
    }
}

// ── SequenceHandle ────────────────────────────────────────────────

/// Builder returned by [`TestContext::start_sequence`].
///
/// Steps are appended in call order. The list starts on the tick after
/// the one it was created on, whether or not a terminal step was added.
pub struct SequenceHandle<'a> {
    list: &'a mut StepList,
}

impl<'a> SequenceHandle<'a> {
    pub(crate) fn new(list: &'a mut StepList) -> Self {
        Self { list }
    }

    /// Append an arbitrary step.
    pub fn then(self, step: SequenceStep) -> Self {
        self.list.push(step);
        self
    }

    /// Wait `ticks` ticks.
    pub fn then_idle(self, ticks: u64) -> Self {
        self.then(SequenceStep::Idle(ticks))
    }

    /// Run `action` once.
    pub fn then_execute(
        self,
        action: impl FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) -> Self {
        self.then(SequenceStep::ExecuteNow(Box::new(action)))
    }

    /// Wait `ticks` ticks, then run `action` once.
    pub fn then_execute_after(
        self,
        ticks: u64,
        action: impl FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) -> Self {
        self.then(SequenceStep::ExecuteAfter(ticks, Box::new(action)))
    }

    /// Poll `predicate` every tick until it holds.
    pub fn then_wait(
        self,
        predicate: impl FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) -> Self {
        self.then(SequenceStep::WaitUntil(Box::new(predicate)))
    }

    /// Wait `ticks` ticks, then poll `predicate` every tick until it holds.
    pub fn then_wait_after(
        self,
        ticks: u64,
        predicate: impl FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) -> Self {
        self.then(SequenceStep::WaitAfter(ticks, Box::new(predicate)))
    }

    /// End the test as succeeded once the preceding steps complete.
    pub fn then_succeed(self) {
        self.list.push(SequenceStep::Succeed);
    }

    /// End the test as failed once the preceding steps complete.
    pub fn then_fail(self, reason: impl Into<String>) {
        self.list.push(SequenceStep::Fail(reason.into()));
    }
}

impl fmt::Debug for SequenceHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SequenceHandle").field(&self.list).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::context::harness::{frame, with_context};
    use crate::context::Registrations;
    use gantry_core::Rotation;
    use gantry_test_utils::GridWorld;

    /// Advance `list` once per tick from `start + 1` until it stops
    /// waiting, returning the final progress, its tick and the verdict.
    fn drive(
        list: &mut StepList,
        start: u64,
        limit: u64,
    ) -> (StepProgress, u64, Option<Verdict>) {
        let mut world = GridWorld::new();
        let f = frame(Rotation::None);
        for tick in start + 1..=limit {
            let mut regs = Registrations::default();
            let progress = with_context(&mut world, &f, &mut regs, tick, |ctx| {
                list.advance(ctx)
            });
            match progress {
                Ok(StepProgress::Waiting) => continue,
                Ok(p) => return (p, tick, regs.verdict),
                Err(failure) => return (StepProgress::Concluded, tick, Some(Verdict::Fail(failure))),
            }
        }
        (StepProgress::Waiting, limit, None)
    }

    #[test]
    fn idle_then_succeed_concludes_on_exact_tick() {
        let mut list = StepList::new(TickId(1));
        list.push(SequenceStep::Idle(10));
        list.push(SequenceStep::Succeed);
        let (progress, tick, verdict) = drive(&mut list, 1, 50);
        assert_eq!(progress, StepProgress::Concluded);
        assert_eq!(tick, 11);
        assert_eq!(verdict, Some(Verdict::Succeed));
    }

    #[test]
    fn satisfied_steps_cascade_within_one_tick() {
        let ran = Rc::new(Cell::new(0u64));
        let seen = Rc::clone(&ran);
        let mut list = StepList::new(TickId(1));
        list.push(SequenceStep::Idle(3));
        list.push(SequenceStep::ExecuteNow(Box::new(move |ctx| {
            seen.set(ctx.tick().0);
            Ok(())
        })));
        list.push(SequenceStep::WaitUntil(Box::new(|_| Ok(()))));
        list.push(SequenceStep::Succeed);
        let (_, tick, _) = drive(&mut list, 1, 50);
        assert_eq!(tick, 4);
        assert_eq!(ran.get(), 4);
    }

    #[test]
    fn delays_are_measured_from_step_activation() {
        let mut list = StepList::new(TickId(0));
        list.push(SequenceStep::Idle(2));
        list.push(SequenceStep::ExecuteAfter(3, Box::new(|_| Ok(()))));
        list.push(SequenceStep::Succeed);
        let (_, tick, _) = drive(&mut list, 0, 50);
        assert_eq!(tick, 5);
    }

    #[test]
    fn wait_polls_once_per_tick_until_satisfied() {
        let polls = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&polls);
        let mut list = StepList::new(TickId(1));
        list.push(SequenceStep::WaitUntil(Box::new(move |ctx| {
            counter.set(counter.get() + 1);
            ctx.assert(ctx.tick() >= TickId(6), "not yet")
        })));
        list.push(SequenceStep::Succeed);
        let (_, tick, _) = drive(&mut list, 1, 50);
        assert_eq!(tick, 6);
        assert_eq!(polls.get(), 5);
    }

    #[test]
    fn pending_wait_keeps_last_failure() {
        let mut list = StepList::new(TickId(0));
        list.push(SequenceStep::WaitUntil(Box::new(|ctx| {
            ctx.assert(false, "lamp is off")
        })));
        let (progress, _, _) = drive(&mut list, 0, 5);
        assert_eq!(progress, StepProgress::Waiting);
        let failure = list.last_failure().unwrap();
        assert_eq!(failure.message, "lamp is off");
        assert_eq!(failure.tick, Some(TickId(5)));
    }

    #[test]
    fn action_error_is_fatal() {
        let mut list = StepList::new(TickId(0));
        list.push(SequenceStep::ExecuteNow(Box::new(|_| {
            Err(AssertionFailure::new("boom"))
        })));
        list.push(SequenceStep::Succeed);
        let (_, tick, verdict) = drive(&mut list, 0, 5);
        assert_eq!(tick, 1);
        assert!(matches!(verdict, Some(Verdict::Fail(f)) if f.message == "boom"));
    }

    #[test]
    fn list_without_terminal_step_is_exhausted() {
        let mut list = StepList::new(TickId(0));
        list.push(SequenceStep::Idle(1));
        let (progress, tick, verdict) = drive(&mut list, 0, 5);
        assert_eq!(progress, StepProgress::Exhausted);
        assert_eq!(tick, 1);
        assert_eq!(verdict, None);
    }

    #[test]
    fn fail_step_carries_reason_and_tick() {
        let mut list = StepList::new(TickId(2));
        list.push(SequenceStep::Idle(2));
        list.push(SequenceStep::Fail("door never opened".into()));
        let (_, _, verdict) = drive(&mut list, 2, 10);
        match verdict {
            Some(Verdict::Fail(f)) => {
                assert_eq!(f.message, "door never opened");
                assert_eq!(f.tick, Some(TickId(4)));
            }
            other => panic!("unexpected verdict {other:?}"),
        }
    }

    #[test]
    fn debug_hides_callbacks() {
        let step = SequenceStep::ExecuteAfter(4, Box::new(|_| Ok(())));
        assert_eq!(format!("{step:?}"), "ExecuteAfter(4, ..)");
    }
}
