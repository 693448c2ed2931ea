//! The handle every scenario callback receives.
//!
//! A [`TestContext`] is built by the scheduler for each callback
//! invocation. It borrows the shared world, the instance's coordinate
//! frame and the instance's registration buffer; it never owns any of
//! them. Everything a callback registers (sequences, delayed actions,
//! subscriptions, a verdict) lands in the buffer and is picked up by the
//! scheduler once the callback returns.

use gantry_core::{
    AssertionFailure, BlockKind, BlockPos, Direction, EntityKind, InstanceId, Simulation,
    TestKey, TickId, WorldEvent,
};
use gantry_space::InstanceFrame;

use crate::events::{Handler, SubscriptionHandle};
use crate::polling::Callback;
use crate::sequence::{SequenceHandle, SequenceStep, StepList};

// ── Verdict ───────────────────────────────────────────────────────

/// Terminal decision requested by a callback or a terminal step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Succeed,
    Fail(AssertionFailure),
}

// ── Registrations ─────────────────────────────────────────────────

/// Work registered by callbacks during the current tick.
#[derive(Default)]
pub(crate) struct Registrations {
    pub(crate) sequences: Vec<StepList>,
    pub(crate) subscriptions: Vec<(SubscriptionHandle, String, Handler)>,
    pub(crate) unsubscriptions: Vec<SubscriptionHandle>,
    pub(crate) verdict: Option<Verdict>,
    next_subscription: u64,
}

impl Registrations {
    /// Record `verdict` unless an earlier one already won.
    pub(crate) fn conclude(&mut self, verdict: Verdict) {
        if self.verdict.is_none() {
            self.verdict = Some(verdict);
        }
    }
}

// ── TestContext ───────────────────────────────────────────────────

/// Scenario-facing view of one running instance.
///
/// All positions taken or returned by block and entity helpers are
/// relative to the instance's structure and pass through its rotation.
pub struct TestContext<'a> {
    world: &'a mut dyn Simulation,
    frame: &'a InstanceFrame,
    key: &'a TestKey,
    instance: InstanceId,
    tick: TickId,
    registrations: &'a mut Registrations,
}

impl<'a> TestContext<'a> {
    pub(crate) fn new(
        world: &'a mut dyn Simulation,
        frame: &'a InstanceFrame,
        key: &'a TestKey,
        instance: InstanceId,
        tick: TickId,
        registrations: &'a mut Registrations,
    ) -> Self {
        Self {
            world,
            frame,
            key,
            instance,
            tick,
            registrations,
        }
    }

    // ── Identity and clock ───────────────────────────────────────

    /// Current instance-local tick.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// The running instance.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Suite and name of the running test.
    pub fn test_key(&self) -> &TestKey {
        self.key
    }

    /// The instance's coordinate frame.
    pub fn frame(&self) -> &InstanceFrame {
        self.frame
    }

    /// Direct access to the shared world, in absolute coordinates.
    pub fn world(&mut self) -> &mut dyn Simulation {
        &mut *self.world
    }

    // ── Coordinates ───────────────────────────────────────────────

    /// Absolute position of a relative one.
    pub fn world_block_location(&self, relative: BlockPos) -> BlockPos {
        self.frame.world_location(relative)
    }

    /// Relative position of an absolute one.
    pub fn relative_block_location(&self, absolute: BlockPos) -> BlockPos {
        self.frame.relative_location(absolute)
    }

    /// A relative direction rotated into the world.
    pub fn rotate_direction(&self, direction: Direction) -> Direction {
        self.frame.rotate_direction(direction)
    }

    /// The world direction the instance's authored south points along.
    pub fn facing(&self) -> Direction {
        self.frame.facing()
    }

    // ── World access ─────────────────────────────────────────────

    /// Block at a relative position (`None` is air).
    pub fn block(&self, relative: BlockPos) -> Option<BlockKind> {
        self.world.block(self.frame.world_location(relative))
    }

    /// Replace the block at a relative position (`None` places air).
    pub fn set_block(&mut self, relative: BlockPos, block: Option<&BlockKind>) {
        let pos = self.frame.world_location(relative);
        self.world.set_block(pos, block);
    }

    /// Spawn an entity at a relative position.
    pub fn spawn_entity(&mut self, kind: &EntityKind, relative: BlockPos) {
        let pos = self.frame.world_location(relative);
        self.world.spawn_entity(kind, pos);
    }

    // ── Assertions ───────────────────────────────────────────────

    /// Fail with `message` unless `condition` holds.
    pub fn assert(
        &self,
        condition: bool,
        message: impl Into<String>,
    ) -> Result<(), AssertionFailure> {
        if condition {
            Ok(())
        } else {
            Err(AssertionFailure::new(message))
        }
    }

    /// Check that `kind` is (or is not) the block at a relative position.
    pub fn assert_block_present(
        &self,
        kind: &BlockKind,
        relative: BlockPos,
        present: bool,
    ) -> Result<(), AssertionFailure> {
        let actual = self.block(relative);
        if (actual.as_ref() == Some(kind)) == present {
            return Ok(());
        }
        let found = actual.map_or_else(|| "air".to_string(), |b| b.to_string());
        let message = if present {
            format!("expected {kind}, found {found}")
        } else {
            format!("expected no {kind}")
        };
        Err(AssertionFailure::at(message, relative))
    }

    /// Check the exact block at a relative position, air included.
    pub fn assert_block(
        &self,
        relative: BlockPos,
        expected: Option<&BlockKind>,
    ) -> Result<(), AssertionFailure> {
        let actual = self.block(relative);
        if actual.as_ref() == expected {
            return Ok(());
        }
        let show = |b: Option<&BlockKind>| b.map_or_else(|| "air".to_string(), |b| b.to_string());
        Err(AssertionFailure::at(
            format!("expected {}, found {}", show(expected), show(actual.as_ref())),
            relative,
        ))
    }

    /// Check that an entity of `kind` is (or is not) at a relative position.
    pub fn assert_entity_present(
        &self,
        kind: &EntityKind,
        relative: BlockPos,
        present: bool,
    ) -> Result<(), AssertionFailure> {
        let pos = self.frame.world_location(relative);
        let found = self.world.entities_at(pos).iter().any(|e| e == kind);
        if found == present {
            return Ok(());
        }
        let message = if present {
            format!("expected entity {kind}")
        } else {
            format!("unexpected entity {kind}")
        };
        Err(AssertionFailure::at(message, relative))
    }

    // ── Verdicts ─────────────────────────────────────────────────

    /// End the test as succeeded. Ignored if a verdict was already given.
    pub fn succeed(&mut self) {
        self.registrations.conclude(Verdict::Succeed);
    }

    /// End the test as failed. Ignored if a verdict was already given.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let failure = AssertionFailure::new(reason).observed_at(self.tick);
        self.registrations.conclude(Verdict::Fail(failure));
    }

    pub(crate) fn conclude(&mut self, verdict: Verdict) {
        self.registrations.conclude(verdict);
    }

    pub(crate) fn has_verdict(&self) -> bool {
        self.registrations.verdict.is_some()
    }

    // ── Scheduling ───────────────────────────────────────────────

    /// Start a new step list on the instance's clock.
    ///
    /// Lists run independently of each other; the first terminal step
    /// reached by any of them ends the test.
    pub fn start_sequence(&mut self) -> SequenceHandle<'_> {
        let list = StepList::new(self.tick);
        let index = self.registrations.sequences.len();
        self.registrations.sequences.push(list);
        SequenceHandle::new(&mut self.registrations.sequences[index])
    }

    /// Succeed on the first tick `predicate` holds.
    pub fn succeed_when(
        &mut self,
        predicate: impl FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) {
        self.start_sequence().then_wait(predicate).then_succeed();
    }

    /// Succeed exactly on instance tick `tick`.
    ///
    /// Called on tick `tick` itself, the test succeeds immediately. Fails
    /// on the next tick if `tick` has already passed.
    pub fn succeed_on_tick(&mut self, tick: u64) {
        let target = TickId(tick);
        if target == self.tick {
            self.succeed();
        } else if target > self.tick {
            let delay = target.since(self.tick);
            self.start_sequence().then_idle(delay).then_succeed();
        } else {
            let reason = format!("succeed_on_tick({tick}) registered on tick {}", self.tick);
            self.start_sequence().then_fail(reason);
        }
    }

    /// Succeed on the first tick at or after `tick` on which `predicate`
    /// holds.
    pub fn succeed_on_tick_when(
        &mut self,
        tick: u64,
        predicate: impl FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) {
        let delay = TickId(tick).since(self.tick);
        self.start_sequence()
            .then_wait_after(delay, predicate)
            .then_succeed();
    }

    /// Run `action` once, `delay` ticks from now, without blocking any
    /// sequence. An `Err` from the action fails the test.
    pub fn run_after_delay(
        &mut self,
        delay: u64,
        action: impl FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) {
        let action: Callback = Box::new(action);
        let mut list = StepList::new(self.tick);
        list.push(SequenceStep::ExecuteAfter(delay, action));
        self.registrations.sequences.push(list);
    }

    // ── Events ───────────────────────────────────────────────────

    /// Receive world events on `topic` until the instance ends or the
    /// handle is passed to [`unsubscribe`](Self::unsubscribe).
    ///
    /// Events with a position are delivered only when it lies inside this
    /// instance's structure. An `Err` from the handler fails the test.
    pub fn subscribe(
        &mut self,
        topic: impl Into<String>,
        handler: impl FnMut(&mut TestContext<'_>, &WorldEvent) -> Result<(), AssertionFailure>
            + 'static,
    ) -> SubscriptionHandle {
        let regs = &mut *self.registrations;
        let handle = SubscriptionHandle {
            instance: self.instance,
            id: regs.next_subscription,
        };
        regs.next_subscription += 1;
        regs.subscriptions
            .push((handle, topic.into(), Box::new(handler)));
        handle
    }

    /// Cancel a subscription. Takes effect before the next delivery.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.registrations.unsubscriptions.push(handle);
    }
}

impl std::fmt::Debug for TestContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("test", self.key)
            .field("instance", &self.instance)
            .field("tick", &self.tick)
            .field("frame", self.frame)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod harness {
    //! Builds a one-off context over a [`GridWorld`] for unit tests.

    use super::*;
    use gantry_core::{Extent, Rotation};
    use gantry_test_utils::GridWorld;

    pub(crate) fn frame(rotation: Rotation) -> InstanceFrame {
        InstanceFrame::new(BlockPos::new(10, 0, 20), rotation, Extent::new(4, 4, 4))
    }

    pub(crate) fn with_context<R>(
        world: &mut GridWorld,
        frame: &InstanceFrame,
        registrations: &mut Registrations,
        tick: u64,
        f: impl FnOnce(&mut TestContext<'_>) -> R,
    ) -> R {
        let key = TestKey::new("unit", "context");
        let mut ctx = TestContext::new(
            world,
            frame,
            &key,
            InstanceId(1),
            TickId(tick),
            registrations,
        );
        f(&mut ctx)
    }
}
