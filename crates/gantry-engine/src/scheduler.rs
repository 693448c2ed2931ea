//! The lockstep tick loop over every live instance.
//!
//! [`TickScheduler::tick`] advances the world once and then every live
//! instance once, in spawn order. Per instance the phases are:
//!
//! 1. setup countdown (`Pending` only),
//! 2. clock increment and timeout check,
//! 3. the body, on the first running tick,
//! 4. delivery of this tick's world events,
//! 5. resumption of a due continuation,
//! 6. advancement of every step list registered before this tick,
//! 7. installation of everything registered during this tick.
//!
//! The first verdict reached in any phase ends the instance; later
//! phases of that tick are skipped.

use std::rc::Rc;

use gantry_core::{AttemptNumber, InstanceId, Simulation, TickId, WorldEvent};
use gantry_space::Placement;
use indexmap::IndexMap;
use tracing::debug;

use crate::context::{TestContext, Verdict};
use crate::continuation::{Continuation, Suspend};
use crate::events::EventBus;
use crate::instance::{FinishedAttempt, Parked, TestInstance, TestStatus, Wake};
use crate::polling::{PollOutcome, PollState};
use crate::registry::{TestBody, TestDefinition};
use crate::sequence::StepProgress;

/// Owns live instances and their subscriptions; advances them in lockstep.
#[derive(Debug, Default)]
pub struct TickScheduler {
    instances: IndexMap<InstanceId, TestInstance>,
    bus: EventBus,
    clock: TickId,
    next_instance: u64,
    events: Vec<WorldEvent>,
}

impl TickScheduler {
    /// A scheduler with no instances, at global tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Global ticks executed so far.
    pub fn clock(&self) -> TickId {
        self.clock
    }

    /// Reserve the next instance id.
    pub fn allocate_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_instance);
        self.next_instance += 1;
        id
    }

    /// Start an attempt in the region granted by `placement`.
    ///
    /// The instance is `Pending` until its setup ticks have elapsed.
    pub fn spawn(
        &mut self,
        definition: Rc<TestDefinition>,
        attempt: AttemptNumber,
        placement: &Placement,
    ) -> InstanceId {
        let id = placement.instance;
        debug!(
            instance = %id,
            test = %definition.key(),
            %attempt,
            origin = %placement.frame.origin(),
            rotation = %placement.frame.rotation(),
            "instance spawned"
        );
        let instance = TestInstance::new(
            id,
            definition,
            attempt,
            placement.frame,
            placement.reserved,
        );
        self.instances.insert(id, instance);
        id
    }

    /// Number of live instances.
    pub fn live_count(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instance is live.
    pub fn is_idle(&self) -> bool {
        self.instances.is_empty()
    }

    /// A live instance.
    pub fn instance(&self, id: InstanceId) -> Option<&TestInstance> {
        self.instances.get(&id)
    }

    /// Live instances in spawn order.
    pub fn instances(&self) -> impl Iterator<Item = &TestInstance> {
        self.instances.values()
    }

    /// Subscriptions of live instances.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Advance the world and every live instance by one tick.
    ///
    /// Returns the instances that reached a terminal status, in spawn
    /// order. They are no longer live and their subscriptions are gone;
    /// releasing their regions is up to the caller.
    pub fn tick(&mut self, world: &mut dyn Simulation) -> Vec<FinishedAttempt> {
        self.clock = self.clock.after(1);
        self.events.clear();
        world.tick(self.clock, &mut self.events);

        let mut terminal = Vec::new();
        for (id, instance) in self.instances.iter_mut() {
            if let Some(status) = step_instance(instance, &mut self.bus, world, &self.events) {
                terminal.push((*id, status));
            }
        }

        let mut finished = Vec::with_capacity(terminal.len());
        for (id, status) in terminal {
            let Some(instance) = self.instances.shift_remove(&id) else {
                continue;
            };
            self.bus.release_instance(id);
            debug!(
                instance = %id,
                test = %instance.definition.key(),
                tick = %instance.current_tick,
                %status,
                "instance finished"
            );
            finished.push(instance.finish(status));
        }
        finished
    }
}

fn step_instance(
    inst: &mut TestInstance,
    bus: &mut EventBus,
    world: &mut dyn Simulation,
    events: &[WorldEvent],
) -> Option<TestStatus> {
    // 1. Setup pre-roll.
    if inst.status == TestStatus::Pending {
        if inst.setup_remaining > 0 {
            inst.setup_remaining -= 1;
            return None;
        }
        inst.status = TestStatus::Running;
    }

    // 2. Clock. Timeout pre-empts everything still pending.
    inst.current_tick = inst.current_tick.after(1);
    let now = inst.current_tick;
    if now.0 > inst.definition.max_ticks() {
        return Some(TestStatus::TimedOut);
    }

    // 3. Body.
    let body_ran = !inst.started;
    if body_ran {
        inst.started = true;
        run_body(inst, world, now);
    }

    // 4. Events.
    if inst.registrations.verdict.is_none() {
        deliver_events(inst, bus, world, events, now);
    }

    // 5. Continuation. A body that just suspended waits for the next tick.
    if !body_ran && inst.registrations.verdict.is_none() {
        resume_parked(inst, world, now);
    }

    // 6. Step lists.
    if inst.registrations.verdict.is_none() {
        advance_lists(inst, world, now);
    }

    // 7. This tick's registrations start next tick.
    install_registrations(inst, bus);

    match inst.registrations.verdict.take()? {
        Verdict::Succeed => Some(TestStatus::Succeeded),
        Verdict::Fail(failure) => Some(TestStatus::Failed(failure)),
    }
}

fn run_body(inst: &mut TestInstance, world: &mut dyn Simulation, now: TickId) {
    let definition = Rc::clone(&inst.definition);
    let mut ctx = TestContext::new(
        world,
        &inst.frame,
        definition.key(),
        inst.id,
        now,
        &mut inst.registrations,
    );
    match definition.body() {
        TestBody::Sync(body) => {
            if let Err(failure) = body(&mut ctx) {
                ctx.conclude(Verdict::Fail(failure.observed_at(now)));
            }
        }
        TestBody::Async(factory) => {
            let mut continuation = factory();
            match continuation.resume(&mut ctx) {
                Ok(suspend) => inst.parked = park(continuation, suspend, now),
                Err(failure) => ctx.conclude(Verdict::Fail(failure.observed_at(now))),
            }
        }
    }
}

fn deliver_events(
    inst: &mut TestInstance,
    bus: &mut EventBus,
    world: &mut dyn Simulation,
    events: &[WorldEvent],
    now: TickId,
) {
    for event in events {
        if event.position.is_some_and(|pos| !inst.frame.contains(pos)) {
            continue;
        }
        for handle in bus.handles_for(inst.id, &event.topic) {
            apply_unsubscriptions(inst, bus);
            if inst.registrations.verdict.is_some() {
                return;
            }
            let mut ctx = TestContext::new(
                world,
                &inst.frame,
                inst.definition.key(),
                inst.id,
                now,
                &mut inst.registrations,
            );
            if let Some(Err(failure)) = bus.deliver(handle, &mut ctx, event) {
                ctx.conclude(Verdict::Fail(failure.observed_at(now)));
            }
        }
    }
}

fn resume_parked(inst: &mut TestInstance, world: &mut dyn Simulation, now: TickId) {
    let Some(mut parked) = inst.parked.take() else {
        return;
    };
    let mut ctx = TestContext::new(
        world,
        &inst.frame,
        inst.definition.key(),
        inst.id,
        now,
        &mut inst.registrations,
    );
    let due = match &mut parked.wake {
        Wake::At(tick) => now >= *tick,
        Wake::Until(predicate, state) => state.poll(predicate, &mut ctx) == PollOutcome::Satisfied,
    };
    if !due || ctx.has_verdict() {
        inst.parked = Some(parked);
        return;
    }
    match parked.continuation.resume(&mut ctx) {
        Ok(suspend) => inst.parked = park(parked.continuation, suspend, now),
        Err(failure) => ctx.conclude(Verdict::Fail(failure.observed_at(now))),
    }
}

fn park(continuation: Box<dyn Continuation>, suspend: Suspend, now: TickId) -> Option<Parked> {
    let wake = match suspend {
        Suspend::Idle(ticks) => Wake::At(now.after(ticks.max(1))),
        Suspend::Until(predicate) => Wake::Until(predicate, PollState::new()),
        Suspend::Done => return None,
    };
    Some(Parked { continuation, wake })
}

fn advance_lists(inst: &mut TestInstance, world: &mut dyn Simulation, now: TickId) {
    let mut lists = std::mem::take(&mut inst.lists);
    let mut i = 0;
    while i < lists.len() {
        let mut ctx = TestContext::new(
            world,
            &inst.frame,
            inst.definition.key(),
            inst.id,
            now,
            &mut inst.registrations,
        );
        if ctx.has_verdict() {
            break;
        }
        match lists[i].advance(&mut ctx) {
            Ok(StepProgress::Exhausted) => {
                lists.remove(i);
                continue;
            }
            Ok(StepProgress::Waiting | StepProgress::Concluded) => {}
            Err(failure) => ctx.conclude(Verdict::Fail(failure.observed_at(now))),
        }
        i += 1;
    }
    inst.lists = lists;
}

// Cancel pending unsubscriptions whose subscriptions are installed;
// the rest wait for installation.
fn apply_unsubscriptions(inst: &mut TestInstance, bus: &mut EventBus) {
    inst.registrations
        .unsubscriptions
        .retain(|handle| !bus.unsubscribe(*handle));
}

fn install_registrations(inst: &mut TestInstance, bus: &mut EventBus) {
    let regs = &mut inst.registrations;
    for (handle, topic, handler) in regs.subscriptions.drain(..) {
        bus.subscribe(handle, topic, handler);
    }
    for handle in regs.unsubscriptions.drain(..) {
        bus.unsubscribe(handle);
    }
    inst.lists.extend(regs.sequences.drain(..));
}
