//! Resumable test bodies.
//!
//! An async test is a [`Continuation`]: the scheduler calls
//! [`resume`](Continuation::resume) on the body tick and again whenever
//! the returned [`Suspend`] point is reached. Between resumes the
//! continuation is parked on the instance and costs nothing but a wake
//! check per tick.

use std::collections::VecDeque;
use std::fmt;

use gantry_core::AssertionFailure;

use crate::context::TestContext;
use crate::polling::Callback;

/// Where a continuation yields back to the scheduler.
pub enum Suspend {
    /// Resume after this many ticks. `Idle(0)` resumes on the next tick.
    Idle(u64),
    /// Poll the predicate from the next tick on; resume on the tick it
    /// first holds.
    Until(Callback),
    /// Nothing left to run. The test still needs a verdict from a
    /// sequence, a handler, or the instance timeout.
    Done,
}

impl Suspend {
    /// `Until` from a closure.
    pub fn until(
        predicate: impl FnMut(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) -> Self {
        Self::Until(Box::new(predicate))
    }
}

impl fmt::Debug for Suspend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle(n) => write!(f, "Idle({n})"),
            Self::Until(_) => f.write_str("Until(..)"),
            Self::Done => f.write_str("Done"),
        }
    }
}

/// A test body that runs in resumable pieces.
///
/// An `Err` from `resume` fails the test.
pub trait Continuation {
    /// Run until the next suspension point.
    fn resume(&mut self, ctx: &mut TestContext<'_>) -> Result<Suspend, AssertionFailure>;
}

impl<F> Continuation for F
where
    F: FnMut(&mut TestContext<'_>) -> Result<Suspend, AssertionFailure>,
{
    fn resume(&mut self, ctx: &mut TestContext<'_>) -> Result<Suspend, AssertionFailure> {
        self(ctx)
    }
}

type Stage = Box<dyn FnOnce(&mut TestContext<'_>) -> Result<Suspend, AssertionFailure>>;

/// A continuation assembled from stages that each run once, in order.
///
/// Each stage returns the suspension to wait on before the next stage
/// runs. After the last stage the continuation is [`Suspend::Done`].
///
/// ```ignore
/// let body = Stages::new()
///     .then(|ctx| {
///         ctx.set_block(BlockPos::new(1, 1, 1), Some(&"minecraft:redstone_block".into()));
///         Ok(Suspend::Idle(4))
///     })
///     .then(|ctx| {
///         ctx.assert_block_present(&"minecraft:piston_head".into(), BlockPos::new(1, 1, 3), true)?;
///         ctx.succeed();
///         Ok(Suspend::Done)
///     });
/// ```
#[derive(Default)]
pub struct Stages {
    stages: VecDeque<Stage>,
}

impl Stages {
    /// No stages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn then(
        mut self,
        stage: impl FnOnce(&mut TestContext<'_>) -> Result<Suspend, AssertionFailure> + 'static,
    ) -> Self {
        self.stages.push_back(Box::new(stage));
        self
    }

    /// Stages not yet run.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }
}

impl Continuation for Stages {
    fn resume(&mut self, ctx: &mut TestContext<'_>) -> Result<Suspend, AssertionFailure> {
        match self.stages.pop_front() {
            Some(stage) => stage(ctx),
            None => Ok(Suspend::Done),
        }
    }
}

impl fmt::Debug for Stages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stages")
            .field("remaining", &self.stages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::harness::{frame, with_context};
    use crate::context::Registrations;
    use gantry_core::Rotation;
    use gantry_test_utils::GridWorld;

    fn resume_at(c: &mut dyn Continuation, tick: u64) -> Result<Suspend, AssertionFailure> {
        let mut world = GridWorld::new();
        let f = frame(Rotation::None);
        let mut regs = Registrations::default();
        with_context(&mut world, &f, &mut regs, tick, |ctx| c.resume(ctx))
    }

    #[test]
    fn stages_run_in_order_then_finish() {
        let mut body = Stages::new()
            .then(|_| Ok(Suspend::Idle(3)))
            .then(|ctx| {
                ctx.assert(ctx.tick().0 == 4, "second stage on tick 4")?;
                Ok(Suspend::Done)
            });
        assert!(matches!(resume_at(&mut body, 1), Ok(Suspend::Idle(3))));
        assert_eq!(body.remaining(), 1);
        assert!(matches!(resume_at(&mut body, 4), Ok(Suspend::Done)));
        assert!(matches!(resume_at(&mut body, 5), Ok(Suspend::Done)));
    }

    #[test]
    fn stage_errors_propagate() {
        let mut body = Stages::new().then(|ctx| {
            ctx.assert(false, "lever missing")?;
            Ok(Suspend::Done)
        });
        let err = resume_at(&mut body, 1).unwrap_err();
        assert_eq!(err.message, "lever missing");
    }

    #[test]
    fn closures_are_continuations() {
        let mut calls = 0;
        let mut body = move |_: &mut TestContext<'_>| -> Result<Suspend, AssertionFailure> {
            calls += 1;
            Ok(if calls < 2 { Suspend::Idle(1) } else { Suspend::Done })
        };
        assert!(matches!(resume_at(&mut body, 1), Ok(Suspend::Idle(1))));
        assert!(matches!(resume_at(&mut body, 2), Ok(Suspend::Done)));
    }
}
