//! The assertion error type shared by every scenario callback.
//!
//! Predicates, actions, event handlers and test bodies all return
//! `Result<(), AssertionFailure>`. Whether an `Err` is fatal or simply
//! means "not yet" is decided by the scheduler from the kind of step
//! that produced it, never by the error itself.

use std::error::Error;
use std::fmt;

use crate::geom::BlockPos;
use crate::id::TickId;

/// A failed check inside a scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionFailure {
    /// Human-readable description of what did not hold.
    pub message: String,
    /// Relative position the check was about, if any.
    pub position: Option<BlockPos>,
    /// Instance tick at which the failure was observed. Filled in by the
    /// scheduler when the failure becomes fatal.
    pub tick: Option<TickId>,
}

impl AssertionFailure {
    /// A failure with a message and no location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            tick: None,
        }
    }

    /// A failure about a specific relative position.
    pub fn at(message: impl Into<String>, position: BlockPos) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
            tick: None,
        }
    }

    /// Attach the tick the failure was observed on, keeping an earlier
    /// value if one is already present.
    pub fn observed_at(mut self, tick: TickId) -> Self {
        self.tick.get_or_insert(tick);
        self
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(pos) = self.position {
            write!(f, " at {pos}")?;
        }
        if let Some(tick) = self.tick {
            write!(f, " (tick {tick})")?;
        }
        Ok(())
    }
}

impl Error for AssertionFailure {}

impl From<&str> for AssertionFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for AssertionFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position_and_tick() {
        let err = AssertionFailure::at("expected minecraft:piston", BlockPos::new(1, 2, 3))
            .observed_at(TickId(7));
        assert_eq!(
            err.to_string(),
            "expected minecraft:piston at (1, 2, 3) (tick 7)"
        );
    }

    #[test]
    fn first_observed_tick_is_kept() {
        let err = AssertionFailure::new("boom")
            .observed_at(TickId(3))
            .observed_at(TickId(9));
        assert_eq!(err.tick, Some(TickId(3)));
    }
}
