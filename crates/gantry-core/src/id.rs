//! Strongly-typed identifiers used throughout the harness.

use std::fmt;

/// Monotonically increasing tick counter.
///
/// Ticks are the harness's only unit of time. Instance-local clocks start
/// at `TickId(0)` and reach `TickId(1)` on the first running tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The tick `n` ticks after `self`, saturating at `u64::MAX`.
    pub fn after(self, n: u64) -> Self {
        Self(self.0.saturating_add(n))
    }

    /// Number of ticks elapsed since `earlier` (zero if `earlier` is later).
    pub fn since(self, earlier: TickId) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies one running attempt of a registered test.
///
/// Allocated sequentially by the scheduler; never reused within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for InstanceId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// One-based attempt counter for the retry ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptNumber(pub u32);

impl AttemptNumber {
    /// The first attempt of any test.
    pub const FIRST: AttemptNumber = AttemptNumber(1);

    /// The attempt following this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for AttemptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a structure template owned by the host world.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureId(pub String);

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StructureId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for StructureId {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Batch identifier. Tests sharing a batch run together under the same
/// environment setup (for example `"no_random_ticks"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub String);

impl BatchId {
    /// Batch used for tests that never call `batch()`.
    pub fn default_batch() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BatchId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

/// Fully-qualified test name: `(suite, name)`.
///
/// Unique within a registry. Displays as `suite:name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestKey {
    /// Suite the test was registered under.
    pub suite: String,
    /// Test name within the suite.
    pub name: String,
}

impl TestKey {
    /// Build a key from a suite and a test name.
    pub fn new(suite: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.suite, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_arithmetic_saturates() {
        assert_eq!(TickId(5).after(3), TickId(8));
        assert_eq!(TickId(u64::MAX).after(1), TickId(u64::MAX));
        assert_eq!(TickId(8).since(TickId(5)), 3);
        assert_eq!(TickId(2).since(TickId(5)), 0);
    }

    #[test]
    fn test_key_display() {
        let key = TestKey::new("redstone", "repeater_delay");
        assert_eq!(key.to_string(), "redstone:repeater_delay");
    }

    #[test]
    fn attempt_numbers_count_up_from_one() {
        assert_eq!(AttemptNumber::FIRST.0, 1);
        assert_eq!(AttemptNumber::FIRST.next(), AttemptNumber(2));
    }
}
