//! Harness configuration, validation, and error types.
//!
//! [`HarnessConfig`] is the runner's only input besides the test catalog.
//! [`validate()`](HarnessConfig::validate) checks structural invariants at
//! startup; test definitions are checked separately when the registry is
//! frozen, and both report through [`ConfigError`].

use std::error::Error;
use std::fmt;

use gantry_core::{Extent, TestKey};
use gantry_space::PlacementConfig;

// ── ConfigError ────────────────────────────────────────────────────

/// Invalid harness configuration or invalid test registration.
///
/// Always fatal: a run never starts with a configuration error outstanding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The registry was frozen by a run; no further registration or
    /// configuration is accepted.
    RegistryFrozen {
        /// Test the late call was about.
        key: TestKey,
    },
    /// A test with the same suite and name is already registered.
    DuplicateTest {
        /// The duplicated key.
        key: TestKey,
    },
    /// `configure()` named a test that was never registered.
    UnknownTest {
        /// The missing key.
        key: TestKey,
    },
    /// Suite or test name is empty.
    EmptyName {
        /// The offending key.
        key: TestKey,
    },
    /// `max_ticks` must exceed `setup_ticks`.
    InvalidTickBudget {
        /// Test being validated.
        key: TestKey,
        /// Configured timeout.
        max_ticks: u64,
        /// Configured setup pre-roll.
        setup_ticks: u64,
    },
    /// `max_attempts` must be at least 1.
    ZeroAttempts {
        /// Test being validated.
        key: TestKey,
    },
    /// `max_concurrent` must be at least 1.
    ZeroConcurrency,
    /// The placement grid has a zero-length axis.
    EmptyGrid {
        /// Configured grid width.
        width: u32,
        /// Configured grid depth.
        depth: u32,
    },
    /// The fallback structure extent has a zero-length axis.
    EmptyDefaultStructure,
    /// `max_run_ticks` must be at least 1.
    ZeroRunBudget,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistryFrozen { key } => {
                write!(f, "cannot configure {key}: registry is frozen")
            }
            Self::DuplicateTest { key } => write!(f, "test {key} is already registered"),
            Self::UnknownTest { key } => write!(f, "test {key} is not registered"),
            Self::EmptyName { key } => {
                write!(f, "suite and test names must be non-empty, got '{key}'")
            }
            Self::InvalidTickBudget {
                key,
                max_ticks,
                setup_ticks,
            } => write!(
                f,
                "{key}: max_ticks ({max_ticks}) must exceed setup_ticks ({setup_ticks})"
            ),
            Self::ZeroAttempts { key } => write!(f, "{key}: max_attempts must be at least 1"),
            Self::ZeroConcurrency => write!(f, "max_concurrent must be at least 1"),
            Self::EmptyGrid { width, depth } => {
                write!(f, "placement grid {width}x{depth} has no area")
            }
            Self::EmptyDefaultStructure => {
                write!(f, "default structure extent must be non-empty")
            }
            Self::ZeroRunBudget => write!(f, "max_run_ticks must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

// ── HarnessConfig ──────────────────────────────────────────────────

/// Complete configuration for a suite run.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Grid that instance regions are allocated in.
    pub placement: PlacementConfig,
    /// Maximum instances running at once within a batch. Default: 32.
    pub max_concurrent: usize,
    /// Padding for tests that do not set one. Default: 2.
    pub default_padding: u32,
    /// Footprint used for tests without a structure template.
    /// Default: 5x5x5.
    pub default_structure_extent: Extent,
    /// Hard stop for the whole run, in global ticks. Default: 1,000,000.
    pub max_run_ticks: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            max_concurrent: 32,
            default_padding: 2,
            default_structure_extent: Extent::new(5, 5, 5),
            max_run_ticks: 1_000_000,
        }
    }
}

impl HarnessConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. At least one instance must be able to run.
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        // 2. The grid must have area.
        if self.placement.width == 0 || self.placement.depth == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.placement.width,
                depth: self.placement.depth,
            });
        }
        // 3. The fallback footprint must be placeable.
        if self.default_structure_extent.is_empty() {
            return Err(ConfigError::EmptyDefaultStructure);
        }
        // 4. The run must be allowed to tick.
        if self.max_run_ticks == 0 {
            return Err(ConfigError::ZeroRunBudget);
        }
        Ok(())
    }
}
