//! Test registration, validation, and selection.
//!
//! Tests are registered into a mutable [`TestRegistry`] and configured
//! through the [`RegistrationHandle`] it returns. [`TestRegistry::freeze`]
//! validates every definition and produces the immutable [`TestCatalog`]
//! a run consumes; from then on the registry rejects further changes.

use std::fmt;
use std::rc::Rc;

use gantry_core::{AssertionFailure, BatchId, StructureId, TestKey};
use indexmap::{IndexMap, IndexSet};

use crate::config::ConfigError;
use crate::context::TestContext;
use crate::continuation::Continuation;

/// Tag selecting a test for the default suite run.
pub const SUITE_DEFAULT: &str = "suiteDefault";

/// Tag excluding a test from runs that do not ask for it by name.
pub const SUITE_DISABLED: &str = "suiteDisabled";

// ── TestBody ──────────────────────────────────────────────────────

/// Scenario entry point, invoked once per attempt on the body tick.
#[derive(Clone)]
pub enum TestBody {
    /// Runs to completion on the body tick, registering sequences,
    /// handlers and verdicts on the context.
    Sync(Rc<dyn Fn(&mut TestContext<'_>) -> Result<(), AssertionFailure>>),
    /// Builds a fresh continuation per attempt; the scheduler resumes it
    /// at each suspension point.
    Async(Rc<dyn Fn() -> Box<dyn Continuation>>),
}

impl fmt::Debug for TestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Sync(..)"),
            Self::Async(_) => f.write_str("Async(..)"),
        }
    }
}

// ── TestDefinition ────────────────────────────────────────────────

/// Everything the harness knows about one registered test.
#[derive(Clone, Debug)]
pub struct TestDefinition {
    key: TestKey,
    body: TestBody,
    structure: Option<StructureId>,
    tags: IndexSet<String>,
    max_ticks: u64,
    setup_ticks: u64,
    padding: Option<u32>,
    rotatable: bool,
    batch: Option<BatchId>,
    required: bool,
    max_attempts: u32,
}

impl TestDefinition {
    fn new(key: TestKey, body: TestBody) -> Self {
        Self {
            key,
            body,
            structure: None,
            tags: IndexSet::new(),
            max_ticks: 100,
            setup_ticks: 0,
            padding: None,
            rotatable: false,
            batch: None,
            required: true,
            max_attempts: 1,
        }
    }

    /// Suite and test name.
    pub fn key(&self) -> &TestKey {
        &self.key
    }

    /// Scenario entry point.
    pub fn body(&self) -> &TestBody {
        &self.body
    }

    /// Structure template to load, if any.
    pub fn structure(&self) -> Option<&StructureId> {
        self.structure.as_ref()
    }

    /// Tags in the order they were added.
    pub fn tags(&self) -> &IndexSet<String> {
        &self.tags
    }

    /// Whether `tag` was added.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Instance ticks allowed before timing out.
    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Ticks to wait after placement before the clock starts.
    pub fn setup_ticks(&self) -> u64 {
        self.setup_ticks
    }

    /// Explicit padding, or `None` for the harness default.
    pub fn padding(&self) -> Option<u32> {
        self.padding
    }

    /// Whether the harness may rotate the structure.
    pub fn rotatable(&self) -> bool {
        self.rotatable
    }

    /// Batch the test runs in, or `None` for the default batch.
    pub fn batch(&self) -> Option<&BatchId> {
        self.batch.as_ref()
    }

    /// Whether a failure fails the suite.
    pub fn required(&self) -> bool {
        self.required
    }

    /// Attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ticks <= self.setup_ticks {
            return Err(ConfigError::InvalidTickBudget {
                key: self.key.clone(),
                max_ticks: self.max_ticks,
                setup_ticks: self.setup_ticks,
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts {
                key: self.key.clone(),
            });
        }
        Ok(())
    }
}

// ── RegistrationHandle ────────────────────────────────────────────

/// Chained configuration of one registered test.
///
/// Every setter overwrites, except [`tag`](Self::tag) which accumulates.
#[derive(Debug)]
pub struct RegistrationHandle<'a> {
    definition: &'a mut TestDefinition,
}

impl RegistrationHandle<'_> {
    /// Add a tag.
    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.definition.tags.insert(tag.into());
        self
    }

    /// Structure template to load for each attempt.
    pub fn structure_name(self, structure: impl Into<StructureId>) -> Self {
        self.definition.structure = Some(structure.into());
        self
    }

    /// Instance ticks allowed before timing out.
    pub fn max_ticks(self, ticks: u64) -> Self {
        self.definition.max_ticks = ticks;
        self
    }

    /// Ticks to wait after placement before the clock starts.
    pub fn setup_ticks(self, ticks: u64) -> Self {
        self.definition.setup_ticks = ticks;
        self
    }

    /// Isolation margin around the structure.
    pub fn padding(self, padding: u32) -> Self {
        self.definition.padding = Some(padding);
        self
    }

    /// Run with the other tests of `batch`.
    pub fn batch(self, batch: impl Into<BatchId>) -> Self {
        self.definition.batch = Some(batch.into());
        self
    }

    /// Whether a failure fails the suite.
    pub fn required(self, required: bool) -> Self {
        self.definition.required = required;
        self
    }

    /// Allow the harness to run the scenario at any of four rotations.
    pub fn rotate_test(self, rotatable: bool) -> Self {
        self.definition.rotatable = rotatable;
        self
    }

    /// Attempt budget; must be at least 1.
    pub fn max_attempts(self, attempts: u32) -> Self {
        self.definition.max_attempts = attempts;
        self
    }
}

// ── TestRegistry ──────────────────────────────────────────────────

/// Mutable collection of test definitions, in registration order.
#[derive(Debug, Default)]
pub struct TestRegistry {
    tests: IndexMap<TestKey, TestDefinition>,
    frozen: bool,
}

impl TestRegistry {
    /// An empty, unfrozen registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered tests.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Whether [`freeze`](Self::freeze) has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Register a test whose body runs to completion on its first tick.
    pub fn register(
        &mut self,
        suite: impl Into<String>,
        name: impl Into<String>,
        body: impl Fn(&mut TestContext<'_>) -> Result<(), AssertionFailure> + 'static,
    ) -> Result<RegistrationHandle<'_>, ConfigError> {
        self.insert(TestKey::new(suite, name), TestBody::Sync(Rc::new(body)))
    }

    /// Register a test whose body suspends between ticks.
    ///
    /// `factory` is called once per attempt so every attempt starts from a
    /// fresh continuation.
    pub fn register_async<C>(
        &mut self,
        suite: impl Into<String>,
        name: impl Into<String>,
        factory: impl Fn() -> C + 'static,
    ) -> Result<RegistrationHandle<'_>, ConfigError>
    where
        C: Continuation + 'static,
    {
        let factory: Rc<dyn Fn() -> Box<dyn Continuation>> =
            Rc::new(move || Box::new(factory()) as Box<dyn Continuation>);
        self.insert(TestKey::new(suite, name), TestBody::Async(factory))
    }

    /// Reopen the configuration of an already registered test.
    pub fn configure(
        &mut self,
        suite: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<RegistrationHandle<'_>, ConfigError> {
        let key = TestKey::new(suite, name);
        if self.frozen {
            return Err(ConfigError::RegistryFrozen { key });
        }
        match self.tests.get_mut(&key) {
            Some(definition) => Ok(RegistrationHandle { definition }),
            None => Err(ConfigError::UnknownTest { key }),
        }
    }

    /// Validate every definition and close the registry.
    ///
    /// # Errors
    ///
    /// The first invalid definition, in registration order. The registry
    /// stays open when validation fails.
    pub fn freeze(&mut self) -> Result<TestCatalog, ConfigError> {
        for definition in self.tests.values() {
            definition.validate()?;
        }
        self.frozen = true;
        Ok(TestCatalog {
            tests: self.tests.values().cloned().map(Rc::new).collect(),
        })
    }

    fn insert(
        &mut self,
        key: TestKey,
        body: TestBody,
    ) -> Result<RegistrationHandle<'_>, ConfigError> {
        if self.frozen {
            return Err(ConfigError::RegistryFrozen { key });
        }
        if key.suite.is_empty() || key.name.is_empty() {
            return Err(ConfigError::EmptyName { key });
        }
        if self.tests.contains_key(&key) {
            return Err(ConfigError::DuplicateTest { key });
        }
        let definition = self
            .tests
            .entry(key.clone())
            .or_insert_with(|| TestDefinition::new(key, body));
        Ok(RegistrationHandle { definition })
    }
}

// ── TestCatalog ───────────────────────────────────────────────────

/// Frozen, validated test definitions in registration order.
#[derive(Clone, Debug, Default)]
pub struct TestCatalog {
    tests: Vec<Rc<TestDefinition>>,
}

impl TestCatalog {
    /// Number of tests.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Look up a test by key.
    pub fn get(&self, key: &TestKey) -> Option<&Rc<TestDefinition>> {
        self.tests.iter().find(|d| d.key() == key)
    }

    /// All tests in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<TestDefinition>> {
        self.tests.iter()
    }

    /// Tests matching `filter`, in registration order.
    pub fn select(&self, filter: &TestFilter) -> Vec<Rc<TestDefinition>> {
        self.tests
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect()
    }
}

// ── TestFilter ────────────────────────────────────────────────────

/// Selects the tests a run should execute.
///
/// Empty criteria match everything. Tests tagged [`SUITE_DISABLED`] are
/// excluded unless that tag is requested. Requesting [`SUITE_DEFAULT`]
/// also selects tests with no tags at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestFilter {
    suites: Vec<String>,
    tags: Vec<String>,
    name_contains: Option<String>,
}

impl TestFilter {
    /// Matches every enabled test.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to `suite` (repeatable; any listed suite matches).
    pub fn suite(mut self, suite: impl Into<String>) -> Self {
        self.suites.push(suite.into());
        self
    }

    /// Restrict to tests carrying `tag` (repeatable; any listed tag
    /// matches).
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Restrict to test names containing `fragment`.
    pub fn name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    /// Whether `definition` is selected.
    pub fn matches(&self, definition: &TestDefinition) -> bool {
        let wants = |tag: &str| self.tags.iter().any(|t| t == tag);
        if definition.has_tag(SUITE_DISABLED) && !wants(SUITE_DISABLED) {
            return false;
        }
        if !self.suites.is_empty() && !self.suites.contains(&definition.key().suite) {
            return false;
        }
        if !self.tags.is_empty() {
            let tagged = definition.tags().iter().any(|t| wants(t));
            let untagged_default = definition.tags().is_empty() && wants(SUITE_DEFAULT);
            if !tagged && !untagged_default {
                return false;
            }
        }
        match &self.name_contains {
            Some(fragment) => definition.key().name.contains(fragment.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuation::{Stages, Suspend};

    fn noop(_: &mut TestContext<'_>) -> Result<(), AssertionFailure> {
        Ok(())
    }

    #[test]
    fn defaults_match_documented_values() {
        let mut reg = TestRegistry::new();
        reg.register("redstone", "torch", noop).unwrap();
        let catalog = reg.freeze().unwrap();
        let def = &catalog.iter().next().unwrap();
        assert_eq!(def.max_ticks(), 100);
        assert_eq!(def.setup_ticks(), 0);
        assert_eq!(def.padding(), None);
        assert!(!def.rotatable());
        assert!(def.required());
        assert_eq!(def.max_attempts(), 1);
        assert!(def.batch().is_none());
    }

    #[test]
    fn chained_configuration_overwrites_and_tags_accumulate() {
        let mut reg = TestRegistry::new();
        reg.register("piston", "push", noop)
            .unwrap()
            .max_ticks(20)
            .max_ticks(40)
            .tag("slow")
            .tag("suite:java_parity")
            .tag("slow")
            .structure_name("piston_push")
            .padding(4)
            .batch("no_random_ticks")
            .required(false)
            .rotate_test(true)
            .max_attempts(3)
            .setup_ticks(5);
        let catalog = reg.freeze().unwrap();
        let def = catalog.get(&TestKey::new("piston", "push")).unwrap();
        assert_eq!(def.max_ticks(), 40);
        assert_eq!(
            def.tags().iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["slow", "suite:java_parity"]
        );
        assert_eq!(def.structure(), Some(&StructureId::from("piston_push")));
        assert_eq!(def.padding(), Some(4));
        assert_eq!(def.batch(), Some(&BatchId::from("no_random_ticks")));
        assert!(!def.required());
        assert!(def.rotatable());
        assert_eq!(def.max_attempts(), 3);
        assert_eq!(def.setup_ticks(), 5);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = TestRegistry::new();
        reg.register("s", "t", noop).unwrap();
        let err = reg.register("s", "t", noop).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateTest {
                key: TestKey::new("s", "t")
            }
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut reg = TestRegistry::new();
        assert!(matches!(
            reg.register("", "t", noop),
            Err(ConfigError::EmptyName { .. })
        ));
    }

    #[test]
    fn frozen_registry_rejects_changes() {
        let mut reg = TestRegistry::new();
        reg.register("s", "t", noop).unwrap();
        reg.freeze().unwrap();
        assert!(reg.is_frozen());
        assert!(matches!(
            reg.register("s", "u", noop),
            Err(ConfigError::RegistryFrozen { .. })
        ));
        assert!(matches!(
            reg.register_async("s", "v", Stages::new),
            Err(ConfigError::RegistryFrozen { .. })
        ));
        assert!(matches!(
            reg.configure("s", "t"),
            Err(ConfigError::RegistryFrozen { .. })
        ));
    }

    #[test]
    fn configure_reaches_registered_tests_only() {
        let mut reg = TestRegistry::new();
        reg.register("s", "t", noop).unwrap();
        reg.configure("s", "t").unwrap().max_ticks(7);
        assert!(matches!(
            reg.configure("s", "missing"),
            Err(ConfigError::UnknownTest { .. })
        ));
        let catalog = reg.freeze().unwrap();
        assert_eq!(catalog.get(&TestKey::new("s", "t")).unwrap().max_ticks(), 7);
    }

    #[test]
    fn freeze_reports_invalid_budgets() {
        let mut reg = TestRegistry::new();
        reg.register("s", "t", noop).unwrap().max_ticks(5).setup_ticks(5);
        assert!(matches!(
            reg.freeze(),
            Err(ConfigError::InvalidTickBudget { max_ticks: 5, setup_ticks: 5, .. })
        ));
        assert!(!reg.is_frozen());
        reg.configure("s", "t").unwrap().max_ticks(6).max_attempts(0);
        assert!(matches!(reg.freeze(), Err(ConfigError::ZeroAttempts { .. })));
    }

    #[test]
    fn async_bodies_are_recorded() {
        let mut reg = TestRegistry::new();
        reg.register_async("s", "a", || {
            Stages::new().then(|ctx| {
                ctx.succeed();
                Ok(Suspend::Done)
            })
        })
        .unwrap();
        let catalog = reg.freeze().unwrap();
        assert!(matches!(
            catalog.iter().next().unwrap().body(),
            TestBody::Async(_)
        ));
    }

    fn filter_catalog() -> TestCatalog {
        let mut reg = TestRegistry::new();
        reg.register("redstone", "torch_burnout", noop).unwrap();
        reg.register("redstone", "repeater_delay", noop)
            .unwrap()
            .tag(SUITE_DEFAULT);
        reg.register("piston", "slime_push", noop)
            .unwrap()
            .tag("suite:java_parity");
        reg.register("piston", "quasi_connectivity", noop)
            .unwrap()
            .tag(SUITE_DISABLED);
        reg.freeze().unwrap()
    }

    fn names(defs: Vec<Rc<TestDefinition>>) -> Vec<String> {
        defs.iter().map(|d| d.key().name.clone()).collect()
    }

    #[test]
    fn unfiltered_selection_skips_disabled_tests() {
        let selected = filter_catalog().select(&TestFilter::all());
        assert_eq!(
            names(selected),
            vec!["torch_burnout", "repeater_delay", "slime_push"]
        );
    }

    #[test]
    fn default_tag_selects_untagged_tests_too() {
        let selected = filter_catalog().select(&TestFilter::all().tag(SUITE_DEFAULT));
        assert_eq!(names(selected), vec!["torch_burnout", "repeater_delay"]);
    }

    #[test]
    fn disabled_tests_run_only_when_requested() {
        let selected = filter_catalog().select(&TestFilter::all().tag(SUITE_DISABLED));
        assert_eq!(names(selected), vec!["quasi_connectivity"]);
    }

    #[test]
    fn suite_and_name_filters_combine() {
        let catalog = filter_catalog();
        let selected = catalog.select(&TestFilter::all().suite("redstone").name_contains("delay"));
        assert_eq!(names(selected), vec!["repeater_delay"]);
        let selected = catalog.select(&TestFilter::all().suite("piston"));
        assert_eq!(names(selected), vec!["slime_push"]);
    }
}
