//! Conformance test harness.
//!
//! Each test runs against a fresh finding log tagged with its name. A test
//! fails when it says so, when it panics, or when it leaves a violation in
//! its log; advisories never fail a test.

use std::panic::{catch_unwind, AssertUnwindSafe};

use audioplug_sdk::{ClassCategory, PluginFactory, ProcessSetup, SampleSize, Uid};
use serde::Serialize;

use crate::config::{Suite, ValidatorConfig};
use crate::finding::{Finding, FindingLog, Severity};
use crate::provider::{PluginProvider, ProviderError, ProvidedPlugin};
use crate::report::{ClassReport, RunReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Skipped(String),
    Failed(String),
}

pub trait ConformanceTest: Send + Sync {
    fn name(&self) -> &'static str;
    fn suite(&self) -> Suite;
    fn description(&self) -> &'static str;
    fn run(&self, cx: &mut TestContext<'_>) -> anyhow::Result<TestOutcome>;
}

pub struct TestContext<'a> {
    pub config: &'a ValidatorConfig,
    pub provider: &'a PluginProvider<'a>,
    pub log: FindingLog,
}

impl TestContext<'_> {
    /// A new processor/controller pair in `Created`, with the configured
    /// event limit applied.
    pub fn create(&self) -> Result<ProvidedPlugin, ProviderError> {
        let mut plugin = self.provider.create(&self.log)?;
        plugin
            .driver
            .checker_mut()
            .set_max_events(self.config.max_events);
        Ok(plugin)
    }

    pub fn setup(&self, sample_rate: f64) -> ProcessSetup {
        ProcessSetup::new(sample_rate, self.config.block_size)
    }

    pub fn setup_with(&self, sample_rate: f64, sample_size: SampleSize) -> ProcessSetup {
        self.setup(sample_rate).with_sample_size(sample_size)
    }

    /// Creates an instance and drives it to `Processing`.
    pub fn started(&self, setup: &ProcessSetup) -> anyhow::Result<ProvidedPlugin> {
        let mut plugin = self.create()?;
        plugin.driver.start(setup)?;
        Ok(plugin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    Passed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: &'static str,
    pub suite: Suite,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub findings: Vec<Finding>,
}

impl TestResult {
    pub fn violations(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Violation)
    }
}

pub struct Validator {
    config: ValidatorConfig,
    tests: Vec<Box<dyn ConformanceTest>>,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self::with_tests(config, crate::suites::default_tests())
    }

    pub fn with_tests(config: ValidatorConfig, tests: Vec<Box<dyn ConformanceTest>>) -> Self {
        Self { config, tests }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Tests enabled by the configuration, in run order.
    pub fn tests(&self) -> impl Iterator<Item = &dyn ConformanceTest> {
        self.tests
            .iter()
            .map(|test| test.as_ref())
            .filter(|test| self.config.runs(test.suite()))
    }

    /// Runs every processor class, or just `only` when given.
    pub fn run(&self, factory: &dyn PluginFactory, only: Option<&Uid>) -> Result<RunReport, ProviderError> {
        let mut classes = Vec::new();
        for class in factory.classes() {
            if class.category != ClassCategory::Processor {
                continue;
            }
            if only.is_some_and(|cid| *cid != class.cid) {
                continue;
            }
            classes.push(self.run_class(factory, &class.cid)?);
        }
        if let Some(cid) = only {
            if classes.is_empty() {
                return Err(ProviderError::UnknownClass(*cid));
            }
        }
        Ok(RunReport {
            factory: factory.factory_info(),
            classes,
        })
    }

    pub fn run_class(&self, factory: &dyn PluginFactory, cid: &Uid) -> Result<ClassReport, ProviderError> {
        let provider = PluginProvider::new(factory, cid)?;
        tracing::info!(class = %provider.class().name, %cid, "validating class");
        let results = self
            .tests()
            .map(|test| self.run_test(test, &provider))
            .collect();
        Ok(ClassReport {
            cid: cid.to_string(),
            name: provider.class().name.clone(),
            sub_categories: provider.class().sub_categories.clone(),
            results,
        })
    }

    fn run_test(&self, test: &dyn ConformanceTest, provider: &PluginProvider<'_>) -> TestResult {
        let log = FindingLog::new();
        log.set_test(Some(test.name()));
        let mut cx = TestContext {
            config: &self.config,
            provider,
            log: log.clone(),
        };
        tracing::debug!(test = test.name(), suite = %test.suite(), "running");

        let outcome = match catch_unwind(AssertUnwindSafe(|| test.run(&mut cx))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => TestOutcome::Failed(format!("{err:#}")),
            Err(panic) => TestOutcome::Failed(format!("panicked: {}", panic_message(panic.as_ref()))),
        };
        drop(cx);

        let findings = log.drain();
        let violations = findings
            .iter()
            .filter(|finding| finding.severity == Severity::Violation)
            .count();
        let (status, message) = match outcome {
            TestOutcome::Failed(message) => (TestStatus::Failed, Some(message)),
            _ if violations > 0 => (
                TestStatus::Failed,
                Some(format!("{violations} contract violation(s)")),
            ),
            TestOutcome::Skipped(reason) => (TestStatus::Skipped, Some(reason)),
            TestOutcome::Passed => (TestStatus::Passed, None),
        };
        match status {
            TestStatus::Failed => tracing::warn!(test = test.name(), message = ?message, "failed"),
            _ => tracing::debug!(test = test.name(), ?status, "finished"),
        }
        TestResult {
            name: test.name(),
            suite: test.suite(),
            status,
            message,
            findings,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
