//! Conformance checking for audioplug modules.
//!
//! [`LifecycleController`] gates every host call against the component state
//! machine, [`ContractChecker`] validates what travels with each process
//! call, and [`Validator`] runs the default suites over every processor class
//! a factory exports. Findings are collected, never thrown, so one run
//! enumerates every defect it can reach.

pub mod buffers;
pub mod config;
pub mod contract;
pub mod finding;
pub mod handler;
pub mod harness;
pub mod lifecycle;
pub mod provider;
pub mod report;
pub mod suites;

pub use buffers::ProcessBuffers;
pub use config::{ConfigError, Suite, ValidatorConfig};
pub use contract::{CallTracker, ContractChecker, ControllerDeclarations};
pub use finding::{Category, Finding, FindingLog, Severity};
pub use handler::{Edit, RecordingHandler};
pub use harness::{ConformanceTest, TestContext, TestOutcome, TestResult, TestStatus, Validator};
pub use lifecycle::{DriverError, LifecycleController};
pub use provider::{Block, PluginProvider, ProvidedPlugin, ProviderError};
pub use report::{ClassReport, RunReport};
