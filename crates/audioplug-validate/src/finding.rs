use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// Stable finding codes. The serialized form is the dotted code printed in
/// reports, so renaming a variant never changes the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    #[serde(rename = "lifecycle.invalid-transition")]
    InvalidTransition,
    #[serde(rename = "lifecycle.process-not-permitted")]
    ProcessNotPermitted,
    #[serde(rename = "lifecycle.missing-setup")]
    MissingSetup,
    #[serde(rename = "lifecycle.repeated-activation")]
    RepeatedActivation,
    #[serde(rename = "component.call-failed")]
    CallFailed,
    #[serde(rename = "component.accepted-illegal-call")]
    AcceptedIllegalCall,
    #[serde(rename = "events.count-exceeded")]
    EventCountExceeded,
    #[serde(rename = "events.out-of-order")]
    EventOutOfOrder,
    #[serde(rename = "events.bus-index")]
    EventBusIndex,
    #[serde(rename = "events.channel-index")]
    EventChannelIndex,
    #[serde(rename = "events.sample-offset")]
    EventSampleOffset,
    #[serde(rename = "events.pitch-range")]
    EventPitchRange,
    #[serde(rename = "events.normalized-range")]
    EventNormalizedRange,
    #[serde(rename = "note-expression.unknown-type")]
    NoteExpressionUnknownType,
    #[serde(rename = "note-expression.range")]
    NoteExpressionRange,
    #[serde(rename = "parameters.normalized-range")]
    ParameterNormalizedRange,
    #[serde(rename = "parameters.sample-offset")]
    ParameterSampleOffset,
    #[serde(rename = "parameters.out-of-order")]
    ParameterOutOfOrder,
    #[serde(rename = "parameters.unknown-id")]
    ParameterUnknownId,
    #[serde(rename = "parameters.declaration")]
    ParameterDeclaration,
    #[serde(rename = "context.sample-rate")]
    ContextSampleRate,
    #[serde(rename = "context.system-time")]
    ContextSystemTime,
    #[serde(rename = "buffers.sample-size")]
    BufferSampleSize,
    #[serde(rename = "buffers.block-size")]
    BufferBlockSize,
    #[serde(rename = "buffers.bus-count")]
    BufferBusCount,
    #[serde(rename = "buffers.channel-count")]
    BufferChannelCount,
    #[serde(rename = "buffers.channel-length")]
    BufferChannelLength,
    #[serde(rename = "call.reentrant")]
    Reentrant,
    #[serde(rename = "setup.invalid")]
    InvalidSetup,
    #[serde(rename = "output.non-finite")]
    OutputNonFinite,
    #[serde(rename = "output.silence-flags")]
    OutputSilenceFlags,
    #[serde(rename = "output.parameters")]
    OutputParameters,
    #[serde(rename = "output.passthrough")]
    OutputPassthrough,
    #[serde(rename = "handler.edit-protocol")]
    EditProtocol,
    #[serde(rename = "buses.declaration")]
    BusDeclaration,
    #[serde(rename = "controller.link")]
    ControllerLink,
}

impl Category {
    pub const ALL: [Category; 36] = [
        Category::InvalidTransition,
        Category::ProcessNotPermitted,
        Category::MissingSetup,
        Category::RepeatedActivation,
        Category::CallFailed,
        Category::AcceptedIllegalCall,
        Category::EventCountExceeded,
        Category::EventOutOfOrder,
        Category::EventBusIndex,
        Category::EventChannelIndex,
        Category::EventSampleOffset,
        Category::EventPitchRange,
        Category::EventNormalizedRange,
        Category::NoteExpressionUnknownType,
        Category::NoteExpressionRange,
        Category::ParameterNormalizedRange,
        Category::ParameterSampleOffset,
        Category::ParameterOutOfOrder,
        Category::ParameterUnknownId,
        Category::ParameterDeclaration,
        Category::ContextSampleRate,
        Category::ContextSystemTime,
        Category::BufferSampleSize,
        Category::BufferBlockSize,
        Category::BufferBusCount,
        Category::BufferChannelCount,
        Category::BufferChannelLength,
        Category::Reentrant,
        Category::InvalidSetup,
        Category::OutputNonFinite,
        Category::OutputSilenceFlags,
        Category::OutputParameters,
        Category::OutputPassthrough,
        Category::EditProtocol,
        Category::BusDeclaration,
        Category::ControllerLink,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Category::InvalidTransition => "lifecycle.invalid-transition",
            Category::ProcessNotPermitted => "lifecycle.process-not-permitted",
            Category::MissingSetup => "lifecycle.missing-setup",
            Category::RepeatedActivation => "lifecycle.repeated-activation",
            Category::CallFailed => "component.call-failed",
            Category::AcceptedIllegalCall => "component.accepted-illegal-call",
            Category::EventCountExceeded => "events.count-exceeded",
            Category::EventOutOfOrder => "events.out-of-order",
            Category::EventBusIndex => "events.bus-index",
            Category::EventChannelIndex => "events.channel-index",
            Category::EventSampleOffset => "events.sample-offset",
            Category::EventPitchRange => "events.pitch-range",
            Category::EventNormalizedRange => "events.normalized-range",
            Category::NoteExpressionUnknownType => "note-expression.unknown-type",
            Category::NoteExpressionRange => "note-expression.range",
            Category::ParameterNormalizedRange => "parameters.normalized-range",
            Category::ParameterSampleOffset => "parameters.sample-offset",
            Category::ParameterOutOfOrder => "parameters.out-of-order",
            Category::ParameterUnknownId => "parameters.unknown-id",
            Category::ParameterDeclaration => "parameters.declaration",
            Category::ContextSampleRate => "context.sample-rate",
            Category::ContextSystemTime => "context.system-time",
            Category::BufferSampleSize => "buffers.sample-size",
            Category::BufferBlockSize => "buffers.block-size",
            Category::BufferBusCount => "buffers.bus-count",
            Category::BufferChannelCount => "buffers.channel-count",
            Category::BufferChannelLength => "buffers.channel-length",
            Category::Reentrant => "call.reentrant",
            Category::InvalidSetup => "setup.invalid",
            Category::OutputNonFinite => "output.non-finite",
            Category::OutputSilenceFlags => "output.silence-flags",
            Category::OutputParameters => "output.parameters",
            Category::OutputPassthrough => "output.passthrough",
            Category::EditProtocol => "handler.edit-protocol",
            Category::BusDeclaration => "buses.declaration",
            Category::ControllerLink => "controller.link",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Violation,
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    /// Name of the conformance test that was running, if any.
    pub test: Option<String>,
}

/// Shared, append-only record of findings. Clones write to the same log.
#[derive(Debug, Clone, Default)]
pub struct FindingLog {
    inner: Arc<Mutex<LogState>>,
}

#[derive(Debug, Default)]
struct LogState {
    findings: Vec<Finding>,
    test: Option<String>,
}

impl FindingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags subsequent findings with a test name.
    pub fn set_test(&self, test: Option<&str>) {
        self.inner.lock().test = test.map(str::to_owned);
    }

    pub fn record(&self, category: Category, message: impl Into<String>) {
        self.push(category, Severity::Violation, message.into());
    }

    pub fn advisory(&self, category: Category, message: impl Into<String>) {
        self.push(category, Severity::Advisory, message.into());
    }

    fn push(&self, category: Category, severity: Severity, message: String) {
        let mut state = self.inner.lock();
        match severity {
            Severity::Violation => tracing::warn!(%category, test = ?state.test, "{message}"),
            Severity::Advisory => tracing::info!(%category, test = ?state.test, "{message}"),
        }
        let test = state.test.clone();
        state.findings.push(Finding {
            category,
            severity,
            message,
            test,
        });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.inner.lock().findings.clone()
    }

    pub fn count(&self, category: Category) -> usize {
        self.inner
            .lock()
            .findings
            .iter()
            .filter(|finding| finding.category == category)
            .count()
    }

    pub fn violations(&self) -> Vec<Finding> {
        self.inner
            .lock()
            .findings
            .iter()
            .filter(|finding| finding.severity == Severity::Violation)
            .cloned()
            .collect()
    }

    pub fn violation_count(&self) -> usize {
        self.inner
            .lock()
            .findings
            .iter()
            .filter(|finding| finding.severity == Severity::Violation)
            .count()
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&self) -> Vec<Finding> {
        std::mem::take(&mut self.inner.lock().findings)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn serialized_category_matches_code() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.code()));
        }
    }

    #[test]
    fn clones_share_one_log() {
        let log = FindingLog::new();
        let clone = log.clone();
        clone.set_test(Some("bus-scan"));
        clone.record(Category::EventOutOfOrder, "pair 0/1");
        log.advisory(Category::RepeatedActivation, "again");
        assert_eq!(log.len(), 2);
        assert_eq!(log.violation_count(), 1);
        assert_eq!(log.count(Category::EventOutOfOrder), 1);
        assert_eq!(log.findings()[0].test.as_deref(), Some("bus-scan"));
        assert_eq!(log.drain().len(), 2);
        assert!(clone.is_empty());
    }
}
