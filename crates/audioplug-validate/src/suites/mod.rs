//! Default conformance suites.

mod general;
mod lifecycle;
mod processing;

use audioplug_sdk::ParameterInfo;

use crate::harness::ConformanceTest;

pub use general::{BusScan, ControllerLink, ParameterScan, SampleSizeSupport};
pub use lifecycle::{InvalidTransitionProbe, RepeatedTransitions, SuspendResume, ValidTransitions};
pub use processing::{
    BypassPassthrough, EventDelivery, NoteExpressions, ParameterChanges, ProcessContextFeed,
    Sample64, SilentInput, VariableBlockSize, ZeroLengthBlocks,
};

pub fn default_tests() -> Vec<Box<dyn ConformanceTest>> {
    vec![
        Box::new(BusScan),
        Box::new(ParameterScan),
        Box::new(ControllerLink),
        Box::new(SampleSizeSupport),
        Box::new(ValidTransitions),
        Box::new(InvalidTransitionProbe),
        Box::new(RepeatedTransitions),
        Box::new(SuspendResume),
        Box::new(SilentInput),
        Box::new(ZeroLengthBlocks),
        Box::new(VariableBlockSize),
        Box::new(BypassPassthrough),
        Box::new(ParameterChanges),
        Box::new(EventDelivery),
        Box::new(NoteExpressions),
        Box::new(ProcessContextFeed),
        Box::new(Sample64),
    ]
}

/// Normalized values that land exactly on the steps of a parameter, or a
/// spread over the range for continuous ones.
pub(crate) fn probe_values(info: &ParameterInfo) -> Vec<f64> {
    if (1..=64).contains(&info.step_count) {
        let steps = info.step_count;
        (0..=steps)
            .map(|step| f64::from(step) / f64::from(steps))
            .collect()
    } else {
        vec![0.0, 0.25, 0.5, 0.75, 1.0]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_names_are_unique() {
        let tests = default_tests();
        let names: HashSet<_> = tests.iter().map(|test| test.name()).collect();
        assert_eq!(names.len(), tests.len());
    }
}
