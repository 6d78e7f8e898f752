use std::collections::HashSet;

use audioplug_sdk::{ComponentHandler, ParamId, PluginError, RestartFlags, Transition};
use parking_lot::Mutex;

use crate::contract::CallTracker;
use crate::finding::{Category, FindingLog};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edit {
    Begin(ParamId),
    Perform(ParamId, f64),
    End(ParamId),
}

/// Host notifier handed to components and controllers. Records every
/// callback and flags edits outside a begin/end pair.
pub struct RecordingHandler {
    log: FindingLog,
    calls: CallTracker,
    state: Mutex<HandlerState>,
}

#[derive(Default)]
struct HandlerState {
    open: HashSet<ParamId>,
    edits: Vec<Edit>,
    restarts: Vec<RestartFlags>,
}

impl RecordingHandler {
    pub fn new(log: FindingLog, calls: CallTracker) -> Self {
        Self {
            log,
            calls,
            state: Mutex::default(),
        }
    }

    pub fn edits(&self) -> Vec<Edit> {
        self.state.lock().edits.clone()
    }

    pub fn restarts(&self) -> Vec<RestartFlags> {
        self.state.lock().restarts.clone()
    }

    /// Flags edits still open. Called when the instance goes away.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        let mut open: Vec<_> = state.open.drain().collect();
        open.sort();
        for id in open {
            self.log.record(
                Category::EditProtocol,
                format!("edit of parameter {id} was never ended"),
            );
        }
    }
}

impl ComponentHandler for RecordingHandler {
    fn begin_edit(&self, id: ParamId) -> Result<(), PluginError> {
        let mut state = self.state.lock();
        state.edits.push(Edit::Begin(id));
        if !state.open.insert(id) {
            self.log.record(
                Category::EditProtocol,
                format!("beginEdit({id}) while an edit of it is already open"),
            );
            return Err(PluginError::Rejected);
        }
        Ok(())
    }

    fn perform_edit(&self, id: ParamId, value: f64) -> Result<(), PluginError> {
        let mut state = self.state.lock();
        state.edits.push(Edit::Perform(id, value));
        if !state.open.contains(&id) {
            self.log.record(
                Category::EditProtocol,
                format!("performEdit({id}) outside beginEdit/endEdit"),
            );
            return Err(PluginError::Rejected);
        }
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            self.log.record(
                Category::EditProtocol,
                format!("performEdit({id}) with value {value} outside [0, 1]"),
            );
            return Err(PluginError::invalid_argument("normalized value out of range"));
        }
        Ok(())
    }

    fn end_edit(&self, id: ParamId) -> Result<(), PluginError> {
        let mut state = self.state.lock();
        state.edits.push(Edit::End(id));
        if !state.open.remove(&id) {
            self.log.record(
                Category::EditProtocol,
                format!("endEdit({id}) without a matching beginEdit"),
            );
            return Err(PluginError::Rejected);
        }
        Ok(())
    }

    fn restart_component(&self, flags: RestartFlags) -> Result<(), PluginError> {
        self.state.lock().restarts.push(flags);
        if self.calls.current() == Some(Transition::Process) {
            self.log.record(
                Category::Reentrant,
                format!("restartComponent({:#x}) requested from inside process", flags.bits()),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn handler() -> (FindingLog, CallTracker, RecordingHandler) {
        let log = FindingLog::new();
        let calls = CallTracker::new(log.clone());
        let handler = RecordingHandler::new(log.clone(), calls.clone());
        (log, calls, handler)
    }

    #[test]
    fn paired_edits_are_clean() {
        let (log, _calls, handler) = handler();
        handler.begin_edit(ParamId(1)).unwrap();
        handler.perform_edit(ParamId(1), 0.3).unwrap();
        handler.end_edit(ParamId(1)).unwrap();
        handler.finish();
        assert!(log.is_empty());
        assert_eq!(
            handler.edits(),
            vec![
                Edit::Begin(ParamId(1)),
                Edit::Perform(ParamId(1), 0.3),
                Edit::End(ParamId(1))
            ]
        );
    }

    #[test]
    fn stray_and_dangling_edits_are_flagged() {
        let (log, _calls, handler) = handler();
        assert!(handler.perform_edit(ParamId(2), 0.5).is_err());
        assert!(handler.end_edit(ParamId(2)).is_err());
        handler.begin_edit(ParamId(3)).unwrap();
        handler.finish();
        assert_eq!(log.count(Category::EditProtocol), 3);
    }

    #[test]
    fn restart_from_process_is_reentrant() {
        let (log, calls, handler) = handler();
        handler.restart_component(RestartFlags::LATENCY_CHANGED).unwrap();
        assert!(log.is_empty());
        let _call = calls.enter(Transition::Process);
        handler.restart_component(RestartFlags::LATENCY_CHANGED).unwrap();
        assert_eq!(log.count(Category::Reentrant), 1);
        assert_eq!(handler.restarts().len(), 2);
    }
}
