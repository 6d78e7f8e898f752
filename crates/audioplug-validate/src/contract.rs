//! Processing contract checks.
//!
//! The checker never stops at the first defect: every rule is evaluated and
//! each violation becomes one categorized finding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use audioplug_sdk::events::NO_NOTE_ID;
use audioplug_sdk::process::ContextState;
use audioplug_sdk::{
    BusLayout, EditController, Event, EventKind, NoteExpressionTypeInfo, ParamId,
    ParameterInfo, ParameterQueue, ProcessContext, ProcessData, ProcessSetup, Transition,
    MAX_EVENTS,
};
use parking_lot::Mutex;

use crate::finding::{Category, FindingLog};

const SAMPLE_RATE_EPSILON: f64 = 1e-6;

/// Tracks the call currently running on one component. Entering while
/// another call is in flight records `call.reentrant`.
#[derive(Debug, Clone)]
pub struct CallTracker {
    inner: Arc<TrackerState>,
    log: FindingLog,
}

#[derive(Debug, Default)]
struct TrackerState {
    in_flight: AtomicBool,
    current: Mutex<Option<Transition>>,
}

#[must_use]
pub struct CallGuard {
    inner: Option<Arc<TrackerState>>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            *inner.current.lock() = None;
            inner.in_flight.store(false, Ordering::Release);
        }
    }
}

impl CallTracker {
    pub fn new(log: FindingLog) -> Self {
        Self {
            inner: Arc::default(),
            log,
        }
    }

    pub fn enter(&self, call: Transition) -> CallGuard {
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let running = *self.inner.current.lock();
            let running = running.map_or_else(|| "another call".to_owned(), |t| t.to_string());
            self.log.record(
                Category::Reentrant,
                format!("{call} entered while {running} was in flight"),
            );
            // The outer call still owns the flag.
            return CallGuard { inner: None };
        }
        *self.inner.current.lock() = Some(call);
        CallGuard {
            inner: Some(Arc::clone(&self.inner)),
        }
    }

    /// The call currently in flight, if any.
    pub fn current(&self) -> Option<Transition> {
        *self.inner.current.lock()
    }

    pub fn in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }
}

/// Parameter and note-expression declarations read from a controller.
#[derive(Debug, Clone, Default)]
pub struct ControllerDeclarations {
    pub parameters: Vec<ParameterInfo>,
    /// Note-expression types keyed by event bus index and channel.
    pub note_expressions: HashMap<(i32, i16), Vec<NoteExpressionTypeInfo>>,
}

impl ControllerDeclarations {
    pub fn query(controller: &dyn EditController, layout: &BusLayout) -> Self {
        let parameters = (0..controller.parameter_count())
            .filter_map(|index| controller.parameter_info(index))
            .collect();
        let mut note_expressions = HashMap::new();
        for (bus_index, bus) in layout.event_inputs.iter().enumerate() {
            let bus_index = bus_index as i32;
            for channel in 0..bus.channel_count.min(i16::MAX as usize) as i16 {
                let types: Vec<_> = (0..controller.note_expression_count(bus_index, channel))
                    .filter_map(|index| controller.note_expression_info(bus_index, channel, index))
                    .collect();
                if !types.is_empty() {
                    note_expressions.insert((bus_index, channel), types);
                }
            }
        }
        Self {
            parameters,
            note_expressions,
        }
    }

    pub fn parameter(&self, id: ParamId) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|info| info.id == id)
    }

    pub fn bypass(&self) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|info| info.is_bypass())
    }

    fn note_expression(
        &self,
        bus_index: i32,
        channel: Option<i16>,
        type_id: u32,
    ) -> Option<&NoteExpressionTypeInfo> {
        match channel {
            Some(channel) => self
                .note_expressions
                .get(&(bus_index, channel))?
                .iter()
                .find(|info| info.type_id == type_id),
            None => self
                .note_expressions
                .iter()
                .filter(|((bus, _), _)| *bus == bus_index)
                .flat_map(|(_, types)| types.iter())
                .find(|info| info.type_id == type_id),
        }
    }
}

pub struct ContractChecker {
    log: FindingLog,
    layout: BusLayout,
    declarations: Option<ControllerDeclarations>,
    setup: Option<ProcessSetup>,
    max_events: usize,
    last_system_time: Option<i64>,
    /// Channel of each note id seen in a note-on, for note-expression lookup.
    note_channels: HashMap<i32, (i32, i16)>,
    calls: CallTracker,
}

impl ContractChecker {
    pub fn new(log: FindingLog, layout: BusLayout) -> Self {
        let calls = CallTracker::new(log.clone());
        Self::with_tracker(log, layout, calls)
    }

    pub fn with_tracker(log: FindingLog, layout: BusLayout, calls: CallTracker) -> Self {
        Self {
            log,
            layout,
            declarations: None,
            setup: None,
            max_events: MAX_EVENTS,
            last_system_time: None,
            note_channels: HashMap::new(),
            calls,
        }
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn set_max_events(&mut self, max_events: usize) {
        self.max_events = max_events;
    }

    pub fn set_declarations(&mut self, declarations: ControllerDeclarations) {
        self.declarations = Some(declarations);
    }

    pub fn declarations(&self) -> Option<&ControllerDeclarations> {
        self.declarations.as_ref()
    }

    pub fn layout(&self) -> &BusLayout {
        &self.layout
    }

    pub fn calls(&self) -> &CallTracker {
        &self.calls
    }

    pub fn setup(&self) -> Option<&ProcessSetup> {
        self.setup.as_ref()
    }

    /// Records the negotiated setup and restarts system-time tracking.
    pub fn configure(&mut self, setup: ProcessSetup) {
        self.setup = Some(setup);
        self.last_system_time = None;
        self.note_channels.clear();
    }

    /// Validates everything the host is about to hand to `process`. Returns
    /// the number of findings recorded.
    pub fn check_input(&mut self, data: &ProcessData<'_>) -> usize {
        let before = self.log.len();
        self.check_buffers(data);
        self.check_events(data.input_events, data.num_samples);
        self.check_parameters(data.input_parameter_changes, data.num_samples);
        if let Some(context) = data.context {
            self.check_context(context);
        }
        self.log.len() - before
    }

    pub fn check_buffers(&self, data: &ProcessData<'_>) {
        let frames = data.num_samples;
        if let Some(setup) = &self.setup {
            if data.sample_size != setup.sample_size {
                self.log.record(
                    Category::BufferSampleSize,
                    format!(
                        "block uses {}-bit samples but {}-bit were negotiated",
                        data.sample_size.bits(),
                        setup.sample_size.bits()
                    ),
                );
            }
            if frames > setup.max_samples_per_block {
                self.log.record(
                    Category::BufferBlockSize,
                    format!(
                        "block of {frames} samples exceeds the negotiated maximum of {}",
                        setup.max_samples_per_block
                    ),
                );
            }
        }

        if data.inputs.len() != self.layout.audio_inputs.len() {
            self.log.record(
                Category::BufferBusCount,
                format!(
                    "{} input buses supplied, {} declared",
                    data.inputs.len(),
                    self.layout.audio_inputs.len()
                ),
            );
        }
        if data.outputs.len() != self.layout.audio_outputs.len() {
            self.log.record(
                Category::BufferBusCount,
                format!(
                    "{} output buses supplied, {} declared",
                    data.outputs.len(),
                    self.layout.audio_outputs.len()
                ),
            );
        }

        for (index, (bus, declared)) in data.inputs.iter().zip(&self.layout.audio_inputs).enumerate()
        {
            if bus.channels.sample_size() != data.sample_size {
                self.log.record(
                    Category::BufferSampleSize,
                    format!("input bus {index} carries a different sample size than the block"),
                );
            }
            self.check_bus_shape(
                "input",
                index,
                bus.channels.channel_count(),
                declared.channel_count,
                |channel| bus.channels.channel_len(channel),
                frames,
            );
        }
        for (index, (bus, declared)) in
            data.outputs.iter().zip(&self.layout.audio_outputs).enumerate()
        {
            if bus.channels.sample_size() != data.sample_size {
                self.log.record(
                    Category::BufferSampleSize,
                    format!("output bus {index} carries a different sample size than the block"),
                );
            }
            self.check_bus_shape(
                "output",
                index,
                bus.channels.channel_count(),
                declared.channel_count,
                |channel| bus.channels.channel_len(channel),
                frames,
            );
        }
    }

    /// Whether every channel carries the block's sample size and holds at
    /// least `num_samples` samples. A block that fails this must not reach
    /// the component.
    pub fn buffers_fit(data: &ProcessData<'_>) -> bool {
        let frames = data.num_samples;
        let inputs = data.inputs.iter().all(|bus| {
            bus.channels.sample_size() == data.sample_size
                && (0..bus.channels.channel_count())
                    .all(|channel| bus.channels.channel_len(channel).unwrap_or(0) >= frames)
        });
        let outputs = data.outputs.iter().all(|bus| {
            bus.channels.sample_size() == data.sample_size
                && (0..bus.channels.channel_count())
                    .all(|channel| bus.channels.channel_len(channel).unwrap_or(0) >= frames)
        });
        inputs && outputs
    }

    fn check_bus_shape(
        &self,
        direction: &str,
        index: usize,
        channels: usize,
        declared: usize,
        len: impl Fn(usize) -> Option<usize>,
        frames: usize,
    ) {
        if channels != declared {
            self.log.record(
                Category::BufferChannelCount,
                format!("{direction} bus {index} has {channels} channels, {declared} declared"),
            );
        }
        for channel in 0..channels {
            let length = len(channel).unwrap_or(0);
            if length < frames {
                self.log.record(
                    Category::BufferChannelLength,
                    format!(
                        "{direction} bus {index} channel {channel} holds {length} samples, block needs {frames}"
                    ),
                );
            }
        }
    }

    pub fn check_events(&mut self, events: &[Event], num_samples: usize) {
        if events.len() > self.max_events {
            self.log.record(
                Category::EventCountExceeded,
                format!(
                    "{} events exceed the limit of {}",
                    events.len(),
                    self.max_events
                ),
            );
        }

        for (index, pair) in events.windows(2).enumerate() {
            if pair[1].sample_offset < pair[0].sample_offset {
                self.log.record(
                    Category::EventOutOfOrder,
                    format!(
                        "event {} at offset {} follows event {index} at offset {}",
                        index + 1,
                        pair[1].sample_offset,
                        pair[0].sample_offset
                    ),
                );
            }
        }

        let limit = num_samples.max(1) as i64;
        for (index, event) in events.iter().enumerate() {
            let offset = i64::from(event.sample_offset);
            if offset < 0 || offset >= limit {
                self.log.record(
                    Category::EventSampleOffset,
                    format!("event {index} offset {offset} is outside 0..{limit}"),
                );
            }

            let bus = usize::try_from(event.bus_index)
                .ok()
                .and_then(|bus| self.layout.event_inputs.get(bus));
            match (bus, event.channel()) {
                (None, _) => self.log.record(
                    Category::EventBusIndex,
                    format!(
                        "event {index} targets bus {} but {} event input buses are declared",
                        event.bus_index,
                        self.layout.event_inputs.len()
                    ),
                ),
                (Some(bus), Some(channel))
                    if channel < 0 || channel as usize >= bus.channel_count =>
                {
                    self.log.record(
                        Category::EventChannelIndex,
                        format!(
                            "event {index} uses channel {channel} on a bus with {} channels",
                            bus.channel_count
                        ),
                    )
                }
                (Some(_), _) => {}
            }

            match &event.kind {
                EventKind::NoteOn(note) => {
                    self.check_pitch(index, note.pitch);
                    self.check_normalized(index, "velocity", f64::from(note.velocity));
                    if note.note_id != NO_NOTE_ID && bus.is_some() {
                        self.note_channels
                            .insert(note.note_id, (event.bus_index, note.channel));
                    }
                }
                EventKind::NoteOff(note) => {
                    self.check_pitch(index, note.pitch);
                    self.check_normalized(index, "velocity", f64::from(note.velocity));
                    if self
                        .note_channels
                        .get(&note.note_id)
                        .is_some_and(|(bus, _)| *bus == event.bus_index)
                    {
                        self.note_channels.remove(&note.note_id);
                    }
                }
                EventKind::PolyPressure(pressure) => {
                    self.check_pitch(index, pressure.pitch);
                    self.check_normalized(index, "pressure", f64::from(pressure.pressure));
                }
                EventKind::NoteExpression(expression) => {
                    let channel = self
                        .note_channels
                        .get(&expression.note_id)
                        .filter(|(bus, _)| *bus == event.bus_index)
                        .map(|(_, channel)| *channel);
                    self.check_note_expression(
                        index,
                        event.bus_index,
                        channel,
                        expression.type_id,
                        expression.value,
                    );
                }
            }
        }
    }

    fn check_pitch(&self, index: usize, pitch: i16) {
        if !(0..=127).contains(&pitch) {
            self.log.record(
                Category::EventPitchRange,
                format!("event {index} pitch {pitch} is outside 0..=127"),
            );
        }
    }

    fn check_normalized(&self, index: usize, what: &str, value: f64) {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            self.log.record(
                Category::EventNormalizedRange,
                format!("event {index} {what} {value} is outside [0, 1]"),
            );
        }
    }

    fn check_note_expression(
        &self,
        index: usize,
        bus_index: i32,
        channel: Option<i16>,
        type_id: u32,
        value: f64,
    ) {
        let Some(declarations) = &self.declarations else {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                self.log.record(
                    Category::NoteExpressionRange,
                    format!("event {index} note-expression value {value} is outside [0, 1]"),
                );
            }
            return;
        };
        match declarations.note_expression(bus_index, channel, type_id) {
            None => self.log.record(
                Category::NoteExpressionUnknownType,
                format!("event {index} uses note-expression type {type_id}, which is not declared"),
            ),
            Some(info) if !info.contains(value) => self.log.record(
                Category::NoteExpressionRange,
                format!(
                    "event {index} {} value {value} is outside [{}, {}]",
                    info.title, info.minimum, info.maximum
                ),
            ),
            Some(_) => {}
        }
    }

    pub fn check_parameters(&self, queues: &[ParameterQueue], num_samples: usize) {
        let limit = num_samples.max(1) as i64;
        for queue in queues {
            if let Some(declarations) = &self.declarations {
                if declarations.parameter(queue.id).is_none() {
                    self.log.record(
                        Category::ParameterUnknownId,
                        format!("parameter queue for undeclared id {}", queue.id),
                    );
                }
            }
            for (index, point) in queue.points.iter().enumerate() {
                if !point.value.is_finite() || !(0.0..=1.0).contains(&point.value) {
                    self.log.record(
                        Category::ParameterNormalizedRange,
                        format!(
                            "parameter {} point {index} value {} is outside [0, 1]",
                            queue.id, point.value
                        ),
                    );
                }
                let offset = i64::from(point.sample_offset);
                if offset < 0 || offset >= limit {
                    self.log.record(
                        Category::ParameterSampleOffset,
                        format!(
                            "parameter {} point {index} offset {offset} is outside 0..{limit}",
                            queue.id
                        ),
                    );
                }
            }
            for (index, pair) in queue.points.windows(2).enumerate() {
                if pair[1].sample_offset < pair[0].sample_offset {
                    self.log.record(
                        Category::ParameterOutOfOrder,
                        format!(
                            "parameter {} point {} at offset {} follows offset {}",
                            queue.id,
                            index + 1,
                            pair[1].sample_offset,
                            pair[0].sample_offset
                        ),
                    );
                }
            }
        }
    }

    pub fn check_context(&mut self, context: &ProcessContext) {
        if let Some(setup) = &self.setup {
            if (context.sample_rate - setup.sample_rate).abs() > SAMPLE_RATE_EPSILON {
                self.log.record(
                    Category::ContextSampleRate,
                    format!(
                        "context sample rate {} differs from negotiated {}",
                        context.sample_rate, setup.sample_rate
                    ),
                );
            }
        }
        if context.state.contains(ContextState::SYSTEM_TIME_VALID) {
            if let Some(previous) = self.last_system_time {
                if context.system_time < previous {
                    self.log.record(
                        Category::ContextSystemTime,
                        format!(
                            "system time went backwards from {previous} to {}",
                            context.system_time
                        ),
                    );
                }
            }
            self.last_system_time = Some(context.system_time);
        }
    }

    /// Validates what the component wrote. Returns the number of findings.
    pub fn check_output(&self, data: &ProcessData<'_>) -> usize {
        let before = self.log.len();
        let frames = data.num_samples;
        for (bus_index, bus) in data.outputs.iter().enumerate() {
            for channel in 0..bus.channels.channel_count() {
                let length = bus.channels.channel_len(channel).unwrap_or(0).min(frames);
                let mut non_finite = false;
                let mut non_zero = false;
                for frame in 0..length {
                    let sample = bus.channels.sample(channel, frame).unwrap_or(0.0);
                    non_finite |= !sample.is_finite();
                    non_zero |= sample != 0.0;
                }
                if non_finite {
                    self.log.record(
                        Category::OutputNonFinite,
                        format!("output bus {bus_index} channel {channel} contains NaN or infinity"),
                    );
                }
                let flagged = channel < 64 && bus.silence_flags & (1u64 << channel) != 0;
                if flagged && non_zero {
                    self.log.record(
                        Category::OutputSilenceFlags,
                        format!(
                            "output bus {bus_index} channel {channel} is flagged silent but is not"
                        ),
                    );
                }
            }
        }

        if let Some(changes) = data.output_parameter_changes.as_deref() {
            let limit = frames.max(1) as i64;
            for change in changes.changes() {
                let offset = i64::from(change.sample_offset);
                let in_range = change.value.is_finite() && (0.0..=1.0).contains(&change.value);
                if !in_range || offset < 0 || offset >= limit {
                    self.log.record(
                        Category::OutputParameters,
                        format!(
                            "output change for parameter {} ({} at offset {offset}) is out of range",
                            change.id, change.value
                        ),
                    );
                }
                if let Some(declarations) = &self.declarations {
                    if declarations.parameter(change.id).is_none() {
                        self.log.record(
                            Category::OutputParameters,
                            format!("output change for undeclared parameter {}", change.id),
                        );
                    }
                }
            }
        }
        self.log.len() - before
    }
}

#[cfg(test)]
mod tests {
    use audioplug_sdk::{BusDirection, BusInfo, ParamId};
    use pretty_assertions::assert_eq;

    use super::*;

    fn synth_layout() -> BusLayout {
        BusLayout::from_buses([
            BusInfo::events(BusDirection::Input, "Notes", 16),
            BusInfo::audio(BusDirection::Output, "Out", 2),
        ])
    }

    fn checker() -> (FindingLog, ContractChecker) {
        let log = FindingLog::new();
        let mut checker = ContractChecker::new(log.clone(), synth_layout());
        checker.configure(ProcessSetup::new(44_100.0, 512));
        (log, checker)
    }

    #[test]
    fn ordered_events_pass() {
        let (log, mut checker) = checker();
        let events: Vec<_> = (0..8).map(|i| Event::note_on(i * 10, 0, 60, 0.8)).collect();
        checker.check_events(&events, 512);
        assert!(log.is_empty(), "{:?}", log.findings());
    }

    #[test]
    fn equal_offsets_are_in_order() {
        let (log, mut checker) = checker();
        let events = [Event::note_on(5, 0, 60, 0.8), Event::note_on(5, 1, 62, 0.8)];
        checker.check_events(&events, 512);
        assert!(log.is_empty());
    }

    #[test]
    fn every_defect_is_reported() {
        let (log, mut checker) = checker();
        let events = [
            Event::note_on(100, 0, 60, 0.5),
            Event::note_on(50, 16, 128, 1.5),
            Event::note_off(600, 0, 60).on_bus(3),
        ];
        checker.check_events(&events, 512);
        assert_eq!(log.count(Category::EventOutOfOrder), 1);
        assert_eq!(log.count(Category::EventChannelIndex), 1);
        assert_eq!(log.count(Category::EventPitchRange), 1);
        assert_eq!(log.count(Category::EventNormalizedRange), 1);
        assert_eq!(log.count(Category::EventSampleOffset), 1);
        assert_eq!(log.count(Category::EventBusIndex), 1);
        assert_eq!(log.len(), 6);
    }

    #[test]
    fn unknown_bus_still_checks_note_fields() {
        let (log, mut checker) = checker();
        checker.check_events(&[Event::note_on(0, 0, 200, 1.5).on_bus(3)], 512);
        assert_eq!(log.count(Category::EventBusIndex), 1);
        assert_eq!(log.count(Category::EventPitchRange), 1);
        assert_eq!(log.count(Category::EventNormalizedRange), 1);
        assert_eq!(log.count(Category::EventChannelIndex), 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn note_off_forgets_the_note_id() {
        let (log, mut checker) = checker();
        for block in 0..100 {
            let mut on = Event::note_on(0, 1, 60, 0.8);
            let mut off = Event::note_off(10, 1, 60);
            if let EventKind::NoteOn(note) = &mut on.kind {
                note.note_id = block;
            }
            if let EventKind::NoteOff(note) = &mut off.kind {
                note.note_id = block;
            }
            checker.check_events(&[on, off], 64);
        }
        assert!(checker.note_channels.is_empty());

        let mut held = Event::note_on(0, 1, 60, 0.8);
        if let EventKind::NoteOn(note) = &mut held.kind {
            note.note_id = 500;
        }
        let mut elsewhere = Event::note_off(1, 1, 60).on_bus(3);
        if let EventKind::NoteOff(note) = &mut elsewhere.kind {
            note.note_id = 500;
        }
        checker.check_events(&[held, elsewhere], 64);
        assert_eq!(checker.note_channels.len(), 1);
        assert_eq!(log.count(Category::EventBusIndex), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn zero_length_blocks_allow_offset_zero() {
        let (log, mut checker) = checker();
        checker.check_events(&[Event::note_on(0, 0, 60, 1.0)], 0);
        assert!(log.is_empty());
        checker.check_events(&[Event::note_on(1, 0, 60, 1.0)], 0);
        assert_eq!(log.count(Category::EventSampleOffset), 1);
    }

    #[test]
    fn parameter_queues_are_checked_point_by_point() {
        let (log, checker) = checker();
        let queues = [ParameterQueue::new(ParamId(0))
            .with_point(10, 0.5)
            .with_point(5, 1.2)
            .with_point(700, 0.0)];
        checker.check_parameters(&queues, 512);
        assert_eq!(log.count(Category::ParameterNormalizedRange), 1);
        assert_eq!(log.count(Category::ParameterOutOfOrder), 1);
        assert_eq!(log.count(Category::ParameterSampleOffset), 1);
        assert_eq!(log.count(Category::ParameterUnknownId), 0);
    }

    #[test]
    fn unknown_ids_need_declarations() {
        let (log, mut checker) = checker();
        checker.set_declarations(ControllerDeclarations::default());
        checker.check_parameters(&[ParameterQueue::new(ParamId(4)).with_point(0, 0.5)], 16);
        assert_eq!(log.count(Category::ParameterUnknownId), 1);
    }

    #[test]
    fn note_expressions_follow_declarations() {
        let (log, mut checker) = checker();
        let mut declarations = ControllerDeclarations::default();
        declarations.note_expressions.insert(
            (0, 2),
            vec![NoteExpressionTypeInfo::new(audioplug_sdk::note_expression::TUNING, "Tuning", 0.5)
                .bipolar()],
        );
        checker.set_declarations(declarations);

        let mut note_on = Event::note_on(0, 2, 64, 1.0);
        if let EventKind::NoteOn(note) = &mut note_on.kind {
            note.note_id = 11;
        }
        let events = [
            note_on,
            Event::note_expression(1, audioplug_sdk::note_expression::TUNING, 11, 0.75),
            Event::note_expression(2, audioplug_sdk::note_expression::VOLUME, 11, 0.5),
            Event::note_expression(3, audioplug_sdk::note_expression::TUNING, 11, 1.5),
        ];
        checker.check_events(&events, 64);
        assert_eq!(log.count(Category::NoteExpressionUnknownType), 1);
        assert_eq!(log.count(Category::NoteExpressionRange), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn context_sample_rate_and_system_time() {
        let (log, mut checker) = checker();
        let mut context = ProcessContext {
            sample_rate: 44_100.0,
            system_time: 1_000,
            ..ProcessContext::default()
        };
        context.state.insert(ContextState::SYSTEM_TIME_VALID);
        checker.check_context(&context);
        context.system_time = 900;
        context.sample_rate = 48_000.0;
        checker.check_context(&context);
        assert_eq!(log.count(Category::ContextSystemTime), 1);
        assert_eq!(log.count(Category::ContextSampleRate), 1);

        // A new setup starts a fresh timeline.
        checker.configure(ProcessSetup::new(48_000.0, 512));
        context.system_time = 10;
        checker.check_context(&context);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn reentrant_calls_are_flagged_once_per_overlap() {
        let log = FindingLog::new();
        let tracker = CallTracker::new(log.clone());
        let outer = tracker.enter(Transition::Process);
        assert_eq!(tracker.current(), Some(Transition::Process));
        {
            let _inner = tracker.enter(Transition::SetProcessing(false));
        }
        // The nested guard must not release the outer call.
        assert!(tracker.in_flight());
        drop(outer);
        assert!(!tracker.in_flight());
        assert_eq!(log.count(Category::Reentrant), 1);
    }
}
