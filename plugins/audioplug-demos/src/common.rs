//! Processor and controller shells shared by every demo class.
//!
//! A class only provides a [`Dsp`]; the shell owns the lifecycle, splits each
//! block at parameter and event offsets, and handles bypass.

use std::ops::Range;

use audioplug_sdk::prelude::*;
use audioplug_sdk::{
    ComponentHandler, ComponentState, OutputParameterChanges, ParameterFlags,
    PluginParameterError, TransitionOutcome,
};

/// Signal processing of one demo class.
pub trait Dsp: Default + Send + 'static {
    fn buses() -> Vec<BusInfo>;
    fn parameters() -> ParameterLayout;

    fn note_expressions() -> Vec<NoteExpressionTypeInfo> {
        Vec::new()
    }

    /// Allocates everything the negotiated setup needs.
    fn prepare(&mut self, setup: &ProcessSetup);
    /// Clears signal state on activation.
    fn reset(&mut self);
    fn set_parameter(&mut self, id: ParamId, plain: f64);

    fn handle_event(&mut self, _event: &Event) {}

    /// Renders `frames` of every output channel.
    fn render<S: Sample>(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: Range<usize>);

    fn report(&mut self, _changes: &mut OutputParameterChanges) {}

    fn tail_samples(&self) -> u32 {
        0
    }
}

/// Input sample as `f32`, or silence for a missing channel.
#[inline]
pub(crate) fn input_at<S: Sample>(inputs: &[&[S]], channel: usize, frame: usize) -> f32 {
    inputs
        .get(channel)
        .and_then(|samples| samples.get(frame))
        .map_or(0.0, |sample| sample.to_f64() as f32)
}

#[inline]
pub(crate) fn write_at<S: Sample>(output: &mut [S], frame: usize, value: f32) {
    output[frame] = S::from_f64(f64::from(value));
}

fn copy_range<S: Sample>(inputs: &[&[S]], outputs: &mut [&mut [S]], frames: Range<usize>) {
    for (index, output) in outputs.iter_mut().enumerate() {
        let target = &mut output[frames.clone()];
        match inputs.get(index) {
            Some(input) => target.copy_from_slice(&input[frames.clone()]),
            None => target.fill(S::default()),
        }
    }
}

fn event_offset(event: &Event) -> usize {
    usize::try_from(event.sample_offset).unwrap_or(0)
}

#[derive(Debug, Clone, Copy)]
struct PendingChange {
    offset: usize,
    order: usize,
    id: ParamId,
    value: f64,
}

const PENDING_CAPACITY: usize = 256;

struct Render<'a, D> {
    dsp: &'a mut D,
    params: &'a mut ParameterSet,
    changes: &'a [PendingChange],
    events: &'a [Event],
}

impl<D: Dsp> Render<'_, D> {
    fn apply(&mut self, change: &PendingChange) {
        if self.params.set_normalized(change.id, change.value).is_err() {
            return;
        }
        if let Some(plain) = self.params.plain(change.id) {
            self.dsp.set_parameter(change.id, plain);
        }
    }

    fn deliver(&mut self, event: &Event) {
        if event.bus_index == 0 {
            self.dsp.handle_event(event);
        }
    }
}

impl<D: Dsp> BlockVisitor for Render<'_, D> {
    fn visit<S: Sample>(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: usize) {
        let frames = outputs
            .iter()
            .map(|channel| channel.len())
            .chain(inputs.iter().map(|channel| channel.len()))
            .fold(frames, usize::min);
        let changes = self.changes;
        let events = self.events;
        let (mut next_change, mut next_event) = (0, 0);
        let mut start = 0;
        loop {
            while let Some(change) = changes.get(next_change).filter(|c| c.offset <= start) {
                self.apply(change);
                next_change += 1;
            }
            while let Some(event) = events.get(next_event).filter(|e| event_offset(e) <= start) {
                self.deliver(event);
                next_event += 1;
            }
            if start >= frames {
                break;
            }
            let end = [
                changes.get(next_change).map(|change| change.offset),
                events.get(next_event).map(event_offset),
            ]
            .into_iter()
            .flatten()
            .fold(frames, usize::min);
            if self.params.is_bypassed() {
                copy_range(inputs, outputs, start..end);
            } else {
                self.dsp.render(inputs, outputs, start..end);
            }
            start = end;
        }
        for change in &changes[next_change..] {
            self.apply(change);
        }
        for event in &events[next_event..] {
            self.deliver(event);
        }
    }
}

pub struct DemoProcessor<D> {
    lifecycle: Lifecycle,
    dsp: D,
    params: ParameterSet,
    buses: Vec<BusInfo>,
    controller: Uid,
    setup: Option<ProcessSetup>,
    pending: Vec<PendingChange>,
}

impl<D: Dsp> DemoProcessor<D> {
    pub fn new(controller: Uid) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            dsp: D::default(),
            params: ParameterSet::new(D::parameters()),
            buses: D::buses(),
            controller,
            setup: None,
            pending: Vec::with_capacity(PENDING_CAPACITY),
        }
    }

    pub fn state(&self) -> ComponentState {
        self.lifecycle.state()
    }

    pub fn dsp(&self) -> &D {
        &self.dsp
    }

    fn sync_parameters(&mut self) {
        for (id, _) in self.params.iter() {
            if let Some(plain) = self.params.plain(id) {
                self.dsp.set_parameter(id, plain);
            }
        }
    }
}

impl<D: Dsp> Component for DemoProcessor<D> {
    fn initialize(&mut self) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Initialize)?;
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Terminate)?;
        self.setup = None;
        Ok(())
    }

    fn controller_class_id(&self) -> Option<Uid> {
        Some(self.controller)
    }

    fn bus_count(&self, media: MediaType, direction: BusDirection) -> usize {
        self.buses
            .iter()
            .filter(|bus| bus.media == media && bus.direction == direction)
            .count()
    }

    fn bus_info(&self, media: MediaType, direction: BusDirection, index: usize) -> Option<BusInfo> {
        self.buses
            .iter()
            .filter(|bus| bus.media == media && bus.direction == direction)
            .nth(index)
            .cloned()
    }

    fn set_active(&mut self, active: bool) -> Result<(), PluginError> {
        let outcome = self.lifecycle.apply(Transition::SetActive(active))?;
        if outcome == TransitionOutcome::Entered(ComponentState::Active) {
            self.dsp.reset();
        }
        Ok(())
    }
}

impl<D: Dsp> AudioProcessor for DemoProcessor<D> {
    fn can_process_sample_size(&self, _sample_size: SampleSize) -> bool {
        true
    }

    fn setup_processing(&mut self, setup: &ProcessSetup) -> Result<(), PluginError> {
        self.lifecycle.permits(Transition::SetupProcessing)?;
        if !setup.sample_rate.is_finite() || setup.sample_rate <= 0.0 {
            return Err(PluginError::invalid_argument(format!(
                "sample rate {} is not positive",
                setup.sample_rate
            )));
        }
        if setup.max_samples_per_block == 0 {
            return Err(PluginError::invalid_argument("maximum block size is zero"));
        }
        self.dsp.prepare(setup);
        self.sync_parameters();
        self.setup = Some(*setup);
        self.lifecycle.apply(Transition::SetupProcessing)?;
        log::debug!(
            "demo processor set up at {} Hz, {} frames",
            setup.sample_rate,
            setup.max_samples_per_block
        );
        Ok(())
    }

    fn set_processing(&mut self, processing: bool) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::SetProcessing(processing))?;
        Ok(())
    }

    fn process(&mut self, data: &mut ProcessData<'_>) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Process)?;
        let setup = self.setup.ok_or(PluginError::NotInitialized)?;
        if data.num_samples > setup.max_samples_per_block {
            return Err(PluginError::invalid_argument(format!(
                "{} frames exceed the negotiated maximum of {}",
                data.num_samples, setup.max_samples_per_block
            )));
        }
        if data.sample_size != setup.sample_size {
            return Err(PluginError::invalid_argument("sample size differs from setup"));
        }

        self.pending.clear();
        for queue in data.input_parameter_changes {
            for point in &queue.points {
                let order = self.pending.len();
                self.pending.push(PendingChange {
                    offset: usize::try_from(point.sample_offset).unwrap_or(0),
                    order,
                    id: queue.id,
                    value: point.value.clamp(0.0, 1.0),
                });
            }
        }
        self.pending
            .sort_unstable_by_key(|change| (change.offset, change.order));

        let mut render = Render {
            dsp: &mut self.dsp,
            params: &mut self.params,
            changes: &self.pending,
            events: data.input_events,
        };
        data.visit_main_buses(&mut render)?;

        let frames = data.num_samples;
        for output in data.outputs.iter_mut().skip(1) {
            output.channels.clear(frames);
        }
        data.set_output_silence(false);
        if let Some(changes) = data.output_parameter_changes.as_deref_mut() {
            self.dsp.report(changes);
        }
        Ok(())
    }

    fn tail_samples(&self) -> u32 {
        self.dsp.tail_samples()
    }
}

/// Edit controller over a [`ParameterSet`].
pub struct DemoController {
    params: ParameterSet,
    note_expressions: Vec<NoteExpressionTypeInfo>,
    event_channels: usize,
    host: HostContext,
    initialized: bool,
}

impl DemoController {
    pub fn new<D: Dsp>(host: HostContext) -> Self {
        let event_channels = D::buses()
            .iter()
            .find(|bus| bus.media == MediaType::Event && bus.direction == BusDirection::Input)
            .map_or(0, |bus| bus.channel_count);
        Self {
            params: ParameterSet::new(D::parameters()),
            note_expressions: D::note_expressions(),
            event_channels,
            host,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Applies a user gesture and reports it to the host as one edit.
    pub fn edit(&mut self, id: ParamId, value: f64) -> Result<(), PluginError> {
        self.host.begin_edit(id)?;
        let result = self
            .set_param_normalized(id, value)
            .and_then(|()| self.host.perform_edit(id, value));
        self.host.end_edit(id)?;
        result
    }

    fn expresses(&self, bus_index: i32, channel: i16) -> bool {
        bus_index == 0 && usize::try_from(channel).is_ok_and(|channel| channel < self.event_channels)
    }
}

impl EditController for DemoController {
    fn initialize(&mut self) -> Result<(), PluginError> {
        self.initialized = true;
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        self.initialized = false;
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        self.params.layout().parameters().len()
    }

    fn parameter_info(&self, index: usize) -> Option<ParameterInfo> {
        self.params
            .layout()
            .parameters()
            .get(index)
            .map(ParameterDefinition::info)
    }

    fn param_normalized(&self, id: ParamId) -> f64 {
        self.params.normalized(id).unwrap_or(0.0)
    }

    fn set_param_normalized(&mut self, id: ParamId, value: f64) -> Result<(), PluginError> {
        let definition = self
            .params
            .layout()
            .find(id)
            .ok_or(PluginParameterError::UnknownParameter(id))?;
        if definition.flags.contains(ParameterFlags::READ_ONLY) {
            return Err(PluginParameterError::ReadOnly(id).into());
        }
        self.params.set_normalized(id, value)?;
        Ok(())
    }

    fn normalized_to_plain(&self, id: ParamId, value: f64) -> f64 {
        self.params
            .layout()
            .find(id)
            .map_or(value, |definition| definition.kind.to_plain(value))
    }

    fn plain_to_normalized(&self, id: ParamId, value: f64) -> f64 {
        self.params
            .layout()
            .find(id)
            .map_or(value, |definition| definition.kind.to_normalized(value))
    }

    fn note_expression_count(&self, bus_index: i32, channel: i16) -> usize {
        if self.expresses(bus_index, channel) {
            self.note_expressions.len()
        } else {
            0
        }
    }

    fn note_expression_info(
        &self,
        bus_index: i32,
        channel: i16,
        index: usize,
    ) -> Option<NoteExpressionTypeInfo> {
        if !self.expresses(bus_index, channel) {
            return None;
        }
        self.note_expressions.get(index).cloned()
    }
}
