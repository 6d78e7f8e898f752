use audioplug_sys::{
    apk_process_context_t, apk_process_mode, apk_process_setup_t, apk_sample_size,
    APK_CONTEXT_BAR_POSITION_VALID, APK_CONTEXT_CONT_TIME_VALID, APK_CONTEXT_PLAYING,
    APK_CONTEXT_PROJECT_TIME_MUSIC_VALID, APK_CONTEXT_RECORDING, APK_CONTEXT_SYSTEM_TIME_VALID,
    APK_CONTEXT_TEMPO_VALID, APK_CONTEXT_TIME_SIG_VALID, APK_PROCESS_OFFLINE, APK_PROCESS_PREFETCH,
    APK_PROCESS_REALTIME, APK_SAMPLE_32, APK_SAMPLE_64,
};
use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::events::Event;
use crate::params::ParamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessMode {
    #[default]
    Realtime,
    Prefetch,
    Offline,
}

impl ProcessMode {
    pub fn to_raw(self) -> apk_process_mode {
        match self {
            ProcessMode::Realtime => APK_PROCESS_REALTIME,
            ProcessMode::Prefetch => APK_PROCESS_PREFETCH,
            ProcessMode::Offline => APK_PROCESS_OFFLINE,
        }
    }

    pub fn from_raw(raw: apk_process_mode) -> Option<Self> {
        match raw {
            APK_PROCESS_REALTIME => Some(ProcessMode::Realtime),
            APK_PROCESS_PREFETCH => Some(ProcessMode::Prefetch),
            APK_PROCESS_OFFLINE => Some(ProcessMode::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SampleSize {
    #[default]
    Sample32,
    Sample64,
}

impl SampleSize {
    pub fn to_raw(self) -> apk_sample_size {
        match self {
            SampleSize::Sample32 => APK_SAMPLE_32,
            SampleSize::Sample64 => APK_SAMPLE_64,
        }
    }

    pub fn from_raw(raw: apk_sample_size) -> Option<Self> {
        match raw {
            APK_SAMPLE_32 => Some(SampleSize::Sample32),
            APK_SAMPLE_64 => Some(SampleSize::Sample64),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            SampleSize::Sample32 => 32,
            SampleSize::Sample64 => 64,
        }
    }
}

/// Configuration negotiated by `setup_processing`. It stays fixed until the
/// component is deactivated and set up again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessSetup {
    pub process_mode: ProcessMode,
    pub sample_size: SampleSize,
    pub max_samples_per_block: usize,
    pub sample_rate: f64,
}

impl ProcessSetup {
    pub fn new(sample_rate: f64, max_samples_per_block: usize) -> Self {
        Self {
            process_mode: ProcessMode::Realtime,
            sample_size: SampleSize::Sample32,
            max_samples_per_block,
            sample_rate,
        }
    }

    pub fn with_sample_size(mut self, sample_size: SampleSize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_process_mode(mut self, process_mode: ProcessMode) -> Self {
        self.process_mode = process_mode;
        self
    }

    pub fn to_raw(&self) -> apk_process_setup_t {
        apk_process_setup_t {
            process_mode: self.process_mode.to_raw(),
            sample_size: self.sample_size.to_raw(),
            max_samples_per_block: i32::try_from(self.max_samples_per_block).unwrap_or(i32::MAX),
            sample_rate: self.sample_rate,
        }
    }

    pub fn from_raw(raw: &apk_process_setup_t) -> Option<Self> {
        Some(Self {
            process_mode: ProcessMode::from_raw(raw.process_mode)?,
            sample_size: SampleSize::from_raw(raw.sample_size)?,
            max_samples_per_block: usize::try_from(raw.max_samples_per_block).ok()?,
            sample_rate: raw.sample_rate,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ContextState(u32);

impl ContextState {
    pub const PLAYING: Self = Self(APK_CONTEXT_PLAYING);
    pub const RECORDING: Self = Self(APK_CONTEXT_RECORDING);
    pub const SYSTEM_TIME_VALID: Self = Self(APK_CONTEXT_SYSTEM_TIME_VALID);
    pub const PROJECT_TIME_MUSIC_VALID: Self = Self(APK_CONTEXT_PROJECT_TIME_MUSIC_VALID);
    pub const TEMPO_VALID: Self = Self(APK_CONTEXT_TEMPO_VALID);
    pub const BAR_POSITION_VALID: Self = Self(APK_CONTEXT_BAR_POSITION_VALID);
    pub const TIME_SIG_VALID: Self = Self(APK_CONTEXT_TIME_SIG_VALID);
    pub const CONT_TIME_VALID: Self = Self(APK_CONTEXT_CONT_TIME_VALID);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// Transport and timing snapshot delivered with a process call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ProcessContext {
    pub state: ContextState,
    pub sample_rate: f64,
    pub project_time_samples: i64,
    /// Host system time in nanoseconds.
    pub system_time: i64,
    pub continuous_time_samples: i64,
    pub project_time_music: f64,
    pub bar_position_music: f64,
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
}

impl ProcessContext {
    pub fn to_raw(&self) -> apk_process_context_t {
        apk_process_context_t {
            state: self.state.bits(),
            sample_rate: self.sample_rate,
            project_time_samples: self.project_time_samples,
            system_time: self.system_time,
            continuous_time_samples: self.continuous_time_samples,
            project_time_music: self.project_time_music,
            bar_position_music: self.bar_position_music,
            tempo: self.tempo,
            time_sig_numerator: self.time_sig_numerator,
            time_sig_denominator: self.time_sig_denominator,
        }
    }

    pub fn from_raw(raw: &apk_process_context_t) -> Self {
        Self {
            state: ContextState::from_bits(raw.state),
            sample_rate: raw.sample_rate,
            project_time_samples: raw.project_time_samples,
            system_time: raw.system_time,
            continuous_time_samples: raw.continuous_time_samples,
            project_time_music: raw.project_time_music,
            bar_position_music: raw.bar_position_music,
            tempo: raw.tempo,
            time_sig_numerator: raw.time_sig_numerator,
            time_sig_denominator: raw.time_sig_denominator,
        }
    }
}

/// Sample formats a processor can be asked to handle.
pub trait Sample: Copy + Default + PartialEq + Send + Sync + 'static {
    const SIZE: SampleSize;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl Sample for f32 {
    const SIZE: SampleSize = SampleSize::Sample32;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Sample for f64 {
    const SIZE: SampleSize = SampleSize::Sample64;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

/// Read-only channel slices of an input bus.
#[derive(Debug)]
pub enum ChannelsRef<'a> {
    Sample32(Vec<&'a [f32]>),
    Sample64(Vec<&'a [f64]>),
}

impl ChannelsRef<'_> {
    pub fn channel_count(&self) -> usize {
        match self {
            ChannelsRef::Sample32(channels) => channels.len(),
            ChannelsRef::Sample64(channels) => channels.len(),
        }
    }

    pub fn sample_size(&self) -> SampleSize {
        match self {
            ChannelsRef::Sample32(_) => SampleSize::Sample32,
            ChannelsRef::Sample64(_) => SampleSize::Sample64,
        }
    }

    pub fn channel_len(&self, index: usize) -> Option<usize> {
        match self {
            ChannelsRef::Sample32(channels) => channels.get(index).map(|c| c.len()),
            ChannelsRef::Sample64(channels) => channels.get(index).map(|c| c.len()),
        }
    }

    pub fn sample(&self, channel: usize, frame: usize) -> Option<f64> {
        match self {
            ChannelsRef::Sample32(channels) => channels.get(channel)?.get(frame).map(|s| s.to_f64()),
            ChannelsRef::Sample64(channels) => channels.get(channel)?.get(frame).copied(),
        }
    }
}

/// Writable channel slices of an output bus.
#[derive(Debug)]
pub enum ChannelsMut<'a> {
    Sample32(Vec<&'a mut [f32]>),
    Sample64(Vec<&'a mut [f64]>),
}

impl ChannelsMut<'_> {
    pub fn channel_count(&self) -> usize {
        match self {
            ChannelsMut::Sample32(channels) => channels.len(),
            ChannelsMut::Sample64(channels) => channels.len(),
        }
    }

    pub fn sample_size(&self) -> SampleSize {
        match self {
            ChannelsMut::Sample32(_) => SampleSize::Sample32,
            ChannelsMut::Sample64(_) => SampleSize::Sample64,
        }
    }

    pub fn channel_len(&self, index: usize) -> Option<usize> {
        match self {
            ChannelsMut::Sample32(channels) => channels.get(index).map(|c| c.len()),
            ChannelsMut::Sample64(channels) => channels.get(index).map(|c| c.len()),
        }
    }

    pub fn sample(&self, channel: usize, frame: usize) -> Option<f64> {
        match self {
            ChannelsMut::Sample32(channels) => channels.get(channel)?.get(frame).map(|s| s.to_f64()),
            ChannelsMut::Sample64(channels) => channels.get(channel)?.get(frame).copied(),
        }
    }

    /// Zeroes the first `frames` samples of every channel.
    pub fn clear(&mut self, frames: usize) {
        match self {
            ChannelsMut::Sample32(channels) => {
                for channel in channels.iter_mut() {
                    let end = frames.min(channel.len());
                    channel[..end].fill(0.0);
                }
            }
            ChannelsMut::Sample64(channels) => {
                for channel in channels.iter_mut() {
                    let end = frames.min(channel.len());
                    channel[..end].fill(0.0);
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct InputBus<'a> {
    pub channels: ChannelsRef<'a>,
    /// Bit `n` set means channel `n` is known to be silent.
    pub silence_flags: u64,
}

#[derive(Debug)]
pub struct OutputBus<'a> {
    pub channels: ChannelsMut<'a>,
    pub silence_flags: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamPoint {
    pub sample_offset: i32,
    pub value: f64,
}

/// Automation points for one parameter within a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterQueue {
    pub id: ParamId,
    pub points: Vec<ParamPoint>,
}

impl ParameterQueue {
    pub fn new(id: ParamId) -> Self {
        Self {
            id,
            points: Vec::new(),
        }
    }

    pub fn with_point(mut self, sample_offset: i32, value: f64) -> Self {
        self.points.push(ParamPoint {
            sample_offset,
            value,
        });
        self
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|point| point.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamChange {
    pub id: ParamId,
    pub sample_offset: i32,
    pub value: f64,
}

/// Bounded sink for parameter changes reported by the processor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputParameterChanges {
    changes: Vec<ParamChange>,
    capacity: usize,
}

impl OutputParameterChanges {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            changes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `false` when the sink is full.
    pub fn push(&mut self, id: ParamId, sample_offset: i32, value: f64) -> bool {
        if self.changes.len() >= self.capacity {
            return false;
        }
        self.changes.push(ParamChange {
            id,
            sample_offset,
            value,
        });
        true
    }

    pub fn changes(&self) -> &[ParamChange] {
        &self.changes
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }

    pub fn reset(&mut self, capacity: usize) {
        self.changes.clear();
        self.capacity = capacity;
    }
}

/// Everything delivered with one process call. Buffers are borrowed for the
/// duration of the call only.
#[derive(Debug)]
pub struct ProcessData<'a> {
    pub process_mode: ProcessMode,
    pub sample_size: SampleSize,
    pub num_samples: usize,
    pub inputs: Vec<InputBus<'a>>,
    pub outputs: Vec<OutputBus<'a>>,
    pub input_events: &'a [Event],
    pub input_parameter_changes: &'a [ParameterQueue],
    pub output_parameter_changes: Option<&'a mut OutputParameterChanges>,
    pub context: Option<&'a ProcessContext>,
}

/// Per-block callback generic over the sample format.
pub trait BlockVisitor {
    fn visit<S: Sample>(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: usize);
}

struct Passthrough;

impl BlockVisitor for Passthrough {
    fn visit<S: Sample>(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: usize) {
        passthrough(inputs, outputs, frames);
    }
}

/// Copies inputs to outputs channel by channel; outputs without a matching
/// input are zeroed.
pub fn passthrough<S: Sample>(inputs: &[&[S]], outputs: &mut [&mut [S]], frames: usize) {
    for (index, output) in outputs.iter_mut().enumerate() {
        let end = frames.min(output.len());
        match inputs.get(index) {
            Some(input) => {
                let copied = end.min(input.len());
                output[..copied].copy_from_slice(&input[..copied]);
                output[copied..end].fill(S::default());
            }
            None => output[..end].fill(S::default()),
        }
    }
}

impl<'a> ProcessData<'a> {
    /// Runs `visitor` over the first input bus (if any) and the first output
    /// bus. Blocks without an output bus are accepted and do nothing.
    pub fn visit_main_buses<V: BlockVisitor>(&mut self, visitor: &mut V) -> Result<(), PluginError> {
        let frames = self.num_samples;
        let input = self.inputs.first();
        let Some(output) = self.outputs.first_mut() else {
            return Ok(());
        };
        match (&mut output.channels, input.map(|bus| &bus.channels)) {
            (ChannelsMut::Sample32(outputs), None) => visitor.visit::<f32>(&[], outputs, frames),
            (ChannelsMut::Sample64(outputs), None) => visitor.visit::<f64>(&[], outputs, frames),
            (ChannelsMut::Sample32(outputs), Some(ChannelsRef::Sample32(inputs))) => {
                visitor.visit(inputs, outputs, frames)
            }
            (ChannelsMut::Sample64(outputs), Some(ChannelsRef::Sample64(inputs))) => {
                visitor.visit(inputs, outputs, frames)
            }
            _ => {
                return Err(PluginError::invalid_argument(
                    "input and output buses use different sample sizes",
                ))
            }
        }
        Ok(())
    }

    /// Copies the main input bus to the main output bus and clears any
    /// further output buses.
    pub fn passthrough(&mut self) -> Result<(), PluginError> {
        self.visit_main_buses(&mut Passthrough)?;
        let frames = self.num_samples;
        for output in self.outputs.iter_mut().skip(1) {
            output.channels.clear(frames);
        }
        Ok(())
    }

    pub fn clear_outputs(&mut self) {
        let frames = self.num_samples;
        for output in &mut self.outputs {
            output.channels.clear(frames);
        }
    }

    pub fn set_output_silence(&mut self, silent: bool) {
        for output in &mut self.outputs {
            let count = output.channels.channel_count().min(64);
            output.silence_flags = if silent && count > 0 {
                u64::MAX >> (64 - count)
            } else {
                0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn passthrough_copies_and_zero_fills() {
        let left = [1.0f32, 2.0, 3.0];
        let mut out_l = [9.0f32; 3];
        let mut out_r = [9.0f32; 3];
        {
            let mut data = ProcessData {
                process_mode: ProcessMode::Realtime,
                sample_size: SampleSize::Sample32,
                num_samples: 3,
                inputs: vec![InputBus {
                    channels: ChannelsRef::Sample32(vec![&left[..]]),
                    silence_flags: 0,
                }],
                outputs: vec![OutputBus {
                    channels: ChannelsMut::Sample32(vec![&mut out_l[..], &mut out_r[..]]),
                    silence_flags: 0,
                }],
                input_events: &[],
                input_parameter_changes: &[],
                output_parameter_changes: None,
                context: None,
            };
            data.passthrough().unwrap();
        }
        assert_eq!(out_l, left);
        assert_eq!(out_r, [0.0; 3]);
    }

    #[test]
    fn mixed_sample_sizes_are_rejected() {
        let input = [0.0f64; 2];
        let mut output = [0.0f32; 2];
        let mut data = ProcessData {
            process_mode: ProcessMode::Offline,
            sample_size: SampleSize::Sample32,
            num_samples: 2,
            inputs: vec![InputBus {
                channels: ChannelsRef::Sample64(vec![&input[..]]),
                silence_flags: 0,
            }],
            outputs: vec![OutputBus {
                channels: ChannelsMut::Sample32(vec![&mut output[..]]),
                silence_flags: 0,
            }],
            input_events: &[],
            input_parameter_changes: &[],
            output_parameter_changes: None,
            context: None,
        };
        assert!(data.passthrough().is_err());
    }

    #[test]
    fn output_changes_respect_capacity() {
        let mut changes = OutputParameterChanges::with_capacity(1);
        assert!(changes.push(ParamId(1), 0, 0.5));
        assert!(!changes.push(ParamId(2), 0, 0.5));
        assert_eq!(changes.changes().len(), 1);
    }
}
