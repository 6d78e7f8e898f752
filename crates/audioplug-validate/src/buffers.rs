use audioplug_sdk::process::{ChannelsMut, ChannelsRef, InputBus, OutputBus};
use audioplug_sdk::{BusInfo, BusLayout, ProcessData, ProcessMode, SampleSize};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
enum BusStorage {
    Sample32(Vec<Vec<f32>>),
    Sample64(Vec<Vec<f64>>),
}

impl BusStorage {
    fn new(sample_size: SampleSize, channels: usize, frames: usize) -> Self {
        match sample_size {
            SampleSize::Sample32 => Self::Sample32(vec![vec![0.0; frames]; channels]),
            SampleSize::Sample64 => Self::Sample64(vec![vec![0.0; frames]; channels]),
        }
    }

    fn fill_with(&mut self, mut next: impl FnMut() -> f64) {
        match self {
            Self::Sample32(channels) => channels
                .iter_mut()
                .flatten()
                .for_each(|sample| *sample = next() as f32),
            Self::Sample64(channels) => channels
                .iter_mut()
                .flatten()
                .for_each(|sample| *sample = next()),
        }
    }

    fn samples(&self, channel: usize, frames: usize) -> Option<Vec<f64>> {
        match self {
            Self::Sample32(channels) => {
                let channel = channels.get(channel)?;
                Some(channel[..frames.min(channel.len())].iter().map(|&s| f64::from(s)).collect())
            }
            Self::Sample64(channels) => {
                let channel = channels.get(channel)?;
                Some(channel[..frames.min(channel.len())].to_vec())
            }
        }
    }

    fn channels(&self, frames: usize) -> ChannelsRef<'_> {
        match self {
            Self::Sample32(channels) => ChannelsRef::Sample32(
                channels.iter().map(|c| &c[..frames.min(c.len())]).collect(),
            ),
            Self::Sample64(channels) => ChannelsRef::Sample64(
                channels.iter().map(|c| &c[..frames.min(c.len())]).collect(),
            ),
        }
    }

    fn channels_mut(&mut self, frames: usize) -> ChannelsMut<'_> {
        match self {
            Self::Sample32(channels) => ChannelsMut::Sample32(
                channels
                    .iter_mut()
                    .map(|c| {
                        let end = frames.min(c.len());
                        &mut c[..end]
                    })
                    .collect(),
            ),
            Self::Sample64(channels) => ChannelsMut::Sample64(
                channels
                    .iter_mut()
                    .map(|c| {
                        let end = frames.min(c.len());
                        &mut c[..end]
                    })
                    .collect(),
            ),
        }
    }
}

/// Owned audio storage shaped after a bus layout.
#[derive(Debug, Clone)]
pub struct ProcessBuffers {
    sample_size: SampleSize,
    max_frames: usize,
    inputs: Vec<BusStorage>,
    outputs: Vec<BusStorage>,
}

impl ProcessBuffers {
    pub fn new(layout: &BusLayout, sample_size: SampleSize, max_frames: usize) -> Self {
        let shape = |buses: &[BusInfo]| -> Vec<BusStorage> {
            buses
                .iter()
                .map(|bus| BusStorage::new(sample_size, bus.channel_count, max_frames))
                .collect()
        };
        Self {
            sample_size,
            max_frames,
            inputs: shape(&layout.audio_inputs),
            outputs: shape(&layout.audio_outputs),
        }
    }

    pub fn sample_size(&self) -> SampleSize {
        self.sample_size
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn fill_silence(&mut self) {
        for bus in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            bus.fill_with(|| 0.0);
        }
    }

    /// Fills the inputs with reproducible white noise in [-0.5, 0.5) and
    /// primes the outputs with a marker value.
    pub fn fill_noise(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        for bus in &mut self.inputs {
            bus.fill_with(|| rng.gen_range(-0.5..0.5));
        }
        for bus in &mut self.outputs {
            bus.fill_with(|| 1.0);
        }
    }

    pub fn input(&self, bus: usize, channel: usize, frames: usize) -> Option<Vec<f64>> {
        self.inputs.get(bus)?.samples(channel, frames)
    }

    pub fn output(&self, bus: usize, channel: usize, frames: usize) -> Option<Vec<f64>> {
        self.outputs.get(bus)?.samples(channel, frames)
    }

    pub fn output_buses(&self) -> usize {
        self.outputs.len()
    }

    pub fn output_channels(&self, bus: usize) -> usize {
        match self.outputs.get(bus) {
            Some(BusStorage::Sample32(channels)) => channels.len(),
            Some(BusStorage::Sample64(channels)) => channels.len(),
            None => 0,
        }
    }

    /// Borrows the storage as a process payload of `num_samples` frames.
    /// Events, parameter changes and context are left empty.
    pub fn data(&mut self, num_samples: usize) -> ProcessData<'_> {
        let inputs = self
            .inputs
            .iter()
            .map(|bus| InputBus {
                channels: bus.channels(num_samples),
                silence_flags: 0,
            })
            .collect();
        let outputs = self
            .outputs
            .iter_mut()
            .map(|bus| OutputBus {
                channels: bus.channels_mut(num_samples),
                silence_flags: 0,
            })
            .collect();
        ProcessData {
            process_mode: ProcessMode::Realtime,
            sample_size: self.sample_size,
            num_samples,
            inputs,
            outputs,
            input_events: &[],
            input_parameter_changes: &[],
            output_parameter_changes: None,
            context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use audioplug_sdk::BusDirection;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn shapes_follow_the_layout() {
        let layout = BusLayout::from_buses([
            BusInfo::audio(BusDirection::Input, "In", 2),
            BusInfo::audio(BusDirection::Output, "Out", 2),
            BusInfo::audio(BusDirection::Output, "Aux", 1),
        ]);
        let mut buffers = ProcessBuffers::new(&layout, SampleSize::Sample64, 32);
        buffers.fill_noise(7);
        let data = buffers.data(16);
        assert_eq!(data.inputs.len(), 1);
        assert_eq!(data.outputs.len(), 2);
        assert_eq!(data.outputs[1].channels.channel_count(), 1);
        assert_eq!(data.inputs[0].channels.channel_len(0), Some(16));
        assert_eq!(data.sample_size, SampleSize::Sample64);
    }

    #[test]
    fn noise_is_reproducible() {
        let layout = BusLayout::from_buses([BusInfo::audio(BusDirection::Input, "In", 1)]);
        let mut a = ProcessBuffers::new(&layout, SampleSize::Sample32, 8);
        let mut b = a.clone();
        a.fill_noise(42);
        b.fill_noise(42);
        assert_eq!(a.input(0, 0, 8), b.input(0, 0, 8));
        assert!(a.input(0, 0, 8).unwrap().iter().any(|s| *s != 0.0));
    }
}
