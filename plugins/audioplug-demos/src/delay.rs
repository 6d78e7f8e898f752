use std::ops::Range;

use audioplug_sdk::prelude::*;

use crate::common::{input_at, write_at, Dsp};

pub const TIME: ParamId = ParamId(0);
pub const FEEDBACK: ParamId = ParamId(1);
pub const MIX: ParamId = ParamId(2);
pub const BYPASS: ParamId = ParamId(3);

const CHANNELS: usize = 2;
const MAX_TIME_S: f64 = 2.0;
const MAX_FEEDBACK: f64 = 0.95;

/// Circular buffer for one channel. Sized once in `prepare`.
#[derive(Debug, Default)]
struct DelayLine {
    buffer: Vec<f32>,
    write: usize,
}

impl DelayLine {
    fn resize(&mut self, len: usize) {
        self.buffer.clear();
        self.buffer.resize(len.max(2), 0.0);
        self.write = 0;
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write = 0;
    }

    /// Reads the sample `delay` frames back and writes `input` plus feedback.
    #[inline]
    fn tick(&mut self, input: f32, delay: usize, feedback: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, len - 1);
        let read = (self.write + len - delay) % len;
        let wet = self.buffer[read];
        self.buffer[self.write] = input + wet * feedback;
        self.write = (self.write + 1) % len;
        wet
    }
}

/// Stereo feedback delay with a dry/wet mix.
#[derive(Debug)]
pub struct DelayDsp {
    lines: Vec<DelayLine>,
    sample_rate: f64,
    time_s: f64,
    delay_samples: usize,
    feedback: f32,
    mix: f32,
}

impl Default for DelayDsp {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            sample_rate: 48_000.0,
            time_s: 0.25,
            delay_samples: 12_000,
            feedback: 0.35,
            mix: 0.3,
        }
    }
}

impl DelayDsp {
    fn update_delay(&mut self) {
        let max = self.lines.first().map_or(1, |line| line.buffer.len().saturating_sub(1));
        let samples = (self.time_s * self.sample_rate).round() as usize;
        self.delay_samples = samples.clamp(1, max.max(1));
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }
}

impl Dsp for DelayDsp {
    fn buses() -> Vec<BusInfo> {
        vec![
            BusInfo::audio(BusDirection::Input, "Input", CHANNELS),
            BusInfo::audio(BusDirection::Output, "Output", CHANNELS),
        ]
    }

    fn parameters() -> ParameterLayout {
        ParameterLayout::new(vec![
            ParameterDefinition::new(
                TIME.0,
                "Time",
                ParameterKind::Continuous(
                    ContinuousParameterOptions::new(0.001..=MAX_TIME_S, 0.25).with_skew(0.5),
                ),
            )
            .with_unit("s"),
            ParameterDefinition::new(FEEDBACK.0, "Feedback", ParameterKind::continuous(0.0..=MAX_FEEDBACK, 0.35)),
            ParameterDefinition::new(MIX.0, "Mix", ParameterKind::continuous(0.0..=1.0, 0.3)),
            ParameterDefinition::bypass(BYPASS.0),
        ])
    }

    fn prepare(&mut self, setup: &ProcessSetup) {
        self.sample_rate = setup.sample_rate;
        let len = (MAX_TIME_S * setup.sample_rate).ceil() as usize + 1;
        self.lines.resize_with(CHANNELS, DelayLine::default);
        for line in &mut self.lines {
            line.resize(len);
        }
        self.update_delay();
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }

    fn set_parameter(&mut self, id: ParamId, plain: f64) {
        match id {
            TIME => {
                self.time_s = plain;
                self.update_delay();
            }
            FEEDBACK => self.feedback = plain.clamp(0.0, MAX_FEEDBACK) as f32,
            MIX => self.mix = plain.clamp(0.0, 1.0) as f32,
            _ => {}
        }
    }

    fn render<S: Sample>(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: Range<usize>) {
        let dry = 1.0 - self.mix;
        for (channel, output) in outputs.iter_mut().enumerate() {
            let line = self.lines.get_mut(channel);
            match line {
                Some(line) => {
                    for frame in frames.clone() {
                        let input = input_at(inputs, channel, frame);
                        let wet = line.tick(input, self.delay_samples, self.feedback);
                        write_at(output, frame, dry * input + self.mix * wet);
                    }
                }
                None => {
                    for frame in frames.clone() {
                        write_at(output, frame, dry * input_at(inputs, channel, frame));
                    }
                }
            }
        }
    }

    fn tail_samples(&self) -> u32 {
        // Feedback at its maximum decays by 60 dB in roughly 135 repeats.
        let repeats = if self.feedback > 0.0 {
            (-3.0 / f64::from(self.feedback).log10()).ceil()
        } else {
            1.0
        };
        (repeats * self.delay_samples as f64).min(f64::from(u32::MAX)) as u32
    }
}
