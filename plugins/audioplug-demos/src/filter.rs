use std::f32::consts::PI;
use std::ops::Range;

use audioplug_sdk::prelude::*;

use crate::common::{input_at, write_at, Dsp};

pub const CUTOFF: ParamId = ParamId(0);
pub const RESONANCE: ParamId = ParamId(1);
pub const BYPASS: ParamId = ParamId(2);

const CHANNELS: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Coefficients {
    a1: f32,
    a2: f32,
    a3: f32,
}

impl Coefficients {
    /// Trapezoidal state-variable low-pass.
    fn lowpass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        let cutoff = cutoff_hz.clamp(10.0, 0.45 * sample_rate);
        let g = (PI * cutoff / sample_rate).tan();
        let k = 1.0 / q.max(0.05);
        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        Self { a1, a2, a3: g * a2 }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SvfState {
    ic1eq: f32,
    ic2eq: f32,
}

impl SvfState {
    #[inline]
    fn tick(&mut self, c: &Coefficients, input: f32) -> f32 {
        let v3 = input - self.ic2eq;
        let v1 = c.a1 * self.ic1eq + c.a2 * v3;
        let v2 = self.ic2eq + c.a2 * self.ic1eq + c.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        v2
    }
}

#[derive(Debug)]
pub struct FilterDsp {
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    coefficients: Coefficients,
    states: [SvfState; CHANNELS],
}

impl Default for FilterDsp {
    fn default() -> Self {
        let mut dsp = Self {
            sample_rate: 48_000.0,
            cutoff: 1_000.0,
            resonance: std::f32::consts::FRAC_1_SQRT_2,
            coefficients: Coefficients::default(),
            states: [SvfState::default(); CHANNELS],
        };
        dsp.update();
        dsp
    }
}

impl FilterDsp {
    fn update(&mut self) {
        self.coefficients = Coefficients::lowpass(self.sample_rate, self.cutoff, self.resonance);
    }
}

impl Dsp for FilterDsp {
    fn buses() -> Vec<BusInfo> {
        vec![
            BusInfo::audio(BusDirection::Input, "Input", CHANNELS),
            BusInfo::audio(BusDirection::Output, "Output", CHANNELS),
        ]
    }

    fn parameters() -> ParameterLayout {
        ParameterLayout::new(vec![
            ParameterDefinition::new(
                CUTOFF.0,
                "Cutoff",
                ParameterKind::Continuous(
                    ContinuousParameterOptions::new(20.0..=20_000.0, 1_000.0).with_skew(0.3),
                ),
            )
            .with_unit("Hz"),
            ParameterDefinition::new(
                RESONANCE.0,
                "Resonance",
                ParameterKind::continuous(0.5..=10.0, f64::from(std::f32::consts::FRAC_1_SQRT_2)),
            ),
            ParameterDefinition::bypass(BYPASS.0),
        ])
    }

    fn prepare(&mut self, setup: &ProcessSetup) {
        self.sample_rate = setup.sample_rate as f32;
        self.update();
    }

    fn reset(&mut self) {
        self.states = [SvfState::default(); CHANNELS];
    }

    fn set_parameter(&mut self, id: ParamId, plain: f64) {
        match id {
            CUTOFF => self.cutoff = plain as f32,
            RESONANCE => self.resonance = plain as f32,
            _ => return,
        }
        self.update();
    }

    fn render<S: Sample>(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: Range<usize>) {
        let coefficients = self.coefficients;
        for (channel, output) in outputs.iter_mut().enumerate() {
            match self.states.get_mut(channel) {
                Some(state) => {
                    for frame in frames.clone() {
                        let filtered = state.tick(&coefficients, input_at(inputs, channel, frame));
                        write_at(output, frame, filtered);
                    }
                }
                None => output[frames.clone()].fill(S::default()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(dsp: &mut FilterDsp, input: &[f32]) -> Vec<f32> {
        let mut output = vec![0.0f32; input.len()];
        dsp.render(&[input], &mut [&mut output[..]], 0..input.len());
        output
    }

    #[test]
    fn passes_dc_and_attenuates_nyquist() {
        let mut dsp = FilterDsp::default();
        dsp.prepare(&ProcessSetup::new(48_000.0, 4_096));
        let dc = run(&mut dsp, &[1.0; 4_096]);
        assert!((dc[4_095] - 1.0).abs() < 1e-3);

        dsp.reset();
        let nyquist: Vec<f32> = (0..4_096).map(|n| if n % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let output = run(&mut dsp, &nyquist);
        let peak = output[2_048..].iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        assert!(peak < 0.01, "nyquist leaked at {peak}");
    }

    #[test]
    fn cutoff_is_clamped_below_nyquist() {
        let mut dsp = FilterDsp::default();
        dsp.prepare(&ProcessSetup::new(44_100.0, 64));
        dsp.set_parameter(CUTOFF, 20_000.0);
        dsp.set_parameter(RESONANCE, 10.0);
        let noise: Vec<f32> = (0..4_096).map(|n| ((n * 7_919) % 200) as f32 / 100.0 - 1.0).collect();
        assert!(run(&mut dsp, &noise).iter().all(|s| s.is_finite()));
    }
}
