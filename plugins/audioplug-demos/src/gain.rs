use std::ops::Range;

use audioplug_sdk::prelude::*;

use crate::common::{input_at, write_at, Dsp};
use crate::smoothing::Smoother;

pub const GAIN: ParamId = ParamId(0);
pub const BYPASS: ParamId = ParamId(1);

const MIN_DB: f64 = -60.0;
const MAX_DB: f64 = 12.0;
const RAMP_MS: f32 = 10.0;

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    if f64::from(db) <= MIN_DB {
        0.0
    } else {
        10.0f32.powf(db * 0.05)
    }
}

/// Stereo gain with a click-free ramp.
#[derive(Debug)]
pub struct GainDsp {
    target: f32,
    ramp: Smoother,
}

impl Default for GainDsp {
    fn default() -> Self {
        let mut ramp = Smoother::default();
        ramp.jump(1.0);
        Self { target: 1.0, ramp }
    }
}

impl Dsp for GainDsp {
    fn buses() -> Vec<BusInfo> {
        vec![
            BusInfo::audio(BusDirection::Input, "Input", 2),
            BusInfo::audio(BusDirection::Output, "Output", 2),
        ]
    }

    fn parameters() -> ParameterLayout {
        ParameterLayout::new(vec![
            ParameterDefinition::new(GAIN.0, "Gain", ParameterKind::continuous(MIN_DB..=MAX_DB, 0.0))
                .with_unit("dB"),
            ParameterDefinition::bypass(BYPASS.0),
        ])
    }

    fn prepare(&mut self, setup: &ProcessSetup) {
        self.ramp.set_time(setup.sample_rate as f32, RAMP_MS);
    }

    fn reset(&mut self) {
        self.ramp.jump(self.target);
    }

    fn set_parameter(&mut self, id: ParamId, plain: f64) {
        if id == GAIN {
            self.target = db_to_linear(plain as f32);
        }
    }

    fn render<S: Sample>(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: Range<usize>) {
        for frame in frames {
            let gain = self.ramp.next(self.target);
            for (channel, output) in outputs.iter_mut().enumerate() {
                write_at(output, frame, input_at(inputs, channel, frame) * gain);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decibels_map_to_linear_gain() {
        assert_eq!(db_to_linear(0.0), 1.0);
        assert_eq!(db_to_linear(-60.0), 0.0);
        assert!((db_to_linear(-6.0) - 0.501).abs() < 1e-3);
    }

    #[test]
    fn unity_gain_leaves_signal_untouched() {
        let mut dsp = GainDsp::default();
        dsp.prepare(&ProcessSetup::new(48_000.0, 4));
        dsp.reset();
        let left = [0.25f32, -0.5, 0.75, 1.0];
        let right = [0.1f32, 0.2, 0.3, 0.4];
        let (mut out_l, mut out_r) = ([0.0f32; 4], [0.0f32; 4]);
        dsp.render(&[&left[..], &right[..]], &mut [&mut out_l[..], &mut out_r[..]], 0..4);
        assert_eq!(out_l, left);
        assert_eq!(out_r, right);
    }

    #[test]
    fn gain_ramps_towards_new_target() {
        let mut dsp = GainDsp::default();
        dsp.prepare(&ProcessSetup::new(48_000.0, 64));
        dsp.reset();
        dsp.set_parameter(GAIN, MIN_DB);
        let input = [1.0f64; 64];
        let mut output = [0.0f64; 64];
        dsp.render(&[&input[..]], &mut [&mut output[..]], 0..64);
        assert!(output[0] < 1.0 && output[0] > 0.9);
        assert!(output.windows(2).all(|pair| pair[1] <= pair[0]));
    }
}
