use std::ops::Range;

use audioplug_sdk::prelude::*;
use audioplug_sdk::{OutputParameterChanges, ParameterFlags};

use crate::common::Dsp;

pub const BYPASS: ParamId = ParamId(0);
pub const PEAK_LEFT: ParamId = ParamId(1);
pub const PEAK_RIGHT: ParamId = ParamId(2);

const CHANNELS: usize = 2;

/// Passes audio through and reports the block peak of each channel as a
/// read-only output parameter.
#[derive(Debug, Default)]
pub struct MeterDsp {
    peaks: [f64; CHANNELS],
}

impl MeterDsp {
    pub fn peaks(&self) -> [f64; CHANNELS] {
        self.peaks
    }
}

impl Dsp for MeterDsp {
    fn buses() -> Vec<BusInfo> {
        vec![
            BusInfo::audio(BusDirection::Input, "Input", CHANNELS),
            BusInfo::audio(BusDirection::Output, "Output", CHANNELS),
        ]
    }

    fn parameters() -> ParameterLayout {
        let peak = |id: ParamId, name: &str| {
            ParameterDefinition::new(id.0, name, ParameterKind::continuous(0.0..=1.0, 0.0))
                .with_flags(ParameterFlags::READ_ONLY)
        };
        ParameterLayout::new(vec![
            ParameterDefinition::bypass(BYPASS.0),
            peak(PEAK_LEFT, "Peak L"),
            peak(PEAK_RIGHT, "Peak R"),
        ])
    }

    fn prepare(&mut self, _setup: &ProcessSetup) {}

    fn reset(&mut self) {
        self.peaks = [0.0; CHANNELS];
    }

    fn set_parameter(&mut self, _id: ParamId, _plain: f64) {}

    fn render<S: Sample>(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: Range<usize>) {
        for (channel, output) in outputs.iter_mut().enumerate() {
            let Some(input) = inputs.get(channel) else {
                output[frames.clone()].fill(S::default());
                continue;
            };
            output[frames.clone()].copy_from_slice(&input[frames.clone()]);
            if let Some(peak) = self.peaks.get_mut(channel) {
                *peak = input[frames.clone()]
                    .iter()
                    .map(|sample| sample.to_f64().abs())
                    .filter(|level| level.is_finite())
                    .fold(*peak, f64::max);
            }
        }
    }

    fn report(&mut self, changes: &mut OutputParameterChanges) {
        for (id, peak) in [PEAK_LEFT, PEAK_RIGHT].into_iter().zip(self.peaks) {
            changes.push(id, 0, peak.min(1.0));
        }
        self.peaks = [0.0; CHANNELS];
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reports_and_clears_block_peaks() {
        let mut dsp = MeterDsp::default();
        let left = [0.1f32, -0.6, 0.3];
        let right = [2.0f32, 0.0, 0.0];
        let (mut out_l, mut out_r) = ([0.0f32; 3], [0.0f32; 3]);
        dsp.render(&[&left[..], &right[..]], &mut [&mut out_l[..], &mut out_r[..]], 0..3);
        assert_eq!(out_l, left);
        assert_eq!(out_r, right);

        let mut changes = OutputParameterChanges::with_capacity(4);
        dsp.report(&mut changes);
        let reported: Vec<_> = changes.changes().iter().map(|c| (c.id, c.value)).collect();
        assert_eq!(
            reported,
            vec![(PEAK_LEFT, f64::from(0.6f32)), (PEAK_RIGHT, 1.0)]
        );
        assert_eq!(dsp.peaks(), [0.0, 0.0]);
    }
}
