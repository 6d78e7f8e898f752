//! Polyphonic oscillator instrument.
//!
//! Notes are matched by note id when the host sends one and by channel and
//! pitch otherwise. Volume and tuning note expressions act per voice.

use std::f32::consts::TAU;
use std::ops::Range;

use audioplug_sdk::events::NO_NOTE_ID;
use audioplug_sdk::note_expression::{TUNING, VOLUME as VOLUME_EXPRESSION};
use audioplug_sdk::prelude::*;

use crate::common::{write_at, Dsp};
use crate::smoothing::Smoother;

pub const VOLUME: ParamId = ParamId(0);
pub const WAVEFORM: ParamId = ParamId(1);

pub const VOICES: usize = 16;
const EVENT_CHANNELS: usize = 16;
const ATTACK_MS: f32 = 2.0;
const RELEASE_MS: f32 = 60.0;
const SILENCE: f32 = 1e-4;
const HEADROOM: f32 = 0.25;
const TUNING_RANGE_SEMITONES: f32 = 12.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Saw,
}

impl Waveform {
    const NAMES: [&'static str; 3] = ["Sine", "Triangle", "Saw"];

    fn from_index(index: f64) -> Self {
        match index.round() as i64 {
            1 => Waveform::Triangle,
            2 => Waveform::Saw,
            _ => Waveform::Sine,
        }
    }

    /// `phase` is in cycles, `[0, 1)`.
    #[inline]
    fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Saw => 2.0 * phase - 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Voice {
    active: bool,
    released: bool,
    channel: i16,
    pitch: i16,
    note_id: i32,
    /// Detune of the note-on event, in cents.
    detune: f32,
    /// Tuning expression offset, in semitones.
    bend: f32,
    level: f32,
    velocity: f32,
    phase: f32,
    increment: f32,
    envelope: Smoother,
    started: u64,
}

impl Voice {
    fn retune(&mut self, sample_rate: f32) {
        let semitones = f32::from(self.pitch) - 69.0 + self.detune / 100.0 + self.bend;
        let frequency = 440.0 * 2.0f32.powf(semitones / 12.0);
        self.increment = (frequency / sample_rate).min(0.5);
    }

    fn matches(&self, channel: i16, pitch: i16, note_id: i32) -> bool {
        if !self.active || self.released {
            return false;
        }
        if note_id != NO_NOTE_ID {
            self.note_id == note_id
        } else {
            self.channel == channel && self.pitch == pitch
        }
    }

    #[inline]
    fn next(&mut self, waveform: Waveform) -> f32 {
        let target = if self.released { 0.0 } else { self.velocity };
        let gain = self.envelope.next(target);
        if self.released && gain < SILENCE {
            self.active = false;
            return 0.0;
        }
        let sample = waveform.sample(self.phase) * gain * self.level;
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}

#[derive(Debug)]
pub struct SynthDsp {
    voices: [Voice; VOICES],
    sample_rate: f32,
    volume: f32,
    waveform: Waveform,
    clock: u64,
}

impl Default for SynthDsp {
    fn default() -> Self {
        Self {
            voices: [Voice::default(); VOICES],
            sample_rate: 48_000.0,
            volume: 0.7,
            waveform: Waveform::Sine,
            clock: 0,
        }
    }
}

impl SynthDsp {
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|voice| voice.active).count()
    }

    fn note_on(&mut self, channel: i16, pitch: i16, note_id: i32, detune: f32, velocity: f32) {
        self.clock += 1;
        let slot = self
            .voices
            .iter()
            .position(|voice| !voice.active)
            .or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, voice)| voice.started)
                    .map(|(index, _)| index)
            })
            .unwrap_or(0);
        let mut voice = Voice {
            active: true,
            channel,
            pitch,
            note_id,
            detune,
            level: 1.0,
            velocity: velocity.clamp(0.0, 1.0),
            envelope: Smoother::new(self.sample_rate, ATTACK_MS),
            started: self.clock,
            ..Voice::default()
        };
        voice.retune(self.sample_rate);
        self.voices[slot] = voice;
    }

    fn note_off(&mut self, channel: i16, pitch: i16, note_id: i32) {
        let sample_rate = self.sample_rate;
        for voice in self.voices.iter_mut().filter(|voice| voice.matches(channel, pitch, note_id)) {
            voice.released = true;
            voice.envelope.set_time(sample_rate, RELEASE_MS);
        }
    }

    fn expression(&mut self, type_id: u32, note_id: i32, value: f64) {
        if note_id == NO_NOTE_ID {
            return;
        }
        let sample_rate = self.sample_rate;
        let value = value.clamp(0.0, 1.0) as f32;
        for voice in self.voices.iter_mut().filter(|voice| voice.active && voice.note_id == note_id) {
            match type_id {
                VOLUME_EXPRESSION => voice.level = value * 4.0,
                TUNING => {
                    voice.bend = (value - 0.5) * 2.0 * TUNING_RANGE_SEMITONES;
                    voice.retune(sample_rate);
                }
                _ => {}
            }
        }
    }
}

impl Dsp for SynthDsp {
    fn buses() -> Vec<BusInfo> {
        vec![
            BusInfo::events(BusDirection::Input, "Notes", EVENT_CHANNELS),
            BusInfo::audio(BusDirection::Output, "Output", 2),
        ]
    }

    fn parameters() -> ParameterLayout {
        ParameterLayout::new(vec![
            ParameterDefinition::new(VOLUME.0, "Volume", ParameterKind::continuous(0.0..=1.0, 0.7)),
            ParameterDefinition::new(
                WAVEFORM.0,
                "Waveform",
                ParameterKind::Choice {
                    options: Waveform::NAMES.iter().map(|name| name.to_string()).collect(),
                    default: 0,
                },
            ),
        ])
    }

    fn note_expressions() -> Vec<NoteExpressionTypeInfo> {
        vec![
            NoteExpressionTypeInfo::new(VOLUME_EXPRESSION, "Volume", 0.25),
            NoteExpressionTypeInfo::new(TUNING, "Tuning", 0.5).bipolar(),
        ]
    }

    fn prepare(&mut self, setup: &ProcessSetup) {
        self.sample_rate = setup.sample_rate as f32;
    }

    fn reset(&mut self) {
        self.voices = [Voice::default(); VOICES];
    }

    fn set_parameter(&mut self, id: ParamId, plain: f64) {
        match id {
            VOLUME => self.volume = plain.clamp(0.0, 1.0) as f32,
            WAVEFORM => self.waveform = Waveform::from_index(plain),
            _ => {}
        }
    }

    fn handle_event(&mut self, event: &Event) {
        match event.kind {
            EventKind::NoteOn(note) if note.velocity > 0.0 => {
                self.note_on(note.channel, note.pitch, note.note_id, note.tuning, note.velocity)
            }
            EventKind::NoteOn(note) => self.note_off(note.channel, note.pitch, note.note_id),
            EventKind::NoteOff(note) => self.note_off(note.channel, note.pitch, note.note_id),
            EventKind::NoteExpression(expression) => {
                self.expression(expression.type_id, expression.note_id, expression.value)
            }
            EventKind::PolyPressure(_) => {}
        }
    }

    fn render<S: Sample>(&mut self, _inputs: &[&[S]], outputs: &mut [&mut [S]], frames: Range<usize>) {
        let gain = self.volume * HEADROOM;
        for frame in frames {
            let mut mix = 0.0;
            for voice in self.voices.iter_mut().filter(|voice| voice.active) {
                mix += voice.next(self.waveform);
            }
            for output in outputs.iter_mut() {
                write_at(output, frame, mix * gain);
            }
        }
    }

    fn tail_samples(&self) -> u32 {
        // Five time constants take the release below the silence threshold.
        (self.sample_rate * RELEASE_MS * 0.001 * 5.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn prepared() -> SynthDsp {
        let mut dsp = SynthDsp::default();
        dsp.prepare(&ProcessSetup::new(48_000.0, 512));
        dsp
    }

    fn render(dsp: &mut SynthDsp, frames: usize) -> Vec<f32> {
        let mut left = vec![0.0f32; frames];
        dsp.render::<f32>(&[], &mut [&mut left[..]], 0..frames);
        left
    }

    #[test]
    fn note_on_sounds_and_note_off_decays_to_silence() {
        let mut dsp = prepared();
        dsp.handle_event(&Event::note_on(0, 0, 69, 1.0));
        let held = render(&mut dsp, 512);
        assert!(held.iter().any(|sample| sample.abs() > 0.01));

        dsp.handle_event(&Event::note_off(0, 0, 69));
        render(&mut dsp, 48_000);
        assert_eq!(dsp.active_voices(), 0);
        assert!(render(&mut dsp, 64).iter().all(|sample| *sample == 0.0));
    }

    #[test]
    fn voices_are_stolen_oldest_first() {
        let mut dsp = prepared();
        for pitch in 0..(VOICES as i16 + 1) {
            dsp.handle_event(&Event::note_on(0, 0, 40 + pitch, 0.5));
        }
        assert_eq!(dsp.active_voices(), VOICES);
        assert!(dsp.voices.iter().all(|voice| voice.pitch != 40));
    }

    #[test]
    fn note_ids_take_precedence_over_pitch() {
        let mut dsp = prepared();
        dsp.note_on(0, 60, 7, 0.0, 0.8);
        dsp.note_on(0, 60, 8, 0.0, 0.8);
        dsp.note_off(0, 60, 8);
        let released: Vec<i32> = dsp
            .voices
            .iter()
            .filter(|voice| voice.active && voice.released)
            .map(|voice| voice.note_id)
            .collect();
        assert_eq!(released, vec![8]);
    }

    #[test]
    fn tuning_expression_bends_the_voice() {
        let mut dsp = prepared();
        dsp.note_on(0, 69, 3, 0.0, 0.8);
        let before = dsp.voices[0].increment;
        dsp.handle_event(&Event::note_expression(0, TUNING, 3, 1.0));
        assert!((dsp.voices[0].increment / before - 2.0).abs() < 1e-4);
        dsp.handle_event(&Event::note_expression(0, VOLUME_EXPRESSION, 3, 0.0));
        assert_eq!(dsp.voices[0].level, 0.0);
    }
}
