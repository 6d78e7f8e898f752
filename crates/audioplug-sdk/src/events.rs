use audioplug_sys::{
    apk_event_payload_t, apk_event_t, apk_note_expression_value_event_t, apk_note_off_event_t,
    apk_note_on_event_t, apk_poly_pressure_event_t, APK_EVENT_FLAG_IS_LIVE, APK_EVENT_NOTE_EXPRESSION_VALUE,
    APK_EVENT_NOTE_OFF, APK_EVENT_NOTE_ON, APK_EVENT_POLY_PRESSURE,
};
use serde::Serialize;

/// Upper bound on events delivered with a single process call.
pub const MAX_EVENTS: usize = 2048;

/// Note id used when the host does not track individual notes.
pub const NO_NOTE_ID: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteOn {
    pub channel: i16,
    pub pitch: i16,
    /// Detune in cents.
    pub tuning: f32,
    pub velocity: f32,
    pub length: i32,
    pub note_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteOff {
    pub channel: i16,
    pub pitch: i16,
    pub velocity: f32,
    pub note_id: i32,
    pub tuning: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolyPressure {
    pub channel: i16,
    pub pitch: i16,
    pub pressure: f32,
    pub note_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteExpressionValue {
    pub type_id: u32,
    pub note_id: i32,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    NoteOn(NoteOn),
    NoteOff(NoteOff),
    PolyPressure(PolyPressure),
    NoteExpression(NoteExpressionValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Event {
    pub bus_index: i32,
    pub sample_offset: i32,
    pub ppq_position: f64,
    pub live: bool,
    pub kind: EventKind,
}

impl Event {
    pub fn new(sample_offset: i32, kind: EventKind) -> Self {
        Self {
            bus_index: 0,
            sample_offset,
            ppq_position: 0.0,
            live: false,
            kind,
        }
    }

    pub fn note_on(sample_offset: i32, channel: i16, pitch: i16, velocity: f32) -> Self {
        Self::new(
            sample_offset,
            EventKind::NoteOn(NoteOn {
                channel,
                pitch,
                tuning: 0.0,
                velocity,
                length: 0,
                note_id: NO_NOTE_ID,
            }),
        )
    }

    pub fn note_off(sample_offset: i32, channel: i16, pitch: i16) -> Self {
        Self::new(
            sample_offset,
            EventKind::NoteOff(NoteOff {
                channel,
                pitch,
                velocity: 0.0,
                note_id: NO_NOTE_ID,
                tuning: 0.0,
            }),
        )
    }

    pub fn note_expression(sample_offset: i32, type_id: u32, note_id: i32, value: f64) -> Self {
        Self::new(
            sample_offset,
            EventKind::NoteExpression(NoteExpressionValue {
                type_id,
                note_id,
                value,
            }),
        )
    }

    pub fn on_bus(mut self, bus_index: i32) -> Self {
        self.bus_index = bus_index;
        self
    }

    /// MIDI-style channel carried by the event, if any.
    pub fn channel(&self) -> Option<i16> {
        match &self.kind {
            EventKind::NoteOn(e) => Some(e.channel),
            EventKind::NoteOff(e) => Some(e.channel),
            EventKind::PolyPressure(e) => Some(e.channel),
            EventKind::NoteExpression(_) => None,
        }
    }

    pub fn to_raw(&self) -> apk_event_t {
        let (event_type, payload) = match self.kind {
            EventKind::NoteOn(e) => (
                APK_EVENT_NOTE_ON,
                apk_event_payload_t {
                    note_on: apk_note_on_event_t {
                        channel: e.channel,
                        pitch: e.pitch,
                        tuning: e.tuning,
                        velocity: e.velocity,
                        length: e.length,
                        note_id: e.note_id,
                    },
                },
            ),
            EventKind::NoteOff(e) => (
                APK_EVENT_NOTE_OFF,
                apk_event_payload_t {
                    note_off: apk_note_off_event_t {
                        channel: e.channel,
                        pitch: e.pitch,
                        velocity: e.velocity,
                        note_id: e.note_id,
                        tuning: e.tuning,
                    },
                },
            ),
            EventKind::PolyPressure(e) => (
                APK_EVENT_POLY_PRESSURE,
                apk_event_payload_t {
                    poly_pressure: apk_poly_pressure_event_t {
                        channel: e.channel,
                        pitch: e.pitch,
                        pressure: e.pressure,
                        note_id: e.note_id,
                    },
                },
            ),
            EventKind::NoteExpression(e) => (
                APK_EVENT_NOTE_EXPRESSION_VALUE,
                apk_event_payload_t {
                    note_expression: apk_note_expression_value_event_t {
                        type_id: e.type_id,
                        note_id: e.note_id,
                        value: e.value,
                    },
                },
            ),
        };
        apk_event_t {
            bus_index: self.bus_index,
            sample_offset: self.sample_offset,
            ppq_position: self.ppq_position,
            flags: if self.live { APK_EVENT_FLAG_IS_LIVE } else { 0 },
            event_type,
            payload,
        }
    }

    /// Converts a raw event. Unknown event types yield `None`.
    pub fn from_raw(raw: &apk_event_t) -> Option<Self> {
        // Safety: the union member read is selected by `event_type`.
        let kind = unsafe {
            match raw.event_type {
                APK_EVENT_NOTE_ON => {
                    let e = raw.payload.note_on;
                    EventKind::NoteOn(NoteOn {
                        channel: e.channel,
                        pitch: e.pitch,
                        tuning: e.tuning,
                        velocity: e.velocity,
                        length: e.length,
                        note_id: e.note_id,
                    })
                }
                APK_EVENT_NOTE_OFF => {
                    let e = raw.payload.note_off;
                    EventKind::NoteOff(NoteOff {
                        channel: e.channel,
                        pitch: e.pitch,
                        velocity: e.velocity,
                        note_id: e.note_id,
                        tuning: e.tuning,
                    })
                }
                APK_EVENT_POLY_PRESSURE => {
                    let e = raw.payload.poly_pressure;
                    EventKind::PolyPressure(PolyPressure {
                        channel: e.channel,
                        pitch: e.pitch,
                        pressure: e.pressure,
                        note_id: e.note_id,
                    })
                }
                APK_EVENT_NOTE_EXPRESSION_VALUE => {
                    let e = raw.payload.note_expression;
                    EventKind::NoteExpression(NoteExpressionValue {
                        type_id: e.type_id,
                        note_id: e.note_id,
                        value: e.value,
                    })
                }
                _ => return None,
            }
        };
        Some(Self {
            bus_index: raw.bus_index,
            sample_offset: raw.sample_offset,
            ppq_position: raw.ppq_position,
            live: raw.flags & APK_EVENT_FLAG_IS_LIVE != 0,
            kind,
        })
    }
}
