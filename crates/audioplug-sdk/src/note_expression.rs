use audioplug_sys::{
    apk_note_expression_type_info_t, APK_NOTE_EXPRESSION_IS_BIPOLAR, APK_NOTE_EXPRESSION_PAN,
    APK_NOTE_EXPRESSION_TUNING, APK_NOTE_EXPRESSION_VOLUME, APK_STRING_SIZE,
};
use serde::Serialize;

use crate::strings::{empty, read_c_string, write_c_string};

pub const VOLUME: u32 = APK_NOTE_EXPRESSION_VOLUME;
pub const PAN: u32 = APK_NOTE_EXPRESSION_PAN;
pub const TUNING: u32 = APK_NOTE_EXPRESSION_TUNING;

/// A note-expression type declared by a controller for one event bus channel.
/// `minimum..=maximum` is the normalized range events of this type may carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteExpressionTypeInfo {
    pub type_id: u32,
    pub title: String,
    pub minimum: f64,
    pub maximum: f64,
    pub default_value: f64,
    pub bipolar: bool,
}

impl NoteExpressionTypeInfo {
    pub fn new(type_id: u32, title: impl Into<String>, default_value: f64) -> Self {
        Self {
            type_id,
            title: title.into(),
            minimum: 0.0,
            maximum: 1.0,
            default_value,
            bipolar: false,
        }
    }

    pub fn bipolar(mut self) -> Self {
        self.bipolar = true;
        self
    }

    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.minimum && value <= self.maximum
    }

    pub fn to_raw(&self) -> apk_note_expression_type_info_t {
        let mut title = empty::<APK_STRING_SIZE>();
        write_c_string(&mut title, &self.title);
        apk_note_expression_type_info_t {
            type_id: self.type_id,
            title,
            minimum: self.minimum,
            maximum: self.maximum,
            default_value: self.default_value,
            flags: if self.bipolar {
                APK_NOTE_EXPRESSION_IS_BIPOLAR
            } else {
                0
            },
        }
    }

    pub fn from_raw(raw: &apk_note_expression_type_info_t) -> Self {
        Self {
            type_id: raw.type_id,
            title: read_c_string(&raw.title),
            minimum: raw.minimum,
            maximum: raw.maximum,
            default_value: raw.default_value,
            bipolar: raw.flags & APK_NOTE_EXPRESSION_IS_BIPOLAR != 0,
        }
    }
}
