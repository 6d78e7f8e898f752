use audioplug_sys::{
    apk_bus_direction, apk_bus_info_t, apk_media_type, APK_BUS_AUX, APK_BUS_FLAG_DEFAULT_ACTIVE,
    APK_BUS_MAIN, APK_DIRECTION_INPUT, APK_DIRECTION_OUTPUT, APK_MEDIA_AUDIO, APK_MEDIA_EVENT,
    APK_STRING_SIZE,
};
use serde::Serialize;

use crate::strings::{empty, read_c_string, write_c_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    Audio,
    Event,
}

impl MediaType {
    pub fn to_raw(self) -> apk_media_type {
        match self {
            MediaType::Audio => APK_MEDIA_AUDIO,
            MediaType::Event => APK_MEDIA_EVENT,
        }
    }

    pub fn from_raw(raw: apk_media_type) -> Option<Self> {
        match raw {
            APK_MEDIA_AUDIO => Some(MediaType::Audio),
            APK_MEDIA_EVENT => Some(MediaType::Event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusDirection {
    Input,
    Output,
}

impl BusDirection {
    pub fn to_raw(self) -> apk_bus_direction {
        match self {
            BusDirection::Input => APK_DIRECTION_INPUT,
            BusDirection::Output => APK_DIRECTION_OUTPUT,
        }
    }

    pub fn from_raw(raw: apk_bus_direction) -> Option<Self> {
        match raw {
            APK_DIRECTION_INPUT => Some(BusDirection::Input),
            APK_DIRECTION_OUTPUT => Some(BusDirection::Output),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusKind {
    Main,
    Aux,
}

/// Description of one bus as declared by a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusInfo {
    pub media: MediaType,
    pub direction: BusDirection,
    pub channel_count: usize,
    pub name: String,
    pub kind: BusKind,
    pub default_active: bool,
}

impl BusInfo {
    pub fn audio(direction: BusDirection, name: impl Into<String>, channel_count: usize) -> Self {
        Self {
            media: MediaType::Audio,
            direction,
            channel_count,
            name: name.into(),
            kind: BusKind::Main,
            default_active: true,
        }
    }

    pub fn events(direction: BusDirection, name: impl Into<String>, channel_count: usize) -> Self {
        Self {
            media: MediaType::Event,
            direction,
            channel_count,
            name: name.into(),
            kind: BusKind::Main,
            default_active: true,
        }
    }

    pub fn with_kind(mut self, kind: BusKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn to_raw(&self) -> apk_bus_info_t {
        let mut name = empty::<APK_STRING_SIZE>();
        write_c_string(&mut name, &self.name);
        apk_bus_info_t {
            media_type: self.media.to_raw(),
            direction: self.direction.to_raw(),
            channel_count: i32::try_from(self.channel_count).unwrap_or(i32::MAX),
            name,
            bus_type: match self.kind {
                BusKind::Main => APK_BUS_MAIN,
                BusKind::Aux => APK_BUS_AUX,
            },
            flags: if self.default_active {
                APK_BUS_FLAG_DEFAULT_ACTIVE
            } else {
                0
            },
        }
    }

    pub fn from_raw(raw: &apk_bus_info_t) -> Option<Self> {
        Some(Self {
            media: MediaType::from_raw(raw.media_type)?,
            direction: BusDirection::from_raw(raw.direction)?,
            channel_count: usize::try_from(raw.channel_count).ok()?,
            name: read_c_string(&raw.name),
            kind: if raw.bus_type == APK_BUS_AUX {
                BusKind::Aux
            } else {
                BusKind::Main
            },
            default_active: raw.flags & APK_BUS_FLAG_DEFAULT_ACTIVE != 0,
        })
    }
}

/// All buses a component declares, grouped by media and direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusLayout {
    pub audio_inputs: Vec<BusInfo>,
    pub audio_outputs: Vec<BusInfo>,
    pub event_inputs: Vec<BusInfo>,
    pub event_outputs: Vec<BusInfo>,
}

impl BusLayout {
    pub fn from_buses(buses: impl IntoIterator<Item = BusInfo>) -> Self {
        let mut layout = Self::default();
        for bus in buses {
            layout.buses_mut(bus.media, bus.direction).push(bus);
        }
        layout
    }

    pub fn buses(&self, media: MediaType, direction: BusDirection) -> &[BusInfo] {
        match (media, direction) {
            (MediaType::Audio, BusDirection::Input) => &self.audio_inputs,
            (MediaType::Audio, BusDirection::Output) => &self.audio_outputs,
            (MediaType::Event, BusDirection::Input) => &self.event_inputs,
            (MediaType::Event, BusDirection::Output) => &self.event_outputs,
        }
    }

    fn buses_mut(&mut self, media: MediaType, direction: BusDirection) -> &mut Vec<BusInfo> {
        match (media, direction) {
            (MediaType::Audio, BusDirection::Input) => &mut self.audio_inputs,
            (MediaType::Audio, BusDirection::Output) => &mut self.audio_outputs,
            (MediaType::Event, BusDirection::Input) => &mut self.event_inputs,
            (MediaType::Event, BusDirection::Output) => &mut self.event_outputs,
        }
    }

    /// Reads the layout a component reports through its bus queries.
    pub fn query<C: crate::Component + ?Sized>(component: &C) -> Self {
        let mut layout = Self::default();
        for media in [MediaType::Audio, MediaType::Event] {
            for direction in [BusDirection::Input, BusDirection::Output] {
                let count = component.bus_count(media, direction);
                let buses = layout.buses_mut(media, direction);
                for index in 0..count {
                    if let Some(info) = component.bus_info(media, direction, index) {
                        buses.push(info);
                    }
                }
            }
        }
        layout
    }
}
