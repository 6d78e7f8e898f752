#![no_std]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

//! Raw `#[repr(C)]` definitions of the audioplug binary interface.
//!
//! Every structure in this crate is part of the frozen ABI shared between a
//! host and a plug-in module. Safe wrappers live in `audioplug-sdk` (plug-in
//! side) and `audioplug-host` (host side).

use cty::c_char;

pub use cty;

/// ABI revision compiled into these definitions. Hosts refuse modules that
/// report a different major revision.
pub const APK_ABI_VERSION_MAJOR: u16 = 1;
pub const APK_ABI_VERSION_MINOR: u16 = 0;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct apk_version_t {
    pub major: u16,
    pub minor: u16,
}

pub const APK_ABI_VERSION: apk_version_t = apk_version_t {
    major: APK_ABI_VERSION_MAJOR,
    minor: APK_ABI_VERSION_MINOR,
};

/// Name of the exported module entry symbol, nul terminated.
pub const APK_ENTRY_SYMBOL: &[u8] = b"audioplug_entry\0";

// ---------------------------------------------------------------------------
// Result codes
// ---------------------------------------------------------------------------

pub type apk_result = i32;

pub const APK_OK: apk_result = 0;
pub const APK_FALSE: apk_result = 1;
pub const APK_INVALID_ARGUMENT: apk_result = 2;
pub const APK_NOT_IMPLEMENTED: apk_result = 3;
pub const APK_INTERNAL_ERROR: apk_result = 4;
pub const APK_NOT_INITIALIZED: apk_result = 5;
pub const APK_OUT_OF_MEMORY: apk_result = 6;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// 128-bit class identifier.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct apk_uid_t {
    pub bytes: [u8; 16],
}

pub const APK_NAME_SIZE: usize = 64;
pub const APK_STRING_SIZE: usize = 128;
pub const APK_URL_SIZE: usize = 256;
pub const APK_SHORT_STRING_SIZE: usize = 32;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_factory_info_t {
    pub vendor: [c_char; APK_NAME_SIZE],
    pub url: [c_char; APK_URL_SIZE],
    pub email: [c_char; APK_STRING_SIZE],
}

pub type apk_class_category = i32;
pub const APK_CLASS_PROCESSOR: apk_class_category = 0;
pub const APK_CLASS_CONTROLLER: apk_class_category = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_class_info_t {
    pub cid: apk_uid_t,
    pub category: apk_class_category,
    pub name: [c_char; APK_NAME_SIZE],
    pub vendor: [c_char; APK_NAME_SIZE],
    pub version: [c_char; APK_SHORT_STRING_SIZE],
    /// `|`-separated sub categories such as `Fx|Delay`.
    pub sub_categories: [c_char; APK_STRING_SIZE],
}

// ---------------------------------------------------------------------------
// Buses
// ---------------------------------------------------------------------------

pub type apk_media_type = i32;
pub const APK_MEDIA_AUDIO: apk_media_type = 0;
pub const APK_MEDIA_EVENT: apk_media_type = 1;

pub type apk_bus_direction = i32;
pub const APK_DIRECTION_INPUT: apk_bus_direction = 0;
pub const APK_DIRECTION_OUTPUT: apk_bus_direction = 1;

pub type apk_bus_type = i32;
pub const APK_BUS_MAIN: apk_bus_type = 0;
pub const APK_BUS_AUX: apk_bus_type = 1;

pub const APK_BUS_FLAG_DEFAULT_ACTIVE: u32 = 1 << 0;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_bus_info_t {
    pub media_type: apk_media_type,
    pub direction: apk_bus_direction,
    pub channel_count: i32,
    pub name: [c_char; APK_STRING_SIZE],
    pub bus_type: apk_bus_type,
    pub flags: u32,
}

// ---------------------------------------------------------------------------
// Processing setup and data
// ---------------------------------------------------------------------------

pub type apk_process_mode = i32;
pub const APK_PROCESS_REALTIME: apk_process_mode = 0;
pub const APK_PROCESS_PREFETCH: apk_process_mode = 1;
pub const APK_PROCESS_OFFLINE: apk_process_mode = 2;

pub type apk_sample_size = i32;
pub const APK_SAMPLE_32: apk_sample_size = 0;
pub const APK_SAMPLE_64: apk_sample_size = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct apk_process_setup_t {
    pub process_mode: apk_process_mode,
    pub sample_size: apk_sample_size,
    pub max_samples_per_block: i32,
    pub sample_rate: f64,
}

/// Channel pointers for one bus. Only the pointer array matching the
/// negotiated sample size is valid; the other is null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_audio_bus_buffers_t {
    pub num_channels: i32,
    pub silence_flags: u64,
    pub channel_buffers32: *mut *mut f32,
    pub channel_buffers64: *mut *mut f64,
}

pub type apk_event_type = u16;
pub const APK_EVENT_NOTE_ON: apk_event_type = 0;
pub const APK_EVENT_NOTE_OFF: apk_event_type = 1;
pub const APK_EVENT_POLY_PRESSURE: apk_event_type = 2;
pub const APK_EVENT_NOTE_EXPRESSION_VALUE: apk_event_type = 3;

pub const APK_EVENT_FLAG_IS_LIVE: u16 = 1 << 0;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct apk_note_on_event_t {
    pub channel: i16,
    pub pitch: i16,
    pub tuning: f32,
    pub velocity: f32,
    pub length: i32,
    pub note_id: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct apk_note_off_event_t {
    pub channel: i16,
    pub pitch: i16,
    pub velocity: f32,
    pub note_id: i32,
    pub tuning: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct apk_poly_pressure_event_t {
    pub channel: i16,
    pub pitch: i16,
    pub pressure: f32,
    pub note_id: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct apk_note_expression_value_event_t {
    pub type_id: u32,
    pub note_id: i32,
    pub value: f64,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union apk_event_payload_t {
    pub note_on: apk_note_on_event_t,
    pub note_off: apk_note_off_event_t,
    pub poly_pressure: apk_poly_pressure_event_t,
    pub note_expression: apk_note_expression_value_event_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct apk_event_t {
    pub bus_index: i32,
    pub sample_offset: i32,
    pub ppq_position: f64,
    pub flags: u16,
    pub event_type: apk_event_type,
    pub payload: apk_event_payload_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_event_list_t {
    pub count: i32,
    pub events: *const apk_event_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct apk_param_point_t {
    pub sample_offset: i32,
    pub value: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_param_queue_t {
    pub param_id: u32,
    pub point_count: i32,
    pub points: *const apk_param_point_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_param_changes_t {
    pub queue_count: i32,
    pub queues: *const apk_param_queue_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct apk_param_change_t {
    pub param_id: u32,
    pub sample_offset: i32,
    pub value: f64,
}

/// Host-allocated storage the processor appends output changes to.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_output_param_changes_t {
    pub capacity: i32,
    pub count: i32,
    pub changes: *mut apk_param_change_t,
}

pub const APK_CONTEXT_PLAYING: u32 = 1 << 1;
pub const APK_CONTEXT_RECORDING: u32 = 1 << 3;
pub const APK_CONTEXT_SYSTEM_TIME_VALID: u32 = 1 << 8;
pub const APK_CONTEXT_PROJECT_TIME_MUSIC_VALID: u32 = 1 << 9;
pub const APK_CONTEXT_TEMPO_VALID: u32 = 1 << 10;
pub const APK_CONTEXT_BAR_POSITION_VALID: u32 = 1 << 11;
pub const APK_CONTEXT_TIME_SIG_VALID: u32 = 1 << 13;
pub const APK_CONTEXT_CONT_TIME_VALID: u32 = 1 << 17;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct apk_process_context_t {
    pub state: u32,
    pub sample_rate: f64,
    pub project_time_samples: i64,
    pub system_time: i64,
    pub continuous_time_samples: i64,
    pub project_time_music: f64,
    pub bar_position_music: f64,
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_process_data_t {
    pub process_mode: apk_process_mode,
    pub sample_size: apk_sample_size,
    pub num_samples: i32,
    pub num_inputs: i32,
    pub num_outputs: i32,
    pub inputs: *mut apk_audio_bus_buffers_t,
    pub outputs: *mut apk_audio_bus_buffers_t,
    pub input_parameter_changes: *const apk_param_changes_t,
    pub output_parameter_changes: *mut apk_output_param_changes_t,
    pub input_events: *const apk_event_list_t,
    pub process_context: *const apk_process_context_t,
}

// ---------------------------------------------------------------------------
// Parameters and note expressions
// ---------------------------------------------------------------------------

pub const APK_PARAM_CAN_AUTOMATE: i32 = 1 << 0;
pub const APK_PARAM_READ_ONLY: i32 = 1 << 1;
pub const APK_PARAM_IS_LIST: i32 = 1 << 3;
pub const APK_PARAM_IS_BYPASS: i32 = 1 << 16;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_parameter_info_t {
    pub id: u32,
    pub title: [c_char; APK_STRING_SIZE],
    pub units: [c_char; APK_SHORT_STRING_SIZE],
    pub step_count: i32,
    pub default_normalized_value: f64,
    pub flags: i32,
}

pub const APK_NOTE_EXPRESSION_VOLUME: u32 = 0;
pub const APK_NOTE_EXPRESSION_PAN: u32 = 1;
pub const APK_NOTE_EXPRESSION_TUNING: u32 = 2;

pub const APK_NOTE_EXPRESSION_IS_BIPOLAR: i32 = 1 << 0;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_note_expression_type_info_t {
    pub type_id: u32,
    pub title: [c_char; APK_STRING_SIZE],
    pub minimum: f64,
    pub maximum: f64,
    pub default_value: f64,
    pub flags: i32,
}

// ---------------------------------------------------------------------------
// Host callbacks
// ---------------------------------------------------------------------------

pub const APK_RESTART_LATENCY_CHANGED: i32 = 1 << 3;
pub const APK_RESTART_PARAM_VALUES_CHANGED: i32 = 1 << 1;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_host_t {
    pub host_data: *mut cty::c_void,
    pub name: *const c_char,
    pub begin_edit: Option<unsafe extern "C" fn(host: *const apk_host_t, id: u32) -> apk_result>,
    pub perform_edit:
        Option<unsafe extern "C" fn(host: *const apk_host_t, id: u32, value: f64) -> apk_result>,
    pub end_edit: Option<unsafe extern "C" fn(host: *const apk_host_t, id: u32) -> apk_result>,
    pub restart_component:
        Option<unsafe extern "C" fn(host: *const apk_host_t, flags: i32) -> apk_result>,
}

// ---------------------------------------------------------------------------
// Component (processor) vtable
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_component_t {
    pub component_data: *mut cty::c_void,
    pub initialize: Option<unsafe extern "C" fn(component: *const apk_component_t) -> apk_result>,
    pub terminate: Option<unsafe extern "C" fn(component: *const apk_component_t) -> apk_result>,
    pub get_controller_class_id: Option<
        unsafe extern "C" fn(component: *const apk_component_t, cid: *mut apk_uid_t) -> apk_result,
    >,
    pub get_bus_count: Option<
        unsafe extern "C" fn(
            component: *const apk_component_t,
            media: apk_media_type,
            direction: apk_bus_direction,
        ) -> i32,
    >,
    pub get_bus_info: Option<
        unsafe extern "C" fn(
            component: *const apk_component_t,
            media: apk_media_type,
            direction: apk_bus_direction,
            index: i32,
            info: *mut apk_bus_info_t,
        ) -> apk_result,
    >,
    pub set_active:
        Option<unsafe extern "C" fn(component: *const apk_component_t, state: bool) -> apk_result>,
    pub can_process_sample_size: Option<
        unsafe extern "C" fn(component: *const apk_component_t, size: apk_sample_size) -> apk_result,
    >,
    pub setup_processing: Option<
        unsafe extern "C" fn(
            component: *const apk_component_t,
            setup: *const apk_process_setup_t,
        ) -> apk_result,
    >,
    pub set_processing:
        Option<unsafe extern "C" fn(component: *const apk_component_t, state: bool) -> apk_result>,
    pub get_latency_samples: Option<unsafe extern "C" fn(component: *const apk_component_t) -> u32>,
    pub get_tail_samples: Option<unsafe extern "C" fn(component: *const apk_component_t) -> u32>,
    pub process: Option<
        unsafe extern "C" fn(
            component: *const apk_component_t,
            data: *mut apk_process_data_t,
        ) -> apk_result,
    >,
    pub destroy: Option<unsafe extern "C" fn(component: *const apk_component_t)>,
}

// ---------------------------------------------------------------------------
// Controller vtable
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_controller_t {
    pub controller_data: *mut cty::c_void,
    pub initialize: Option<unsafe extern "C" fn(controller: *const apk_controller_t) -> apk_result>,
    pub terminate: Option<unsafe extern "C" fn(controller: *const apk_controller_t) -> apk_result>,
    pub get_parameter_count: Option<unsafe extern "C" fn(controller: *const apk_controller_t) -> i32>,
    pub get_parameter_info: Option<
        unsafe extern "C" fn(
            controller: *const apk_controller_t,
            index: i32,
            info: *mut apk_parameter_info_t,
        ) -> apk_result,
    >,
    pub get_param_normalized:
        Option<unsafe extern "C" fn(controller: *const apk_controller_t, id: u32) -> f64>,
    pub set_param_normalized: Option<
        unsafe extern "C" fn(controller: *const apk_controller_t, id: u32, value: f64) -> apk_result,
    >,
    pub normalized_param_to_plain: Option<
        unsafe extern "C" fn(controller: *const apk_controller_t, id: u32, value: f64) -> f64,
    >,
    pub plain_param_to_normalized: Option<
        unsafe extern "C" fn(controller: *const apk_controller_t, id: u32, value: f64) -> f64,
    >,
    pub get_note_expression_count: Option<
        unsafe extern "C" fn(controller: *const apk_controller_t, bus_index: i32, channel: i16) -> i32,
    >,
    pub get_note_expression_info: Option<
        unsafe extern "C" fn(
            controller: *const apk_controller_t,
            bus_index: i32,
            channel: i16,
            index: i32,
            info: *mut apk_note_expression_type_info_t,
        ) -> apk_result,
    >,
    pub destroy: Option<unsafe extern "C" fn(controller: *const apk_controller_t)>,
}

// ---------------------------------------------------------------------------
// Factory and module entry
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_factory_t {
    pub get_factory_info: Option<
        unsafe extern "C" fn(factory: *const apk_factory_t, info: *mut apk_factory_info_t) -> apk_result,
    >,
    pub count_classes: Option<unsafe extern "C" fn(factory: *const apk_factory_t) -> i32>,
    pub get_class_info: Option<
        unsafe extern "C" fn(
            factory: *const apk_factory_t,
            index: i32,
            info: *mut apk_class_info_t,
        ) -> apk_result,
    >,
    pub create_component: Option<
        unsafe extern "C" fn(
            factory: *const apk_factory_t,
            cid: *const apk_uid_t,
            host: *const apk_host_t,
        ) -> *const apk_component_t,
    >,
    pub create_controller: Option<
        unsafe extern "C" fn(
            factory: *const apk_factory_t,
            cid: *const apk_uid_t,
            host: *const apk_host_t,
        ) -> *const apk_controller_t,
    >,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct apk_module_entry_t {
    pub abi_version: apk_version_t,
    pub init: Option<unsafe extern "C" fn(module_path: *const c_char) -> bool>,
    pub deinit: Option<unsafe extern "C" fn()>,
    pub get_factory: Option<unsafe extern "C" fn() -> *const apk_factory_t>,
}
