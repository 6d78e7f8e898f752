//! Binary export of a [`PluginFactory`].
//!
//! Everything here runs on the plug-in side of the ABI: the shims translate
//! raw vtable calls into trait calls, contain panics and refuse malformed
//! process data before any buffer is dereferenced.

use std::ffi::CStr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use audioplug_sys::{
    apk_bus_direction, apk_bus_info_t, apk_class_info_t, apk_component_t, apk_controller_t,
    apk_factory_info_t, apk_factory_t, apk_host_t, apk_media_type, apk_note_expression_type_info_t,
    apk_parameter_info_t, apk_process_data_t, apk_process_setup_t, apk_result, apk_sample_size,
    apk_uid_t, cty::c_char, APK_FALSE, APK_INTERNAL_ERROR, APK_INVALID_ARGUMENT, APK_OK,
};

use crate::bus::{BusDirection, MediaType};
use crate::error::{to_code, PluginError};
use crate::events::Event;
use crate::params::ParamId;
use crate::plugin::{
    AudioProcessor, ComponentHandler, EditController, HostContext, NullHandler, PluginFactory,
    RestartFlags,
};
use crate::process::{
    ChannelsMut, ChannelsRef, InputBus, OutputBus, OutputParameterChanges, ParamPoint,
    ParameterQueue, ProcessContext, ProcessData, ProcessMode, ProcessSetup, SampleSize,
};
use crate::uid::Uid;

fn guard<R>(name: &str, fallback: R, call: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(_) => {
            log::error!("panic in audioplug {name} call");
            fallback
        }
    }
}

#[doc(hidden)]
pub fn module_init(path: *const c_char) -> bool {
    if !path.is_null() {
        // Safety: the host passes a nul-terminated path or null.
        let path = unsafe { CStr::from_ptr(path) };
        log::debug!("audioplug module initialised from {}", path.to_string_lossy());
    }
    true
}

#[doc(hidden)]
pub fn module_deinit() {
    log::debug!("audioplug module released");
}

/// Static factory record handed out through the module entry. The raw table
/// comes first so the pointer the host holds can be cast back.
#[doc(hidden)]
#[repr(C)]
pub struct ExportedFactory {
    raw: apk_factory_t,
    factory: &'static dyn PluginFactory,
}

impl ExportedFactory {
    pub const fn new(factory: &'static dyn PluginFactory) -> Self {
        Self {
            raw: apk_factory_t {
                get_factory_info: Some(Self::get_factory_info),
                count_classes: Some(Self::count_classes),
                get_class_info: Some(Self::get_class_info),
                create_component: Some(Self::create_component),
                create_controller: Some(Self::create_controller),
            },
            factory,
        }
    }

    pub fn as_raw(&'static self) -> *const apk_factory_t {
        &self.raw
    }

    unsafe fn from_raw<'a>(factory: *const apk_factory_t) -> Option<&'a Self> {
        (factory as *const Self).as_ref()
    }

    unsafe extern "C" fn get_factory_info(
        factory: *const apk_factory_t,
        info: *mut apk_factory_info_t,
    ) -> apk_result {
        guard("get_factory_info", APK_INTERNAL_ERROR, || {
            match (Self::from_raw(factory), info.as_mut()) {
                (Some(this), Some(info)) => {
                    *info = this.factory.factory_info().to_raw();
                    APK_OK
                }
                _ => APK_INVALID_ARGUMENT,
            }
        })
    }

    unsafe extern "C" fn count_classes(factory: *const apk_factory_t) -> i32 {
        guard("count_classes", 0, || {
            Self::from_raw(factory)
                .map(|this| this.factory.classes().len() as i32)
                .unwrap_or(0)
        })
    }

    unsafe extern "C" fn get_class_info(
        factory: *const apk_factory_t,
        index: i32,
        info: *mut apk_class_info_t,
    ) -> apk_result {
        guard("get_class_info", APK_INTERNAL_ERROR, || {
            let (Some(this), Some(info)) = (Self::from_raw(factory), info.as_mut()) else {
                return APK_INVALID_ARGUMENT;
            };
            let Ok(index) = usize::try_from(index) else {
                return APK_INVALID_ARGUMENT;
            };
            match this.factory.classes().get(index) {
                Some(class) => {
                    *info = class.to_raw();
                    APK_OK
                }
                None => APK_INVALID_ARGUMENT,
            }
        })
    }

    unsafe extern "C" fn create_component(
        factory: *const apk_factory_t,
        cid: *const apk_uid_t,
        host: *const apk_host_t,
    ) -> *const apk_component_t {
        guard("create_component", std::ptr::null(), || {
            let (Some(this), Some(cid)) = (Self::from_raw(factory), cid.as_ref()) else {
                return std::ptr::null();
            };
            let cid = Uid::from_raw(cid);
            match this.factory.create_processor(&cid, host_context(host)) {
                Ok(processor) => ComponentInstance::into_raw(processor),
                Err(err) => {
                    log::error!("failed to create processor {cid}: {err}");
                    std::ptr::null()
                }
            }
        })
    }

    unsafe extern "C" fn create_controller(
        factory: *const apk_factory_t,
        cid: *const apk_uid_t,
        host: *const apk_host_t,
    ) -> *const apk_controller_t {
        guard("create_controller", std::ptr::null(), || {
            let (Some(this), Some(cid)) = (Self::from_raw(factory), cid.as_ref()) else {
                return std::ptr::null();
            };
            let cid = Uid::from_raw(cid);
            match this.factory.create_controller(&cid, host_context(host)) {
                Ok(controller) => ControllerInstance::into_raw(controller),
                Err(err) => {
                    log::error!("failed to create controller {cid}: {err}");
                    std::ptr::null()
                }
            }
        })
    }
}

/// Host callbacks seen from inside the plug-in.
struct RawHost {
    raw: apk_host_t,
}

// Safety: the host guarantees its callback table and `host_data` stay valid
// and callable from any thread for the lifetime of every created instance.
unsafe impl Send for RawHost {}
unsafe impl Sync for RawHost {}

impl RawHost {
    fn call(
        &self,
        callback: Option<unsafe extern "C" fn(*const apk_host_t, u32) -> apk_result>,
        id: ParamId,
    ) -> Result<(), PluginError> {
        match callback {
            Some(callback) => PluginError::check(unsafe { callback(&self.raw, id.0) }),
            None => Err(PluginError::NotImplemented),
        }
    }
}

impl ComponentHandler for RawHost {
    fn begin_edit(&self, id: ParamId) -> Result<(), PluginError> {
        self.call(self.raw.begin_edit, id)
    }

    fn perform_edit(&self, id: ParamId, value: f64) -> Result<(), PluginError> {
        match self.raw.perform_edit {
            Some(callback) => PluginError::check(unsafe { callback(&self.raw, id.0, value) }),
            None => Err(PluginError::NotImplemented),
        }
    }

    fn end_edit(&self, id: ParamId) -> Result<(), PluginError> {
        self.call(self.raw.end_edit, id)
    }

    fn restart_component(&self, flags: RestartFlags) -> Result<(), PluginError> {
        match self.raw.restart_component {
            Some(callback) => PluginError::check(unsafe { callback(&self.raw, flags.bits()) }),
            None => Err(PluginError::NotImplemented),
        }
    }
}

unsafe fn host_context(host: *const apk_host_t) -> HostContext {
    match host.as_ref() {
        Some(raw) => Arc::new(RawHost { raw: *raw }),
        None => Arc::new(NullHandler),
    }
}

/// Storage reused across process calls so converting raw data does not
/// allocate once capacities settle.
#[derive(Default)]
struct ProcessScratch {
    events: Vec<Event>,
    params: Vec<ParameterQueue>,
    output_changes: OutputParameterChanges,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

struct ComponentInstance {
    processor: Box<dyn AudioProcessor>,
    scratch: ProcessScratch,
}

impl ComponentInstance {
    fn into_raw(processor: Box<dyn AudioProcessor>) -> *const apk_component_t {
        let instance = Box::new(ComponentInstance {
            processor,
            scratch: ProcessScratch::default(),
        });
        let raw = Box::new(apk_component_t {
            component_data: Box::into_raw(instance) as *mut _,
            initialize: Some(Self::initialize),
            terminate: Some(Self::terminate),
            get_controller_class_id: Some(Self::get_controller_class_id),
            get_bus_count: Some(Self::get_bus_count),
            get_bus_info: Some(Self::get_bus_info),
            set_active: Some(Self::set_active),
            can_process_sample_size: Some(Self::can_process_sample_size),
            setup_processing: Some(Self::setup_processing),
            set_processing: Some(Self::set_processing),
            get_latency_samples: Some(Self::get_latency_samples),
            get_tail_samples: Some(Self::get_tail_samples),
            process: Some(Self::process),
            destroy: Some(Self::destroy),
        });
        Box::into_raw(raw)
    }

    unsafe fn from_component<'a>(component: *const apk_component_t) -> Option<&'a mut Self> {
        let data = component.as_ref()?.component_data as *mut ComponentInstance;
        data.as_mut()
    }

    unsafe fn with<R: Copy>(
        component: *const apk_component_t,
        name: &str,
        fallback: R,
        call: impl FnOnce(&mut Self) -> R,
    ) -> R {
        guard(name, fallback, || match Self::from_component(component) {
            Some(this) => call(this),
            None => fallback,
        })
    }

    unsafe extern "C" fn initialize(component: *const apk_component_t) -> apk_result {
        Self::with(component, "initialize", APK_INTERNAL_ERROR, |this| {
            to_code(this.processor.initialize())
        })
    }

    unsafe extern "C" fn terminate(component: *const apk_component_t) -> apk_result {
        Self::with(component, "terminate", APK_INTERNAL_ERROR, |this| {
            to_code(this.processor.terminate())
        })
    }

    unsafe extern "C" fn get_controller_class_id(
        component: *const apk_component_t,
        cid: *mut apk_uid_t,
    ) -> apk_result {
        Self::with(component, "get_controller_class_id", APK_INTERNAL_ERROR, |this| {
            let Some(cid) = cid.as_mut() else {
                return APK_INVALID_ARGUMENT;
            };
            match this.processor.controller_class_id() {
                Some(id) => {
                    *cid = id.to_raw();
                    APK_OK
                }
                None => APK_FALSE,
            }
        })
    }

    unsafe extern "C" fn get_bus_count(
        component: *const apk_component_t,
        media: apk_media_type,
        direction: apk_bus_direction,
    ) -> i32 {
        Self::with(component, "get_bus_count", 0, |this| {
            match (MediaType::from_raw(media), BusDirection::from_raw(direction)) {
                (Some(media), Some(direction)) => this.processor.bus_count(media, direction) as i32,
                _ => 0,
            }
        })
    }

    unsafe extern "C" fn get_bus_info(
        component: *const apk_component_t,
        media: apk_media_type,
        direction: apk_bus_direction,
        index: i32,
        info: *mut apk_bus_info_t,
    ) -> apk_result {
        Self::with(component, "get_bus_info", APK_INTERNAL_ERROR, |this| {
            let (Some(media), Some(direction), Ok(index), Some(info)) = (
                MediaType::from_raw(media),
                BusDirection::from_raw(direction),
                usize::try_from(index),
                info.as_mut(),
            ) else {
                return APK_INVALID_ARGUMENT;
            };
            match this.processor.bus_info(media, direction, index) {
                Some(bus) => {
                    *info = bus.to_raw();
                    APK_OK
                }
                None => APK_INVALID_ARGUMENT,
            }
        })
    }

    unsafe extern "C" fn set_active(component: *const apk_component_t, state: bool) -> apk_result {
        Self::with(component, "set_active", APK_INTERNAL_ERROR, |this| {
            to_code(this.processor.set_active(state))
        })
    }

    unsafe extern "C" fn can_process_sample_size(
        component: *const apk_component_t,
        size: apk_sample_size,
    ) -> apk_result {
        Self::with(component, "can_process_sample_size", APK_INTERNAL_ERROR, |this| {
            match SampleSize::from_raw(size) {
                Some(size) if this.processor.can_process_sample_size(size) => APK_OK,
                Some(_) => APK_FALSE,
                None => APK_INVALID_ARGUMENT,
            }
        })
    }

    unsafe extern "C" fn setup_processing(
        component: *const apk_component_t,
        setup: *const apk_process_setup_t,
    ) -> apk_result {
        Self::with(component, "setup_processing", APK_INTERNAL_ERROR, |this| {
            match setup.as_ref().and_then(ProcessSetup::from_raw) {
                Some(setup) => to_code(this.processor.setup_processing(&setup)),
                None => APK_INVALID_ARGUMENT,
            }
        })
    }

    unsafe extern "C" fn set_processing(
        component: *const apk_component_t,
        state: bool,
    ) -> apk_result {
        Self::with(component, "set_processing", APK_INTERNAL_ERROR, |this| {
            to_code(this.processor.set_processing(state))
        })
    }

    unsafe extern "C" fn get_latency_samples(component: *const apk_component_t) -> u32 {
        Self::with(component, "get_latency_samples", 0, |this| {
            this.processor.latency_samples()
        })
    }

    unsafe extern "C" fn get_tail_samples(component: *const apk_component_t) -> u32 {
        Self::with(component, "get_tail_samples", 0, |this| this.processor.tail_samples())
    }

    unsafe extern "C" fn process(
        component: *const apk_component_t,
        data: *mut apk_process_data_t,
    ) -> apk_result {
        Self::with(component, "process", APK_INTERNAL_ERROR, |this| {
            match data.as_mut() {
                Some(data) => to_code(this.process_raw(data)),
                None => APK_INVALID_ARGUMENT,
            }
        })
    }

    unsafe extern "C" fn destroy(component: *const apk_component_t) {
        if component.is_null() {
            return;
        }
        let component = component as *mut apk_component_t;
        let data = (*component).component_data as *mut ComponentInstance;
        if !data.is_null() {
            drop(Box::from_raw(data));
        }
        (*component).component_data = std::ptr::null_mut();
        drop(Box::from_raw(component));
    }

    /// Converts raw process data, runs the processor and copies silence
    /// flags and output parameter changes back.
    unsafe fn process_raw(&mut self, raw: &mut apk_process_data_t) -> Result<(), PluginError> {
        let sample_size = SampleSize::from_raw(raw.sample_size)
            .ok_or_else(|| PluginError::invalid_argument("unknown sample size"))?;
        let process_mode = ProcessMode::from_raw(raw.process_mode)
            .ok_or_else(|| PluginError::invalid_argument("unknown process mode"))?;
        let num_samples = usize::try_from(raw.num_samples)
            .map_err(|_| PluginError::invalid_argument("negative sample count"))?;
        let num_inputs = bus_count(raw.num_inputs, raw.inputs.is_null())?;
        let num_outputs = bus_count(raw.num_outputs, raw.outputs.is_null())?;

        let Self { processor, scratch } = self;

        if num_samples > 0 {
            scratch.inputs.clear();
            scratch.outputs.clear();
            for index in 0..num_inputs {
                collect_addresses(&*raw.inputs.add(index), sample_size, &mut scratch.inputs)?;
            }
            for index in 0..num_outputs {
                collect_addresses(&*raw.outputs.add(index), sample_size, &mut scratch.outputs)?;
            }
            for (position, address) in scratch.outputs.iter().enumerate() {
                if scratch.inputs.contains(address) || scratch.outputs[..position].contains(address)
                {
                    return Err(PluginError::invalid_argument("aliased channel buffers"));
                }
            }
        }

        let mut inputs = Vec::with_capacity(num_inputs);
        for index in 0..num_inputs {
            let bus = &*raw.inputs.add(index);
            let channels = bus.num_channels.max(0) as usize;
            let channels = match sample_size {
                SampleSize::Sample32 => ChannelsRef::Sample32(
                    (0..channels)
                        .map(|ch| input_slice(bus.channel_buffers32, ch, num_samples))
                        .collect(),
                ),
                SampleSize::Sample64 => ChannelsRef::Sample64(
                    (0..channels)
                        .map(|ch| input_slice(bus.channel_buffers64, ch, num_samples))
                        .collect(),
                ),
            };
            inputs.push(InputBus {
                channels,
                silence_flags: bus.silence_flags,
            });
        }

        let mut outputs = Vec::with_capacity(num_outputs);
        for index in 0..num_outputs {
            let bus = &*raw.outputs.add(index);
            let channels = bus.num_channels.max(0) as usize;
            let channels = match sample_size {
                SampleSize::Sample32 => ChannelsMut::Sample32(
                    (0..channels)
                        .map(|ch| output_slice(bus.channel_buffers32, ch, num_samples))
                        .collect(),
                ),
                SampleSize::Sample64 => ChannelsMut::Sample64(
                    (0..channels)
                        .map(|ch| output_slice(bus.channel_buffers64, ch, num_samples))
                        .collect(),
                ),
            };
            outputs.push(OutputBus {
                channels,
                silence_flags: bus.silence_flags,
            });
        }

        scratch.events.clear();
        if let Some(list) = raw.input_events.as_ref() {
            if list.count > 0 && !list.events.is_null() {
                let events = std::slice::from_raw_parts(list.events, list.count as usize);
                scratch.events.extend(events.iter().filter_map(Event::from_raw));
            }
        }

        scratch.params.clear();
        if let Some(changes) = raw.input_parameter_changes.as_ref() {
            if changes.queue_count > 0 && !changes.queues.is_null() {
                let queues = std::slice::from_raw_parts(changes.queues, changes.queue_count as usize);
                for queue in queues {
                    let points = if queue.point_count > 0 && !queue.points.is_null() {
                        std::slice::from_raw_parts(queue.points, queue.point_count as usize)
                    } else {
                        &[]
                    };
                    scratch.params.push(ParameterQueue {
                        id: ParamId(queue.param_id),
                        points: points
                            .iter()
                            .map(|point| ParamPoint {
                                sample_offset: point.sample_offset,
                                value: point.value,
                            })
                            .collect(),
                    });
                }
            }
        }

        let raw_output_changes = raw.output_parameter_changes.as_mut();
        if let Some(sink) = raw_output_changes.as_deref() {
            scratch
                .output_changes
                .reset(sink.capacity.max(0) as usize);
        }
        let context = raw.process_context.as_ref().map(ProcessContext::from_raw);

        let mut data = ProcessData {
            process_mode,
            sample_size,
            num_samples,
            inputs,
            outputs,
            input_events: &scratch.events,
            input_parameter_changes: &scratch.params,
            output_parameter_changes: raw_output_changes
                .is_some()
                .then_some(&mut scratch.output_changes),
            context: context.as_ref(),
        };
        let result = processor.process(&mut data);

        for (index, bus) in data.outputs.iter().enumerate() {
            (*raw.outputs.add(index)).silence_flags = bus.silence_flags;
        }
        drop(data);

        if let Some(sink) = raw_output_changes {
            let written = scratch.output_changes.changes();
            if !sink.changes.is_null() {
                for (index, change) in written.iter().enumerate() {
                    *sink.changes.add(index) = audioplug_sys::apk_param_change_t {
                        param_id: change.id.0,
                        sample_offset: change.sample_offset,
                        value: change.value,
                    };
                }
                sink.count = written.len() as i32;
            } else {
                sink.count = 0;
            }
        }

        result
    }
}

fn bus_count(count: i32, is_null: bool) -> Result<usize, PluginError> {
    match usize::try_from(count) {
        Ok(0) => Ok(0),
        Ok(_) if is_null => Err(PluginError::invalid_argument("missing bus buffers")),
        Ok(count) => Ok(count),
        Err(_) => Err(PluginError::invalid_argument("negative bus count")),
    }
}

unsafe fn collect_addresses(
    bus: &audioplug_sys::apk_audio_bus_buffers_t,
    sample_size: SampleSize,
    into: &mut Vec<usize>,
) -> Result<(), PluginError> {
    let channels = bus.num_channels.max(0) as usize;
    if channels == 0 {
        return Ok(());
    }
    let table = match sample_size {
        SampleSize::Sample32 => bus.channel_buffers32 as *const *mut u8,
        SampleSize::Sample64 => bus.channel_buffers64 as *const *mut u8,
    };
    if table.is_null() {
        return Err(PluginError::invalid_argument("missing channel table"));
    }
    for channel in 0..channels {
        let pointer = *table.add(channel);
        if pointer.is_null() {
            return Err(PluginError::invalid_argument("null channel buffer"));
        }
        into.push(pointer as usize);
    }
    Ok(())
}

/// Zero-length blocks never touch the channel table.
unsafe fn input_slice<'a, S>(table: *mut *mut S, channel: usize, frames: usize) -> &'a [S] {
    if frames == 0 {
        return &[];
    }
    std::slice::from_raw_parts(*table.add(channel), frames)
}

unsafe fn output_slice<'a, S>(table: *mut *mut S, channel: usize, frames: usize) -> &'a mut [S] {
    if frames == 0 {
        return Default::default();
    }
    std::slice::from_raw_parts_mut(*table.add(channel), frames)
}

struct ControllerInstance {
    controller: Box<dyn EditController>,
}

impl ControllerInstance {
    fn into_raw(controller: Box<dyn EditController>) -> *const apk_controller_t {
        let instance = Box::new(ControllerInstance { controller });
        let raw = Box::new(apk_controller_t {
            controller_data: Box::into_raw(instance) as *mut _,
            initialize: Some(Self::initialize),
            terminate: Some(Self::terminate),
            get_parameter_count: Some(Self::get_parameter_count),
            get_parameter_info: Some(Self::get_parameter_info),
            get_param_normalized: Some(Self::get_param_normalized),
            set_param_normalized: Some(Self::set_param_normalized),
            normalized_param_to_plain: Some(Self::normalized_param_to_plain),
            plain_param_to_normalized: Some(Self::plain_param_to_normalized),
            get_note_expression_count: Some(Self::get_note_expression_count),
            get_note_expression_info: Some(Self::get_note_expression_info),
            destroy: Some(Self::destroy),
        });
        Box::into_raw(raw)
    }

    unsafe fn with<R: Copy>(
        controller: *const apk_controller_t,
        name: &str,
        fallback: R,
        call: impl FnOnce(&mut Self) -> R,
    ) -> R {
        guard(name, fallback, || {
            let data = controller
                .as_ref()
                .map(|raw| raw.controller_data as *mut ControllerInstance)
                .and_then(|data| data.as_mut());
            match data {
                Some(this) => call(this),
                None => fallback,
            }
        })
    }

    unsafe extern "C" fn initialize(controller: *const apk_controller_t) -> apk_result {
        Self::with(controller, "initialize", APK_INTERNAL_ERROR, |this| {
            to_code(this.controller.initialize())
        })
    }

    unsafe extern "C" fn terminate(controller: *const apk_controller_t) -> apk_result {
        Self::with(controller, "terminate", APK_INTERNAL_ERROR, |this| {
            to_code(this.controller.terminate())
        })
    }

    unsafe extern "C" fn get_parameter_count(controller: *const apk_controller_t) -> i32 {
        Self::with(controller, "get_parameter_count", 0, |this| {
            this.controller.parameter_count() as i32
        })
    }

    unsafe extern "C" fn get_parameter_info(
        controller: *const apk_controller_t,
        index: i32,
        info: *mut apk_parameter_info_t,
    ) -> apk_result {
        Self::with(controller, "get_parameter_info", APK_INTERNAL_ERROR, |this| {
            let (Ok(index), Some(info)) = (usize::try_from(index), info.as_mut()) else {
                return APK_INVALID_ARGUMENT;
            };
            match this.controller.parameter_info(index) {
                Some(parameter) => {
                    *info = parameter.to_raw();
                    APK_OK
                }
                None => APK_INVALID_ARGUMENT,
            }
        })
    }

    unsafe extern "C" fn get_param_normalized(controller: *const apk_controller_t, id: u32) -> f64 {
        Self::with(controller, "get_param_normalized", 0.0, |this| {
            this.controller.param_normalized(ParamId(id))
        })
    }

    unsafe extern "C" fn set_param_normalized(
        controller: *const apk_controller_t,
        id: u32,
        value: f64,
    ) -> apk_result {
        Self::with(controller, "set_param_normalized", APK_INTERNAL_ERROR, |this| {
            to_code(this.controller.set_param_normalized(ParamId(id), value))
        })
    }

    unsafe extern "C" fn normalized_param_to_plain(
        controller: *const apk_controller_t,
        id: u32,
        value: f64,
    ) -> f64 {
        Self::with(controller, "normalized_param_to_plain", 0.0, |this| {
            this.controller.normalized_to_plain(ParamId(id), value)
        })
    }

    unsafe extern "C" fn plain_param_to_normalized(
        controller: *const apk_controller_t,
        id: u32,
        value: f64,
    ) -> f64 {
        Self::with(controller, "plain_param_to_normalized", 0.0, |this| {
            this.controller.plain_to_normalized(ParamId(id), value)
        })
    }

    unsafe extern "C" fn get_note_expression_count(
        controller: *const apk_controller_t,
        bus_index: i32,
        channel: i16,
    ) -> i32 {
        Self::with(controller, "get_note_expression_count", 0, |this| {
            this.controller.note_expression_count(bus_index, channel) as i32
        })
    }

    unsafe extern "C" fn get_note_expression_info(
        controller: *const apk_controller_t,
        bus_index: i32,
        channel: i16,
        index: i32,
        info: *mut apk_note_expression_type_info_t,
    ) -> apk_result {
        Self::with(controller, "get_note_expression_info", APK_INTERNAL_ERROR, |this| {
            let (Ok(index), Some(info)) = (usize::try_from(index), info.as_mut()) else {
                return APK_INVALID_ARGUMENT;
            };
            match this.controller.note_expression_info(bus_index, channel, index) {
                Some(expression) => {
                    *info = expression.to_raw();
                    APK_OK
                }
                None => APK_INVALID_ARGUMENT,
            }
        })
    }

    unsafe extern "C" fn destroy(controller: *const apk_controller_t) {
        if controller.is_null() {
            return;
        }
        let controller = controller as *mut apk_controller_t;
        let data = (*controller).controller_data as *mut ControllerInstance;
        if !data.is_null() {
            drop(Box::from_raw(data));
        }
        (*controller).controller_data = std::ptr::null_mut();
        drop(Box::from_raw(controller));
    }
}

/// Exports a `'static` [`PluginFactory`] value as the module entry symbol.
///
/// ```ignore
/// audioplug_sdk::audioplug_export!(MyFactory);
/// ```
#[macro_export]
macro_rules! audioplug_export {
    ($factory:expr) => {
        static __AUDIOPLUG_FACTORY: $crate::export::ExportedFactory =
            $crate::export::ExportedFactory::new(&$factory);

        unsafe extern "C" fn __audioplug_entry_init(
            path: *const $crate::sys::cty::c_char,
        ) -> bool {
            $crate::export::module_init(path)
        }

        unsafe extern "C" fn __audioplug_entry_deinit() {
            $crate::export::module_deinit()
        }

        unsafe extern "C" fn __audioplug_entry_get_factory() -> *const $crate::sys::apk_factory_t
        {
            __AUDIOPLUG_FACTORY.as_raw()
        }

        #[allow(non_upper_case_globals)]
        #[no_mangle]
        pub static audioplug_entry: $crate::sys::apk_module_entry_t =
            $crate::sys::apk_module_entry_t {
                abi_version: $crate::sys::APK_ABI_VERSION,
                init: Some(__audioplug_entry_init),
                deinit: Some(__audioplug_entry_deinit),
                get_factory: Some(__audioplug_entry_get_factory),
            };
    };
}
