use std::cell::Cell;

use audioplug_sdk::{
    AudioProcessor, BusDirection, BusInfo, ClassInfo, Component, EditController, FactoryInfo,
    HostContext, MediaType, PluginError, PluginFactory, ProcessData, ProcessSetup, Uid,
};
use audioplug_sys::*;

thread_local! {
    static PROCESS_CALLS: Cell<usize> = const { Cell::new(0) };
}

const COPY: Uid = Uid::from_u32s(0, 0, 0, 1);
const PANICS: Uid = Uid::from_u32s(0, 0, 0, 2);

struct Copier {
    panic_in_process: bool,
}

impl Component for Copier {
    fn initialize(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn bus_count(&self, media: MediaType, _direction: BusDirection) -> usize {
        usize::from(media == MediaType::Audio)
    }

    fn bus_info(&self, _media: MediaType, direction: BusDirection, _index: usize) -> Option<BusInfo> {
        Some(BusInfo::audio(direction, "Main", 1))
    }

    fn set_active(&mut self, _active: bool) -> Result<(), PluginError> {
        Ok(())
    }
}

impl AudioProcessor for Copier {
    fn setup_processing(&mut self, _setup: &ProcessSetup) -> Result<(), PluginError> {
        Ok(())
    }

    fn set_processing(&mut self, _processing: bool) -> Result<(), PluginError> {
        Ok(())
    }

    fn process(&mut self, data: &mut ProcessData<'_>) -> Result<(), PluginError> {
        PROCESS_CALLS.with(|calls| calls.set(calls.get() + 1));
        if self.panic_in_process {
            panic!("processor exploded");
        }
        data.passthrough()
    }
}

struct Factory;

impl PluginFactory for Factory {
    fn factory_info(&self) -> FactoryInfo {
        FactoryInfo::default()
    }

    fn classes(&self) -> Vec<ClassInfo> {
        vec![
            ClassInfo::processor(COPY, "Copy"),
            ClassInfo::processor(PANICS, "Panics"),
        ]
    }

    fn create_processor(
        &self,
        cid: &Uid,
        _host: HostContext,
    ) -> Result<Box<dyn AudioProcessor>, PluginError> {
        Ok(Box::new(Copier {
            panic_in_process: *cid == PANICS,
        }))
    }

    fn create_controller(
        &self,
        _cid: &Uid,
        _host: HostContext,
    ) -> Result<Box<dyn EditController>, PluginError> {
        Err(PluginError::NotImplemented)
    }
}

audioplug_sdk::audioplug_export!(Factory);

fn create(cid: Uid) -> *const apk_component_t {
    unsafe {
        let factory = audioplug_entry.get_factory.unwrap()();
        let raw_cid = cid.to_raw();
        let component = (*factory).create_component.unwrap()(factory, &raw_cid, std::ptr::null());
        assert!(!component.is_null());
        component
    }
}

fn destroy(component: *const apk_component_t) {
    unsafe { (*component).destroy.unwrap()(component) };
}

fn bus(table32: &mut [*mut f32]) -> apk_audio_bus_buffers_t {
    apk_audio_bus_buffers_t {
        num_channels: table32.len() as i32,
        silence_flags: 0,
        channel_buffers32: table32.as_mut_ptr(),
        channel_buffers64: std::ptr::null_mut(),
    }
}

fn data(
    num_samples: i32,
    inputs: &mut apk_audio_bus_buffers_t,
    outputs: &mut apk_audio_bus_buffers_t,
) -> apk_process_data_t {
    apk_process_data_t {
        process_mode: APK_PROCESS_REALTIME,
        sample_size: APK_SAMPLE_32,
        num_samples,
        num_inputs: 1,
        num_outputs: 1,
        inputs,
        outputs,
        input_parameter_changes: std::ptr::null(),
        output_parameter_changes: std::ptr::null_mut(),
        input_events: std::ptr::null(),
        process_context: std::ptr::null(),
    }
}

#[test]
fn copies_between_distinct_buffers() {
    let component = create(COPY);
    let mut input = [0.25f32; 8];
    let mut output = [0.0f32; 8];
    let mut in_table = [input.as_mut_ptr()];
    let mut out_table = [output.as_mut_ptr()];
    let (mut inputs, mut outputs) = (bus(&mut in_table), bus(&mut out_table));
    let mut raw = data(8, &mut inputs, &mut outputs);
    let code = unsafe { (*component).process.unwrap()(component, &mut raw) };
    assert_eq!(code, APK_OK);
    assert_eq!(output, [0.25f32; 8]);
    destroy(component);
}

#[test]
fn aliased_buffers_are_rejected_before_processing() {
    let component = create(COPY);
    let mut shared = [0.5f32; 8];
    let before = PROCESS_CALLS.with(Cell::get);
    let mut in_table = [shared.as_mut_ptr()];
    let mut out_table = [shared.as_mut_ptr()];
    let (mut inputs, mut outputs) = (bus(&mut in_table), bus(&mut out_table));
    let mut raw = data(8, &mut inputs, &mut outputs);
    let code = unsafe { (*component).process.unwrap()(component, &mut raw) };
    assert_eq!(code, APK_INVALID_ARGUMENT);
    assert_eq!(PROCESS_CALLS.with(Cell::get), before);
    destroy(component);
}

#[test]
fn zero_length_blocks_never_touch_channel_tables() {
    let component = create(COPY);
    let mut inputs = apk_audio_bus_buffers_t {
        num_channels: 2,
        silence_flags: 0,
        channel_buffers32: std::ptr::null_mut(),
        channel_buffers64: std::ptr::null_mut(),
    };
    let mut outputs = inputs;
    let mut raw = data(0, &mut inputs, &mut outputs);
    let code = unsafe { (*component).process.unwrap()(component, &mut raw) };
    assert_eq!(code, APK_OK);
    destroy(component);
}

#[test]
fn panics_become_internal_errors() {
    let component = create(PANICS);
    let mut input = [0.0f32; 4];
    let mut output = [0.0f32; 4];
    let mut in_table = [input.as_mut_ptr()];
    let mut out_table = [output.as_mut_ptr()];
    let (mut inputs, mut outputs) = (bus(&mut in_table), bus(&mut out_table));
    let mut raw = data(4, &mut inputs, &mut outputs);
    let code = unsafe { (*component).process.unwrap()(component, &mut raw) };
    assert_eq!(code, APK_INTERNAL_ERROR);
    destroy(component);
}

#[test]
fn missing_controller_class_yields_null() {
    unsafe {
        let factory = audioplug_entry.get_factory.unwrap()();
        assert_eq!((*factory).count_classes.unwrap()(factory), 2);
        let raw_cid = COPY.to_raw();
        let controller =
            (*factory).create_controller.unwrap()(factory, &raw_cid, std::ptr::null());
        assert!(controller.is_null());
    }
}
