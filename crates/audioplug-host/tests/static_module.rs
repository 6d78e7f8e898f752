use std::sync::Arc;

use audioplug_host::{LoadError, PluginModule};
use audioplug_sdk::process::{ChannelsMut, ChannelsRef, InputBus, OutputBus};
use audioplug_sdk::{
    null_host, AudioProcessor, BusDirection, BusInfo, ClassCategory, ClassInfo, Component,
    ComponentHandler, EditController, Event, FactoryInfo, HostContext, Lifecycle, MediaType,
    OutputParameterChanges, ParamId, ParameterInfo, PluginError, PluginFactory, ProcessData,
    ProcessMode, ProcessSetup, RestartFlags, SampleSize, Transition, Uid,
};
use audioplug_sys::{apk_module_entry_t, apk_version_t};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

const ECHO_CID: Uid = Uid::from_u32s(0xEC40, 1, 2, 3);
const ECHO_CONTROLLER_CID: Uid = Uid::from_u32s(0xEC40, 1, 2, 4);

/// Copies its input, reports the event count as an output parameter and
/// pings the host on activation.
struct Echo {
    lifecycle: Lifecycle,
    host: HostContext,
}

impl Component for Echo {
    fn initialize(&mut self) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Initialize)?;
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Terminate)?;
        Ok(())
    }

    fn controller_class_id(&self) -> Option<Uid> {
        Some(ECHO_CONTROLLER_CID)
    }

    fn bus_count(&self, media: MediaType, _direction: BusDirection) -> usize {
        usize::from(media == MediaType::Audio)
    }

    fn bus_info(&self, media: MediaType, direction: BusDirection, index: usize) -> Option<BusInfo> {
        (media == MediaType::Audio && index == 0).then(|| BusInfo::audio(direction, "Main", 1))
    }

    fn set_active(&mut self, active: bool) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::SetActive(active))?;
        if active {
            self.host.restart_component(RestartFlags::LATENCY_CHANGED)?;
        }
        Ok(())
    }
}

impl AudioProcessor for Echo {
    fn setup_processing(&mut self, _setup: &ProcessSetup) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::SetupProcessing)?;
        Ok(())
    }

    fn set_processing(&mut self, processing: bool) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::SetProcessing(processing))?;
        Ok(())
    }

    fn process(&mut self, data: &mut ProcessData<'_>) -> Result<(), PluginError> {
        self.lifecycle.apply(Transition::Process)?;
        data.passthrough()?;
        let events = data.input_events.len() as f64;
        if let Some(sink) = data.output_parameter_changes.as_deref_mut() {
            sink.push(ParamId(7), 0, events / 10.0);
        }
        data.set_output_silence(false);
        Ok(())
    }

    fn latency_samples(&self) -> u32 {
        32
    }
}

struct EchoController;

impl EditController for EchoController {
    fn initialize(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn parameter_info(&self, _index: usize) -> Option<ParameterInfo> {
        None
    }

    fn param_normalized(&self, _id: ParamId) -> f64 {
        0.0
    }

    fn set_param_normalized(&mut self, id: ParamId, _value: f64) -> Result<(), PluginError> {
        Err(audioplug_sdk::PluginParameterError::UnknownParameter(id).into())
    }

    fn normalized_to_plain(&self, _id: ParamId, value: f64) -> f64 {
        value
    }

    fn plain_to_normalized(&self, _id: ParamId, value: f64) -> f64 {
        value
    }
}

struct EchoFactory;

impl PluginFactory for EchoFactory {
    fn factory_info(&self) -> FactoryInfo {
        FactoryInfo {
            vendor: "Echo Works".into(),
            url: "https://example.invalid".into(),
            email: String::new(),
        }
    }

    fn classes(&self) -> Vec<ClassInfo> {
        vec![
            ClassInfo::processor(ECHO_CID, "Echo").with_sub_categories("Fx"),
            ClassInfo::controller(ECHO_CONTROLLER_CID, "Echo Controller"),
        ]
    }

    fn create_processor(
        &self,
        cid: &Uid,
        host: HostContext,
    ) -> Result<Box<dyn AudioProcessor>, PluginError> {
        if *cid != ECHO_CID {
            return Err(PluginError::invalid_argument("unknown class"));
        }
        Ok(Box::new(Echo {
            lifecycle: Lifecycle::new(),
            host,
        }))
    }

    fn create_controller(
        &self,
        cid: &Uid,
        _host: HostContext,
    ) -> Result<Box<dyn EditController>, PluginError> {
        if *cid != ECHO_CONTROLLER_CID {
            return Err(PluginError::invalid_argument("unknown class"));
        }
        Ok(Box::new(EchoController))
    }
}

audioplug_sdk::audioplug_export!(EchoFactory);

#[derive(Default)]
struct Restarts(Mutex<Vec<i32>>);

impl ComponentHandler for Restarts {
    fn begin_edit(&self, _id: ParamId) -> Result<(), PluginError> {
        Ok(())
    }

    fn perform_edit(&self, _id: ParamId, _value: f64) -> Result<(), PluginError> {
        Ok(())
    }

    fn end_edit(&self, _id: ParamId) -> Result<(), PluginError> {
        Ok(())
    }

    fn restart_component(&self, flags: RestartFlags) -> Result<(), PluginError> {
        self.0.lock().push(flags.bits());
        Ok(())
    }
}

fn module() -> PluginModule {
    PluginModule::from_entry(&audioplug_entry).expect("static entry opens")
}

#[test]
fn lists_factory_and_classes_through_the_abi() {
    let module = module();
    assert_eq!(module.factory_info().vendor, "Echo Works");
    let classes = module.classes();
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0].cid, ECHO_CID);
    assert_eq!(classes[0].category, ClassCategory::Processor);
    assert_eq!(classes[1].category, ClassCategory::Controller);
    assert_eq!(module.path(), None);
}

#[test]
fn unknown_class_yields_an_error_not_an_instance() {
    let module = module();
    let missing = Uid::from_u32s(1, 1, 1, 1);
    assert!(module.create_processor(&missing, null_host()).is_err());
    assert!(module.create_controller(&missing, null_host()).is_err());
}

#[test]
fn processes_a_block_through_the_vtable() {
    let module = module();
    let restarts = Arc::new(Restarts::default());
    let mut processor = module
        .create_processor(&ECHO_CID, restarts.clone())
        .expect("processor");
    assert_eq!(processor.controller_class_id(), Some(ECHO_CONTROLLER_CID));
    assert_eq!(processor.bus_count(MediaType::Audio, BusDirection::Input), 1);
    assert_eq!(
        processor
            .bus_info(MediaType::Audio, BusDirection::Output, 0)
            .map(|bus| bus.channel_count),
        Some(1)
    );
    assert_eq!(processor.latency_samples(), 32);

    processor.initialize().unwrap();
    processor.setup_processing(&ProcessSetup::new(48_000.0, 4)).unwrap();
    processor.set_active(true).unwrap();
    assert_eq!(*restarts.0.lock(), vec![RestartFlags::LATENCY_CHANGED.bits()]);
    processor.set_processing(true).unwrap();

    let input = [0.5f32, -0.5, 0.25, 0.0];
    let mut output = [9.0f32; 4];
    let events = [Event::note_on(0, 0, 60, 1.0), Event::note_off(3, 0, 60)];
    let mut changes = OutputParameterChanges::with_capacity(4);
    let mut data = ProcessData {
        process_mode: ProcessMode::Realtime,
        sample_size: SampleSize::Sample32,
        num_samples: 4,
        inputs: vec![InputBus {
            channels: ChannelsRef::Sample32(vec![&input[..]]),
            silence_flags: 0,
        }],
        outputs: vec![OutputBus {
            channels: ChannelsMut::Sample32(vec![&mut output[..]]),
            silence_flags: 1,
        }],
        input_events: &events,
        input_parameter_changes: &[],
        output_parameter_changes: Some(&mut changes),
        context: None,
    };
    processor.process(&mut data).unwrap();
    assert_eq!(data.outputs[0].silence_flags, 0);
    drop(data);

    assert_eq!(output, input);
    assert_eq!(changes.changes().len(), 1);
    assert_eq!(changes.changes()[0].id, ParamId(7));
    assert!((changes.changes()[0].value - 0.2).abs() < 1e-12);

    processor.set_processing(false).unwrap();
    processor.set_active(false).unwrap();
    processor.terminate().unwrap();
}

#[test]
fn short_channels_are_refused_before_the_call() {
    let module = module();
    let mut processor = module.create_processor(&ECHO_CID, null_host()).unwrap();
    processor.initialize().unwrap();
    processor.setup_processing(&ProcessSetup::new(48_000.0, 256)).unwrap();
    processor.set_active(true).unwrap();
    processor.set_processing(true).unwrap();

    let input = vec![0.5f32; 256];
    let mut backing = vec![7.0f32; 256];
    let (head, tail) = backing.split_at_mut(64);
    let mut data = ProcessData {
        process_mode: ProcessMode::Realtime,
        sample_size: SampleSize::Sample32,
        num_samples: 256,
        inputs: vec![InputBus {
            channels: ChannelsRef::Sample32(vec![&input[..]]),
            silence_flags: 0,
        }],
        outputs: vec![OutputBus {
            channels: ChannelsMut::Sample32(vec![head]),
            silence_flags: 0,
        }],
        input_events: &[],
        input_parameter_changes: &[],
        output_parameter_changes: None,
        context: None,
    };
    assert!(matches!(
        processor.process(&mut data),
        Err(PluginError::InvalidArgument(_))
    ));

    data.num_samples = 64;
    processor.process(&mut data).unwrap();
    drop(data);
    assert!(tail.iter().all(|&sample| sample == 7.0));
    assert!(backing[..64].iter().all(|&sample| sample == 0.5));
}

#[test]
fn mismatched_sample_size_is_refused_before_the_call() {
    let module = module();
    let mut processor = module.create_processor(&ECHO_CID, null_host()).unwrap();
    processor.initialize().unwrap();
    processor.setup_processing(&ProcessSetup::new(48_000.0, 16)).unwrap();
    processor.set_active(true).unwrap();
    processor.set_processing(true).unwrap();

    let input = [0.5f64; 16];
    let mut output = [0.0f32; 16];
    let mut data = ProcessData {
        process_mode: ProcessMode::Realtime,
        sample_size: SampleSize::Sample32,
        num_samples: 16,
        inputs: vec![InputBus {
            channels: ChannelsRef::Sample64(vec![&input[..]]),
            silence_flags: 0,
        }],
        outputs: vec![OutputBus {
            channels: ChannelsMut::Sample32(vec![&mut output[..]]),
            silence_flags: 0,
        }],
        input_events: &[],
        input_parameter_changes: &[],
        output_parameter_changes: None,
        context: None,
    };
    assert!(matches!(
        processor.process(&mut data),
        Err(PluginError::InvalidArgument(_))
    ));
}

#[test]
fn illegal_calls_are_refused_by_the_plugin_state_machine() {
    let module = module();
    let mut processor = module.create_processor(&ECHO_CID, null_host()).unwrap();
    processor.initialize().unwrap();
    assert_eq!(processor.set_active(true), Err(PluginError::Rejected));
    assert_eq!(processor.set_processing(true), Err(PluginError::Rejected));
}

#[test]
fn controller_errors_travel_as_result_codes() {
    let module = module();
    let mut controller = module
        .create_controller(&ECHO_CONTROLLER_CID, null_host())
        .unwrap();
    controller.initialize().unwrap();
    assert_eq!(controller.parameter_count(), 0);
    assert!(matches!(
        controller.set_param_normalized(ParamId(1), 0.5),
        Err(PluginError::InvalidArgument(_))
    ));
    assert_eq!(controller.normalized_to_plain(ParamId(1), 0.25), 0.25);
}

unsafe extern "C" fn never_called() -> *const audioplug_sys::apk_factory_t {
    std::ptr::null()
}

static FUTURE_ENTRY: apk_module_entry_t = apk_module_entry_t {
    abi_version: apk_version_t { major: 99, minor: 0 },
    init: None,
    deinit: None,
    get_factory: Some(never_called),
};

static EMPTY_ENTRY: apk_module_entry_t = apk_module_entry_t {
    abi_version: audioplug_sys::APK_ABI_VERSION,
    init: None,
    deinit: None,
    get_factory: Some(never_called),
};

#[test]
fn rejects_foreign_abi_and_missing_factory() {
    assert!(matches!(
        PluginModule::from_entry(&FUTURE_ENTRY),
        Err(LoadError::AbiMismatch { found_major: 99, .. })
    ));
    assert!(matches!(
        PluginModule::from_entry(&EMPTY_ENTRY),
        Err(LoadError::NoFactory)
    ));
}

#[test]
fn missing_binary_is_reported_before_dlopen() {
    let result = unsafe { PluginModule::load("/nonexistent/libnothing.so") };
    assert!(matches!(result, Err(LoadError::MissingBinary(_))));
}
