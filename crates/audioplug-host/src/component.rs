use std::sync::Arc;

use audioplug_sdk::process::{ChannelsMut, ChannelsRef};
use audioplug_sdk::{
    AudioProcessor, BusDirection, BusInfo, Component, MediaType, PluginError, ProcessData,
    ProcessSetup, SampleSize, Uid,
};
use audioplug_sys::{
    apk_audio_bus_buffers_t, apk_bus_info_t, apk_component_t, apk_event_list_t, apk_event_t,
    apk_output_param_changes_t, apk_param_change_t, apk_param_changes_t, apk_param_point_t,
    apk_param_queue_t, apk_process_data_t, apk_uid_t, APK_OK, APK_STRING_SIZE,
};

use crate::handler::HostBridge;
use crate::module::ModuleHandle;

/// A processor created by a loaded module, driven through its vtable.
pub struct HostedComponent {
    raw: *const apk_component_t,
    _bridge: HostBridge,
    _module: Arc<ModuleHandle>,
}

// Safety: the ABI makes instances movable between threads as long as calls
// are not concurrent, which `&mut self` guarantees.
unsafe impl Send for HostedComponent {}

impl HostedComponent {
    pub(crate) unsafe fn new(
        raw: *const apk_component_t,
        bridge: HostBridge,
        module: Arc<ModuleHandle>,
    ) -> Self {
        Self {
            raw,
            _bridge: bridge,
            _module: module,
        }
    }

    fn vtable(&self) -> &apk_component_t {
        // Safety: non-null and alive until `destroy` in `Drop`.
        unsafe { &*self.raw }
    }

    fn result(
        &self,
        call: Option<unsafe extern "C" fn(*const apk_component_t) -> i32>,
    ) -> Result<(), PluginError> {
        match call {
            Some(call) => PluginError::check(unsafe { call(self.raw) }),
            None => Err(PluginError::NotImplemented),
        }
    }

    fn toggle(
        &self,
        call: Option<unsafe extern "C" fn(*const apk_component_t, bool) -> i32>,
        state: bool,
    ) -> Result<(), PluginError> {
        match call {
            Some(call) => PluginError::check(unsafe { call(self.raw, state) }),
            None => Err(PluginError::NotImplemented),
        }
    }
}

impl Drop for HostedComponent {
    fn drop(&mut self) {
        if let Some(destroy) = self.vtable().destroy {
            unsafe { destroy(self.raw) };
        }
    }
}

impl Component for HostedComponent {
    fn initialize(&mut self) -> Result<(), PluginError> {
        self.result(self.vtable().initialize)
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        self.result(self.vtable().terminate)
    }

    fn controller_class_id(&self) -> Option<Uid> {
        let call = self.vtable().get_controller_class_id?;
        let mut cid = apk_uid_t::default();
        (unsafe { call(self.raw, &mut cid) } == APK_OK).then(|| Uid::from_raw(&cid))
    }

    fn bus_count(&self, media: MediaType, direction: BusDirection) -> usize {
        match self.vtable().get_bus_count {
            Some(call) => unsafe { call(self.raw, media.to_raw(), direction.to_raw()) }.max(0)
                as usize,
            None => 0,
        }
    }

    fn bus_info(&self, media: MediaType, direction: BusDirection, index: usize) -> Option<BusInfo> {
        let call = self.vtable().get_bus_info?;
        let mut raw = apk_bus_info_t {
            media_type: 0,
            direction: 0,
            channel_count: 0,
            name: [0; APK_STRING_SIZE],
            bus_type: 0,
            flags: 0,
        };
        let index = i32::try_from(index).ok()?;
        let code = unsafe { call(self.raw, media.to_raw(), direction.to_raw(), index, &mut raw) };
        if code != APK_OK {
            return None;
        }
        BusInfo::from_raw(&raw)
    }

    fn set_active(&mut self, active: bool) -> Result<(), PluginError> {
        self.toggle(self.vtable().set_active, active)
    }
}

impl AudioProcessor for HostedComponent {
    fn can_process_sample_size(&self, sample_size: SampleSize) -> bool {
        match self.vtable().can_process_sample_size {
            Some(call) => (unsafe { call(self.raw, sample_size.to_raw()) } == APK_OK),
            None => sample_size == SampleSize::Sample32,
        }
    }

    fn setup_processing(&mut self, setup: &ProcessSetup) -> Result<(), PluginError> {
        let raw = setup.to_raw();
        match self.vtable().setup_processing {
            Some(call) => PluginError::check(unsafe { call(self.raw, &raw) }),
            None => Err(PluginError::NotImplemented),
        }
    }

    fn set_processing(&mut self, processing: bool) -> Result<(), PluginError> {
        self.toggle(self.vtable().set_processing, processing)
    }

    fn process(&mut self, data: &mut ProcessData<'_>) -> Result<(), PluginError> {
        let call = self.vtable().process.ok_or(PluginError::NotImplemented)?;
        let mut block = RawBlock::build(data)?;
        let code = unsafe { call(self.raw, &mut block.data) };
        block.write_back(data);
        PluginError::check(code)
    }

    fn latency_samples(&self) -> u32 {
        self.vtable()
            .get_latency_samples
            .map(|call| unsafe { call(self.raw) })
            .unwrap_or(0)
    }

    fn tail_samples(&self) -> u32 {
        self.vtable()
            .get_tail_samples
            .map(|call| unsafe { call(self.raw) })
            .unwrap_or(0)
    }
}

/// Raw view of one `ProcessData` for the duration of a single call. All
/// pointers borrow from `ProcessData` or from the vectors owned here.
struct RawBlock {
    data: apk_process_data_t,
    _channels32: Vec<Vec<*mut f32>>,
    _channels64: Vec<Vec<*mut f64>>,
    inputs: Vec<apk_audio_bus_buffers_t>,
    outputs: Vec<apk_audio_bus_buffers_t>,
    _events: Vec<apk_event_t>,
    _event_list: Box<apk_event_list_t>,
    _points: Vec<Vec<apk_param_point_t>>,
    _queues: Vec<apk_param_queue_t>,
    _changes: Box<apk_param_changes_t>,
    output_changes: Option<(Vec<apk_param_change_t>, Box<apk_output_param_changes_t>)>,
    _context: Option<Box<audioplug_sys::apk_process_context_t>>,
}

impl RawBlock {
    fn build(data: &mut ProcessData<'_>) -> Result<Self, PluginError> {
        let num_samples = i32::try_from(data.num_samples)
            .map_err(|_| PluginError::invalid_argument("block too large"))?;
        let frames = data.num_samples;
        for bus in &data.inputs {
            check_channels(
                bus.channels.sample_size(),
                bus.channels.channel_count(),
                |channel| bus.channels.channel_len(channel),
                data.sample_size,
                frames,
            )?;
        }
        for bus in &data.outputs {
            check_channels(
                bus.channels.sample_size(),
                bus.channels.channel_count(),
                |channel| bus.channels.channel_len(channel),
                data.sample_size,
                frames,
            )?;
        }
        let mut channels32: Vec<Vec<*mut f32>> = Vec::new();
        let mut channels64: Vec<Vec<*mut f64>> = Vec::new();

        let mut inputs = Vec::with_capacity(data.inputs.len());
        for bus in &data.inputs {
            let mut raw = apk_audio_bus_buffers_t {
                num_channels: bus.channels.channel_count() as i32,
                silence_flags: bus.silence_flags,
                channel_buffers32: std::ptr::null_mut(),
                channel_buffers64: std::ptr::null_mut(),
            };
            match &bus.channels {
                ChannelsRef::Sample32(channels) => {
                    let mut table: Vec<*mut f32> =
                        channels.iter().map(|c| c.as_ptr() as *mut f32).collect();
                    raw.channel_buffers32 = table.as_mut_ptr();
                    channels32.push(table);
                }
                ChannelsRef::Sample64(channels) => {
                    let mut table: Vec<*mut f64> =
                        channels.iter().map(|c| c.as_ptr() as *mut f64).collect();
                    raw.channel_buffers64 = table.as_mut_ptr();
                    channels64.push(table);
                }
            }
            inputs.push(raw);
        }

        let mut outputs = Vec::with_capacity(data.outputs.len());
        for bus in &mut data.outputs {
            let mut raw = apk_audio_bus_buffers_t {
                num_channels: bus.channels.channel_count() as i32,
                silence_flags: bus.silence_flags,
                channel_buffers32: std::ptr::null_mut(),
                channel_buffers64: std::ptr::null_mut(),
            };
            match &mut bus.channels {
                ChannelsMut::Sample32(channels) => {
                    let mut table: Vec<*mut f32> =
                        channels.iter_mut().map(|c| c.as_mut_ptr()).collect();
                    raw.channel_buffers32 = table.as_mut_ptr();
                    channels32.push(table);
                }
                ChannelsMut::Sample64(channels) => {
                    let mut table: Vec<*mut f64> =
                        channels.iter_mut().map(|c| c.as_mut_ptr()).collect();
                    raw.channel_buffers64 = table.as_mut_ptr();
                    channels64.push(table);
                }
            }
            outputs.push(raw);
        }

        let events: Vec<apk_event_t> = data.input_events.iter().map(|e| e.to_raw()).collect();
        let event_list = Box::new(apk_event_list_t {
            count: events.len() as i32,
            events: events.as_ptr(),
        });

        let points: Vec<Vec<apk_param_point_t>> = data
            .input_parameter_changes
            .iter()
            .map(|queue| {
                queue
                    .points
                    .iter()
                    .map(|point| apk_param_point_t {
                        sample_offset: point.sample_offset,
                        value: point.value,
                    })
                    .collect()
            })
            .collect();
        let queues: Vec<apk_param_queue_t> = data
            .input_parameter_changes
            .iter()
            .zip(&points)
            .map(|(queue, points)| apk_param_queue_t {
                param_id: queue.id.0,
                point_count: points.len() as i32,
                points: points.as_ptr(),
            })
            .collect();
        let changes = Box::new(apk_param_changes_t {
            queue_count: queues.len() as i32,
            queues: queues.as_ptr(),
        });

        let mut output_changes = data.output_parameter_changes.as_deref().map(|sink| {
            let mut storage = vec![apk_param_change_t::default(); sink.capacity()];
            let raw = Box::new(apk_output_param_changes_t {
                capacity: storage.len() as i32,
                count: 0,
                changes: storage.as_mut_ptr(),
            });
            (storage, raw)
        });
        let context = data.context.map(|context| Box::new(context.to_raw()));

        let mut block = Self {
            data: apk_process_data_t {
                process_mode: data.process_mode.to_raw(),
                sample_size: data.sample_size.to_raw(),
                num_samples,
                num_inputs: inputs.len() as i32,
                num_outputs: outputs.len() as i32,
                inputs: std::ptr::null_mut(),
                outputs: std::ptr::null_mut(),
                input_parameter_changes: &*changes,
                output_parameter_changes: output_changes
                    .as_mut()
                    .map_or(std::ptr::null_mut(), |(_, raw)| &mut **raw as *mut _),
                input_events: &*event_list,
                process_context: context
                    .as_deref()
                    .map_or(std::ptr::null(), |context| context as *const _),
            },
            _channels32: channels32,
            _channels64: channels64,
            inputs,
            outputs,
            _events: events,
            _event_list: event_list,
            _points: points,
            _queues: queues,
            _changes: changes,
            output_changes,
            _context: context,
        };
        // Vec buffers do not move with `block`, so taking these last is safe.
        block.data.inputs = ptr_or_null(&mut block.inputs);
        block.data.outputs = ptr_or_null(&mut block.outputs);
        Ok(block)
    }

    fn write_back(&self, data: &mut ProcessData<'_>) {
        for (bus, raw) in data.outputs.iter_mut().zip(&self.outputs) {
            bus.silence_flags = raw.silence_flags;
        }
        if let (Some(sink), Some((storage, raw))) = (
            data.output_parameter_changes.as_deref_mut(),
            self.output_changes.as_ref(),
        ) {
            sink.clear();
            let count = (raw.count.max(0) as usize).min(storage.len());
            for change in &storage[..count] {
                sink.push(
                    audioplug_sdk::ParamId(change.param_id),
                    change.sample_offset,
                    change.value,
                );
            }
        }
    }
}

/// The plug-in sees `frames` samples behind every channel pointer, so each
/// slice must hold at least that many and match the block's sample size.
fn check_channels(
    bus_size: SampleSize,
    channels: usize,
    len: impl Fn(usize) -> Option<usize>,
    block_size: SampleSize,
    frames: usize,
) -> Result<(), PluginError> {
    if bus_size != block_size {
        return Err(PluginError::invalid_argument(
            "bus sample size differs from the block",
        ));
    }
    for channel in 0..channels {
        let length = len(channel).unwrap_or(0);
        if length < frames {
            return Err(PluginError::invalid_argument(format!(
                "channel {channel} holds {length} samples, block needs {frames}"
            )));
        }
    }
    Ok(())
}

fn ptr_or_null<T>(items: &mut [T]) -> *mut T {
    if items.is_empty() {
        std::ptr::null_mut()
    } else {
        items.as_mut_ptr()
    }
}
