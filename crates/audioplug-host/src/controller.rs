use std::sync::Arc;

use audioplug_sdk::{EditController, NoteExpressionTypeInfo, ParamId, ParameterInfo, PluginError};
use audioplug_sys::{
    apk_controller_t, apk_note_expression_type_info_t, apk_parameter_info_t, APK_OK,
    APK_SHORT_STRING_SIZE, APK_STRING_SIZE,
};

use crate::handler::HostBridge;
use crate::module::ModuleHandle;

/// A controller created by a loaded module.
pub struct HostedController {
    raw: *const apk_controller_t,
    _bridge: HostBridge,
    _module: Arc<ModuleHandle>,
}

// Safety: see `HostedComponent`.
unsafe impl Send for HostedController {}

impl HostedController {
    pub(crate) unsafe fn new(
        raw: *const apk_controller_t,
        bridge: HostBridge,
        module: Arc<ModuleHandle>,
    ) -> Self {
        Self {
            raw,
            _bridge: bridge,
            _module: module,
        }
    }

    fn vtable(&self) -> &apk_controller_t {
        // Safety: non-null and alive until `destroy` in `Drop`.
        unsafe { &*self.raw }
    }

    fn convert(
        &self,
        call: Option<unsafe extern "C" fn(*const apk_controller_t, u32, f64) -> f64>,
        id: ParamId,
        value: f64,
    ) -> f64 {
        call.map(|call| unsafe { call(self.raw, id.0, value) })
            .unwrap_or(value)
    }
}

impl Drop for HostedController {
    fn drop(&mut self) {
        if let Some(destroy) = self.vtable().destroy {
            unsafe { destroy(self.raw) };
        }
    }
}

impl EditController for HostedController {
    fn initialize(&mut self) -> Result<(), PluginError> {
        match self.vtable().initialize {
            Some(call) => PluginError::check(unsafe { call(self.raw) }),
            None => Err(PluginError::NotImplemented),
        }
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        match self.vtable().terminate {
            Some(call) => PluginError::check(unsafe { call(self.raw) }),
            None => Err(PluginError::NotImplemented),
        }
    }

    fn parameter_count(&self) -> usize {
        self.vtable()
            .get_parameter_count
            .map(|call| unsafe { call(self.raw) }.max(0) as usize)
            .unwrap_or(0)
    }

    fn parameter_info(&self, index: usize) -> Option<ParameterInfo> {
        let call = self.vtable().get_parameter_info?;
        let mut raw = apk_parameter_info_t {
            id: 0,
            title: [0; APK_STRING_SIZE],
            units: [0; APK_SHORT_STRING_SIZE],
            step_count: 0,
            default_normalized_value: 0.0,
            flags: 0,
        };
        let index = i32::try_from(index).ok()?;
        (unsafe { call(self.raw, index, &mut raw) } == APK_OK)
            .then(|| ParameterInfo::from_raw(&raw))
    }

    fn param_normalized(&self, id: ParamId) -> f64 {
        self.vtable()
            .get_param_normalized
            .map(|call| unsafe { call(self.raw, id.0) })
            .unwrap_or(0.0)
    }

    fn set_param_normalized(&mut self, id: ParamId, value: f64) -> Result<(), PluginError> {
        match self.vtable().set_param_normalized {
            Some(call) => PluginError::check(unsafe { call(self.raw, id.0, value) }),
            None => Err(PluginError::NotImplemented),
        }
    }

    fn normalized_to_plain(&self, id: ParamId, value: f64) -> f64 {
        self.convert(self.vtable().normalized_param_to_plain, id, value)
    }

    fn plain_to_normalized(&self, id: ParamId, value: f64) -> f64 {
        self.convert(self.vtable().plain_param_to_normalized, id, value)
    }

    fn note_expression_count(&self, bus_index: i32, channel: i16) -> usize {
        self.vtable()
            .get_note_expression_count
            .map(|call| unsafe { call(self.raw, bus_index, channel) }.max(0) as usize)
            .unwrap_or(0)
    }

    fn note_expression_info(
        &self,
        bus_index: i32,
        channel: i16,
        index: usize,
    ) -> Option<NoteExpressionTypeInfo> {
        let call = self.vtable().get_note_expression_info?;
        let mut raw = apk_note_expression_type_info_t {
            type_id: 0,
            title: [0; APK_STRING_SIZE],
            minimum: 0.0,
            maximum: 0.0,
            default_value: 0.0,
            flags: 0,
        };
        let index = i32::try_from(index).ok()?;
        (unsafe { call(self.raw, bus_index, channel, index, &mut raw) } == APK_OK)
            .then(|| NoteExpressionTypeInfo::from_raw(&raw))
    }
}
