use std::ffi::CString;
use std::panic::{catch_unwind, AssertUnwindSafe};

use audioplug_sdk::error::to_code;
use audioplug_sdk::{HostContext, ParamId, RestartFlags};
use audioplug_sys::{apk_host_t, apk_result, APK_INTERNAL_ERROR, APK_INVALID_ARGUMENT};

/// Callback table handed to a module for one instance. `host_data` points at
/// a boxed [`HostContext`], so the trampolines work on copies of the table.
pub(crate) struct HostBridge {
    raw: Box<apk_host_t>,
    context: *mut HostContext,
    _name: CString,
}

// Safety: `context` is an owned `Box<HostContext>` and `HostContext` is
// `Send + Sync`.
unsafe impl Send for HostBridge {}

impl HostBridge {
    pub(crate) fn new(context: HostContext) -> Self {
        let name = CString::new("audioplug-host").unwrap_or_default();
        let context = Box::into_raw(Box::new(context));
        let raw = Box::new(apk_host_t {
            host_data: context as *mut _,
            name: name.as_ptr(),
            begin_edit: Some(begin_edit),
            perform_edit: Some(perform_edit),
            end_edit: Some(end_edit),
            restart_component: Some(restart_component),
        });
        Self {
            raw,
            context,
            _name: name,
        }
    }

    pub(crate) fn as_raw(&self) -> *const apk_host_t {
        &*self.raw
    }
}

impl Drop for HostBridge {
    fn drop(&mut self) {
        // Safety: created by `Box::into_raw` in `new` and released only here.
        unsafe { drop(Box::from_raw(self.context)) };
    }
}

unsafe fn dispatch(
    host: *const apk_host_t,
    call: impl FnOnce(&HostContext) -> apk_result,
) -> apk_result {
    let Some(context) = host
        .as_ref()
        .and_then(|raw| (raw.host_data as *const HostContext).as_ref())
    else {
        return APK_INVALID_ARGUMENT;
    };
    match catch_unwind(AssertUnwindSafe(|| call(context))) {
        Ok(code) => code,
        Err(_) => {
            tracing::error!("component handler panicked");
            APK_INTERNAL_ERROR
        }
    }
}

unsafe extern "C" fn begin_edit(host: *const apk_host_t, id: u32) -> apk_result {
    dispatch(host, |context| to_code(context.begin_edit(ParamId(id))))
}

unsafe extern "C" fn perform_edit(host: *const apk_host_t, id: u32, value: f64) -> apk_result {
    dispatch(host, |context| to_code(context.perform_edit(ParamId(id), value)))
}

unsafe extern "C" fn end_edit(host: *const apk_host_t, id: u32) -> apk_result {
    dispatch(host, |context| to_code(context.end_edit(ParamId(id))))
}

unsafe extern "C" fn restart_component(host: *const apk_host_t, flags: i32) -> apk_result {
    dispatch(host, |context| {
        to_code(context.restart_component(RestartFlags::from_bits(flags)))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use audioplug_sdk::{ComponentHandler, PluginError};
    use audioplug_sys::{APK_FALSE, APK_OK};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl ComponentHandler for Recorder {
        fn begin_edit(&self, id: ParamId) -> Result<(), PluginError> {
            self.calls.lock().push(format!("begin {id}"));
            Ok(())
        }

        fn perform_edit(&self, id: ParamId, value: f64) -> Result<(), PluginError> {
            self.calls.lock().push(format!("perform {id} {value}"));
            Ok(())
        }

        fn end_edit(&self, _id: ParamId) -> Result<(), PluginError> {
            Err(PluginError::Rejected)
        }

        fn restart_component(&self, flags: RestartFlags) -> Result<(), PluginError> {
            self.calls.lock().push(format!("restart {}", flags.bits()));
            Ok(())
        }
    }

    #[test]
    fn trampolines_reach_the_context_through_a_copied_table() {
        let recorder = Arc::new(Recorder::default());
        let bridge = HostBridge::new(recorder.clone());
        // Modules keep their own copy of the table.
        let copy: apk_host_t = unsafe { *bridge.as_raw() };
        unsafe {
            assert_eq!(copy.begin_edit.unwrap()(&copy, 3), APK_OK);
            assert_eq!(copy.perform_edit.unwrap()(&copy, 3, 0.5), APK_OK);
            assert_eq!(copy.end_edit.unwrap()(&copy, 3), APK_FALSE);
            assert_eq!(copy.restart_component.unwrap()(&copy, 2), APK_OK);
        }
        assert_eq!(
            *recorder.calls.lock(),
            vec!["begin 3", "perform 3 0.5", "restart 2"]
        );
    }
}
