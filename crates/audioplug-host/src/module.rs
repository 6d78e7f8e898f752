use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use audioplug_sdk::{
    AudioProcessor, ClassInfo, EditController, FactoryInfo, HostContext, PluginError,
    PluginFactory, Uid,
};
use audioplug_sys::{
    apk_class_info_t, apk_factory_info_t, apk_factory_t, apk_module_entry_t, APK_ABI_VERSION,
    APK_ENTRY_SYMBOL, APK_NAME_SIZE, APK_OK, APK_SHORT_STRING_SIZE, APK_STRING_SIZE, APK_URL_SIZE,
};
use libloading::Library;

use crate::component::HostedComponent;
use crate::controller::HostedController;
use crate::error::{InstanceError, LoadError};
use crate::handler::HostBridge;

/// Keeps the library mapped and the module initialised. Every hosted
/// instance holds a clone so the code behind its vtable outlives it.
pub(crate) struct ModuleHandle {
    entry: *const apk_module_entry_t,
    factory: *const apk_factory_t,
    initialized: bool,
    // Dropped after `deinit` runs in `Drop`.
    _library: Option<Library>,
}

// Safety: the module entry and factory tables are immutable statics of the
// loaded library and the ABI requires them to be callable from any thread.
unsafe impl Send for ModuleHandle {}
unsafe impl Sync for ModuleHandle {}

impl ModuleHandle {
    pub(crate) fn factory(&self) -> &apk_factory_t {
        // Safety: checked non-null when the module was opened.
        unsafe { &*self.factory }
    }
}

impl Drop for ModuleHandle {
    fn drop(&mut self) {
        if !self.initialized {
            return;
        }
        unsafe {
            if let Some(deinit) = (*self.entry).deinit {
                deinit();
            }
        }
        tracing::debug!("module deinitialised");
    }
}

/// An opened plug-in module: the explicit session object whose drop calls
/// the module's `deinit`.
pub struct PluginModule {
    path: Option<PathBuf>,
    handle: Arc<ModuleHandle>,
}

impl PluginModule {
    /// Loads a shared library and initialises its module entry.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisers; the caller must trust the
    /// binary to follow the audioplug ABI.
    pub unsafe fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(LoadError::MissingBinary(path));
        }
        let library = Library::new(&path).map_err(|source| LoadError::Library {
            path: path.clone(),
            source,
        })?;
        let entry = {
            let symbol: libloading::Symbol<*const apk_module_entry_t> = library
                .get(APK_ENTRY_SYMBOL)
                .map_err(|source| LoadError::MissingEntry {
                    path: path.clone(),
                    source,
                })?;
            // The symbol is the static itself, not a pointer to it.
            *symbol as *const apk_module_entry_t
        };
        tracing::info!(path = %path.display(), "loaded plug-in library");
        Self::open(entry, Some(library), Some(path))
    }

    /// Opens a module whose entry is linked into the current binary.
    pub fn from_entry(entry: &'static apk_module_entry_t) -> Result<Self, LoadError> {
        // Safety: a `'static` reference is valid for the whole program.
        unsafe { Self::open(entry, None, None) }
    }

    unsafe fn open(
        entry: *const apk_module_entry_t,
        library: Option<Library>,
        path: Option<PathBuf>,
    ) -> Result<Self, LoadError> {
        let Some(entry_ref) = entry.as_ref() else {
            return Err(LoadError::NullEntry);
        };
        let version = entry_ref.abi_version;
        if version.major != APK_ABI_VERSION.major {
            return Err(LoadError::AbiMismatch {
                found_major: version.major,
                found_minor: version.minor,
                expected_major: APK_ABI_VERSION.major,
                expected_minor: APK_ABI_VERSION.minor,
            });
        }

        let mut initialized = false;
        if let Some(init) = entry_ref.init {
            let c_path = path
                .as_ref()
                .and_then(|path| CString::new(path.to_string_lossy().as_bytes()).ok());
            let c_path_ptr = c_path.as_ref().map_or(std::ptr::null(), |path| path.as_ptr());
            if !init(c_path_ptr) {
                return Err(LoadError::InitFailed);
            }
            initialized = true;
        }

        let factory = match entry_ref.get_factory {
            Some(get_factory) => get_factory(),
            None => std::ptr::null(),
        };
        let handle = ModuleHandle {
            entry,
            factory,
            initialized,
            _library: library,
        };
        if factory.is_null() {
            // `handle` drops here and balances the successful init.
            return Err(LoadError::NoFactory);
        }
        tracing::debug!(abi.major = version.major, abi.minor = version.minor, "module opened");
        Ok(Self {
            path,
            handle: Arc::new(handle),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl PluginFactory for PluginModule {
    fn factory_info(&self) -> FactoryInfo {
        let factory = self.handle.factory();
        let Some(get_factory_info) = factory.get_factory_info else {
            return FactoryInfo::default();
        };
        let mut raw = apk_factory_info_t {
            vendor: [0; APK_NAME_SIZE],
            url: [0; APK_URL_SIZE],
            email: [0; APK_STRING_SIZE],
        };
        if unsafe { get_factory_info(factory, &mut raw) } == APK_OK {
            FactoryInfo::from_raw(&raw)
        } else {
            FactoryInfo::default()
        }
    }

    fn classes(&self) -> Vec<ClassInfo> {
        let factory = self.handle.factory();
        let (Some(count_classes), Some(get_class_info)) =
            (factory.count_classes, factory.get_class_info)
        else {
            return Vec::new();
        };
        let count = unsafe { count_classes(factory) }.max(0);
        let mut classes = Vec::with_capacity(count as usize);
        for index in 0..count {
            let mut raw = apk_class_info_t {
                cid: Default::default(),
                category: 0,
                name: [0; APK_NAME_SIZE],
                vendor: [0; APK_NAME_SIZE],
                version: [0; APK_SHORT_STRING_SIZE],
                sub_categories: [0; APK_STRING_SIZE],
            };
            if unsafe { get_class_info(factory, index, &mut raw) } != APK_OK {
                tracing::warn!(index, "factory refused class info");
                continue;
            }
            match ClassInfo::from_raw(&raw) {
                Some(class) => classes.push(class),
                None => tracing::warn!(index, category = raw.category, "unknown class category"),
            }
        }
        classes
    }

    fn create_processor(
        &self,
        cid: &Uid,
        host: HostContext,
    ) -> Result<Box<dyn AudioProcessor>, PluginError> {
        let factory = self.handle.factory();
        let create = factory
            .create_component
            .ok_or(InstanceError::MissingEntryPoint("create_component"))?;
        let bridge = HostBridge::new(host);
        let raw_cid = cid.to_raw();
        let component = unsafe { create(factory, &raw_cid, bridge.as_raw()) };
        if component.is_null() {
            return Err(InstanceError::NullInstance(*cid).into());
        }
        tracing::debug!(%cid, "created processor");
        Ok(Box::new(unsafe {
            HostedComponent::new(component, bridge, Arc::clone(&self.handle))
        }))
    }

    fn create_controller(
        &self,
        cid: &Uid,
        host: HostContext,
    ) -> Result<Box<dyn EditController>, PluginError> {
        let factory = self.handle.factory();
        let create = factory
            .create_controller
            .ok_or(InstanceError::MissingEntryPoint("create_controller"))?;
        let bridge = HostBridge::new(host);
        let raw_cid = cid.to_raw();
        let controller = unsafe { create(factory, &raw_cid, bridge.as_raw()) };
        if controller.is_null() {
            return Err(InstanceError::NullInstance(*cid).into());
        }
        tracing::debug!(%cid, "created controller");
        Ok(Box::new(unsafe {
            HostedController::new(controller, bridge, Arc::clone(&self.handle))
        }))
    }
}
