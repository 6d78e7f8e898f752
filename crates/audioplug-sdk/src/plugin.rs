use std::sync::Arc;

use audioplug_sys::{
    apk_class_category, apk_class_info_t, apk_factory_info_t, APK_CLASS_CONTROLLER,
    APK_CLASS_PROCESSOR, APK_NAME_SIZE, APK_SHORT_STRING_SIZE, APK_STRING_SIZE, APK_URL_SIZE,
    APK_RESTART_LATENCY_CHANGED, APK_RESTART_PARAM_VALUES_CHANGED,
};
use serde::Serialize;

use crate::bus::{BusDirection, BusInfo, MediaType};
use crate::error::PluginError;
use crate::note_expression::NoteExpressionTypeInfo;
use crate::params::{ParamId, ParameterInfo};
use crate::process::{ProcessData, ProcessSetup, SampleSize};
use crate::strings::{empty, read_c_string, write_c_string};
use crate::uid::Uid;

/// Basic component capability: lifecycle and bus declarations.
pub trait Component: Send {
    fn initialize(&mut self) -> Result<(), PluginError>;
    fn terminate(&mut self) -> Result<(), PluginError>;

    /// Class id of the controller paired with this component.
    fn controller_class_id(&self) -> Option<Uid> {
        None
    }

    fn bus_count(&self, media: MediaType, direction: BusDirection) -> usize;
    fn bus_info(&self, media: MediaType, direction: BusDirection, index: usize) -> Option<BusInfo>;

    fn set_active(&mut self, active: bool) -> Result<(), PluginError>;
}

/// Audio processing capability.
pub trait AudioProcessor: Component {
    fn can_process_sample_size(&self, sample_size: SampleSize) -> bool {
        sample_size == SampleSize::Sample32
    }

    fn setup_processing(&mut self, setup: &ProcessSetup) -> Result<(), PluginError>;
    fn set_processing(&mut self, processing: bool) -> Result<(), PluginError>;
    fn process(&mut self, data: &mut ProcessData<'_>) -> Result<(), PluginError>;

    fn latency_samples(&self) -> u32 {
        0
    }

    fn tail_samples(&self) -> u32 {
        0
    }
}

/// Parameter and metadata capability.
pub trait EditController: Send {
    fn initialize(&mut self) -> Result<(), PluginError>;
    fn terminate(&mut self) -> Result<(), PluginError>;

    fn parameter_count(&self) -> usize;
    fn parameter_info(&self, index: usize) -> Option<ParameterInfo>;
    fn param_normalized(&self, id: ParamId) -> f64;
    fn set_param_normalized(&mut self, id: ParamId, value: f64) -> Result<(), PluginError>;
    fn normalized_to_plain(&self, id: ParamId, value: f64) -> f64;
    fn plain_to_normalized(&self, id: ParamId, value: f64) -> f64;

    fn note_expression_count(&self, _bus_index: i32, _channel: i16) -> usize {
        0
    }

    fn note_expression_info(
        &self,
        _bus_index: i32,
        _channel: i16,
        _index: usize,
    ) -> Option<NoteExpressionTypeInfo> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestartFlags(i32);

impl RestartFlags {
    pub const LATENCY_CHANGED: Self = Self(APK_RESTART_LATENCY_CHANGED);
    pub const PARAM_VALUES_CHANGED: Self = Self(APK_RESTART_PARAM_VALUES_CHANGED);

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Host notifier handed to every instance a factory creates.
pub trait ComponentHandler: Send + Sync {
    fn begin_edit(&self, id: ParamId) -> Result<(), PluginError>;
    fn perform_edit(&self, id: ParamId, value: f64) -> Result<(), PluginError>;
    fn end_edit(&self, id: ParamId) -> Result<(), PluginError>;
    fn restart_component(&self, flags: RestartFlags) -> Result<(), PluginError>;
}

pub type HostContext = Arc<dyn ComponentHandler>;

/// Handler that accepts every notification and does nothing with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl ComponentHandler for NullHandler {
    fn begin_edit(&self, _id: ParamId) -> Result<(), PluginError> {
        Ok(())
    }

    fn perform_edit(&self, _id: ParamId, _value: f64) -> Result<(), PluginError> {
        Ok(())
    }

    fn end_edit(&self, _id: ParamId) -> Result<(), PluginError> {
        Ok(())
    }

    fn restart_component(&self, _flags: RestartFlags) -> Result<(), PluginError> {
        Ok(())
    }
}

pub fn null_host() -> HostContext {
    Arc::new(NullHandler)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FactoryInfo {
    pub vendor: String,
    pub url: String,
    pub email: String,
}

impl FactoryInfo {
    pub fn to_raw(&self) -> apk_factory_info_t {
        let mut raw = apk_factory_info_t {
            vendor: empty::<APK_NAME_SIZE>(),
            url: empty::<APK_URL_SIZE>(),
            email: empty::<APK_STRING_SIZE>(),
        };
        write_c_string(&mut raw.vendor, &self.vendor);
        write_c_string(&mut raw.url, &self.url);
        write_c_string(&mut raw.email, &self.email);
        raw
    }

    pub fn from_raw(raw: &apk_factory_info_t) -> Self {
        Self {
            vendor: read_c_string(&raw.vendor),
            url: read_c_string(&raw.url),
            email: read_c_string(&raw.email),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassCategory {
    Processor,
    Controller,
}

impl ClassCategory {
    pub fn to_raw(self) -> apk_class_category {
        match self {
            ClassCategory::Processor => APK_CLASS_PROCESSOR,
            ClassCategory::Controller => APK_CLASS_CONTROLLER,
        }
    }

    pub fn from_raw(raw: apk_class_category) -> Option<Self> {
        match raw {
            APK_CLASS_PROCESSOR => Some(ClassCategory::Processor),
            APK_CLASS_CONTROLLER => Some(ClassCategory::Controller),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub cid: Uid,
    pub category: ClassCategory,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub sub_categories: String,
}

impl ClassInfo {
    pub fn processor(cid: Uid, name: impl Into<String>) -> Self {
        Self {
            cid,
            category: ClassCategory::Processor,
            name: name.into(),
            vendor: String::new(),
            version: String::new(),
            sub_categories: String::new(),
        }
    }

    pub fn controller(cid: Uid, name: impl Into<String>) -> Self {
        Self {
            category: ClassCategory::Controller,
            ..Self::processor(cid, name)
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_sub_categories(mut self, sub_categories: impl Into<String>) -> Self {
        self.sub_categories = sub_categories.into();
        self
    }

    pub fn is_instrument(&self) -> bool {
        self.sub_categories
            .split('|')
            .any(|category| category.eq_ignore_ascii_case("Instrument"))
    }

    pub fn to_raw(&self) -> apk_class_info_t {
        let mut raw = apk_class_info_t {
            cid: self.cid.to_raw(),
            category: self.category.to_raw(),
            name: empty::<APK_NAME_SIZE>(),
            vendor: empty::<APK_NAME_SIZE>(),
            version: empty::<APK_SHORT_STRING_SIZE>(),
            sub_categories: empty::<APK_STRING_SIZE>(),
        };
        write_c_string(&mut raw.name, &self.name);
        write_c_string(&mut raw.vendor, &self.vendor);
        write_c_string(&mut raw.version, &self.version);
        write_c_string(&mut raw.sub_categories, &self.sub_categories);
        raw
    }

    pub fn from_raw(raw: &apk_class_info_t) -> Option<Self> {
        Some(Self {
            cid: Uid::from_raw(&raw.cid),
            category: ClassCategory::from_raw(raw.category)?,
            name: read_c_string(&raw.name),
            vendor: read_c_string(&raw.vendor),
            version: read_c_string(&raw.version),
            sub_categories: read_c_string(&raw.sub_categories),
        })
    }
}

/// Entry point of a module: enumerates classes and creates instances.
///
/// Hosts see loaded binaries through this same trait, so a validator can
/// drive an in-process factory and a loaded library identically.
pub trait PluginFactory: Send + Sync {
    fn factory_info(&self) -> FactoryInfo;
    fn classes(&self) -> Vec<ClassInfo>;

    fn create_processor(
        &self,
        cid: &Uid,
        host: HostContext,
    ) -> Result<Box<dyn AudioProcessor>, PluginError>;

    fn create_controller(
        &self,
        cid: &Uid,
        host: HostContext,
    ) -> Result<Box<dyn EditController>, PluginError>;

    fn class_info(&self, cid: &Uid) -> Option<ClassInfo> {
        self.classes().into_iter().find(|class| &class.cid == cid)
    }
}
