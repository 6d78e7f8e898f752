//! Safe plug-in side API for audioplug modules.
//!
//! A module implements [`PluginFactory`] plus one [`AudioProcessor`] and one
//! [`EditController`] per class, then exports the factory with
//! [`audioplug_export!`]. Hosts reuse the same types and traits, which is what
//! lets the validator drive an in-process factory exactly like a loaded one.

pub mod bus;
pub mod error;
pub mod events;
pub mod export;
pub mod lifecycle;
pub mod note_expression;
pub mod params;
pub mod plugin;
pub mod process;
pub mod strings;
pub mod uid;

pub use audioplug_sys as sys;

pub use bus::{BusDirection, BusInfo, BusKind, BusLayout, MediaType};
pub use error::PluginError;
pub use events::{Event, EventKind, MAX_EVENTS};
pub use lifecycle::{ComponentState, Lifecycle, Transition, TransitionError, TransitionOutcome};
pub use note_expression::NoteExpressionTypeInfo;
pub use params::{
    ParamId, ParameterDefinition, ParameterFlags, ParameterInfo, ParameterKind, ParameterLayout,
    ParameterSet, PluginParameterError,
};
pub use plugin::{
    null_host, AudioProcessor, ClassCategory, ClassInfo, Component, ComponentHandler,
    EditController, FactoryInfo, HostContext, NullHandler, PluginFactory, RestartFlags,
};
pub use process::{
    OutputParameterChanges, ParameterQueue, ProcessContext, ProcessData, ProcessMode,
    ProcessSetup, Sample, SampleSize,
};
pub use uid::Uid;

pub mod prelude {
    pub use crate::bus::{BusDirection, BusInfo, MediaType};
    pub use crate::error::PluginError;
    pub use crate::events::{Event, EventKind};
    pub use crate::lifecycle::{Lifecycle, Transition};
    pub use crate::note_expression::NoteExpressionTypeInfo;
    pub use crate::params::{
        ContinuousParameterOptions, ParamId, ParameterDefinition, ParameterInfo, ParameterKind,
        ParameterLayout, ParameterSet,
    };
    pub use crate::plugin::{
        AudioProcessor, ClassInfo, Component, EditController, FactoryInfo, HostContext,
        PluginFactory,
    };
    pub use crate::process::{BlockVisitor, ProcessData, ProcessSetup, Sample, SampleSize};
    pub use crate::uid::Uid;
}
