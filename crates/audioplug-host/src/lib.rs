//! Host side of the audioplug ABI.
//!
//! [`PluginModule`] opens a module (from a shared library or a statically
//! linked entry) and implements [`audioplug_sdk::PluginFactory`] on top of the
//! raw factory table. The processors and controllers it creates are
//! [`HostedComponent`] and [`HostedController`], which implement the SDK
//! capability traits by calling through the module's vtables. Each of them
//! keeps the module mapped until it is dropped.

mod component;
mod controller;
mod error;
mod handler;
mod module;

pub use component::HostedComponent;
pub use controller::HostedController;
pub use error::{InstanceError, LoadError};
pub use module::PluginModule;

/// Re-export the raw bindings for users that need to drop down to the ABI.
pub use audioplug_sys as ffi;
