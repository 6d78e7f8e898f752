use std::path::PathBuf;

use audioplug_sdk::{PluginError, Uid};
use thiserror::Error;

/// Fatal errors while opening a module. None of these leave a usable session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("plug-in binary not found at {0}")]
    MissingBinary(PathBuf),
    #[error("failed to load plug-in library {path}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("{path} does not export the audioplug entry symbol")]
    MissingEntry {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("module entry is null")]
    NullEntry,
    #[error("module ABI {found_major}.{found_minor} is incompatible with host ABI {expected_major}.{expected_minor}")]
    AbiMismatch {
        found_major: u16,
        found_minor: u16,
        expected_major: u16,
        expected_minor: u16,
    },
    #[error("module init failed")]
    InitFailed,
    #[error("module returned no factory")]
    NoFactory,
}

/// Errors while creating instances through a loaded factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("factory does not provide `{0}`")]
    MissingEntryPoint(&'static str),
    #[error("factory returned no instance for class {0}")]
    NullInstance(Uid),
}

impl From<InstanceError> for PluginError {
    fn from(err: InstanceError) -> Self {
        match err {
            InstanceError::MissingEntryPoint(_) => PluginError::NotImplemented,
            InstanceError::NullInstance(_) => PluginError::Internal(err.to_string()),
        }
    }
}
