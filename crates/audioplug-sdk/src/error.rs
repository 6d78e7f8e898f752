use audioplug_sys::{
    apk_result, APK_FALSE, APK_INTERNAL_ERROR, APK_INVALID_ARGUMENT, APK_NOT_IMPLEMENTED,
    APK_NOT_INITIALIZED, APK_OK, APK_OUT_OF_MEMORY,
};
use thiserror::Error;

use crate::lifecycle::TransitionError;
use crate::params::PluginParameterError;

/// Errors returned by plug-in capability calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PluginError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    InvalidState(#[from] TransitionError),
    #[error(transparent)]
    Parameter(#[from] PluginParameterError),
    #[error("call rejected")]
    Rejected,
    #[error("not implemented")]
    NotImplemented,
    #[error("component is not initialized")]
    NotInitialized,
    #[error("out of memory")]
    OutOfMemory,
    #[error("internal error: {0}")]
    Internal(String),
}

impl PluginError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Maps the error onto the ABI result code. State and parameter errors
    /// have no dedicated code and travel as `APK_FALSE`.
    pub fn code(&self) -> apk_result {
        match self {
            PluginError::InvalidArgument(_) | PluginError::Parameter(_) => APK_INVALID_ARGUMENT,
            PluginError::InvalidState(_) | PluginError::Rejected => APK_FALSE,
            PluginError::NotImplemented => APK_NOT_IMPLEMENTED,
            PluginError::NotInitialized => APK_NOT_INITIALIZED,
            PluginError::OutOfMemory => APK_OUT_OF_MEMORY,
            PluginError::Internal(_) => APK_INTERNAL_ERROR,
        }
    }

    pub fn check(code: apk_result) -> Result<(), PluginError> {
        match code {
            APK_OK => Ok(()),
            APK_FALSE => Err(PluginError::Rejected),
            APK_INVALID_ARGUMENT => Err(PluginError::invalid_argument("rejected by plug-in")),
            APK_NOT_IMPLEMENTED => Err(PluginError::NotImplemented),
            APK_NOT_INITIALIZED => Err(PluginError::NotInitialized),
            APK_OUT_OF_MEMORY => Err(PluginError::OutOfMemory),
            other => Err(PluginError::Internal(format!("result code {other}"))),
        }
    }
}

pub fn to_code(result: Result<(), PluginError>) -> apk_result {
    match result {
        Ok(()) => APK_OK,
        Err(err) => err.code(),
    }
}
