//! Translation of core errors into VST3 result codes.

use log::error;
use polyplug_core::{PluginError, PluginResult};
use vst3::Steinberg::{kInternalError, kInvalidArgument, kResultFalse, kResultOk, tresult};

/// Result code for a core error.
pub fn error_code(err: &PluginError) -> tresult {
    match err {
        PluginError::InvalidArgument(_) => kInvalidArgument,
        PluginError::UnsupportedConfiguration(_) => kResultFalse,
        PluginError::CorruptState(_) => kInternalError,
        PluginError::InvalidDescriptor(_) => kInternalError,
        PluginError::Io(_) => kResultFalse,
    }
}

/// Result code for a core result: `kResultOk` on success.
pub fn to_tresult<T>(result: &PluginResult<T>) -> tresult {
    match result {
        Ok(_) => kResultOk,
        Err(err) => error_code(err),
    }
}

/// Like [`to_tresult`], logging failures at error level.
pub(crate) fn report<T>(context: &str, result: PluginResult<T>) -> tresult {
    if let Err(err) = &result {
        error!("{} failed: {}", context, err);
    }
    to_tresult(&result)
}
