//! Error types for the Polyplug framework.

use thiserror::Error;

/// Errors reported by the descriptor model and the core algorithms.
///
/// Format adapters translate these into whatever their ABI expects
/// (result codes, booleans). None of them is fatal to the plugin instance:
/// the failing operation is aborted and all state stays at its last good value.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The caller passed an out-of-range index or a malformed request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The plugin declared something this format cannot represent.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// A state stream was truncated or had unbalanced section markers.
    #[error("corrupt state: {0}")]
    CorruptState(String),
    /// The plugin violated a descriptor invariant during initialization.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    /// The host storage stream failed.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptState(msg.into())
    }

    pub fn descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }
}

/// Result type for Polyplug operations.
pub type PluginResult<T> = Result<T, PluginError>;
