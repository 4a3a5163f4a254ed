//! String key/value state declarations.

/// Flags describing a state entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateHints {
    /// The value is a filename or path.
    pub is_filename: bool,
    /// Only the editor ever writes this state.
    pub only_for_editor: bool,
    /// Changing the value from the host is not expected.
    pub host_readable_only: bool,
}

/// A single string state declared by the plugin.
///
/// Unlike parameters, states are not automatable; they hold configuration
/// such as file paths or editor-only settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateEntry {
    pub hints: StateHints,
    /// Key, unique among states.
    pub key: String,
    /// Value the state has before anything sets it.
    pub default_value: String,
    /// Human readable label.
    pub label: String,
    pub description: String,
}

impl StateEntry {
    pub fn new(key: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default_value: default_value.into(),
            ..Self::default()
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Mark the state as a filename.
    pub fn with_filename(mut self) -> Self {
        self.hints.is_filename = true;
        self
    }
}
