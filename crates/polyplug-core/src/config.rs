//! Shared plugin configuration.
//!
//! This module provides format-agnostic plugin metadata shared across all
//! export formats, plus the per-instance [`ConstructionParams`] handed to a
//! plugin when it is created.
//!
//! # Example
//!
//! ```
//! use polyplug_core::PluginConfig;
//!
//! pub static CONFIG: PluginConfig = PluginConfig::new("My Plugin", 0x4d79_506c)
//!     .with_vendor("My Company")
//!     .with_version(1, 2, 0)
//!     .with_audio_ports(2, 2)
//!     .with_midi_input();
//! ```

/// Format-agnostic plugin configuration.
///
/// Everything here is static: it is known before any instance exists and is
/// what export formats use to size their fixed index spaces.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Plugin name displayed in the DAW.
    pub name: &'static str,

    /// Vendor/company name.
    pub vendor: &'static str,

    /// Vendor URL.
    pub url: &'static str,

    /// Vendor email.
    pub email: &'static str,

    /// Unique plugin id (four-character code style).
    pub unique_id: u32,

    /// Packed version: `major << 16 | minor << 8 | micro`.
    pub version: u32,

    /// Plugin category (e.g., "Fx", "Instrument").
    pub category: &'static str,

    /// Number of audio input ports.
    pub audio_inputs: u32,

    /// Number of audio output ports.
    pub audio_outputs: u32,

    /// Plugin reports processing latency to the host.
    pub wants_latency: bool,

    /// Plugin receives MIDI input.
    pub wants_midi_input: bool,

    /// Plugin produces MIDI output.
    pub wants_midi_output: bool,

    /// Whether this plugin has an editor/GUI.
    pub has_editor: bool,
}

impl PluginConfig {
    /// Create a new plugin configuration with default values
    /// (stereo in/out, no MIDI, no latency).
    pub const fn new(name: &'static str, unique_id: u32) -> Self {
        Self {
            name,
            vendor: "Unknown Vendor",
            url: "",
            email: "",
            unique_id,
            version: 1 << 16,
            category: "Fx",
            audio_inputs: 2,
            audio_outputs: 2,
            wants_latency: false,
            wants_midi_input: false,
            wants_midi_output: false,
            has_editor: false,
        }
    }

    /// Set the vendor name.
    pub const fn with_vendor(mut self, vendor: &'static str) -> Self {
        self.vendor = vendor;
        self
    }

    /// Set the vendor URL.
    pub const fn with_url(mut self, url: &'static str) -> Self {
        self.url = url;
        self
    }

    /// Set the vendor email.
    pub const fn with_email(mut self, email: &'static str) -> Self {
        self.email = email;
        self
    }

    /// Set the version.
    pub const fn with_version(mut self, major: u8, minor: u8, micro: u8) -> Self {
        self.version = (major as u32) << 16 | (minor as u32) << 8 | micro as u32;
        self
    }

    /// Set the plugin category.
    pub const fn with_category(mut self, category: &'static str) -> Self {
        self.category = category;
        self
    }

    /// Set the number of audio input and output ports.
    pub const fn with_audio_ports(mut self, inputs: u32, outputs: u32) -> Self {
        self.audio_inputs = inputs;
        self.audio_outputs = outputs;
        self
    }

    /// Report processing latency to the host.
    pub const fn with_latency(mut self) -> Self {
        self.wants_latency = true;
        self
    }

    /// Enable MIDI input.
    pub const fn with_midi_input(mut self) -> Self {
        self.wants_midi_input = true;
        self
    }

    /// Enable MIDI output.
    pub const fn with_midi_output(mut self) -> Self {
        self.wants_midi_output = true;
        self
    }

    /// Enable the editor/GUI.
    pub const fn with_editor(mut self) -> Self {
        self.has_editor = true;
        self
    }

    /// Version as a dotted string, e.g. `"1.2.0"`.
    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}",
            (self.version >> 16) & 0xff,
            (self.version >> 8) & 0xff,
            self.version & 0xff
        )
    }
}

/// Per-instance values known at construction time.
///
/// Passed straight into [`Plugin::create`](crate::Plugin::create) so that a
/// plugin can size its buffers from the start.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionParams {
    /// Host sample rate in Hz.
    pub sample_rate: f64,
    /// Maximum number of frames per `run` call.
    pub buffer_size: u32,
    /// The instance only exists so the host can scan metadata.
    pub is_dummy: bool,
    /// Path of the bundle the plugin was loaded from, when known.
    pub bundle_path: Option<String>,
}

impl ConstructionParams {
    /// Construction parameters for a real processing instance.
    pub fn new(sample_rate: f64, buffer_size: u32) -> Self {
        Self {
            sample_rate,
            buffer_size,
            is_dummy: false,
            bundle_path: None,
        }
    }

    /// Construction parameters for a metadata-only instance.
    pub fn dummy() -> Self {
        Self {
            sample_rate: 44100.0,
            buffer_size: 512,
            is_dummy: true,
            bundle_path: None,
        }
    }

    /// Set the bundle path.
    pub fn with_bundle_path(mut self, path: impl Into<String>) -> Self {
        self.bundle_path = Some(path.into());
        self
    }
}

impl Default for ConstructionParams {
    fn default() -> Self {
        Self::new(44100.0, 512)
    }
}
