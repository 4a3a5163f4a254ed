//! # Polyplug
//!
//! Cross-format audio plugin framework for Rust.
//!
//! A plugin is described once through the [`Plugin`](prelude::Plugin) trait
//! and exported through a format adapter. The core crate computes the
//! flat parameter index space, the persisted state stream and the bus
//! layout; adapters translate those into a host protocol.
//!
//! ## Architecture
//!
//! ```text
//! Your Plugin (implements Plugin trait)
//!        ↓
//! PluginInstance<P> (descriptor, values, state, buses)
//!        ↓
//! Vst3Adapter<P> (VST3-style entry points)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use polyplug::prelude::*;
//!
//! struct Gain { gain: f32 }
//!
//! impl Plugin for Gain {
//!     fn create(_: &ConstructionParams) -> Self { Self { gain: 1.0 } }
//!     fn parameter_count(&self) -> u32 { 1 }
//!     fn init_parameter(&mut self, _: u32, parameter: &mut Parameter) {
//!         *parameter = Parameter::new("Gain", "gain", ParameterRanges::new(1.0, 0.0, 2.0));
//!     }
//!     fn parameter_value(&self, _: u32) -> f32 { self.gain }
//!     fn set_parameter_value(&mut self, _: u32, value: f32) { self.gain = value; }
//!     fn run(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: u32, _: &[MidiEvent]) {
//!         // Your DSP here
//!     }
//! }
//!
//! static CONFIG: PluginConfig = PluginConfig::new("Gain", 0x4761696e).with_audio_ports(2, 2);
//! static VST3_CONFIG: Vst3Config = Vst3Config::new([0x47; 16]);
//! ```

// Re-export sub-crates
pub use polyplug_core as core;
pub use polyplug_vst3 as vst3_impl;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use polyplug::prelude::*;
/// ```
pub mod prelude {
    pub use polyplug_core::{
        // Plugin model
        AudioPort, ConstructionParams, Direction, Plugin, PluginConfig, PluginInstance, PortGroup,
        PortKind, PORT_GROUP_MONO, PORT_GROUP_NONE, PORT_GROUP_STEREO,
        // Parameters
        Parameter, ParameterDesignation, ParameterEnumeration, ParameterEnumerationValue,
        ParameterHints, ParameterRanges,
        // State
        StateEntry, StateHints,
        // MIDI
        MidiEvent,
        // Error types
        PluginError, PluginResult,
    };

    // VST3 implementation
    pub use polyplug_vst3::{EditorMessage, PluginModule, Vst3Adapter, Vst3Config};
}
