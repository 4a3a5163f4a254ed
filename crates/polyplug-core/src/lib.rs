//! # polyplug-core
//!
//! Core of the Polyplug cross-format plugin framework.
//!
//! This crate holds everything that does not depend on a particular plugin
//! format: the plugin descriptor model and the three algorithms every format
//! adapter builds on.
//!
//! ## Main Types
//!
//! - [`Plugin`] - Trait implemented by user plugins
//! - [`PluginInstance`] - Owns a plugin plus its descriptor and runtime state
//! - [`PluginDescriptor`] - Ports, parameters, groups, programs and states
//!
//! ## Algorithms
//!
//! - [`ParameterLayout`] - Flat host parameter index space with internal slots
//! - [`StateEncoder`] / [`StateDecoder`] - Persisted state stream
//! - [`BusLayout`] - Port to bus partitioning and arrangement negotiation
//!
//! ## Supporting Types
//!
//! - [`Parameter`] / [`ParameterRanges`] - Parameter metadata
//! - [`AudioPort`] / [`PortGroup`] - Port metadata
//! - [`MidiEvent`] - Raw MIDI messages
//! - [`PluginError`] - Error types

pub mod bus;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod instance;
pub mod midi;
pub mod parameter;
pub mod parameter_layout;
pub mod plugin;
pub mod port;
pub mod speaker;
pub mod state;
pub mod state_codec;
pub mod types;

// Re-exports for convenience
pub use bus::{Bus, BusCategory, BusLayout, BUS_FLAG_CONTROL_VOLTAGE};
pub use config::{ConstructionParams, PluginConfig};
pub use descriptor::PluginDescriptor;
pub use error::{PluginError, PluginResult};
pub use instance::PluginInstance;
pub use midi::MidiEvent;
pub use parameter::{
    Parameter, ParameterDesignation, ParameterEnumeration, ParameterEnumerationValue,
    ParameterHints, ParameterRanges,
};
pub use parameter_layout::{
    parameter_to_normalized, parameter_to_plain, ExportFormat, InternalMaxima, InternalSlot,
    MidiCcKind, MidiCcSlot, ParameterLayout, ParameterTarget, MIDI_CC_PARAMETER_COUNT,
    MIDI_CHANNELS, MIDI_CONTROLLERS_PER_CHANNEL,
};
pub use plugin::Plugin;
pub use port::{AudioPort, PortGroup, PortKind};
pub use speaker::SpeakerArrangement;
pub use state::{StateEntry, StateHints};
pub use state_codec::{
    decode_state, encode_state, AppliedState, DecodedState, StateDecoder, StateEncoder,
};
pub use types::{
    Direction, NormalizedValue, ParameterIndex, RawIndex, MAX_BUSES, MAX_CHANNELS,
    PORT_GROUP_MONO, PORT_GROUP_NONE, PORT_GROUP_STEREO,
};
