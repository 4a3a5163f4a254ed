//! VST3-specific plugin configuration.
//!
//! This module provides VST3-specific configuration that complements
//! the shared [`polyplug_core::PluginConfig`].

use polyplug_core::InternalMaxima;
use vst3::Steinberg::TUID;

/// Default maximum block size used until the host calls `setup_processing`.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 4096;

/// Default capacity of the editor-to-audio MIDI queue.
pub const DEFAULT_MIDI_QUEUE_CAPACITY: usize = 256;

/// Default number of MIDI events delivered to the plugin per block.
pub const DEFAULT_MAX_MIDI_EVENTS: usize = 512;

/// VST3-specific plugin configuration.
///
/// # Example
///
/// ```
/// use polyplug_core::InternalMaxima;
/// use polyplug_vst3::Vst3Config;
///
/// pub static VST3_CONFIG: Vst3Config = Vst3Config::new([0; 16])
///     .with_midi_queue_capacity(512)
///     .with_maxima(InternalMaxima::VST3);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Vst3Config {
    /// Unique ID for the audio component class.
    pub component_uid: TUID,

    /// Block size scratch buffers are sized for before the host reports one.
    pub max_block_size: usize,

    /// Number of MIDI messages the editor can queue between blocks.
    /// Messages sent while the queue is full are dropped.
    pub midi_queue_capacity: usize,

    /// Upper bound on MIDI events handed to the plugin in one block.
    pub max_midi_events: usize,

    /// Maxima used to normalize buffer size, sample rate and latency.
    pub maxima: InternalMaxima,
}

impl Vst3Config {
    /// Create a new VST3 configuration with default values.
    pub const fn new(component_uid: TUID) -> Self {
        Self {
            component_uid,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            midi_queue_capacity: DEFAULT_MIDI_QUEUE_CAPACITY,
            max_midi_events: DEFAULT_MAX_MIDI_EVENTS,
            maxima: InternalMaxima::VST3,
        }
    }

    /// Set the initial maximum block size.
    pub const fn with_max_block_size(mut self, size: usize) -> Self {
        self.max_block_size = size;
        self
    }

    /// Set the editor MIDI queue capacity.
    pub const fn with_midi_queue_capacity(mut self, capacity: usize) -> Self {
        self.midi_queue_capacity = capacity;
        self
    }

    /// Set the per-block MIDI event limit.
    pub const fn with_max_midi_events(mut self, count: usize) -> Self {
        self.max_midi_events = count;
        self
    }

    /// Replace the internal parameter maxima.
    pub const fn with_maxima(mut self, maxima: InternalMaxima) -> Self {
        self.maxima = maxima;
        self
    }
}
