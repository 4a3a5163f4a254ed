//! The plugin trait implemented by user code.

use crate::config::ConstructionParams;
use crate::midi::MidiEvent;
use crate::parameter::Parameter;
use crate::port::{AudioPort, PortGroup};
use crate::state::StateEntry;
use crate::types::Direction;

/// A plugin implementation, independent of any export format.
///
/// The descriptor is built by querying the `init_*` methods exactly once,
/// index by index, when a [`PluginInstance`](crate::PluginInstance) is
/// created. After that only the runtime methods are called.
///
/// # Example
///
/// ```
/// use polyplug_core::{ConstructionParams, MidiEvent, Parameter, ParameterRanges, Plugin};
///
/// struct Gain {
///     gain: f32,
/// }
///
/// impl Plugin for Gain {
///     fn create(_params: &ConstructionParams) -> Self {
///         Gain { gain: 1.0 }
///     }
///
///     fn parameter_count(&self) -> u32 {
///         1
///     }
///
///     fn init_parameter(&mut self, _index: u32, parameter: &mut Parameter) {
///         *parameter = Parameter::new("Gain", "gain", ParameterRanges::new(1.0, 0.0, 2.0));
///     }
///
///     fn parameter_value(&self, _index: u32) -> f32 {
///         self.gain
///     }
///
///     fn set_parameter_value(&mut self, _index: u32, value: f32) {
///         self.gain = value;
///     }
///
///     fn run(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: u32, _midi: &[MidiEvent]) {
///         for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
///             for i in 0..frames as usize {
///                 output[i] = input[i] * self.gain;
///             }
///         }
///     }
/// }
/// ```
pub trait Plugin: Send + 'static {
    /// Create a new instance.
    ///
    /// `params` carries everything the host knows at construction time, so
    /// buffers can be sized right away.
    fn create(params: &ConstructionParams) -> Self
    where
        Self: Sized;

    // =========================================================================
    // Counts (static, queried once)
    // =========================================================================

    /// Number of parameters.
    fn parameter_count(&self) -> u32 {
        0
    }

    /// Number of factory programs.
    fn program_count(&self) -> u32 {
        0
    }

    /// Number of string states.
    fn state_count(&self) -> u32 {
        0
    }

    // =========================================================================
    // Initialization (called once per index)
    // =========================================================================

    /// Describe an audio port.
    ///
    /// `port` arrives prefilled: directions with exactly one or two ports are
    /// placed in the reserved mono or stereo group. Unset names and symbols
    /// are generated afterwards.
    fn init_audio_port(&mut self, direction: Direction, index: u32, port: &mut AudioPort) {
        let _ = (direction, index, port);
    }

    /// Describe a parameter. The symbol must be set.
    fn init_parameter(&mut self, index: u32, parameter: &mut Parameter) {
        let _ = (index, parameter);
    }

    /// Describe a port group referenced by a port or parameter.
    ///
    /// Called once for every non-reserved group id in use. Both name and
    /// symbol must be set.
    fn init_port_group(&mut self, group_id: u32, group: &mut PortGroup) {
        let _ = (group_id, group);
    }

    /// Name a factory program. Left empty, it becomes "Program N".
    fn init_program_name(&mut self, index: u32, name: &mut String) {
        let _ = (index, name);
    }

    /// Describe a string state. The key must be set.
    fn init_state(&mut self, index: u32, state: &mut StateEntry) {
        let _ = (index, state);
    }

    // =========================================================================
    // Runtime
    // =========================================================================

    /// Current plain value of a parameter.
    fn parameter_value(&self, index: u32) -> f32 {
        let _ = index;
        0.0
    }

    /// Set a parameter's plain value. Never called for outputs or triggers.
    fn set_parameter_value(&mut self, index: u32, value: f32) {
        let _ = (index, value);
    }

    /// Load a factory program.
    fn load_program(&mut self, index: u32) {
        let _ = index;
    }

    /// Current value of a string state.
    ///
    /// Returning `None` lets the framework report the last value it set.
    fn state_value(&self, key: &str) -> Option<String> {
        let _ = key;
        None
    }

    /// Change a string state.
    fn set_state(&mut self, key: &str, value: &str) {
        let _ = (key, value);
    }

    /// Processing is about to start.
    fn activate(&mut self) {}

    /// Processing has stopped.
    fn deactivate(&mut self) {}

    /// The maximum block size changed.
    fn buffer_size_changed(&mut self, new_buffer_size: u32) {
        let _ = new_buffer_size;
    }

    /// The sample rate changed.
    fn sample_rate_changed(&mut self, new_sample_rate: f64) {
        let _ = new_sample_rate;
    }

    /// Processing latency in frames.
    fn latency(&self) -> u32 {
        0
    }

    /// Process one block.
    ///
    /// `inputs` and `outputs` hold one slice per port, each at least `frames`
    /// long. `midi` is sorted by frame offset.
    fn run(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        frames: u32,
        midi: &[MidiEvent],
    );
}
