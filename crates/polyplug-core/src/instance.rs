//! Format-independent plugin instance.
//!
//! [`PluginInstance`] owns a plugin together with its descriptor, resolved
//! bus layouts, current program and string state values. Format adapters
//! talk to the plugin only through it, which is what enforces the host-side
//! rules: outputs and triggers are never written by the host, values are
//! clamped to their ranges, and state loads are all-or-nothing.

use std::io::{ErrorKind, Read, Write};

use log::{debug, warn};

use crate::bus::BusLayout;
use crate::config::{ConstructionParams, PluginConfig};
use crate::descriptor::PluginDescriptor;
use crate::error::{PluginError, PluginResult};
use crate::midi::MidiEvent;
use crate::plugin::Plugin;
use crate::state_codec::{encode_state, AppliedState, DecodedState, StateDecoder};
use crate::types::{Direction, ParameterIndex};

/// Chunk size used when reading state from a host stream.
const STATE_READ_CHUNK: usize = 512;

/// A plugin plus everything the framework tracks about it.
pub struct PluginInstance<P: Plugin> {
    plugin: P,
    descriptor: PluginDescriptor,
    input_buses: BusLayout,
    output_buses: BusLayout,
    current_program: u32,
    state_values: Vec<String>,
    sample_rate: f64,
    buffer_size: u32,
    is_active: bool,
}

impl<P: Plugin> PluginInstance<P> {
    /// Create the plugin, query its descriptor and resolve its buses.
    pub fn new(config: &PluginConfig, params: &ConstructionParams) -> PluginResult<Self> {
        let mut plugin = P::create(params);
        let mut descriptor = PluginDescriptor::build(config, &mut plugin)?;

        let groups = descriptor.port_groups.clone();
        let input_buses =
            BusLayout::resolve(Direction::Input, descriptor.ports_mut(Direction::Input), &groups)?;
        let output_ports = descriptor.ports_mut(Direction::Output);
        let output_buses = BusLayout::resolve(Direction::Output, output_ports, &groups)?;

        let state_values = descriptor
            .states
            .iter()
            .map(|s| s.default_value.clone())
            .collect();

        if descriptor.program_count() > 0 {
            plugin.load_program(0);
        }

        debug!(
            "Created '{}': {} parameters, {} programs, {} states, {}/{} buses",
            config.name,
            descriptor.parameter_count(),
            descriptor.program_count(),
            descriptor.states.len(),
            input_buses.bus_count(),
            output_buses.bus_count()
        );

        Ok(Self {
            plugin,
            descriptor,
            input_buses,
            output_buses,
            current_program: 0,
            state_values,
            sample_rate: params.sample_rate,
            buffer_size: params.buffer_size,
            is_active: false,
        })
    }

    #[inline]
    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    #[inline]
    pub fn plugin_mut(&mut self) -> &mut P {
        &mut self.plugin
    }

    #[inline]
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn bus_layout(&self, direction: Direction) -> &BusLayout {
        match direction {
            Direction::Input => &self.input_buses,
            Direction::Output => &self.output_buses,
        }
    }

    #[inline]
    pub fn bus_layout_mut(&mut self, direction: Direction) -> &mut BusLayout {
        match direction {
            Direction::Input => &mut self.input_buses,
            Direction::Output => &mut self.output_buses,
        }
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Current plain value of a parameter.
    pub fn parameter_value(&self, index: ParameterIndex) -> PluginResult<f32> {
        self.check_parameter(index)?;
        Ok(self.plugin.parameter_value(index))
    }

    /// Host write of a parameter's plain value.
    ///
    /// Outputs, triggers and non-finite values are rejected; values are
    /// clamped to the range.
    pub fn set_parameter_value(&mut self, index: ParameterIndex, value: f32) -> PluginResult<()> {
        self.check_parameter(index)?;
        let parameter = &self.descriptor.parameters[index as usize];
        if !value.is_finite() {
            return Err(PluginError::invalid_argument(format!(
                "non-finite value for parameter '{}'",
                parameter.symbol
            )));
        }
        if !parameter.is_host_writable() {
            warn!("Rejecting host write to read-only parameter '{}'", parameter.symbol);
            return Err(PluginError::invalid_argument(format!(
                "parameter '{}' is not writable by the host",
                parameter.symbol
            )));
        }
        let value = parameter.ranges.fixed_value(value);
        self.plugin.set_parameter_value(index, value);
        Ok(())
    }

    /// Put a trigger parameter back to its default.
    ///
    /// Returns true if the value had drifted and was reset.
    pub fn reset_trigger(&mut self, index: ParameterIndex) -> bool {
        let Some(parameter) = self.descriptor.parameter(index) else {
            return false;
        };
        if !parameter.hints.trigger {
            return false;
        }
        let default = parameter.ranges.default;
        if self.plugin.parameter_value(index) == default {
            return false;
        }
        self.plugin.set_parameter_value(index, default);
        true
    }

    fn check_parameter(&self, index: ParameterIndex) -> PluginResult<()> {
        if index >= self.descriptor.parameter_count() {
            return Err(PluginError::invalid_argument(format!(
                "parameter index {} out of range",
                index
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Programs and states
    // =========================================================================

    #[inline]
    pub fn current_program(&self) -> u32 {
        self.current_program
    }

    /// Load a factory program.
    pub fn set_program(&mut self, index: u32) -> PluginResult<()> {
        if index >= self.descriptor.program_count() {
            return Err(PluginError::invalid_argument(format!(
                "program index {} out of range",
                index
            )));
        }
        self.plugin.load_program(index);
        self.current_program = index;
        Ok(())
    }

    /// Current value of a string state.
    pub fn state_value(&self, key: &str) -> Option<String> {
        let index = self.descriptor.state_index(key)?;
        self.plugin
            .state_value(key)
            .or_else(|| Some(self.state_values[index].clone()))
    }

    /// Change a string state.
    pub fn set_state_value(&mut self, key: &str, value: &str) -> PluginResult<()> {
        let index = self
            .descriptor
            .state_index(key)
            .ok_or_else(|| PluginError::invalid_argument(format!("unknown state key '{}'", key)))?;
        self.plugin.set_state(key, value);
        self.state_values[index] = value.to_string();
        Ok(())
    }

    // =========================================================================
    // State persistence
    // =========================================================================

    /// Serialize program, states and input parameters.
    pub fn save_state(&self) -> PluginResult<Vec<u8>> {
        let states: Vec<String> = self
            .descriptor
            .states
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                self.plugin
                    .state_value(&entry.key)
                    .unwrap_or_else(|| self.state_values[i].clone())
            })
            .collect();
        encode_state(&self.descriptor, self.current_program, &states, |index| {
            self.plugin.parameter_value(index)
        })
    }

    /// Write the serialized state to a host stream.
    pub fn write_state<W: Write>(&self, writer: &mut W) -> PluginResult<()> {
        let bytes = self.save_state()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a state stream in chunks until its terminator or end of stream,
    /// then apply it.
    pub fn read_state<R: Read>(&mut self, reader: &mut R) -> PluginResult<AppliedState> {
        let mut decoder = StateDecoder::new();
        let mut chunk = [0u8; STATE_READ_CHUNK];
        let mut total = 0;
        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            total += read;
            if decoder.feed(&chunk[..read])? {
                break;
            }
        }
        debug!("Read state: {} bytes", total);
        let decoded = decoder.finish()?;
        self.apply_state(decoded)
    }

    /// Decode and apply an in-memory state stream.
    pub fn load_state(&mut self, bytes: &[u8]) -> PluginResult<AppliedState> {
        self.read_state(&mut &bytes[..])
    }

    /// Apply decoded state: program first, then states, then parameters.
    ///
    /// The program index is validated before anything is changed. Unknown
    /// state keys and parameter symbols are skipped, as are values for
    /// outputs and triggers.
    pub fn apply_state(&mut self, decoded: DecodedState) -> PluginResult<AppliedState> {
        let program_count = self.descriptor.program_count();
        let program = match decoded.program {
            Some(p) if program_count == 0 => {
                debug!("Skipping program {} for plugin without programs", p);
                None
            }
            Some(p) if p >= program_count => {
                return Err(PluginError::corrupt(format!(
                    "program {} out of range ({} programs)",
                    p, program_count
                )));
            }
            other => other,
        };

        let mut applied = AppliedState::default();

        if let Some(p) = program {
            self.plugin.load_program(p);
            self.current_program = p;
            applied.program = Some(p);
        }

        for (key, value) in decoded.states {
            match self.descriptor.state_index(&key) {
                Some(index) => {
                    self.plugin.set_state(&key, &value);
                    self.state_values[index] = value.clone();
                    applied.states.push((key, value));
                }
                None => debug!("Skipping unknown state key '{}'", key),
            }
        }

        for (symbol, value) in decoded.parameters {
            let Some(index) = self.descriptor.parameter_index(&symbol) else {
                debug!("Skipping unknown parameter '{}'", symbol);
                continue;
            };
            let parameter = &self.descriptor.parameters[index as usize];
            if !parameter.is_host_writable() {
                debug!("Skipping stored value for read-only parameter '{}'", symbol);
                continue;
            }
            let value = parameter.ranges.fixed_value(value);
            self.plugin.set_parameter_value(index, value);
            applied.parameters.push((index, value));
        }

        Ok(applied)
    }

    // =========================================================================
    // Processing
    // =========================================================================

    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn activate(&mut self) {
        if !self.is_active {
            self.plugin.activate();
            self.is_active = true;
        }
    }

    pub fn deactivate(&mut self) {
        if self.is_active {
            self.plugin.deactivate();
            self.is_active = false;
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline]
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate > 0.0 && sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.plugin.sample_rate_changed(sample_rate);
        }
    }

    pub fn set_buffer_size(&mut self, buffer_size: u32) {
        if buffer_size > 0 && buffer_size != self.buffer_size {
            self.buffer_size = buffer_size;
            self.plugin.buffer_size_changed(buffer_size);
        }
    }

    /// Processing latency reported by the plugin, 0 if it does not report one.
    pub fn latency(&self) -> u32 {
        if self.descriptor.config.wants_latency {
            self.plugin.latency()
        } else {
            0
        }
    }

    /// Process one block.
    pub fn run(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        frames: u32,
        midi: &[MidiEvent],
    ) {
        self.plugin.run(inputs, outputs, frames, midi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::{Parameter, ParameterHints, ParameterRanges};
    use crate::state::StateEntry;
    use crate::state_codec::{STATE_BEGIN_KEY, STATE_END_KEY, TERMINATOR};
    use approx::assert_abs_diff_eq;

    /// Two programs, one state, an integer, an output and a float parameter.
    struct Synth {
        program: u32,
        mode: String,
        values: [f32; 4],
        activations: u32,
    }

    impl Plugin for Synth {
        fn create(_params: &ConstructionParams) -> Self {
            Self {
                program: 0,
                mode: "off".into(),
                values: [4.0, 0.0, 0.5, 0.0],
                activations: 0,
            }
        }
        fn parameter_count(&self) -> u32 {
            4
        }
        fn program_count(&self) -> u32 {
            2
        }
        fn state_count(&self) -> u32 {
            1
        }
        fn init_parameter(&mut self, index: u32, parameter: &mut Parameter) {
            *parameter = match index {
                0 => Parameter::new("Voices", "voices", ParameterRanges::new(4.0, 1.0, 16.0))
                    .with_hints(ParameterHints::AUTOMATABLE.with_integer()),
                1 => Parameter::new("Level", "level", ParameterRanges::new(0.0, 0.0, 1.0))
                    .with_hints(ParameterHints::OUTPUT),
                2 => Parameter::new("Cutoff", "cutoff", ParameterRanges::new(0.5, 0.0, 1.0)),
                _ => Parameter::new("Reset", "reset", ParameterRanges::new(0.0, 0.0, 1.0))
                    .with_hints(ParameterHints::TRIGGER),
            };
        }
        fn init_state(&mut self, _index: u32, state: &mut StateEntry) {
            *state = StateEntry::new("mode", "off");
        }
        fn parameter_value(&self, index: u32) -> f32 {
            self.values[index as usize]
        }
        fn set_parameter_value(&mut self, index: u32, value: f32) {
            self.values[index as usize] = value;
        }
        fn load_program(&mut self, index: u32) {
            self.program = index;
        }
        fn state_value(&self, _key: &str) -> Option<String> {
            Some(self.mode.clone())
        }
        fn set_state(&mut self, _key: &str, value: &str) {
            self.mode = value.to_string();
        }
        fn activate(&mut self) {
            self.activations += 1;
        }
        fn run(&mut self, _: &[&[f32]], _: &mut [&mut [f32]], _: u32, _: &[MidiEvent]) {
            self.values[1] = 0.75;
        }
    }

    const CONFIG: PluginConfig = PluginConfig::new("Synth", 0x53796e74);

    fn instance() -> PluginInstance<Synth> {
        PluginInstance::new(&CONFIG, &ConstructionParams::default()).unwrap()
    }

    #[test]
    fn test_state_round_trip() {
        let mut source = instance();
        source.set_program(1).unwrap();
        source.set_state_value("mode", "on").unwrap();
        source.set_parameter_value(0, 9.0).unwrap();
        source.set_parameter_value(2, 0.123_456_7).unwrap();
        source.plugin_mut().values[1] = 0.9;

        let bytes = source.save_state().unwrap();
        assert_eq!(bytes.last(), Some(&TERMINATOR));

        let mut target = instance();
        let applied = target.load_state(&bytes).unwrap();

        assert_eq!(target.current_program(), 1);
        assert_eq!(target.plugin().program, 1);
        assert_eq!(target.state_value("mode").as_deref(), Some("on"));
        assert_eq!(target.parameter_value(0).unwrap(), 9.0);
        assert_abs_diff_eq!(target.parameter_value(2).unwrap(), 0.123_456_7, epsilon = 1e-6);
        // Output parameter untouched by the load
        assert_eq!(target.parameter_value(1).unwrap(), 0.0);

        assert_eq!(applied.program, Some(1));
        assert_eq!(applied.states.len(), 1);
        assert_eq!(applied.parameters.len(), 2);
    }

    #[test]
    fn test_end_marker_without_begin_leaves_values() {
        let mut target = instance();
        target.set_parameter_value(2, 0.3).unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"__dpf_program__\x001\x00");
        bytes.extend_from_slice(STATE_END_KEY.as_bytes());
        bytes.extend_from_slice(b"\x00\x00");
        bytes.push(TERMINATOR);

        assert!(target.load_state(&bytes).is_err());
        assert_eq!(target.parameter_value(2).unwrap(), 0.3);
        assert_eq!(target.current_program(), 0);
    }

    #[test]
    fn test_chunked_reader() {
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = self.0.len().min(buf.len()).min(3);
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }

        let mut source = instance();
        source.set_state_value("mode", "chunky").unwrap();
        let mut stream = Vec::new();
        source.write_state(&mut stream).unwrap();

        let mut target = instance();
        target.read_state(&mut Trickle(&stream)).unwrap();
        assert_eq!(target.state_value("mode").as_deref(), Some("chunky"));
    }

    #[test]
    fn test_unknown_keys_skipped() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(STATE_BEGIN_KEY.as_bytes());
        bytes.extend_from_slice(b"\x00\x00legacy\x00x\x00mode\x00on\x00");
        bytes.extend_from_slice(STATE_END_KEY.as_bytes());
        bytes.extend_from_slice(b"\x00\x00__dpf_parameters_begin__\x00\x00gone\x001\x00level\x001\x00");
        bytes.extend_from_slice(b"__dpf_parameters_end__\x00\x00");

        let mut target = instance();
        let applied = target.load_state(&bytes).unwrap();
        assert_eq!(applied.states, vec![("mode".to_string(), "on".to_string())]);
        assert!(applied.parameters.is_empty());
        assert_eq!(target.parameter_value(1).unwrap(), 0.0);
    }

    #[test]
    fn test_program_out_of_range_rejected_first() {
        let mut target = instance();
        let bytes = b"__dpf_program__\x007\x00__dpf_state_begin__\x00\x00mode\x00on\x00__dpf_state_end__\x00\x00";
        assert!(target.load_state(bytes).is_err());
        assert_eq!(target.state_value("mode").as_deref(), Some("off"));
    }

    #[test]
    fn test_host_writes_rejected_for_outputs_and_triggers() {
        let mut target = instance();
        assert!(target.set_parameter_value(1, 1.0).is_err());
        assert!(target.set_parameter_value(3, 1.0).is_err());
        assert!(target.set_parameter_value(9, 1.0).is_err());

        target.set_parameter_value(0, 100.0).unwrap();
        assert_eq!(target.parameter_value(0).unwrap(), 16.0);
    }

    #[test]
    fn test_non_finite_values_keep_previous_state() {
        let mut target = instance();
        target.set_parameter_value(2, 0.3).unwrap();

        let mut bytes = b"__dpf_parameters_begin__\x00\x00".to_vec();
        bytes.extend_from_slice(b"cutoff\x00NaN\x00__dpf_parameters_end__\x00\x00");
        bytes.push(TERMINATOR);
        assert!(matches!(target.load_state(&bytes), Err(PluginError::CorruptState(_))));
        assert_eq!(target.parameter_value(2).unwrap(), 0.3);

        assert!(target.set_parameter_value(2, f32::NAN).is_err());
        assert!(target.set_parameter_value(2, f32::INFINITY).is_err());
        assert_eq!(target.parameter_value(2).unwrap(), 0.3);
    }

    #[test]
    fn test_trigger_reset() {
        let mut target = instance();
        assert!(!target.reset_trigger(3));
        target.plugin_mut().values[3] = 1.0;
        assert!(target.reset_trigger(3));
        assert_eq!(target.parameter_value(3).unwrap(), 0.0);
        assert!(!target.reset_trigger(2));
    }

    #[test]
    fn test_activation_is_idempotent() {
        let mut target = instance();
        target.activate();
        target.activate();
        assert!(target.is_active());
        assert_eq!(target.plugin().activations, 1);
        target.deactivate();
        assert!(!target.is_active());
    }

    #[test]
    fn test_default_buses() {
        let target = instance();
        let outputs = target.bus_layout(Direction::Output);
        assert_eq!(outputs.bus_count(), 1);
        assert!(outputs.bus(0).unwrap().is_default_active);
        assert_eq!(target.descriptor().outputs[0].bus_id, Some(0));
    }
}
