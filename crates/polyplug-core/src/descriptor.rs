//! Plugin descriptor: the static shape of a plugin instance.
//!
//! A [`PluginDescriptor`] is populated once, by querying the plugin's `init_*`
//! methods index by index, and is read-only afterwards. Port, parameter,
//! program and state order is fixed for the lifetime of the instance and
//! drives all index arithmetic.

use std::collections::HashSet;

use crate::config::PluginConfig;
use crate::error::{PluginError, PluginResult};
use crate::parameter::{Parameter, ParameterDesignation};
use crate::plugin::Plugin;
use crate::port::{AudioPort, PortGroup};
use crate::state::StateEntry;
use crate::types::{
    is_reserved_port_group, Direction, ParameterIndex, PORT_GROUP_MONO, PORT_GROUP_NONE,
    PORT_GROUP_STEREO,
};

/// Prefix reserved for the state stream's section markers.
pub const RESERVED_KEY_PREFIX: &str = "__dpf_";

/// Complete static description of a plugin instance.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub config: PluginConfig,
    pub inputs: Vec<AudioPort>,
    pub outputs: Vec<AudioPort>,
    pub parameters: Vec<Parameter>,
    /// Non-reserved groups, in order of first use.
    pub port_groups: Vec<PortGroup>,
    pub programs: Vec<String>,
    pub states: Vec<StateEntry>,
    /// Index of the parameter designated as bypass, if any.
    pub bypass_index: Option<ParameterIndex>,
}

impl PluginDescriptor {
    /// Query `plugin` for its ports, parameters, groups, programs and states,
    /// then validate the result.
    pub fn build<P: Plugin>(config: &PluginConfig, plugin: &mut P) -> PluginResult<Self> {
        let inputs = Self::build_ports(plugin, Direction::Input, config.audio_inputs);
        let outputs = Self::build_ports(plugin, Direction::Output, config.audio_outputs);

        let mut parameters = Vec::with_capacity(plugin.parameter_count() as usize);
        for index in 0..plugin.parameter_count() {
            let mut parameter = Parameter::default();
            plugin.init_parameter(index, &mut parameter);
            if parameter.short_name.is_empty() {
                parameter.short_name = parameter.name.clone();
            }
            parameters.push(parameter);
        }

        // Distinct non-reserved groups in first-use order
        let mut port_groups: Vec<PortGroup> = Vec::new();
        let used_ids = inputs
            .iter()
            .chain(outputs.iter())
            .map(|p| p.group_id)
            .chain(parameters.iter().map(|p| p.group_id));
        for group_id in used_ids {
            if group_id == PORT_GROUP_NONE
                || is_reserved_port_group(group_id)
                || port_groups.iter().any(|g| g.group_id == group_id)
            {
                continue;
            }
            let mut group = PortGroup {
                group_id,
                ..PortGroup::default()
            };
            plugin.init_port_group(group_id, &mut group);
            group.group_id = group_id;
            port_groups.push(group);
        }

        let mut programs = Vec::with_capacity(plugin.program_count() as usize);
        for index in 0..plugin.program_count() {
            let mut name = String::new();
            plugin.init_program_name(index, &mut name);
            if name.is_empty() {
                name = format!("Program {}", index + 1);
            }
            programs.push(name);
        }

        let mut states = Vec::with_capacity(plugin.state_count() as usize);
        for index in 0..plugin.state_count() {
            let mut state = StateEntry::default();
            plugin.init_state(index, &mut state);
            states.push(state);
        }

        let bypass_index = parameters
            .iter()
            .position(|p| p.designation == ParameterDesignation::Bypass)
            .map(|i| i as ParameterIndex);

        let descriptor = Self {
            config: config.clone(),
            inputs,
            outputs,
            parameters,
            port_groups,
            programs,
            states,
            bypass_index,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn build_ports<P: Plugin>(plugin: &mut P, direction: Direction, count: u32) -> Vec<AudioPort> {
        let preset_group = match count {
            1 => PORT_GROUP_MONO,
            2 => PORT_GROUP_STEREO,
            _ => PORT_GROUP_NONE,
        };

        let mut ports = Vec::with_capacity(count as usize);
        let mut stereo_seen = 0;
        for index in 0..count {
            let mut port = AudioPort::default().with_group(preset_group);
            plugin.init_audio_port(direction, index, &mut port);

            let stereo_channel = (port.group_id == PORT_GROUP_STEREO).then(|| {
                stereo_seen += 1;
                stereo_seen - 1
            });
            port.fill_defaults(direction.is_input(), index, stereo_channel);
            ports.push(port);
        }
        ports
    }

    /// Check every descriptor invariant.
    pub fn validate(&self) -> PluginResult<()> {
        let mut symbols = HashSet::new();
        let mut bypass_count = 0;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if parameter.symbol.is_empty() {
                return Err(PluginError::descriptor(format!(
                    "parameter {} has no symbol",
                    index
                )));
            }
            if parameter.symbol.starts_with(RESERVED_KEY_PREFIX) {
                return Err(PluginError::descriptor(format!(
                    "parameter symbol '{}' uses a reserved prefix",
                    parameter.symbol
                )));
            }
            if !symbols.insert(parameter.symbol.as_str()) {
                return Err(PluginError::descriptor(format!(
                    "duplicate parameter symbol '{}'",
                    parameter.symbol
                )));
            }
            if !parameter.ranges.is_valid() {
                return Err(PluginError::descriptor(format!(
                    "parameter '{}' has invalid ranges {:?}",
                    parameter.symbol, parameter.ranges
                )));
            }
            if parameter.hints.output && parameter.hints.trigger {
                return Err(PluginError::descriptor(format!(
                    "parameter '{}' is both output and trigger",
                    parameter.symbol
                )));
            }
            if parameter.designation == ParameterDesignation::Bypass {
                bypass_count += 1;
            }
            self.check_group(parameter.group_id, &parameter.symbol)?;
        }
        if bypass_count > 1 {
            return Err(PluginError::descriptor(format!(
                "{} parameters are designated as bypass",
                bypass_count
            )));
        }

        let mut port_symbols = HashSet::new();
        for port in self.inputs.iter().chain(self.outputs.iter()) {
            if !port_symbols.insert(port.symbol.as_str()) {
                return Err(PluginError::descriptor(format!(
                    "duplicate port symbol '{}'",
                    port.symbol
                )));
            }
            self.check_group(port.group_id, &port.symbol)?;
        }

        let mut keys = HashSet::new();
        for (index, state) in self.states.iter().enumerate() {
            if state.key.is_empty() {
                return Err(PluginError::descriptor(format!("state {} has no key", index)));
            }
            if state.key.starts_with(RESERVED_KEY_PREFIX) {
                return Err(PluginError::descriptor(format!(
                    "state key '{}' uses a reserved prefix",
                    state.key
                )));
            }
            if !keys.insert(state.key.as_str()) {
                return Err(PluginError::descriptor(format!(
                    "duplicate state key '{}'",
                    state.key
                )));
            }
        }

        Ok(())
    }

    fn check_group(&self, group_id: u32, owner: &str) -> PluginResult<()> {
        if group_id == PORT_GROUP_NONE || is_reserved_port_group(group_id) {
            return Ok(());
        }
        match self.port_group(group_id) {
            Some(group) if !group.name.is_empty() && !group.symbol.is_empty() => Ok(()),
            _ => Err(PluginError::descriptor(format!(
                "'{}' references uninitialized group {}",
                owner, group_id
            ))),
        }
    }

    /// Ports of one direction.
    #[inline]
    pub fn ports(&self, direction: Direction) -> &[AudioPort] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    pub(crate) fn ports_mut(&mut self, direction: Direction) -> &mut [AudioPort] {
        match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        }
    }

    /// Look up a group by id, reserved groups included.
    pub fn port_group(&self, group_id: u32) -> Option<PortGroup> {
        PortGroup::reserved(group_id)
            .or_else(|| self.port_groups.iter().find(|g| g.group_id == group_id).cloned())
    }

    #[inline]
    pub fn parameter_count(&self) -> u32 {
        self.parameters.len() as u32
    }

    #[inline]
    pub fn program_count(&self) -> u32 {
        self.programs.len() as u32
    }

    #[inline]
    pub fn parameter(&self, index: ParameterIndex) -> Option<&Parameter> {
        self.parameters.get(index as usize)
    }

    /// Index of the parameter with `symbol`.
    pub fn parameter_index(&self, symbol: &str) -> Option<ParameterIndex> {
        self.parameters
            .iter()
            .position(|p| p.symbol == symbol)
            .map(|i| i as ParameterIndex)
    }

    /// Index of the state with `key`.
    pub fn state_index(&self, key: &str) -> Option<usize> {
        self.states.iter().position(|s| s.key == key)
    }
}
