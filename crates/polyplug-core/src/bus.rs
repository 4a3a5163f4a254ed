//! Bus/port arrangement resolution.
//!
//! Hosts enumerate audio in buses, plugins declare a flat list of ports. A
//! [`BusLayout`] partitions one direction's ports into buses, assigns every
//! port its `bus_id`, computes each bus's speaker arrangement and tracks
//! which buses (and therefore which ports) the host has enabled.
//!
//! Bus order for one direction:
//!
//! ```text
//! group buses     one per distinct group id, in order of first appearance
//! main bus        all ungrouped plain audio ports
//! sidechain bus   all ungrouped sidechain ports
//! CV buses        one per ungrouped control-voltage port
//! ```

use log::{debug, warn};

use crate::error::{PluginError, PluginResult};
use crate::port::{AudioPort, PortGroup, PortKind};
use crate::speaker::{self, SpeakerArrangement};
use crate::types::{Direction, MAX_BUSES, MAX_CHANNELS};

/// Bus flag marking a control-voltage bus (VST3 `kIsControlVoltage`).
pub const BUS_FLAG_CONTROL_VOLTAGE: u32 = 1 << 1;

/// What a bus was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCategory {
    /// All ports sharing a group id.
    Group(u32),
    /// All ungrouped plain audio ports.
    Main,
    /// All ungrouped sidechain ports.
    Sidechain,
    /// A single ungrouped control-voltage port.
    ControlVoltage,
}

/// A host-visible bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub id: u32,
    pub category: BusCategory,
    /// Kind of the ports on this bus (first port for group buses).
    pub kind: PortKind,
    pub name: String,
    pub channel_count: u32,
    /// Speaker arrangement, `None` when the bus was declined because its
    /// layout is not representable.
    pub arrangement: Option<SpeakerArrangement>,
    pub is_default_active: bool,
    /// Indices into the direction's port list.
    pub ports: Vec<usize>,
}

impl Bus {
    /// Returns true for buses carrying the plugin's primary signal.
    #[inline]
    pub fn is_main(&self) -> bool {
        matches!(self.category, BusCategory::Main | BusCategory::Group(_))
            && self.kind == PortKind::Audio
    }

    #[inline]
    pub fn is_control_voltage(&self) -> bool {
        self.kind == PortKind::ControlVoltage
    }

    /// Returns true if the bus could not be given a speaker arrangement.
    #[inline]
    pub fn is_declined(&self) -> bool {
        self.arrangement.is_none()
    }

    /// Format bus flags: [`BUS_FLAG_CONTROL_VOLTAGE`] for CV buses, plus
    /// `default_active_flag` when the bus starts active.
    pub fn flags(&self, default_active_flag: u32) -> u32 {
        let mut flags = 0;
        if self.is_default_active {
            flags |= default_active_flag;
        }
        if self.is_control_voltage() {
            flags |= BUS_FLAG_CONTROL_VOLTAGE;
        }
        flags
    }
}

/// Resolved buses for one direction plus the host's enable state.
#[derive(Debug, Clone)]
pub struct BusLayout {
    direction: Direction,
    buses: Vec<Bus>,
    active: Vec<bool>,
    port_enabled: Vec<bool>,
}

impl BusLayout {
    /// Partition `ports` into buses and write each port's `bus_id`.
    ///
    /// Buses whose channel count has no speaker layout are declined (logged,
    /// never active) rather than guessed. More than [`MAX_BUSES`] buses is an
    /// error.
    pub fn resolve(
        direction: Direction,
        ports: &mut [AudioPort],
        groups: &[PortGroup],
    ) -> PluginResult<Self> {
        let dir_name = if direction.is_input() { "Input" } else { "Output" };
        let mut buses: Vec<Bus> = Vec::new();

        // Group buses
        for (index, port) in ports.iter().enumerate() {
            if !port.is_grouped() {
                continue;
            }
            match buses
                .iter_mut()
                .find(|b| b.category == BusCategory::Group(port.group_id))
            {
                Some(bus) => bus.ports.push(index),
                None => {
                    let name = PortGroup::reserved(port.group_id)
                        .or_else(|| groups.iter().find(|g| g.group_id == port.group_id).cloned())
                        .map(|g| g.name)
                        .unwrap_or_else(|| format!("Group {}", port.group_id));
                    buses.push(Self::new_bus(
                        buses.len(),
                        BusCategory::Group(port.group_id),
                        port.kind,
                        name,
                        index,
                    ));
                }
            }
        }

        // Ungrouped main and sidechain buses
        for (category, kind, name) in [
            (BusCategory::Main, PortKind::Audio, format!("Audio {}", dir_name)),
            (BusCategory::Sidechain, PortKind::Sidechain, format!("Sidechain {}", dir_name)),
        ] {
            let members: Vec<usize> = ports
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.is_grouped() && p.kind == kind)
                .map(|(i, _)| i)
                .collect();
            if let Some((&first, rest)) = members.split_first() {
                let mut bus = Self::new_bus(buses.len(), category, kind, name, first);
                bus.ports.extend_from_slice(rest);
                buses.push(bus);
            }
        }

        // One bus per ungrouped CV port
        for (index, port) in ports.iter().enumerate() {
            if !port.is_grouped() && port.kind == PortKind::ControlVoltage {
                buses.push(Self::new_bus(
                    buses.len(),
                    BusCategory::ControlVoltage,
                    PortKind::ControlVoltage,
                    port.name.clone(),
                    index,
                ));
            }
        }

        if buses.len() > MAX_BUSES {
            return Err(PluginError::UnsupportedConfiguration(format!(
                "{} ports resolve into {} {} buses, but MAX_BUSES is {}",
                ports.len(),
                buses.len(),
                dir_name.to_lowercase(),
                MAX_BUSES
            )));
        }

        for bus in &mut buses {
            bus.channel_count = bus.ports.len() as u32;
            bus.arrangement = match Self::compute_arrangement(bus) {
                Ok(arrangement) => Some(arrangement),
                Err(err) => {
                    warn!("Declining {} bus '{}': {}", dir_name.to_lowercase(), bus.name, err);
                    None
                }
            };
            for &port in &bus.ports {
                ports[port].bus_id = Some(bus.id);
            }
        }

        // Default-active: the main bus if there is one, else the first
        // ordinary-audio group bus.
        let default_active = buses
            .iter()
            .position(|b| b.category == BusCategory::Main && !b.is_declined())
            .or_else(|| buses.iter().position(|b| b.is_main() && !b.is_declined()));
        if let Some(index) = default_active {
            buses[index].is_default_active = true;
        }

        let mut layout = Self {
            direction,
            active: vec![false; buses.len()],
            port_enabled: vec![false; ports.len()],
            buses,
        };
        layout.reset();
        Ok(layout)
    }

    fn new_bus(id: usize, category: BusCategory, kind: PortKind, name: String, port: usize) -> Bus {
        Bus {
            id: id as u32,
            category,
            kind,
            name,
            channel_count: 0,
            arrangement: None,
            is_default_active: false,
            ports: vec![port],
        }
    }

    fn compute_arrangement(bus: &Bus) -> PluginResult<SpeakerArrangement> {
        if bus.channel_count as usize > MAX_CHANNELS {
            return Err(PluginError::UnsupportedConfiguration(format!(
                "{} channels, but MAX_CHANNELS is {}",
                bus.channel_count, MAX_CHANNELS
            )));
        }
        match bus.category {
            BusCategory::ControlVoltage => Ok(speaker::ARR_MONO),
            BusCategory::Group(group_id) => {
                speaker::arrangement_for_group(group_id, bus.channel_count)
            }
            BusCategory::Main | BusCategory::Sidechain => {
                speaker::arrangement_for_channels(bus.channel_count)
            }
        }
    }

    /// Restore every bus to its default-active state.
    pub fn reset(&mut self) {
        for (index, bus) in self.buses.iter().enumerate() {
            self.active[index] = bus.is_default_active;
        }
        self.sync_ports();
    }

    fn sync_ports(&mut self) {
        for (bus, &active) in self.buses.iter().zip(self.active.iter()) {
            for &port in &bus.ports {
                self.port_enabled[port] = active;
            }
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    #[inline]
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    #[inline]
    pub fn bus(&self, index: usize) -> Option<&Bus> {
        self.buses.get(index)
    }

    /// Speaker arrangement of a bus.
    pub fn arrangement(&self, index: usize) -> PluginResult<SpeakerArrangement> {
        let bus = self.bus(index).ok_or_else(|| {
            PluginError::invalid_argument(format!("bus index {} out of range", index))
        })?;
        bus.arrangement.ok_or_else(|| {
            PluginError::UnsupportedConfiguration(format!("bus '{}' was declined", bus.name))
        })
    }

    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    /// Enable flag per port, indexed like the direction's port list.
    #[inline]
    pub fn port_enabled(&self) -> &[bool] {
        &self.port_enabled
    }

    /// Activate or deactivate a single bus.
    pub fn activate_bus(&mut self, index: usize, active: bool) -> PluginResult<()> {
        let bus = self.buses.get(index).ok_or_else(|| {
            PluginError::invalid_argument(format!("bus index {} out of range", index))
        })?;
        if active && bus.is_declined() {
            return Err(PluginError::UnsupportedConfiguration(format!(
                "bus '{}' was declined and cannot be activated",
                bus.name
            )));
        }
        self.active[index] = active;
        self.sync_ports();
        Ok(())
    }

    /// Apply a host rearrangement request.
    ///
    /// `requested[i]` must equal bus `i`'s computed arrangement for every
    /// supplied bus; those buses are enabled and any bus past the end of
    /// `requested` is disabled. On any mismatch nothing changes.
    pub fn set_arrangements(&mut self, requested: &[SpeakerArrangement]) -> PluginResult<()> {
        self.check_arrangements(requested)?;

        for (index, active) in self.active.iter_mut().enumerate() {
            *active = index < requested.len();
        }
        self.sync_ports();
        Ok(())
    }

    /// Check a rearrangement request without applying it.
    pub fn check_arrangements(&self, requested: &[SpeakerArrangement]) -> PluginResult<()> {
        if requested.len() > self.buses.len() {
            return Err(PluginError::invalid_argument(format!(
                "{} arrangements requested for {} buses",
                requested.len(),
                self.buses.len()
            )));
        }
        for (index, (&mask, bus)) in requested.iter().zip(self.buses.iter()).enumerate() {
            if bus.arrangement != Some(mask) {
                debug!(
                    "Rejecting arrangement {:#x} for bus {} ('{}'), expected {:?}",
                    mask, index, bus.name, bus.arrangement
                );
                return Err(PluginError::invalid_argument(format!(
                    "arrangement {:#x} does not match bus {}",
                    mask, index
                )));
            }
        }
        Ok(())
    }

    /// Bus a port belongs to.
    pub fn bus_for_port(&self, port: usize) -> Option<&Bus> {
        self.buses.iter().find(|b| b.ports.contains(&port))
    }
}
