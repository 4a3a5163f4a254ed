//! Audio port and port group descriptions.

use crate::types::{PORT_GROUP_MONO, PORT_GROUP_NONE, PORT_GROUP_STEREO};

/// Semantic kind of an audio port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortKind {
    /// Ordinary audio.
    #[default]
    Audio,
    /// Auxiliary side input (or output).
    Sidechain,
    /// Control-voltage signal carried on an audio buffer.
    ControlVoltage,
}

/// A single audio port as declared by the plugin.
///
/// Direction is not stored here: the descriptor keeps inputs and outputs in
/// separate lists.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPort {
    pub kind: PortKind,
    /// The port may be left unconnected by the host.
    pub optional: bool,
    /// Port group, [`PORT_GROUP_NONE`] when ungrouped.
    pub group_id: u32,
    /// Display name (e.g., "Audio Input 1").
    pub name: String,
    /// Machine name, unique among ports.
    pub symbol: String,
    /// Bus this port was assigned to, filled in by the bus resolver.
    pub bus_id: Option<u32>,
}

impl Default for AudioPort {
    fn default() -> Self {
        Self {
            kind: PortKind::Audio,
            optional: false,
            group_id: PORT_GROUP_NONE,
            name: String::new(),
            symbol: String::new(),
            bus_id: None,
        }
    }
}

impl AudioPort {
    /// Create an ungrouped audio port.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Set the port kind.
    pub fn with_kind(mut self, kind: PortKind) -> Self {
        self.kind = kind;
        self
    }

    /// Assign the port to a group.
    pub fn with_group(mut self, group_id: u32) -> Self {
        self.group_id = group_id;
        self
    }

    /// Mark the port as optional.
    pub fn with_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Returns true if the port belongs to a group.
    #[inline]
    pub fn is_grouped(&self) -> bool {
        self.group_id != PORT_GROUP_NONE
    }

    /// Fill in the default name and symbol for an unnamed port.
    ///
    /// Ports of a reserved mono/stereo group get channel names; everything
    /// else is numbered per direction.
    pub(crate) fn fill_defaults(&mut self, input: bool, index: u32, stereo_channel: Option<u32>) {
        let dir = if input { "Input" } else { "Output" };
        let sym = if input { "in" } else { "out" };

        if self.name.is_empty() {
            self.name = match (self.group_id, stereo_channel) {
                (PORT_GROUP_MONO, _) => format!("Mono {}", dir),
                (PORT_GROUP_STEREO, Some(0)) => format!("Left {}", dir),
                (PORT_GROUP_STEREO, Some(_)) => format!("Right {}", dir),
                _ => match self.kind {
                    PortKind::Audio => format!("Audio {} {}", dir, index + 1),
                    PortKind::Sidechain => format!("Sidechain {} {}", dir, index + 1),
                    PortKind::ControlVoltage => format!("CV {} {}", dir, index + 1),
                },
            };
        }

        if self.symbol.is_empty() {
            self.symbol = format!("{}{}", sym, index + 1);
        }
    }
}

/// A named group of ports or parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortGroup {
    pub group_id: u32,
    pub name: String,
    pub symbol: String,
}

impl PortGroup {
    pub fn new(group_id: u32, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            group_id,
            name: name.into(),
            symbol: symbol.into(),
        }
    }

    /// Built-in description of a reserved group id.
    pub fn reserved(group_id: u32) -> Option<Self> {
        match group_id {
            PORT_GROUP_MONO => Some(Self::new(group_id, "Mono", "dpf_mono")),
            PORT_GROUP_STEREO => Some(Self::new(group_id, "Stereo", "dpf_stereo")),
            _ => None,
        }
    }
}
