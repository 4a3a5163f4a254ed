//! Common types used throughout the Polyplug framework.

// =============================================================================
// Audio Bus Limits
// =============================================================================
//
// Upper bounds for bus enumeration. A plugin whose ports resolve into more
// buses than this, or a bus wider than MAX_CHANNELS, is rejected when the
// bus layout is resolved.
// =============================================================================

/// Maximum number of audio channels per bus.
pub const MAX_CHANNELS: usize = 32;

/// Maximum number of audio buses per direction.
pub const MAX_BUSES: usize = 16;

// =============================================================================
// Port Groups
// =============================================================================

/// Port group id of a port that belongs to no group.
pub const PORT_GROUP_NONE: u32 = u32::MAX;

/// Reserved port group id for a single mono channel.
pub const PORT_GROUP_MONO: u32 = PORT_GROUP_NONE - 1;

/// Reserved port group id for a left/right stereo pair.
pub const PORT_GROUP_STEREO: u32 = PORT_GROUP_NONE - 2;

/// Returns true if `group_id` is one of the framework-reserved group ids.
#[inline]
pub const fn is_reserved_port_group(group_id: u32) -> bool {
    group_id == PORT_GROUP_MONO || group_id == PORT_GROUP_STEREO
}

/// Direction of an audio port or bus.
///
/// Ports do not store their own direction; the descriptor keeps inputs and
/// outputs in separate lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    /// Returns true for [`Direction::Input`].
    #[inline]
    pub const fn is_input(self) -> bool {
        matches!(self, Direction::Input)
    }
}

/// Plugin-local parameter index (0-based, declaration order).
pub type ParameterIndex = u32;

/// Host-visible flat parameter index, internal parameters included.
pub type RawIndex = u32;

/// Normalized parameter value (0.0 to 1.0) as exchanged with hosts.
pub type NormalizedValue = f64;
