//! Raw MIDI events handed to [`Plugin::run`](crate::Plugin::run).
//!
//! Events are short channel messages stored inline (no allocation), sorted by
//! `sample_offset` within a block.

/// Status nibble of a control change message.
pub const STATUS_CONTROL_CHANGE: u8 = 0xB0;
/// Status nibble of a channel pressure message.
pub const STATUS_CHANNEL_PRESSURE: u8 = 0xD0;
/// Status nibble of a pitch bend message.
pub const STATUS_PITCH_BEND: u8 = 0xE0;

/// A single short MIDI message at a frame offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MidiEvent {
    /// Frame offset within the current block (0 = start of block).
    pub sample_offset: u32,
    /// Number of valid bytes in `data` (1 to 3).
    pub size: u8,
    /// Raw message bytes.
    pub data: [u8; 3],
}

impl MidiEvent {
    /// Build an event from raw bytes. Returns `None` if `bytes` is empty or
    /// longer than a short message.
    pub fn from_bytes(sample_offset: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > 3 {
            return None;
        }
        let mut data = [0u8; 3];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            sample_offset,
            size: bytes.len() as u8,
            data,
        })
    }

    /// Control change on a zero-based channel.
    pub fn control_change(sample_offset: u32, channel: u8, controller: u8, value: u8) -> Self {
        Self {
            sample_offset,
            size: 3,
            data: [STATUS_CONTROL_CHANGE | (channel & 0x0f), controller & 0x7f, value & 0x7f],
        }
    }

    /// Channel pressure (aftertouch) on a zero-based channel.
    pub fn channel_pressure(sample_offset: u32, channel: u8, pressure: u8) -> Self {
        Self {
            sample_offset,
            size: 2,
            data: [STATUS_CHANNEL_PRESSURE | (channel & 0x0f), pressure & 0x7f, 0],
        }
    }

    /// Pitch bend on a zero-based channel. `value` is 14-bit, 8192 = centre.
    pub fn pitch_bend(sample_offset: u32, channel: u8, value: u16) -> Self {
        let value = value.min(16383);
        Self {
            sample_offset,
            size: 3,
            data: [
                STATUS_PITCH_BEND | (channel & 0x0f),
                (value & 0x7f) as u8,
                (value >> 7) as u8,
            ],
        }
    }

    /// Valid bytes of the message.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }

    /// Status nibble (message type without channel).
    #[inline]
    pub fn status(&self) -> u8 {
        self.data[0] & 0xf0
    }

    /// Zero-based MIDI channel.
    #[inline]
    pub fn channel(&self) -> u8 {
        self.data[0] & 0x0f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_bend_encoding() {
        let event = MidiEvent::pitch_bend(5, 3, 8192);
        assert_eq!(event.bytes(), &[0xE3, 0x00, 0x40]);
        assert_eq!(event.channel(), 3);
        assert_eq!(event.status(), STATUS_PITCH_BEND);
    }

    #[test]
    fn test_from_bytes_limits() {
        assert!(MidiEvent::from_bytes(0, &[]).is_none());
        assert!(MidiEvent::from_bytes(0, &[0x90, 60, 100, 0]).is_none());
        let event = MidiEvent::from_bytes(2, &[0xD1, 64]).unwrap();
        assert_eq!(event.bytes(), &[0xD1, 64]);
    }
}
