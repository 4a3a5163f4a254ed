//! Speaker arrangement bit masks.
//!
//! Each bit names one speaker position; a bus's arrangement is the union of
//! its speakers. Bit values are the VST3 ones so adapters can pass masks
//! through unchanged.

use crate::error::{PluginError, PluginResult};
use crate::types::{PORT_GROUP_MONO, PORT_GROUP_STEREO};

/// Bit mask of speaker positions.
pub type SpeakerArrangement = u64;

pub const SPEAKER_L: SpeakerArrangement = 1 << 0;
pub const SPEAKER_R: SpeakerArrangement = 1 << 1;
pub const SPEAKER_C: SpeakerArrangement = 1 << 2;
pub const SPEAKER_LFE: SpeakerArrangement = 1 << 3;
pub const SPEAKER_LS: SpeakerArrangement = 1 << 4;
pub const SPEAKER_RS: SpeakerArrangement = 1 << 5;
pub const SPEAKER_LC: SpeakerArrangement = 1 << 6;
pub const SPEAKER_RC: SpeakerArrangement = 1 << 7;
pub const SPEAKER_CS: SpeakerArrangement = 1 << 8;
pub const SPEAKER_SL: SpeakerArrangement = 1 << 9;
pub const SPEAKER_SR: SpeakerArrangement = 1 << 10;
pub const SPEAKER_M: SpeakerArrangement = 1 << 19;

pub const ARR_EMPTY: SpeakerArrangement = 0;
pub const ARR_MONO: SpeakerArrangement = SPEAKER_M;
pub const ARR_STEREO: SpeakerArrangement = SPEAKER_L | SPEAKER_R;
pub const ARR_30_CINE: SpeakerArrangement = SPEAKER_L | SPEAKER_R | SPEAKER_C;
pub const ARR_40_MUSIC: SpeakerArrangement = SPEAKER_L | SPEAKER_R | SPEAKER_LS | SPEAKER_RS;
pub const ARR_50: SpeakerArrangement = ARR_30_CINE | SPEAKER_LS | SPEAKER_RS;
pub const ARR_60_CINE: SpeakerArrangement = ARR_50 | SPEAKER_CS;
pub const ARR_70_CINE: SpeakerArrangement = ARR_50 | SPEAKER_LC | SPEAKER_RC;
pub const ARR_80_CINE: SpeakerArrangement = ARR_70_CINE | SPEAKER_CS;
pub const ARR_81_CINE: SpeakerArrangement = ARR_80_CINE | SPEAKER_LFE;
pub const ARR_100_CINE: SpeakerArrangement = ARR_80_CINE | SPEAKER_SL | SPEAKER_SR;
pub const ARR_101_CINE: SpeakerArrangement = ARR_100_CINE | SPEAKER_LFE;

/// Standard layouts indexed by `channel_count - 1`.
const LAYOUTS: [SpeakerArrangement; 11] = [
    ARR_MONO,
    ARR_STEREO,
    ARR_30_CINE,
    ARR_40_MUSIC,
    ARR_50,
    ARR_60_CINE,
    ARR_70_CINE,
    ARR_80_CINE,
    ARR_81_CINE,
    ARR_100_CINE,
    ARR_101_CINE,
];

/// Standard layout for a channel count.
///
/// Only 1 to 11 channels have a layout; anything else is an
/// [`UnsupportedConfiguration`](PluginError::UnsupportedConfiguration).
pub fn arrangement_for_channels(channel_count: u32) -> PluginResult<SpeakerArrangement> {
    match channel_count {
        1..=11 => Ok(LAYOUTS[channel_count as usize - 1]),
        _ => Err(PluginError::UnsupportedConfiguration(format!(
            "no speaker layout for {} channels",
            channel_count
        ))),
    }
}

/// Layout of a group bus.
///
/// The reserved mono and stereo groups have fixed masks and must hold
/// exactly one and two ports; other groups use the channel count table.
pub fn arrangement_for_group(
    group_id: u32,
    channel_count: u32,
) -> PluginResult<SpeakerArrangement> {
    let (expected, mask) = match group_id {
        PORT_GROUP_MONO => (1, ARR_MONO),
        PORT_GROUP_STEREO => (2, ARR_STEREO),
        _ => return arrangement_for_channels(channel_count),
    };
    if channel_count != expected {
        return Err(PluginError::UnsupportedConfiguration(format!(
            "reserved group {:#x} holds {} ports, expected {}",
            group_id, channel_count, expected
        )));
    }
    Ok(mask)
}

/// Number of speakers in an arrangement.
#[inline]
pub fn channel_count(arrangement: SpeakerArrangement) -> u32 {
    arrangement.count_ones()
}
