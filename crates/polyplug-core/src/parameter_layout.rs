//! Flat host parameter index space.
//!
//! Some formats expose "internal" parameters that the plugin never declares:
//! buffer size, sample rate, latency, the current program and a bank of
//! per-channel MIDI controllers. [`ParameterLayout`] places those in front of
//! the plugin's own parameters and converts between the host's raw index and
//! a [`ParameterTarget`].
//!
//! # VST3 index space
//!
//! ```text
//! 0                     buffer size
//! 1                     sample rate
//! 2                     latency            (if the plugin reports latency)
//! next                  current program    (if the plugin has programs)
//! next .. +16*130       MIDI CC bank       (if the plugin wants MIDI input)
//! internal count ..     plugin parameters
//! ```
//!
//! Within the MIDI bank, slot `channel * 130 + controller` holds controllers
//! 0-127, followed by channel pressure (128) and pitch bend (129).

use crate::config::PluginConfig;
use crate::error::{PluginError, PluginResult};
use crate::parameter::Parameter;
use crate::types::{ParameterIndex, RawIndex};

/// Number of MIDI channels with emulated controller parameters.
pub const MIDI_CHANNELS: u32 = 16;

/// Controller slots per channel: 128 CCs + channel pressure + pitch bend.
pub const MIDI_CONTROLLERS_PER_CHANNEL: u32 = 130;

/// Controller slot used for channel pressure.
pub const MIDI_CC_CHANNEL_PRESSURE: u8 = 128;

/// Controller slot used for pitch bend.
pub const MIDI_CC_PITCH_BEND: u8 = 129;

/// Total number of emulated MIDI controller parameters.
pub const MIDI_CC_PARAMETER_COUNT: u32 = MIDI_CHANNELS * MIDI_CONTROLLERS_PER_CHANNEL;

/// Export format whose index space is being laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// No internal parameters; raw index equals plugin index.
    Plain,
    /// VST3-style internal parameters (see module docs).
    Vst3,
}

/// Host-protocol maxima used to normalize internal parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InternalMaxima {
    pub buffer_size: u32,
    pub sample_rate: f64,
    pub latency: u32,
}

impl InternalMaxima {
    /// VST3 maxima.
    pub const VST3: Self = Self {
        buffer_size: 32768,
        sample_rate: 384000.0,
        latency: 384000 * 10,
    };
}

impl Default for InternalMaxima {
    fn default() -> Self {
        Self::VST3
    }
}

/// What an emulated MIDI controller slot sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiCcKind {
    /// Ordinary controller 0-127.
    Normal(u8),
    ChannelPressure,
    PitchBend,
}

/// One emulated MIDI controller: zero-based channel plus controller slot
/// (0-127 CC, 128 channel pressure, 129 pitch bend).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiCcSlot {
    pub channel: u8,
    pub controller: u8,
}

impl MidiCcSlot {
    #[inline]
    pub fn kind(&self) -> MidiCcKind {
        match self.controller {
            MIDI_CC_CHANNEL_PRESSURE => MidiCcKind::ChannelPressure,
            MIDI_CC_PITCH_BEND => MidiCcKind::PitchBend,
            cc => MidiCcKind::Normal(cc),
        }
    }

    /// Largest plain value the slot carries.
    #[inline]
    pub fn max_value(&self) -> f64 {
        match self.kind() {
            MidiCcKind::PitchBend => 16383.0,
            _ => 127.0,
        }
    }
}

/// A format-internal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalSlot {
    BufferSize,
    SampleRate,
    Latency,
    Program,
    Midi(MidiCcSlot),
}

/// What a raw host index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterTarget {
    Internal(InternalSlot),
    Plugin(ParameterIndex),
}

/// Layout of one format's flat parameter index space.
///
/// Computed once from static plugin configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterLayout {
    format: ExportFormat,
    internal_count: u32,
    parameter_count: u32,
    program_count: u32,
    latency_index: Option<RawIndex>,
    program_index: Option<RawIndex>,
    midi_base: Option<RawIndex>,
    maxima: InternalMaxima,
}

impl ParameterLayout {
    pub fn new(
        format: ExportFormat,
        config: &PluginConfig,
        program_count: u32,
        parameter_count: u32,
    ) -> Self {
        let mut layout = Self {
            format,
            internal_count: 0,
            parameter_count,
            program_count,
            latency_index: None,
            program_index: None,
            midi_base: None,
            maxima: InternalMaxima::default(),
        };

        if format == ExportFormat::Vst3 {
            // Buffer size and sample rate are always present
            let mut next = 2;
            if config.wants_latency {
                layout.latency_index = Some(next);
                next += 1;
            }
            if program_count > 0 {
                layout.program_index = Some(next);
                next += 1;
            }
            if config.wants_midi_input {
                layout.midi_base = Some(next);
                next += MIDI_CC_PARAMETER_COUNT;
            }
            layout.internal_count = next;
        }

        layout
    }

    /// Replace the internal parameter maxima.
    pub fn with_maxima(mut self, maxima: InternalMaxima) -> Self {
        self.maxima = maxima;
        self
    }

    #[inline]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    #[inline]
    pub fn maxima(&self) -> InternalMaxima {
        self.maxima
    }

    /// Number of internal parameters in front of the plugin's own.
    #[inline]
    pub fn internal_parameter_count(&self) -> u32 {
        self.internal_count
    }

    #[inline]
    pub fn parameter_count(&self) -> u32 {
        self.parameter_count
    }

    #[inline]
    pub fn program_count(&self) -> u32 {
        self.program_count
    }

    /// Size of the whole raw index space.
    #[inline]
    pub fn total_count(&self) -> u32 {
        self.internal_count + self.parameter_count
    }

    /// Raw index of a plugin parameter.
    pub fn to_raw_index(&self, index: ParameterIndex) -> PluginResult<RawIndex> {
        if index >= self.parameter_count {
            return Err(PluginError::invalid_argument(format!(
                "parameter index {} out of range ({} parameters)",
                index, self.parameter_count
            )));
        }
        Ok(index + self.internal_count)
    }

    /// Classify a raw host index.
    pub fn from_raw_index(&self, raw: RawIndex) -> PluginResult<ParameterTarget> {
        self.classify(raw).ok_or_else(|| {
            PluginError::invalid_argument(format!(
                "raw parameter index {} out of range ({} total)",
                raw,
                self.total_count()
            ))
        })
    }

    /// Like [`from_raw_index`](Self::from_raw_index), without building an
    /// error. Safe to call on the audio thread.
    pub fn classify(&self, raw: RawIndex) -> Option<ParameterTarget> {
        if raw >= self.total_count() {
            return None;
        }
        if raw >= self.internal_count {
            return Some(ParameterTarget::Plugin(raw - self.internal_count));
        }

        let slot = match raw {
            0 => InternalSlot::BufferSize,
            1 => InternalSlot::SampleRate,
            _ if Some(raw) == self.latency_index => InternalSlot::Latency,
            _ if Some(raw) == self.program_index => InternalSlot::Program,
            _ => {
                let base = self.midi_base.filter(|&base| raw >= base)?;
                let offset = raw - base;
                InternalSlot::Midi(MidiCcSlot {
                    channel: (offset / MIDI_CONTROLLERS_PER_CHANNEL) as u8,
                    controller: (offset % MIDI_CONTROLLERS_PER_CHANNEL) as u8,
                })
            }
        };
        Some(ParameterTarget::Internal(slot))
    }

    /// Raw index of an internal slot, if this layout has it.
    pub fn internal_raw_index(&self, slot: InternalSlot) -> Option<RawIndex> {
        if self.format != ExportFormat::Vst3 {
            return None;
        }
        match slot {
            InternalSlot::BufferSize => Some(0),
            InternalSlot::SampleRate => Some(1),
            InternalSlot::Latency => self.latency_index,
            InternalSlot::Program => self.program_index,
            InternalSlot::Midi(cc) => self.midi_cc_raw_index(cc.channel, cc.controller).ok(),
        }
    }

    /// Raw index of the emulated controller for a zero-based `channel` and
    /// controller slot (0-127 CC, 128 pressure, 129 pitch bend).
    pub fn midi_cc_raw_index(&self, channel: u8, controller: u8) -> PluginResult<RawIndex> {
        let base = self
            .midi_base
            .ok_or_else(|| PluginError::invalid_argument("layout has no MIDI controller bank"))?;
        if channel as u32 >= MIDI_CHANNELS || controller as u32 >= MIDI_CONTROLLERS_PER_CHANNEL {
            return Err(PluginError::invalid_argument(format!(
                "MIDI controller {} on channel {} out of range",
                controller, channel
            )));
        }
        Ok(base + channel as u32 * MIDI_CONTROLLERS_PER_CHANNEL + controller as u32)
    }

    // =========================================================================
    // Value conversion
    // =========================================================================

    /// Convert a normalized value to plain for an internal slot.
    ///
    /// Linear against the format maxima; no rounding is applied here.
    pub fn internal_to_plain(&self, slot: InternalSlot, normalized: f64) -> f64 {
        let normalized = normalized.clamp(0.0, 1.0);
        normalized * self.internal_max(slot)
    }

    /// Convert a plain value to normalized for an internal slot.
    pub fn internal_to_normalized(&self, slot: InternalSlot, plain: f64) -> f64 {
        let max = self.internal_max(slot);
        if max <= 0.0 {
            return 0.0;
        }
        (plain / max).clamp(0.0, 1.0)
    }

    fn internal_max(&self, slot: InternalSlot) -> f64 {
        match slot {
            InternalSlot::BufferSize => self.maxima.buffer_size as f64,
            InternalSlot::SampleRate => self.maxima.sample_rate,
            InternalSlot::Latency => self.maxima.latency as f64,
            InternalSlot::Program => self.program_count.saturating_sub(1) as f64,
            InternalSlot::Midi(cc) => cc.max_value(),
        }
    }

    /// Number of discrete steps of an internal slot.
    pub fn internal_step_count(&self, slot: InternalSlot) -> u32 {
        match slot {
            InternalSlot::BufferSize => self.maxima.buffer_size,
            InternalSlot::SampleRate => 0,
            InternalSlot::Latency => self.maxima.latency,
            InternalSlot::Program => self.program_count.saturating_sub(1),
            InternalSlot::Midi(cc) => cc.max_value() as u32,
        }
    }

    /// Convert a normalized value to plain for any raw index.
    pub fn normalized_to_plain(
        &self,
        raw: RawIndex,
        normalized: f64,
        parameters: &[Parameter],
    ) -> PluginResult<f64> {
        match self.from_raw_index(raw)? {
            ParameterTarget::Internal(slot) => Ok(self.internal_to_plain(slot, normalized)),
            ParameterTarget::Plugin(index) => {
                let parameter = lookup(parameters, index)?;
                Ok(parameter_to_plain(parameter, normalized))
            }
        }
    }

    /// Convert a plain value to normalized for any raw index.
    pub fn plain_to_normalized(
        &self,
        raw: RawIndex,
        plain: f64,
        parameters: &[Parameter],
    ) -> PluginResult<f64> {
        match self.from_raw_index(raw)? {
            ParameterTarget::Internal(slot) => Ok(self.internal_to_normalized(slot, plain)),
            ParameterTarget::Plugin(index) => {
                let parameter = lookup(parameters, index)?;
                Ok(parameter_to_normalized(parameter, plain))
            }
        }
    }
}

fn lookup(parameters: &[Parameter], index: ParameterIndex) -> PluginResult<&Parameter> {
    parameters.get(index as usize).ok_or_else(|| {
        PluginError::invalid_argument(format!("no parameter at index {}", index))
    })
}

/// Normalized to plain for a plugin parameter.
///
/// Boolean parameters snap to `min` or `max` around the midpoint, integer
/// parameters round to the nearest whole number.
pub fn parameter_to_plain(parameter: &Parameter, normalized: f64) -> f64 {
    let ranges = &parameter.ranges;
    if parameter.hints.boolean {
        return if normalized > 0.5 {
            ranges.max as f64
        } else {
            ranges.min as f64
        };
    }
    let plain = ranges.unnormalized_value_f64(normalized);
    if parameter.hints.integer {
        plain.round()
    } else {
        plain
    }
}

/// Plain to normalized for a plugin parameter.
pub fn parameter_to_normalized(parameter: &Parameter, plain: f64) -> f64 {
    let ranges = &parameter.ranges;
    if parameter.hints.boolean {
        let midpoint = (ranges.min as f64 + ranges.max as f64) * 0.5;
        return if plain > midpoint { 1.0 } else { 0.0 };
    }
    let plain = if parameter.hints.integer {
        plain.round()
    } else {
        plain
    };
    ranges.normalized_value_f64(plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::{ParameterHints, ParameterRanges};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const FULL: PluginConfig = PluginConfig::new("Full", 1)
        .with_latency()
        .with_midi_input();

    fn full_layout() -> ParameterLayout {
        ParameterLayout::new(ExportFormat::Vst3, &FULL, 4, 10)
    }

    #[test]
    fn test_internal_counts() {
        assert_eq!(full_layout().internal_parameter_count(), 4 + MIDI_CC_PARAMETER_COUNT);

        let bare = PluginConfig::new("Bare", 2);
        assert_eq!(
            ParameterLayout::new(ExportFormat::Vst3, &bare, 0, 3).internal_parameter_count(),
            2
        );
        assert_eq!(
            ParameterLayout::new(ExportFormat::Plain, &FULL, 4, 3).internal_parameter_count(),
            0
        );
    }

    #[test]
    fn test_slot_order() {
        let layout = full_layout();
        let slots: Vec<_> = (0..4).map(|i| layout.from_raw_index(i).unwrap()).collect();
        assert_eq!(
            slots,
            vec![
                ParameterTarget::Internal(InternalSlot::BufferSize),
                ParameterTarget::Internal(InternalSlot::SampleRate),
                ParameterTarget::Internal(InternalSlot::Latency),
                ParameterTarget::Internal(InternalSlot::Program),
            ]
        );
    }

    #[test]
    fn test_program_slot_without_latency() {
        let config = PluginConfig::new("P", 3);
        let layout = ParameterLayout::new(ExportFormat::Vst3, &config, 8, 1);
        assert_eq!(
            layout.from_raw_index(2).unwrap(),
            ParameterTarget::Internal(InternalSlot::Program)
        );
        assert_eq!(layout.from_raw_index(3).unwrap(), ParameterTarget::Plugin(0));
        assert_eq!(layout.internal_step_count(InternalSlot::Program), 7);
    }

    #[test]
    fn test_sustain_pedal_channel_two() {
        let layout = full_layout();
        let raw = layout.midi_cc_raw_index(1, 64).unwrap();
        assert_eq!(raw, 4 + MIDI_CONTROLLERS_PER_CHANNEL + 64);

        let target = layout.from_raw_index(raw).unwrap();
        let ParameterTarget::Internal(InternalSlot::Midi(slot)) = target else {
            panic!("expected MIDI slot, got {:?}", target);
        };
        assert_eq!(slot.kind(), MidiCcKind::Normal(64));
        assert_eq!((slot.channel, slot.controller), (1, 64));
        assert_eq!(layout.internal_raw_index(InternalSlot::Midi(slot)), Some(raw));
    }

    #[test]
    fn test_pressure_and_pitch_bend_slots() {
        let layout = full_layout();
        let pressure = layout.midi_cc_raw_index(0, 128).unwrap();
        let bend = layout.midi_cc_raw_index(15, 129).unwrap();
        assert_eq!(bend, layout.internal_parameter_count() - 1);

        let ParameterTarget::Internal(InternalSlot::Midi(slot)) =
            layout.from_raw_index(pressure).unwrap()
        else {
            panic!("expected MIDI slot");
        };
        assert_eq!(slot.kind(), MidiCcKind::ChannelPressure);

        let ParameterTarget::Internal(InternalSlot::Midi(slot)) =
            layout.from_raw_index(bend).unwrap()
        else {
            panic!("expected MIDI slot");
        };
        assert_eq!(slot.kind(), MidiCcKind::PitchBend);
        assert_relative_eq!(layout.internal_to_plain(InternalSlot::Midi(slot), 0.5), 8191.5);
    }

    #[test]
    fn test_midi_bounds_checked() {
        let layout = full_layout();
        assert!(layout.midi_cc_raw_index(16, 0).is_err());
        assert!(layout.midi_cc_raw_index(0, 130).is_err());

        let no_midi = ParameterLayout::new(ExportFormat::Vst3, &PluginConfig::new("N", 4), 0, 1);
        assert!(no_midi.midi_cc_raw_index(0, 1).is_err());
    }

    #[test]
    fn test_out_of_range() {
        let layout = full_layout();
        assert!(layout.from_raw_index(layout.total_count()).is_err());
        assert_eq!(layout.classify(layout.total_count()), None);
        assert_eq!(
            layout.classify(layout.total_count() - 1),
            Some(ParameterTarget::Plugin(9))
        );
        assert!(layout.to_raw_index(10).is_err());
        assert!(layout.to_raw_index(9).is_ok());
    }

    #[test]
    fn test_boolean_snaps() {
        let parameter = Parameter::new("On", "on", ParameterRanges::new(0.0, 0.0, 1.0))
            .with_hints(ParameterHints::AUTOMATABLE.with_boolean());
        assert_eq!(parameter_to_plain(&parameter, 0.5), 0.0);
        assert_eq!(parameter_to_plain(&parameter, 0.51), 1.0);
        assert_eq!(parameter_to_plain(&parameter, 1.0), 1.0);
        assert_eq!(parameter_to_normalized(&parameter, 1.0), 1.0);
        assert_eq!(parameter_to_normalized(&parameter, 0.0), 0.0);
    }

    #[test]
    fn test_internal_maxima() {
        let layout = full_layout();
        assert_relative_eq!(layout.internal_to_plain(InternalSlot::BufferSize, 1.0), 32768.0);
        assert_relative_eq!(
            layout.internal_to_normalized(InternalSlot::SampleRate, 48000.0),
            0.125
        );
        assert_relative_eq!(layout.internal_to_plain(InternalSlot::Program, 1.0), 3.0);

        let custom = layout.with_maxima(InternalMaxima {
            buffer_size: 4096,
            ..InternalMaxima::VST3
        });
        assert_relative_eq!(custom.internal_to_plain(InternalSlot::BufferSize, 0.5), 2048.0);
    }

    fn gain() -> Parameter {
        Parameter::new("Gain", "gain", ParameterRanges::new(0.0, -60.0, 12.0))
    }

    fn steps() -> Parameter {
        Parameter::new("Steps", "steps", ParameterRanges::new(4.0, 1.0, 16.0))
            .with_hints(ParameterHints::AUTOMATABLE.with_integer())
    }

    proptest! {
        #[test]
        fn prop_raw_index_round_trip(index in 0u32..10) {
            let layout = full_layout();
            let raw = layout.to_raw_index(index).unwrap();
            prop_assert_eq!(layout.from_raw_index(raw).unwrap(), ParameterTarget::Plugin(index));
        }

        #[test]
        fn prop_internal_never_plugin(raw in 0u32..(4 + MIDI_CC_PARAMETER_COUNT)) {
            let layout = full_layout();
            let is_internal = matches!(layout.from_raw_index(raw), Ok(ParameterTarget::Internal(_)));
            prop_assert!(is_internal);
        }

        #[test]
        fn prop_midi_slot_round_trip(channel in 0u8..16, controller in 0u8..130) {
            let layout = full_layout();
            let raw = layout.midi_cc_raw_index(channel, controller).unwrap();
            prop_assert_eq!(
                layout.from_raw_index(raw).unwrap(),
                ParameterTarget::Internal(InternalSlot::Midi(MidiCcSlot { channel, controller }))
            );
        }

        #[test]
        fn prop_internal_normalized_round_trip(normalized in 0.0f64..=1.0, raw in 0u32..4) {
            let layout = full_layout();
            let ParameterTarget::Internal(slot) = layout.from_raw_index(raw).unwrap() else {
                unreachable!()
            };
            let plain = layout.internal_to_plain(slot, normalized);
            prop_assert!((layout.internal_to_normalized(slot, plain) - normalized).abs() < 1e-9);
        }

        #[test]
        fn prop_float_parameter_round_trip(normalized in 0.0f64..=1.0) {
            let parameter = gain();
            let plain = parameter_to_plain(&parameter, normalized);
            prop_assert!((parameter_to_normalized(&parameter, plain) - normalized).abs() < 1e-9);
        }

        #[test]
        fn prop_integer_parameter_stable(normalized in 0.0f64..=1.0) {
            let parameter = steps();
            let plain = parameter_to_plain(&parameter, normalized);
            prop_assert_eq!(plain, plain.round());
            let again = parameter_to_plain(&parameter, parameter_to_normalized(&parameter, plain));
            prop_assert_eq!(again, plain);
        }

        #[test]
        fn prop_boolean_idempotent(normalized in 0.0f64..=1.0) {
            let parameter = Parameter::new("On", "on", ParameterRanges::new(0.0, -1.0, 3.0))
                .with_hints(ParameterHints::AUTOMATABLE.with_boolean());
            let plain = parameter_to_plain(&parameter, normalized);
            let expected = if normalized > 0.5 { 3.0 } else { -1.0 };
            prop_assert_eq!(plain, expected);
            let again = parameter_to_plain(&parameter, parameter_to_normalized(&parameter, plain));
            prop_assert_eq!(again, plain);
        }
    }
}
