//! Shared test plugin for the adapter integration tests.

#![allow(dead_code)]

use polyplug_core::{
    AudioPort, ConstructionParams, Direction, MidiEvent, Parameter, ParameterEnumeration,
    ParameterEnumerationValue, ParameterHints, ParameterRanges, Plugin, PluginConfig, PortKind,
    StateEntry, PORT_GROUP_STEREO,
};
use polyplug_vst3::vst3::Steinberg::tresult;
use polyplug_vst3::{ParameterChange, Vst3Adapter, Vst3Config};

pub const CONFIG: PluginConfig = PluginConfig::new("Tone", 0x546f6e65)
    .with_audio_ports(3, 2)
    .with_latency()
    .with_midi_input();

pub const VST3_CONFIG: Vst3Config = Vst3Config::new([0; 16]).with_max_block_size(256);

// Internal parameters: buffer size, sample rate, latency, program, 16 * 130 MIDI
pub const INTERNAL_COUNT: u32 = 4 + 16 * 130;
pub const PROGRAM: u32 = 3;
pub const MIDI_BASE: u32 = 4;

pub const GAIN: u32 = INTERNAL_COUNT;
pub const METER: u32 = INTERNAL_COUNT + 1;
pub const FIRE: u32 = INTERNAL_COUNT + 2;
pub const MODE: u32 = INTERNAL_COUNT + 3;
pub const BYPASS: u32 = INTERNAL_COUNT + 4;

pub const LATENCY: u32 = 64;

/// Stereo effect with a sidechain input.
///
/// Parameters: gain, meter (output), fire (trigger, set by incoming MIDI),
/// mode (enumeration), bypass. Programs "Init" and "Loud". One state, "file".
pub struct Tone {
    pub values: [f32; 5],
    pub program: u32,
    pub file: String,
    pub received: Vec<MidiEvent>,
    pub gains_seen: Vec<f32>,
    pub sidechain_peak: f32,
}

impl Plugin for Tone {
    fn create(_params: &ConstructionParams) -> Self {
        Self {
            values: [1.0, 0.0, 0.0, 0.0, 0.0],
            program: 0,
            file: String::new(),
            received: Vec::new(),
            gains_seen: Vec::new(),
            sidechain_peak: 0.0,
        }
    }

    fn parameter_count(&self) -> u32 {
        5
    }

    fn program_count(&self) -> u32 {
        2
    }

    fn state_count(&self) -> u32 {
        1
    }

    fn init_audio_port(&mut self, direction: Direction, index: u32, port: &mut AudioPort) {
        if direction == Direction::Input {
            if index < 2 {
                port.group_id = PORT_GROUP_STEREO;
            } else {
                port.kind = PortKind::Sidechain;
            }
        }
    }

    fn init_parameter(&mut self, index: u32, parameter: &mut Parameter) {
        match index {
            0 => {
                *parameter = Parameter::new("Gain", "gain", ParameterRanges::new(1.0, 0.0, 2.0))
                    .with_unit("x")
            }
            1 => {
                *parameter = Parameter::new("Meter", "meter", ParameterRanges::new(0.0, 0.0, 1.0))
                    .with_hints(ParameterHints::OUTPUT)
            }
            2 => {
                *parameter = Parameter::new("Fire", "fire", ParameterRanges::new(0.0, 0.0, 1.0))
                    .with_hints(ParameterHints::TRIGGER)
            }
            3 => {
                *parameter = Parameter::new("Mode", "mode", ParameterRanges::new(0.0, 0.0, 2.0))
                    .with_hints(ParameterHints::AUTOMATABLE.with_integer())
                    .with_enumeration(ParameterEnumeration {
                        values: vec![
                            ParameterEnumerationValue::new(0.0, "Soft"),
                            ParameterEnumerationValue::new(1.0, "Hard"),
                            ParameterEnumerationValue::new(2.0, "Fold"),
                        ],
                        restricted_mode: true,
                    })
            }
            _ => parameter.init_bypass(),
        }
    }

    fn init_program_name(&mut self, index: u32, name: &mut String) {
        *name = if index == 0 { "Init" } else { "Loud" }.to_string();
    }

    fn init_state(&mut self, _index: u32, state: &mut StateEntry) {
        *state = StateEntry::new("file", "").with_filename();
    }

    fn parameter_value(&self, index: u32) -> f32 {
        self.values[index as usize]
    }

    fn set_parameter_value(&mut self, index: u32, value: f32) {
        self.values[index as usize] = value;
    }

    fn load_program(&mut self, index: u32) {
        self.program = index;
        self.values[0] = if index == 0 { 1.0 } else { 0.5 };
    }

    fn state_value(&self, _key: &str) -> Option<String> {
        Some(self.file.clone())
    }

    fn set_state(&mut self, _key: &str, value: &str) {
        self.file = value.to_string();
    }

    fn latency(&self) -> u32 {
        LATENCY
    }

    fn run(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: u32, midi: &[MidiEvent]) {
        let frames = frames as usize;
        let gain = self.values[0];
        self.gains_seen.push(gain);
        self.received.extend_from_slice(midi);

        let mut peak = 0.0f32;
        for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
            for i in 0..frames {
                output[i] = input[i] * gain;
                peak = peak.max(output[i].abs());
            }
        }
        self.values[1] = peak;
        self.sidechain_peak = inputs[2][..frames].iter().fold(0.0f32, |m, s| m.max(s.abs()));

        if !midi.is_empty() {
            self.values[2] = 1.0;
        }
    }
}

pub fn adapter() -> Vst3Adapter<Tone> {
    adapter_with(&VST3_CONFIG)
}

pub fn adapter_with(vst3_config: &Vst3Config) -> Vst3Adapter<Tone> {
    Vst3Adapter::new(&CONFIG, vst3_config, &ConstructionParams::new(48000.0, 128)).unwrap()
}

/// Host-side buffers, per bus then per channel.
pub struct Buffers {
    pub frames: usize,
    pub inputs: Vec<Vec<Vec<f32>>>,
    pub outputs: Vec<Vec<Vec<f32>>>,
}

impl Buffers {
    /// Stereo main input at `main`, mono sidechain at `sidechain`, stereo output.
    pub fn new(frames: usize, main: f32, sidechain: f32) -> Self {
        Self {
            frames,
            inputs: vec![vec![vec![main; frames]; 2], vec![vec![sidechain; frames]]],
            outputs: vec![vec![vec![0.0; frames]; 2]],
        }
    }

    pub fn process(
        &mut self,
        adapter: &mut Vst3Adapter<Tone>,
        changes: &[ParameterChange],
        midi: &[MidiEvent],
    ) -> tresult {
        let input_channels: Vec<Vec<&[f32]>> = self
            .inputs
            .iter()
            .map(|bus| bus.iter().map(|c| c.as_slice()).collect())
            .collect();
        let input_buses: Vec<&[&[f32]]> = input_channels.iter().map(|b| b.as_slice()).collect();

        let mut output_channels: Vec<Vec<&mut [f32]>> = self
            .outputs
            .iter_mut()
            .map(|bus| bus.iter_mut().map(|c| c.as_mut_slice()).collect())
            .collect();
        let mut output_buses: Vec<&mut [&mut [f32]]> = output_channels
            .iter_mut()
            .map(|b| b.as_mut_slice())
            .collect();

        adapter.process(self.frames, &input_buses, &mut output_buses, changes, midi)
    }
}
