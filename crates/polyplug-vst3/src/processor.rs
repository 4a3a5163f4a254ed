//! VST3-style processor/controller adapter.
//!
//! [`Vst3Adapter`] implements the host-facing side of the combined
//! component pattern (processor and controller in one object) on top of a
//! [`PluginInstance`]. Every method takes safe Rust arguments and returns a
//! VST3 result code; the COM vtables that would forward raw host pointers
//! into these methods are not part of this crate.
//!
//! ```text
//! User Plugin (implements polyplug_core::Plugin)
//!        ↓
//! PluginInstance<P> (descriptor, buses, programs, states)
//!        ↓
//! Vst3Adapter<P> (this wrapper: index layout, result codes, bus info)
//!        ↓
//! host
//! ```
//!
//! # Parameter ids
//!
//! The raw parameter id the host sees is the [`ParameterLayout`] raw index:
//! internal parameters (buffer size, sample rate, latency, program, MIDI
//! controllers) come first, plugin parameters follow.

use std::io::{Read, Write};
use std::sync::Arc;

use log::{debug, warn};
use rtrb::{Consumer, Producer, RingBuffer};
use vst3::{Steinberg::Vst::*, Steinberg::*};

use polyplug_core::parameter_layout::MIDI_CC_PITCH_BEND;
use polyplug_core::{
    parameter_to_normalized, parameter_to_plain, AppliedState, ConstructionParams, Direction,
    ExportFormat, InternalSlot, MidiCcKind, MidiCcSlot, MidiEvent, Parameter, ParameterLayout,
    ParameterTarget, Plugin, PluginConfig, PluginError, PluginInstance, PluginResult, MAX_BUSES,
    MAX_CHANNELS, MIDI_CC_PARAMETER_COUNT, MIDI_CONTROLLERS_PER_CHANNEL,
};

use crate::editor::{
    AttributeValue, ChangedValues, EditorMessage, MSG_CLOSE, MSG_IDLE, MSG_INIT, MSG_MIDI,
    MSG_PARAMETER_SET, MSG_READY, MSG_STATE_SET,
};
use crate::result::{error_code, report, to_tresult};
use crate::util::{copy_wstring, wstring_to_string};
use crate::wrapper::Vst3Config;

/// Maximum number of audio ports per direction the adapter can route.
pub const MAX_PORTS: usize = MAX_BUSES * MAX_CHANNELS;

/// A single host parameter change.
///
/// Used for both directions: changes the host queues for a block, and
/// output/trigger values the adapter reports back after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterChange {
    /// Raw parameter id.
    pub id: u32,
    /// Frame offset within the block.
    pub sample_offset: i32,
    /// Normalized value.
    pub value: f64,
}

impl ParameterChange {
    pub fn new(id: u32, sample_offset: i32, value: f64) -> Self {
        Self {
            id,
            sample_offset,
            value,
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Host-facing adapter for one plugin instance.
pub struct Vst3Adapter<P: Plugin> {
    instance: PluginInstance<P>,
    layout: ParameterLayout,
    config: Vst3Config,

    /// Block size the scratch buffers are sized for.
    max_block_size: usize,

    /// Last value seen per plugin parameter, for output change detection.
    last_values: Vec<f32>,
    /// Values the editor has not picked up yet, per plugin parameter.
    changed: Arc<ChangedValues>,
    /// State changes the editor has not picked up yet.
    pending_states: Vec<(String, String)>,
    /// Normalized value of each emulated MIDI controller.
    midi_cc_values: Vec<f64>,

    editor_midi_in: Producer<MidiEvent>,
    editor_midi_out: Consumer<MidiEvent>,
    midi_scratch: Vec<MidiEvent>,

    zero_buffer: Vec<f32>,
    scratch_outputs: Vec<Vec<f32>>,

    output_changes: Vec<ParameterChange>,
    host_edits: Vec<ParameterChange>,
    outbox: Vec<EditorMessage>,
    editor_connected: bool,
    last_latency: u32,
    rejected_changes: usize,
}

impl<P: Plugin> Vst3Adapter<P> {
    /// Create the plugin instance and everything the adapter caches about it.
    pub fn new(
        config: &PluginConfig,
        vst3_config: &Vst3Config,
        params: &ConstructionParams,
    ) -> PluginResult<Self> {
        let instance = PluginInstance::<P>::new(config, params)?;
        let descriptor = instance.descriptor();

        for direction in [Direction::Input, Direction::Output] {
            let count = descriptor.ports(direction).len();
            if count > MAX_PORTS {
                return Err(PluginError::UnsupportedConfiguration(format!(
                    "{} {:?} ports, but at most {} can be routed",
                    count, direction, MAX_PORTS
                )));
            }
        }

        let parameter_count = descriptor.parameter_count();
        let layout = ParameterLayout::new(
            ExportFormat::Vst3,
            config,
            descriptor.program_count(),
            parameter_count,
        )
        .with_maxima(vst3_config.maxima);

        let last_values = (0..parameter_count)
            .map(|index| instance.plugin().parameter_value(index))
            .collect();

        let midi_cc_values = if config.wants_midi_input {
            (0..MIDI_CC_PARAMETER_COUNT)
                .map(|slot| {
                    if slot % MIDI_CONTROLLERS_PER_CHANNEL == MIDI_CC_PITCH_BEND as u32 {
                        0.5
                    } else {
                        0.0
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        let (editor_midi_in, editor_midi_out) =
            RingBuffer::<MidiEvent>::new(vst3_config.midi_queue_capacity);

        let mut adapter = Self {
            layout,
            config: *vst3_config,
            max_block_size: 0,
            last_values,
            changed: Arc::new(ChangedValues::new(parameter_count as usize)),
            pending_states: Vec::new(),
            midi_cc_values,
            editor_midi_in,
            editor_midi_out,
            midi_scratch: Vec::with_capacity(vst3_config.max_midi_events),
            zero_buffer: Vec::new(),
            scratch_outputs: Vec::new(),
            output_changes: Vec::with_capacity(parameter_count as usize + 1),
            host_edits: Vec::new(),
            outbox: Vec::new(),
            editor_connected: false,
            last_latency: 0,
            rejected_changes: 0,
            instance,
        };
        adapter.allocate_buffers(vst3_config.max_block_size);
        Ok(adapter)
    }

    fn allocate_buffers(&mut self, max_block_size: usize) {
        let outputs = self.instance.descriptor().ports(Direction::Output).len();
        self.zero_buffer = vec![0.0; max_block_size];
        self.scratch_outputs = (0..outputs).map(|_| vec![0.0; max_block_size]).collect();
        self.max_block_size = max_block_size;
    }

    #[inline]
    pub fn instance(&self) -> &PluginInstance<P> {
        &self.instance
    }

    #[inline]
    pub fn instance_mut(&mut self) -> &mut PluginInstance<P> {
        &mut self.instance
    }

    #[inline]
    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    /// Shared handle to the values waiting for the editor.
    pub fn changed_values(&self) -> Arc<ChangedValues> {
        Arc::clone(&self.changed)
    }

    fn plugin_parameter(&self, index: u32) -> PluginResult<&Parameter> {
        self.instance.descriptor().parameter(index).ok_or_else(|| {
            PluginError::invalid_argument(format!("parameter index {} out of range", index))
        })
    }

    fn midi_cc_offset(slot: MidiCcSlot) -> usize {
        slot.channel as usize * MIDI_CONTROLLERS_PER_CHANNEL as usize + slot.controller as usize
    }

    // =========================================================================
    // Component: buses, activation, state
    // =========================================================================

    pub fn get_bus_count(&self, media_type: MediaType, dir: BusDirection) -> i32 {
        let config = &self.instance.descriptor().config;
        match media_type as MediaTypes {
            MediaTypes_::kAudio => match bus_direction(dir) {
                Some(direction) => self.instance.bus_layout(direction).bus_count() as i32,
                None => 0,
            },
            MediaTypes_::kEvent => match bus_direction(dir) {
                Some(Direction::Input) if config.wants_midi_input => 1,
                Some(Direction::Output) if config.wants_midi_output => 1,
                _ => 0,
            },
            _ => 0,
        }
    }

    pub fn get_bus_info(
        &self,
        media_type: MediaType,
        dir: BusDirection,
        index: i32,
        info: &mut BusInfo,
    ) -> tresult {
        let Some(direction) = bus_direction(dir) else {
            return kInvalidArgument;
        };
        if index < 0 {
            return kInvalidArgument;
        }

        match media_type as MediaTypes {
            MediaTypes_::kAudio => {
                let Some(bus) = self.instance.bus_layout(direction).bus(index as usize) else {
                    return kInvalidArgument;
                };
                info.mediaType = MediaTypes_::kAudio as MediaType;
                info.direction = dir;
                info.channelCount = bus.channel_count as i32;
                copy_wstring(&bus.name, &mut info.name);
                info.busType = if bus.is_main() {
                    BusTypes_::kMain
                } else {
                    BusTypes_::kAux
                } as BusType;
                info.flags = bus.flags(BusInfo_::BusFlags_::kDefaultActive as u32);
                kResultOk
            }
            MediaTypes_::kEvent => {
                if index != 0 || self.get_bus_count(media_type, dir) == 0 {
                    return kInvalidArgument;
                }
                info.mediaType = MediaTypes_::kEvent as MediaType;
                info.direction = dir;
                info.channelCount = 1;
                let name = if direction.is_input() { "MIDI In" } else { "MIDI Out" };
                copy_wstring(name, &mut info.name);
                info.busType = BusTypes_::kMain as BusType;
                info.flags = BusInfo_::BusFlags_::kDefaultActive as u32;
                kResultOk
            }
            _ => kInvalidArgument,
        }
    }

    pub fn activate_bus(
        &mut self,
        media_type: MediaType,
        dir: BusDirection,
        index: i32,
        state: TBool,
    ) -> tresult {
        let Some(direction) = bus_direction(dir) else {
            return kInvalidArgument;
        };
        if index < 0 {
            return kInvalidArgument;
        }
        match media_type as MediaTypes {
            MediaTypes_::kAudio => {
                let result = self
                    .instance
                    .bus_layout_mut(direction)
                    .activate_bus(index as usize, state != 0);
                if let Err(err) = &result {
                    warn!("activate_bus({:?}, {}) rejected: {}", direction, index, err);
                }
                to_tresult(&result)
            }
            MediaTypes_::kEvent if index == 0 && self.get_bus_count(media_type, dir) > 0 => {
                kResultOk
            }
            _ => kInvalidArgument,
        }
    }

    pub fn set_active(&mut self, state: TBool) -> tresult {
        if state != 0 {
            self.instance.activate();
            self.last_latency = self.instance.latency();
            debug!("Activated, latency {} samples", self.last_latency);
        } else {
            self.instance.deactivate();
        }
        kResultOk
    }

    /// Write the persisted state to a host stream.
    pub fn get_state<W: Write>(&self, stream: &mut W) -> tresult {
        report("get_state", self.instance.write_state(stream))
    }

    /// Load persisted state from a host stream.
    ///
    /// On failure nothing is changed and the error is logged.
    pub fn set_state<R: Read>(&mut self, stream: &mut R) -> tresult {
        match self.instance.read_state(stream) {
            Ok(applied) => {
                self.after_state_load(applied);
                kResultOk
            }
            Err(err) => report::<()>("set_state", Err(err)),
        }
    }

    fn after_state_load(&mut self, applied: AppliedState) {
        debug!(
            "Applied state: program {:?}, {} states, {} parameters",
            applied.program,
            applied.states.len(),
            applied.parameters.len()
        );
        if applied.program.is_some() {
            self.refresh_parameters();
        }
        for (index, value) in applied.parameters {
            let slot = index as usize;
            if self.last_values[slot] != value {
                self.last_values[slot] = value;
                self.changed.set(slot, value as f64);
            }
        }
        self.pending_states.extend(applied.states);
    }

    /// Pick up parameter values changed on the plugin side, e.g. by a
    /// program load.
    fn refresh_parameters(&mut self) {
        for index in 0..self.instance.descriptor().parameter_count() {
            let value = self.instance.plugin().parameter_value(index);
            if value != self.last_values[index as usize] {
                self.last_values[index as usize] = value;
                self.changed.set(index as usize, value as f64);
            }
        }
    }

    // =========================================================================
    // Audio processor
    // =========================================================================

    /// Accept a host arrangement request only if every bus of both
    /// directions matches its computed arrangement.
    pub fn set_bus_arrangements(
        &mut self,
        inputs: &[SpeakerArrangement],
        outputs: &[SpeakerArrangement],
    ) -> tresult {
        let checked = self
            .instance
            .bus_layout(Direction::Input)
            .check_arrangements(inputs)
            .and_then(|_| {
                self.instance
                    .bus_layout(Direction::Output)
                    .check_arrangements(outputs)
            });
        if let Err(err) = checked {
            debug!("Rejecting bus arrangement: {}", err);
            return kResultFalse;
        }

        for (direction, requested) in [(Direction::Input, inputs), (Direction::Output, outputs)] {
            if let Err(err) = self
                .instance
                .bus_layout_mut(direction)
                .set_arrangements(requested)
            {
                return error_code(&err);
            }
        }
        debug!(
            "Accepted bus arrangement: {} inputs, {} outputs",
            inputs.len(),
            outputs.len()
        );
        kResultTrue
    }

    pub fn get_bus_arrangement(
        &self,
        dir: BusDirection,
        index: i32,
        arrangement: &mut SpeakerArrangement,
    ) -> tresult {
        let Some(direction) = bus_direction(dir) else {
            return kInvalidArgument;
        };
        if index < 0 {
            return kInvalidArgument;
        }
        match self.instance.bus_layout(direction).arrangement(index as usize) {
            Ok(mask) => {
                *arrangement = mask;
                kResultOk
            }
            Err(err) => error_code(&err),
        }
    }

    pub fn can_process_sample_size(&self, symbolic_sample_size: i32) -> tresult {
        if symbolic_sample_size == SymbolicSampleSizes_::kSample32 as i32 {
            kResultOk
        } else {
            kResultFalse
        }
    }

    pub fn get_latency_samples(&self) -> u32 {
        self.last_latency
    }

    /// Store the host's processing setup and size scratch buffers for it.
    pub fn setup_processing(&mut self, setup: &ProcessSetup) -> tresult {
        if setup.maxSamplesPerBlock <= 0 || setup.sampleRate <= 0.0 {
            return kInvalidArgument;
        }
        if setup.symbolicSampleSize != SymbolicSampleSizes_::kSample32 as i32 {
            return kResultFalse;
        }

        let max_block_size = setup.maxSamplesPerBlock as usize;
        self.instance.set_sample_rate(setup.sampleRate);
        self.instance.set_buffer_size(max_block_size as u32);
        if max_block_size != self.max_block_size {
            self.allocate_buffers(max_block_size);
        }
        debug!(
            "setup_processing: {} Hz, {} frames",
            setup.sampleRate, max_block_size
        );
        kResultOk
    }

    /// Process one block.
    ///
    /// `inputs` and `outputs` hold the host's buffers per bus, then per
    /// channel. Changes at offset 0 are applied before the plugin runs, later
    /// ones after it; changes to MIDI controller parameters become MIDI
    /// events at their offset. Output and trigger values that changed are
    /// available from [`output_changes`](Self::output_changes) afterwards.
    pub fn process(
        &mut self,
        frames: usize,
        inputs: &[&[&[f32]]],
        outputs: &mut [&mut [&mut [f32]]],
        changes: &[ParameterChange],
        midi: &[MidiEvent],
    ) -> tresult {
        self.output_changes.clear();
        self.rejected_changes = 0;

        if frames > self.max_block_size {
            return kInvalidArgument;
        }
        if inputs.len() > self.instance.bus_layout(Direction::Input).bus_count()
            || outputs.len() > self.instance.bus_layout(Direction::Output).bus_count()
        {
            return kInvalidArgument;
        }
        let short_input = inputs
            .iter()
            .flat_map(|bus| bus.iter())
            .any(|channel| channel.len() < frames);
        let short_output = outputs
            .iter()
            .flat_map(|bus| bus.iter())
            .any(|channel| channel.len() < frames);
        if short_input || short_output {
            return kInvalidArgument;
        }

        // MIDI: editor queue, host events, then emulated controllers
        self.midi_scratch.clear();
        let limit = self.config.max_midi_events;
        let last_frame = frames.saturating_sub(1) as u32;
        let mut dropped = 0usize;
        while let Ok(event) = self.editor_midi_out.pop() {
            push_bounded(&mut self.midi_scratch, limit, event, &mut dropped);
        }
        for event in midi {
            let mut event = *event;
            event.sample_offset = event.sample_offset.min(last_frame);
            push_bounded(&mut self.midi_scratch, limit, event, &mut dropped);
        }

        for change in changes {
            let Some(target) = self.layout.classify(change.id) else {
                self.rejected_changes += 1;
                continue;
            };
            if !self.accepts_host_change(target, change.value) {
                self.rejected_changes += 1;
                continue;
            }
            match target {
                ParameterTarget::Internal(InternalSlot::Midi(slot)) => {
                    let offset = (change.sample_offset.max(0) as u32).min(last_frame);
                    let event = self.midi_cc_event(slot, offset, change.value);
                    push_bounded(&mut self.midi_scratch, limit, event, &mut dropped);
                }
                _ if change.sample_offset <= 0 => self.apply_target(target, change.value, true),
                _ => {}
            }
        }
        if dropped > 0 {
            warn!("Dropped {} MIDI events over the per-block limit of {}", dropped, limit);
        }
        sort_by_offset(&mut self.midi_scratch);

        if frames > 0 {
            self.run(frames, inputs, outputs);
        }

        for change in changes.iter().filter(|c| c.sample_offset > 0) {
            match self.layout.classify(change.id) {
                Some(ParameterTarget::Internal(InternalSlot::Midi(_))) | None => {}
                Some(target) if self.accepts_host_change(target, change.value) => {
                    self.apply_target(target, change.value, true);
                }
                Some(_) => {}
            }
        }

        self.report_outputs();
        kResultOk
    }

    fn run(&mut self, frames: usize, inputs: &[&[&[f32]]], outputs: &mut [&mut [&mut [f32]]]) {
        let input_count = self.instance.descriptor().ports(Direction::Input).len();
        let output_count = self.instance.descriptor().ports(Direction::Output).len();

        // Inputs: inactive buses read silence
        let mut input_refs: [&[f32]; MAX_PORTS] = [&[] as &[f32]; MAX_PORTS];
        let zeros = &self.zero_buffer[..frames];
        for slot in input_refs.iter_mut().take(input_count) {
            *slot = zeros;
        }
        let input_layout = self.instance.bus_layout(Direction::Input);
        for (bus_index, channels) in inputs.iter().enumerate() {
            if !input_layout.is_active(bus_index) {
                continue;
            }
            if let Some(bus) = input_layout.bus(bus_index) {
                for (&port, channel) in bus.ports.iter().zip(channels.iter()) {
                    input_refs[port] = &channel[..frames];
                }
            }
        }

        // Outputs: inactive buses are silenced and the plugin writes scratch
        let mut routed: [Option<&mut [f32]>; MAX_PORTS] = std::array::from_fn(|_| None);
        let output_layout = self.instance.bus_layout(Direction::Output);
        for (bus_index, channels) in outputs.iter_mut().enumerate() {
            let active = output_layout.is_active(bus_index);
            let Some(bus) = output_layout.bus(bus_index) else {
                break;
            };
            for (&port, channel) in bus.ports.iter().zip(channels.iter_mut()) {
                let buffer = &mut channel[..frames];
                if active {
                    routed[port] = Some(buffer);
                } else {
                    buffer.fill(0.0);
                }
            }
        }

        let mut output_refs: [&mut [f32]; MAX_PORTS] = std::array::from_fn(|_| Default::default());
        for ((target, host), scratch) in output_refs
            .iter_mut()
            .zip(routed.iter_mut())
            .zip(self.scratch_outputs.iter_mut())
        {
            *target = match host.take() {
                Some(buffer) => buffer,
                None => &mut scratch[..frames],
            };
        }

        self.instance.run(
            &input_refs[..input_count],
            &mut output_refs[..output_count],
            frames as u32,
            &self.midi_scratch,
        );
    }

    fn midi_cc_event(&mut self, slot: MidiCcSlot, offset: u32, normalized: f64) -> MidiEvent {
        let normalized = normalized.clamp(0.0, 1.0);
        if let Some(value) = self.midi_cc_values.get_mut(Self::midi_cc_offset(slot)) {
            *value = normalized;
        }
        let plain = self
            .layout
            .internal_to_plain(InternalSlot::Midi(slot), normalized)
            .round();
        match slot.kind() {
            MidiCcKind::Normal(cc) => {
                MidiEvent::control_change(offset, slot.channel, cc, plain as u8)
            }
            MidiCcKind::ChannelPressure => {
                MidiEvent::channel_pressure(offset, slot.channel, plain as u8)
            }
            MidiCcKind::PitchBend => MidiEvent::pitch_bend(offset, slot.channel, plain as u16),
        }
    }

    /// Apply a normalized value to whatever `raw` refers to.
    fn apply_normalized(
        &mut self,
        raw: u32,
        normalized: f64,
        notify_editor: bool,
    ) -> PluginResult<()> {
        let target = self.layout.from_raw_index(raw)?;
        if !normalized.is_finite() {
            return Err(PluginError::invalid_argument(format!(
                "non-finite value for parameter {}",
                raw
            )));
        }
        if !self.accepts_host_change(target, normalized) {
            return Err(PluginError::invalid_argument(format!(
                "parameter {} ({:?}) is read-only",
                raw, target
            )));
        }
        self.apply_target(target, normalized, notify_editor);
        Ok(())
    }

    /// Whether a host or editor write to `target` is allowed.
    ///
    /// Does not allocate, so the audio thread can filter changes with it.
    fn accepts_host_change(&self, target: ParameterTarget, normalized: f64) -> bool {
        if !normalized.is_finite() {
            return false;
        }
        match target {
            ParameterTarget::Plugin(index) => self
                .instance
                .descriptor()
                .parameter(index)
                .is_some_and(|parameter| parameter.is_host_writable()),
            ParameterTarget::Internal(InternalSlot::Program | InternalSlot::Midi(_)) => true,
            ParameterTarget::Internal(_) => false,
        }
    }

    /// Apply a write already accepted by [`accepts_host_change`](Self::accepts_host_change).
    fn apply_target(&mut self, target: ParameterTarget, normalized: f64, notify_editor: bool) {
        match target {
            ParameterTarget::Plugin(index) => {
                let Some(parameter) = self.instance.descriptor().parameter(index) else {
                    return;
                };
                let plain = parameter_to_plain(parameter, normalized) as f32;
                if self.instance.set_parameter_value(index, plain).is_err() {
                    return;
                }
                let value = self.instance.plugin().parameter_value(index);
                self.last_values[index as usize] = value;
                if notify_editor {
                    self.changed.set(index as usize, value as f64);
                }
            }
            ParameterTarget::Internal(InternalSlot::Program) => {
                let program = self
                    .layout
                    .internal_to_plain(InternalSlot::Program, normalized)
                    .round() as u32;
                if self.instance.set_program(program).is_ok() {
                    self.refresh_parameters();
                }
            }
            ParameterTarget::Internal(InternalSlot::Midi(slot)) => {
                if let Some(value) = self.midi_cc_values.get_mut(Self::midi_cc_offset(slot)) {
                    *value = normalized.clamp(0.0, 1.0);
                }
            }
            ParameterTarget::Internal(_) => {}
        }
    }

    /// Report changed outputs and fired triggers, then reset the triggers.
    fn report_outputs(&mut self) {
        for index in 0..self.instance.descriptor().parameter_count() {
            let (is_output, is_trigger) = match self.instance.descriptor().parameter(index) {
                Some(parameter) => (parameter.hints.output, parameter.hints.trigger),
                None => continue,
            };
            if !is_output && !is_trigger {
                continue;
            }

            let value = self.instance.plugin().parameter_value(index);
            if is_trigger {
                if !self.instance.reset_trigger(index) {
                    continue;
                }
            } else if value == self.last_values[index as usize] {
                continue;
            } else {
                self.last_values[index as usize] = value;
            }
            self.publish_output(index, value);
        }

        let latency = self.instance.latency();
        if latency != self.last_latency {
            self.last_latency = latency;
            if let Some(raw) = self.layout.internal_raw_index(InternalSlot::Latency) {
                let normalized = self
                    .layout
                    .internal_to_normalized(InternalSlot::Latency, latency as f64);
                self.output_changes.push(ParameterChange::new(raw, 0, normalized));
            }
        }
    }

    fn publish_output(&mut self, index: u32, value: f32) {
        let Some(parameter) = self.instance.descriptor().parameter(index) else {
            return;
        };
        let normalized = parameter_to_normalized(parameter, value as f64);
        if let Ok(raw) = self.layout.to_raw_index(index) {
            self.output_changes.push(ParameterChange::new(raw, 0, normalized));
        }
        self.changed.set(index as usize, value as f64);
    }

    /// Output and trigger changes produced by the last [`process`](Self::process).
    #[inline]
    pub fn output_changes(&self) -> &[ParameterChange] {
        &self.output_changes
    }

    /// Host changes dropped by the last [`process`](Self::process): unknown
    /// ids, read-only targets and non-finite values.
    #[inline]
    pub fn rejected_changes(&self) -> usize {
        self.rejected_changes
    }

    // =========================================================================
    // Edit controller
    // =========================================================================

    pub fn get_parameter_count(&self) -> i32 {
        self.layout.total_count() as i32
    }

    pub fn get_parameter_info(&self, param_index: i32, info: &mut ParameterInfo) -> tresult {
        if param_index < 0 {
            return kInvalidArgument;
        }
        let raw = param_index as u32;
        let target = match self.layout.from_raw_index(raw) {
            Ok(target) => target,
            Err(err) => return error_code(&err),
        };

        info.id = raw;
        info.unitId = 0;
        match target {
            ParameterTarget::Plugin(index) => {
                let Ok(parameter) = self.plugin_parameter(index) else {
                    return kInvalidArgument;
                };
                copy_wstring(&parameter.name, &mut info.title);
                copy_wstring(&parameter.short_name, &mut info.shortTitle);
                copy_wstring(&parameter.unit, &mut info.units);
                info.stepCount = parameter.step_count() as i32;
                info.defaultNormalizedValue =
                    parameter_to_normalized(parameter, parameter.ranges.default as f64);
                info.flags = parameter_flags(parameter);
            }
            ParameterTarget::Internal(slot) => {
                let title = internal_title(slot);
                copy_wstring(&title, &mut info.title);
                copy_wstring(&title, &mut info.shortTitle);
                copy_wstring("", &mut info.units);
                info.stepCount = self.layout.internal_step_count(slot) as i32;
                info.defaultNormalizedValue = match slot {
                    InternalSlot::Midi(cc) if cc.kind() == MidiCcKind::PitchBend => 0.5,
                    InternalSlot::Midi(_) | InternalSlot::Program => 0.0,
                    _ => self.get_param_normalized(raw),
                };
                info.flags = internal_flags(slot);
            }
        }
        kResultOk
    }

    pub fn get_param_normalized(&self, id: u32) -> f64 {
        match self.layout.from_raw_index(id) {
            Ok(ParameterTarget::Plugin(index)) => match self.plugin_parameter(index) {
                Ok(parameter) => {
                    let value = self.instance.plugin().parameter_value(index);
                    parameter_to_normalized(parameter, value as f64)
                }
                Err(_) => 0.0,
            },
            Ok(ParameterTarget::Internal(InternalSlot::Midi(slot))) => self
                .midi_cc_values
                .get(Self::midi_cc_offset(slot))
                .copied()
                .unwrap_or(0.0),
            Ok(ParameterTarget::Internal(slot)) => {
                let plain = match slot {
                    InternalSlot::BufferSize => self.instance.buffer_size() as f64,
                    InternalSlot::SampleRate => self.instance.sample_rate(),
                    InternalSlot::Latency => self.last_latency as f64,
                    InternalSlot::Program => self.instance.current_program() as f64,
                    InternalSlot::Midi(_) => 0.0,
                };
                self.layout.internal_to_normalized(slot, plain)
            }
            Err(_) => 0.0,
        }
    }

    /// Host write from the controller side.
    ///
    /// Outputs, triggers, non-finite values and read-only internal parameters
    /// are rejected.
    pub fn set_param_normalized(&mut self, id: u32, value: f64) -> tresult {
        match self.apply_normalized(id, value, true) {
            Ok(()) => kResultOk,
            Err(err) => {
                debug!("set_param_normalized({}) rejected: {}", id, err);
                kResultFalse
            }
        }
    }

    pub fn normalized_param_to_plain(&self, id: u32, normalized: f64) -> f64 {
        self.layout
            .normalized_to_plain(id, normalized, &self.instance.descriptor().parameters)
            .unwrap_or(0.0)
    }

    pub fn plain_param_to_normalized(&self, id: u32, plain: f64) -> f64 {
        self.layout
            .plain_to_normalized(id, plain, &self.instance.descriptor().parameters)
            .unwrap_or(0.0)
    }

    pub fn get_param_string_by_value(
        &self,
        id: u32,
        normalized: f64,
        string: &mut [TChar],
    ) -> tresult {
        match self.param_display(id, normalized) {
            Ok(text) => {
                copy_wstring(&text, string);
                kResultOk
            }
            Err(err) => error_code(&err),
        }
    }

    pub fn get_param_value_by_string(
        &self,
        id: u32,
        string: &[TChar],
        normalized: &mut f64,
    ) -> tresult {
        let text = wstring_to_string(string);
        match self.param_parse(id, text.trim()) {
            Ok(value) => {
                *normalized = value;
                kResultOk
            }
            Err(err) => error_code(&err),
        }
    }

    fn param_display(&self, id: u32, normalized: f64) -> PluginResult<String> {
        match self.layout.from_raw_index(id)? {
            ParameterTarget::Plugin(index) => {
                let parameter = self.plugin_parameter(index)?;
                let plain = parameter_to_plain(parameter, normalized);
                if let Some(label) = parameter
                    .enumeration
                    .as_ref()
                    .and_then(|e| e.label_for(plain as f32))
                {
                    return Ok(label.to_string());
                }
                if parameter.hints.boolean || parameter.hints.integer {
                    Ok(format!("{}", plain.round() as i64))
                } else {
                    Ok(format!("{:.3}", plain))
                }
            }
            ParameterTarget::Internal(InternalSlot::Program) => {
                let program = self
                    .layout
                    .internal_to_plain(InternalSlot::Program, normalized)
                    .round() as usize;
                Ok(self
                    .instance
                    .descriptor()
                    .programs
                    .get(program)
                    .cloned()
                    .unwrap_or_default())
            }
            ParameterTarget::Internal(slot) => {
                let plain = self.layout.internal_to_plain(slot, normalized);
                Ok(format!("{}", plain.round() as i64))
            }
        }
    }

    fn param_parse(&self, id: u32, text: &str) -> PluginResult<f64> {
        let parameters = &self.instance.descriptor().parameters;
        match self.layout.from_raw_index(id)? {
            ParameterTarget::Plugin(index) => {
                let parameter = self.plugin_parameter(index)?;
                if let Some(entry) = parameter
                    .enumeration
                    .as_ref()
                    .and_then(|e| e.values.iter().find(|v| v.label == text))
                {
                    return Ok(parameter_to_normalized(parameter, entry.value as f64));
                }
            }
            ParameterTarget::Internal(InternalSlot::Program) => {
                if let Some(program) = self
                    .instance
                    .descriptor()
                    .programs
                    .iter()
                    .position(|name| name == text)
                {
                    return Ok(self
                        .layout
                        .internal_to_normalized(InternalSlot::Program, program as f64));
                }
            }
            ParameterTarget::Internal(_) => {}
        }
        let plain: f64 = text
            .parse()
            .map_err(|_| PluginError::invalid_argument(format!("cannot parse '{}'", text)))?;
        self.layout.plain_to_normalized(id, plain, parameters)
    }

    /// Name of a factory program.
    pub fn get_program_name(&self, program_index: i32, name: &mut [TChar]) -> tresult {
        let programs = &self.instance.descriptor().programs;
        match usize::try_from(program_index).ok().and_then(|i| programs.get(i)) {
            Some(program) => {
                copy_wstring(program, name);
                kResultOk
            }
            None => kInvalidArgument,
        }
    }

    /// Map a host MIDI controller to a raw parameter id.
    ///
    /// Parameters that name the controller themselves win over the emulated
    /// controller bank.
    pub fn get_midi_controller_assignment(
        &self,
        bus_index: i32,
        channel: i16,
        midi_controller_number: i16,
        id: &mut u32,
    ) -> tresult {
        if bus_index != 0 || !self.instance.descriptor().config.wants_midi_input {
            return kResultFalse;
        }
        let (Ok(channel), Ok(controller)) =
            (u8::try_from(channel), u8::try_from(midi_controller_number))
        else {
            return kResultFalse;
        };

        let descriptor = self.instance.descriptor();
        if let Some(index) = descriptor
            .parameters
            .iter()
            .position(|p| p.midi_cc == Some(controller) && p.is_host_writable())
        {
            if let Ok(raw) = self.layout.to_raw_index(index as u32) {
                *id = raw;
                return kResultOk;
            }
        }

        match self.layout.midi_cc_raw_index(channel, controller) {
            Ok(raw) => {
                *id = raw;
                kResultOk
            }
            Err(_) => kResultFalse,
        }
    }

    // =========================================================================
    // Editor messaging
    // =========================================================================

    /// Handle a message sent by the editor.
    pub fn handle_editor_message(&mut self, message: &EditorMessage) -> tresult {
        match message.name.as_str() {
            MSG_INIT => {
                self.editor_connected = true;
                self.send_initial_values();
                kResultOk
            }
            MSG_READY => {
                self.editor_connected = true;
                kResultOk
            }
            MSG_IDLE => {
                if self.editor_connected {
                    self.flush_editor_changes();
                }
                kResultOk
            }
            MSG_CLOSE => {
                self.editor_connected = false;
                kResultOk
            }
            MSG_PARAMETER_SET => {
                let (Some(index), Some(value)) = (message.int("index"), message.float("value"))
                else {
                    return kInvalidArgument;
                };
                let Ok(raw) = u32::try_from(index) else {
                    return kInvalidArgument;
                };
                if !value.is_finite() {
                    return kInvalidArgument;
                }
                let normalized = match self.layout.plain_to_normalized(
                    raw,
                    value,
                    &self.instance.descriptor().parameters,
                ) {
                    Ok(normalized) => normalized,
                    Err(err) => return error_code(&err),
                };
                match self.apply_normalized(raw, normalized, false) {
                    Ok(()) => {
                        self.host_edits.push(ParameterChange::new(raw, 0, normalized));
                        kResultOk
                    }
                    Err(err) => {
                        warn!("Editor parameter-set for {} rejected: {}", raw, err);
                        error_code(&err)
                    }
                }
            }
            MSG_STATE_SET => {
                let (Some(key), Some(value)) = (message.string("key"), message.string("value"))
                else {
                    return kInvalidArgument;
                };
                report("state-set", self.instance.set_state_value(key, value))
            }
            MSG_MIDI => {
                let Some(event) = message
                    .binary("data")
                    .and_then(|data| MidiEvent::from_bytes(0, data))
                else {
                    return kInvalidArgument;
                };
                if self.editor_midi_in.push(event).is_err() {
                    warn!("Editor MIDI queue full, dropping message");
                    return kResultFalse;
                }
                kResultOk
            }
            other => {
                debug!("Ignoring unknown editor message '{}'", other);
                kResultFalse
            }
        }
    }

    fn send_initial_values(&mut self) {
        self.outbox.push(
            EditorMessage::new(MSG_INIT)
                .with("sample_rate", AttributeValue::Float(self.instance.sample_rate())),
        );
        for index in 0..self.instance.descriptor().parameter_count() {
            // Anything pending is covered by the full snapshot
            let _ = self.changed.take(index as usize);
            if let Ok(raw) = self.layout.to_raw_index(index) {
                let value = self.instance.plugin().parameter_value(index);
                self.outbox.push(EditorMessage::parameter_set(raw, value as f64));
            }
        }
        let descriptor = self.instance.descriptor();
        for entry in &descriptor.states {
            if let Some(value) = self.instance.state_value(&entry.key) {
                self.outbox.push(EditorMessage::state_set(&entry.key, &value));
            }
        }
        self.pending_states.clear();
    }

    fn flush_editor_changes(&mut self) {
        let layout = self.layout;
        let outbox = &mut self.outbox;
        self.changed.drain(|index, value| {
            if let Ok(raw) = layout.to_raw_index(index as u32) {
                outbox.push(EditorMessage::parameter_set(raw, value));
            }
        });
        for (key, value) in self.pending_states.drain(..) {
            outbox.push(EditorMessage::state_set(&key, &value));
        }
    }

    /// Messages queued for the editor since the last call.
    pub fn take_editor_messages(&mut self) -> Vec<EditorMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// Parameter edits made in the editor that the host must be told about.
    pub fn take_host_edits(&mut self) -> Vec<ParameterChange> {
        std::mem::take(&mut self.host_edits)
    }

    #[inline]
    pub fn is_editor_connected(&self) -> bool {
        self.editor_connected
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn bus_direction(dir: BusDirection) -> Option<Direction> {
    match dir as BusDirections {
        BusDirections_::kInput => Some(Direction::Input),
        BusDirections_::kOutput => Some(Direction::Output),
        _ => None,
    }
}

fn push_bounded(events: &mut Vec<MidiEvent>, limit: usize, event: MidiEvent, dropped: &mut usize) {
    if events.len() < limit {
        events.push(event);
    } else {
        *dropped += 1;
    }
}

/// Stable in-place sort by frame offset.
///
/// Insertion sort: linear for the usual already-ordered block, at most
/// `n * (n - 1) / 2` swaps otherwise, with `n` bounded by
/// [`Vst3Config::max_midi_events`]. Never allocates.
fn sort_by_offset(events: &mut [MidiEvent]) {
    for i in 1..events.len() {
        let mut j = i;
        while j > 0 && events[j - 1].sample_offset > events[j].sample_offset {
            events.swap(j - 1, j);
            j -= 1;
        }
    }
}

fn parameter_flags(parameter: &Parameter) -> i32 {
    use ParameterInfo_::ParameterFlags_::*;

    let mut flags = 0;
    if parameter.hints.automatable && parameter.is_host_writable() {
        flags |= kCanAutomate as i32;
    }
    if !parameter.is_host_writable() {
        flags |= kIsReadOnly as i32;
    }
    if parameter.hints.hidden {
        flags |= kIsHidden as i32;
    }
    if parameter.designation == polyplug_core::ParameterDesignation::Bypass {
        flags |= kIsBypass as i32;
    }
    if parameter
        .enumeration
        .as_ref()
        .is_some_and(|e| e.restricted_mode)
    {
        flags |= kIsList as i32;
    }
    flags
}

fn internal_flags(slot: InternalSlot) -> i32 {
    use ParameterInfo_::ParameterFlags_::*;

    match slot {
        InternalSlot::Program => (kCanAutomate | kIsList | kIsProgramChange) as i32,
        InternalSlot::Midi(_) => (kCanAutomate | kIsHidden) as i32,
        _ => (kIsReadOnly | kIsHidden) as i32,
    }
}

fn internal_title(slot: InternalSlot) -> String {
    match slot {
        InternalSlot::BufferSize => "Buffer Size".to_string(),
        InternalSlot::SampleRate => "Sample Rate".to_string(),
        InternalSlot::Latency => "Latency".to_string(),
        InternalSlot::Program => "Current Program".to_string(),
        InternalSlot::Midi(cc) => match cc.kind() {
            MidiCcKind::Normal(number) => format!("MIDI Ch. {} CC {}", cc.channel + 1, number),
            MidiCcKind::ChannelPressure => format!("MIDI Ch. {} Pressure", cc.channel + 1),
            MidiCcKind::PitchBend => format!("MIDI Ch. {} Pitchbend", cc.channel + 1),
        },
    }
}
