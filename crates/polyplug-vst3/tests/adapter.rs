mod common;

use approx::assert_abs_diff_eq;
use common::*;
use polyplug_core::MidiEvent;
use polyplug_vst3::util::wstring_to_string;
use polyplug_vst3::vst3::Steinberg::Vst::*;
use polyplug_vst3::vst3::Steinberg::*;
use polyplug_vst3::ParameterChange;

fn empty_parameter_info() -> ParameterInfo {
    ParameterInfo {
        id: 0,
        title: [0; 128],
        shortTitle: [0; 128],
        units: [0; 128],
        stepCount: 0,
        defaultNormalizedValue: 0f64,
        unitId: 0,
        flags: 0,
    }
}

fn empty_bus_info() -> BusInfo {
    BusInfo {
        mediaType: 0,
        direction: 0,
        channelCount: 0,
        name: [0; 128],
        busType: 0,
        flags: 0,
    }
}

fn setup(frames: i32) -> ProcessSetup {
    ProcessSetup {
        processMode: ProcessModes_::kRealtime as i32,
        symbolicSampleSize: SymbolicSampleSizes_::kSample32 as i32,
        maxSamplesPerBlock: frames,
        sampleRate: 48000.0,
    }
}

const AUDIO: MediaType = MediaTypes_::kAudio as MediaType;
const EVENT: MediaType = MediaTypes_::kEvent as MediaType;
const INPUT: BusDirection = BusDirections_::kInput as BusDirection;
const OUTPUT: BusDirection = BusDirections_::kOutput as BusDirection;

fn has_flag(flags: i32, flag: i32) -> bool {
    flags & flag != 0
}

// =============================================================================
// Parameter index space
// =============================================================================

#[test]
fn test_parameter_count_includes_internal_slots() {
    let adapter = adapter();
    assert_eq!(adapter.get_parameter_count(), (INTERNAL_COUNT + 5) as i32);
    assert_eq!(adapter.layout().internal_parameter_count(), INTERNAL_COUNT);
}

#[test]
fn test_internal_parameter_info() {
    use ParameterInfo_::ParameterFlags_::*;

    let adapter = adapter();
    let mut info = empty_parameter_info();

    assert_eq!(adapter.get_parameter_info(0, &mut info), kResultOk);
    assert_eq!(wstring_to_string(&info.title), "Buffer Size");
    assert!(has_flag(info.flags, kIsReadOnly as i32));
    assert!(has_flag(info.flags, kIsHidden as i32));

    assert_eq!(adapter.get_parameter_info(PROGRAM as i32, &mut info), kResultOk);
    assert_eq!(wstring_to_string(&info.title), "Current Program");
    assert_eq!(info.stepCount, 1);
    assert!(has_flag(info.flags, kIsProgramChange as i32));
    assert!(has_flag(info.flags, kIsList as i32));

    // Channel 3 (zero-based 2), CC 64
    let raw = MIDI_BASE + 2 * 130 + 64;
    assert_eq!(adapter.get_parameter_info(raw as i32, &mut info), kResultOk);
    assert_eq!(info.id, raw);
    assert_eq!(wstring_to_string(&info.title), "MIDI Ch. 3 CC 64");
    assert_eq!(info.stepCount, 127);
    assert!(has_flag(info.flags, kIsHidden as i32));

    // Pitch bend rests in the centre
    let bend = MIDI_BASE + 129;
    assert_eq!(adapter.get_parameter_info(bend as i32, &mut info), kResultOk);
    assert_eq!(info.defaultNormalizedValue, 0.5);
    assert_eq!(adapter.get_param_normalized(bend), 0.5);
}

#[test]
fn test_plugin_parameter_info() {
    use ParameterInfo_::ParameterFlags_::*;

    let adapter = adapter();
    let mut info = empty_parameter_info();

    assert_eq!(adapter.get_parameter_info(GAIN as i32, &mut info), kResultOk);
    assert_eq!(info.id, GAIN);
    assert_eq!(wstring_to_string(&info.title), "Gain");
    assert_eq!(wstring_to_string(&info.units), "x");
    assert_abs_diff_eq!(info.defaultNormalizedValue, 0.5);
    assert!(has_flag(info.flags, kCanAutomate as i32));

    assert_eq!(adapter.get_parameter_info(METER as i32, &mut info), kResultOk);
    assert!(has_flag(info.flags, kIsReadOnly as i32));
    assert!(!has_flag(info.flags, kCanAutomate as i32));

    assert_eq!(adapter.get_parameter_info(MODE as i32, &mut info), kResultOk);
    assert_eq!(info.stepCount, 2);
    assert!(has_flag(info.flags, kIsList as i32));

    assert_eq!(adapter.get_parameter_info(BYPASS as i32, &mut info), kResultOk);
    assert!(has_flag(info.flags, kIsBypass as i32));

    assert_eq!(adapter.get_parameter_info(-1, &mut info), kInvalidArgument);
    assert_eq!(
        adapter.get_parameter_info((BYPASS + 1) as i32, &mut info),
        kInvalidArgument
    );
}

#[test]
fn test_midi_controller_assignment() {
    let adapter = adapter();
    let mut id = 0;
    assert_eq!(adapter.get_midi_controller_assignment(0, 2, 64, &mut id), kResultOk);
    assert_eq!(id, MIDI_BASE + 2 * 130 + 64);

    assert_eq!(adapter.get_midi_controller_assignment(0, 16, 64, &mut id), kResultFalse);
    assert_eq!(adapter.get_midi_controller_assignment(0, 0, -1, &mut id), kResultFalse);
    assert_eq!(adapter.get_midi_controller_assignment(1, 0, 1, &mut id), kResultFalse);
}

#[test]
fn test_param_strings() {
    let adapter = adapter();
    let mut text = [0 as TChar; 128];

    assert_eq!(adapter.get_param_string_by_value(MODE, 0.5, &mut text), kResultOk);
    assert_eq!(wstring_to_string(&text), "Hard");

    assert_eq!(adapter.get_param_string_by_value(PROGRAM, 1.0, &mut text), kResultOk);
    assert_eq!(wstring_to_string(&text), "Loud");

    let mut value = 0.0;
    let mut fold = [0 as TChar; 8];
    polyplug_vst3::util::copy_wstring("Fold", &mut fold);
    assert_eq!(adapter.get_param_value_by_string(MODE, &fold, &mut value), kResultOk);
    assert_eq!(value, 1.0);

    let mut gain = [0 as TChar; 8];
    polyplug_vst3::util::copy_wstring("1.5", &mut gain);
    assert_eq!(adapter.get_param_value_by_string(GAIN, &gain, &mut value), kResultOk);
    assert_abs_diff_eq!(value, 0.75);

    let mut junk = [0 as TChar; 8];
    polyplug_vst3::util::copy_wstring("loud", &mut junk);
    assert_eq!(
        adapter.get_param_value_by_string(GAIN, &junk, &mut value),
        kInvalidArgument
    );
}

#[test]
fn test_controller_writes() {
    let mut adapter = adapter();

    assert_eq!(adapter.set_param_normalized(GAIN, 0.25), kResultOk);
    assert_eq!(adapter.instance().plugin().values[0], 0.5);
    assert_abs_diff_eq!(adapter.get_param_normalized(GAIN), 0.25);

    // Outputs, triggers and the read-only internal slots refuse host writes
    assert_eq!(adapter.set_param_normalized(METER, 1.0), kResultFalse);
    assert_eq!(adapter.set_param_normalized(FIRE, 1.0), kResultFalse);
    assert_eq!(adapter.set_param_normalized(0, 1.0), kResultFalse);
    assert_eq!(adapter.instance().plugin().values[1], 0.0);

    // Program change loads the program
    assert_eq!(adapter.set_param_normalized(PROGRAM, 1.0), kResultOk);
    assert_eq!(adapter.instance().current_program(), 1);
    assert_eq!(adapter.instance().plugin().values[0], 0.5);

    assert_eq!(adapter.normalized_param_to_plain(GAIN, 0.5), 1.0);
    assert_eq!(adapter.plain_param_to_normalized(GAIN, 2.0), 1.0);
}

#[test]
fn test_non_finite_controller_writes_are_refused() {
    let mut adapter = adapter();
    assert_eq!(adapter.set_param_normalized(GAIN, 0.25), kResultOk);

    assert_eq!(adapter.set_param_normalized(GAIN, f64::NAN), kResultFalse);
    assert_eq!(adapter.set_param_normalized(GAIN, f64::INFINITY), kResultFalse);
    assert_eq!(adapter.set_param_normalized(PROGRAM, f64::NAN), kResultFalse);
    assert_eq!(adapter.instance().plugin().values[0], 0.5);
    assert_eq!(adapter.instance().current_program(), 0);
    assert_abs_diff_eq!(adapter.get_param_normalized(GAIN), 0.25);
}

// =============================================================================
// Buses
// =============================================================================

#[test]
fn test_bus_info() {
    let adapter = adapter();
    let mut info = empty_bus_info();

    assert_eq!(adapter.get_bus_count(AUDIO, INPUT), 2);
    assert_eq!(adapter.get_bus_count(AUDIO, OUTPUT), 1);
    assert_eq!(adapter.get_bus_count(EVENT, INPUT), 1);
    assert_eq!(adapter.get_bus_count(EVENT, OUTPUT), 0);

    assert_eq!(adapter.get_bus_info(AUDIO, INPUT, 0, &mut info), kResultOk);
    assert_eq!(wstring_to_string(&info.name), "Stereo");
    assert_eq!(info.channelCount, 2);
    assert_eq!(info.busType, BusTypes_::kMain as BusType);
    assert_ne!(info.flags & BusInfo_::BusFlags_::kDefaultActive as u32, 0);

    assert_eq!(adapter.get_bus_info(AUDIO, INPUT, 1, &mut info), kResultOk);
    assert_eq!(wstring_to_string(&info.name), "Sidechain Input");
    assert_eq!(info.channelCount, 1);
    assert_eq!(info.busType, BusTypes_::kAux as BusType);
    assert_eq!(info.flags & BusInfo_::BusFlags_::kDefaultActive as u32, 0);

    assert_eq!(adapter.get_bus_info(AUDIO, INPUT, 2, &mut info), kInvalidArgument);
    assert_eq!(adapter.get_bus_info(EVENT, INPUT, 0, &mut info), kResultOk);
    assert_eq!(adapter.get_bus_info(EVENT, OUTPUT, 0, &mut info), kInvalidArgument);

    let mut arrangement = 0;
    assert_eq!(adapter.get_bus_arrangement(INPUT, 1, &mut arrangement), kResultOk);
    assert_eq!(arrangement, SpeakerArr::kMono);
    assert_eq!(adapter.get_bus_arrangement(OUTPUT, 0, &mut arrangement), kResultOk);
    assert_eq!(arrangement, SpeakerArr::kStereo);
}

#[test]
fn test_bus_arrangements() {
    let mut adapter = adapter();
    let sidechain_enabled = |a: &polyplug_vst3::Vst3Adapter<Tone>| {
        a.instance()
            .bus_layout(polyplug_core::Direction::Input)
            .port_enabled()[2]
    };

    assert!(!sidechain_enabled(&adapter));

    // Wrong mask for the sidechain: nothing changes on either side
    assert_eq!(
        adapter.set_bus_arrangements(
            &[SpeakerArr::kStereo, SpeakerArr::kStereo],
            &[SpeakerArr::kStereo]
        ),
        kResultFalse
    );
    assert!(!sidechain_enabled(&adapter));

    // Valid inputs but invalid outputs must not apply the inputs either
    assert_eq!(
        adapter.set_bus_arrangements(
            &[SpeakerArr::kStereo, SpeakerArr::kMono],
            &[SpeakerArr::kMono]
        ),
        kResultFalse
    );
    assert!(!sidechain_enabled(&adapter));

    assert_eq!(
        adapter.set_bus_arrangements(
            &[SpeakerArr::kStereo, SpeakerArr::kMono],
            &[SpeakerArr::kStereo]
        ),
        kResultTrue
    );
    assert!(sidechain_enabled(&adapter));
}

// =============================================================================
// Processing
// =============================================================================

#[test]
fn test_setup_processing_validation() {
    let mut adapter = adapter();
    assert_eq!(adapter.setup_processing(&setup(0)), kInvalidArgument);

    let mut double = setup(128);
    double.symbolicSampleSize = SymbolicSampleSizes_::kSample64 as i32;
    assert_eq!(adapter.setup_processing(&double), kResultFalse);
    assert_eq!(
        adapter.can_process_sample_size(SymbolicSampleSizes_::kSample64 as i32),
        kResultFalse
    );

    assert_eq!(adapter.setup_processing(&setup(128)), kResultOk);
    assert_eq!(adapter.instance().sample_rate(), 48000.0);

    // Blocks longer than the announced maximum are refused
    let mut buffers = Buffers::new(256, 0.5, 0.0);
    assert_eq!(buffers.process(&mut adapter, &[], &[]), kInvalidArgument);
}

#[test]
fn test_process_applies_changes_around_run() {
    let mut adapter = adapter();
    assert_eq!(adapter.setup_processing(&setup(128)), kResultOk);
    assert_eq!(adapter.set_active(1), kResultOk);

    let mut buffers = Buffers::new(128, 0.5, 0.0);
    let changes = [
        ParameterChange::new(GAIN, 0, 0.25),
        ParameterChange::new(MODE, 64, 1.0),
    ];
    assert_eq!(buffers.process(&mut adapter, &changes, &[]), kResultOk);

    // Gain at offset 0 was in effect for the block
    assert_eq!(adapter.instance().plugin().gains_seen, vec![0.5]);
    assert!(buffers.outputs[0][0].iter().all(|&s| s == 0.25));

    // The later change landed after run
    assert_eq!(adapter.instance().plugin().values[3], 2.0);

    // Meter moved and is reported back
    let reported: Vec<_> = adapter.output_changes().to_vec();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].id, METER);
    assert_abs_diff_eq!(reported[0].value, 0.25);

    // Same meter value next block: nothing to report
    assert_eq!(buffers.process(&mut adapter, &[], &[]), kResultOk);
    assert!(adapter.output_changes().is_empty());
}

#[test]
fn test_inactive_sidechain_reads_silence() {
    let mut adapter = adapter();
    assert_eq!(adapter.setup_processing(&setup(64)), kResultOk);

    let mut buffers = Buffers::new(64, 0.0, 1.0);
    assert_eq!(buffers.process(&mut adapter, &[], &[]), kResultOk);
    assert_eq!(adapter.instance().plugin().sidechain_peak, 0.0);

    assert_eq!(adapter.activate_bus(AUDIO, INPUT, 1, 1), kResultOk);
    assert_eq!(buffers.process(&mut adapter, &[], &[]), kResultOk);
    assert_eq!(adapter.instance().plugin().sidechain_peak, 1.0);
}

#[test]
fn test_inactive_output_is_silenced() {
    let mut adapter = adapter();
    assert_eq!(adapter.setup_processing(&setup(64)), kResultOk);
    assert_eq!(adapter.activate_bus(AUDIO, OUTPUT, 0, 0), kResultOk);

    let mut buffers = Buffers::new(64, 0.5, 0.0);
    buffers.outputs[0][1].fill(9.0);
    assert_eq!(buffers.process(&mut adapter, &[], &[]), kResultOk);
    assert!(buffers.outputs[0].iter().flatten().all(|&s| s == 0.0));
}

#[test]
fn test_midi_controller_changes_become_events() {
    let mut adapter = adapter();
    assert_eq!(adapter.setup_processing(&setup(64)), kResultOk);

    let cc = MIDI_BASE + 2 * 130 + 64;
    let bend = MIDI_BASE + 129;
    let host_note = MidiEvent::from_bytes(5, &[0x90, 60, 100]).unwrap();
    let changes = [
        ParameterChange::new(cc, 10, 1.0),
        ParameterChange::new(bend, 2, 1.0),
    ];

    let mut buffers = Buffers::new(64, 0.0, 0.0);
    assert_eq!(buffers.process(&mut adapter, &changes, &[host_note]), kResultOk);

    let received = adapter.instance().plugin().received.clone();
    assert_eq!(
        received,
        vec![
            MidiEvent::pitch_bend(2, 0, 16383),
            host_note,
            MidiEvent::control_change(10, 2, 64, 127),
        ]
    );
    assert_eq!(adapter.get_param_normalized(cc), 1.0);
}

#[test]
fn test_trigger_reported_once_then_reset() {
    let mut adapter = adapter();
    assert_eq!(adapter.setup_processing(&setup(64)), kResultOk);

    let note = MidiEvent::from_bytes(0, &[0x90, 60, 100]).unwrap();
    let mut buffers = Buffers::new(64, 0.0, 0.0);
    assert_eq!(buffers.process(&mut adapter, &[], &[note]), kResultOk);

    let fired: Vec<_> = adapter
        .output_changes()
        .iter()
        .filter(|c| c.id == FIRE)
        .copied()
        .collect();
    assert_eq!(fired, vec![ParameterChange::new(FIRE, 0, 1.0)]);
    assert_eq!(adapter.instance().plugin().values[2], 0.0);

    assert_eq!(buffers.process(&mut adapter, &[], &[]), kResultOk);
    assert!(adapter.output_changes().iter().all(|c| c.id != FIRE));
}

#[test]
fn test_latency_published_after_activation() {
    let mut adapter = adapter();
    assert_eq!(adapter.get_latency_samples(), 0);
    assert_eq!(adapter.set_active(1), kResultOk);
    assert_eq!(adapter.get_latency_samples(), LATENCY);

    let expected = LATENCY as f64 / (384000.0 * 10.0);
    assert_abs_diff_eq!(adapter.get_param_normalized(2), expected);
    assert_eq!(adapter.set_active(0), kResultOk);
    assert!(!adapter.instance().is_active());
}

#[test]
fn test_zero_frame_block_only_applies_changes() {
    let mut adapter = adapter();
    let mut buffers = Buffers::new(0, 0.0, 0.0);
    let changes = [ParameterChange::new(GAIN, 0, 1.0)];
    assert_eq!(buffers.process(&mut adapter, &changes, &[]), kResultOk);
    assert!(adapter.instance().plugin().gains_seen.is_empty());
    assert_eq!(adapter.instance().plugin().values[0], 2.0);
}

#[test]
fn test_process_skips_rejected_changes() {
    let mut adapter = adapter();
    let mut buffers = Buffers::new(64, 0.0, 0.0);
    let changes = [
        ParameterChange::new(METER, 0, 0.5),
        ParameterChange::new(0, 0, 1.0),
        ParameterChange::new(BYPASS + 1, 0, 1.0),
        ParameterChange::new(MODE, 0, f64::NAN),
        ParameterChange::new(MODE, 32, f64::INFINITY),
        ParameterChange::new(GAIN, 0, 0.25),
    ];
    assert_eq!(buffers.process(&mut adapter, &changes, &[]), kResultOk);
    assert_eq!(adapter.rejected_changes(), 5);

    // The valid change still applies before run
    assert_eq!(adapter.instance().plugin().gains_seen, vec![0.5]);
    assert_eq!(adapter.instance().plugin().values[3], 0.0);

    // Counter is per block
    assert_eq!(buffers.process(&mut adapter, &[], &[]), kResultOk);
    assert_eq!(adapter.rejected_changes(), 0);
}
