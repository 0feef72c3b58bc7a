// End-to-end runs of the engine against the offline renderer.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use stepgrid::audio::OfflineSink;
use stepgrid::pipeline::config::EngineConfig;
use stepgrid::pipeline::playback::PlaybackPattern;
use stepgrid::scales;
use stepgrid::{EngineError, Middle};

const SR: u32 = 8000;

fn config(size: usize) -> EngineConfig {
    EngineConfig {
        matrix_size: size,
        impulse_dir: PathBuf::from("/nonexistent"), // synthetic rooms
        ..EngineConfig::default()
    }
}

fn engine(size: usize) -> (Middle, OfflineSink) {
    let mut m = Middle::with_seed(config(size), 42).unwrap();
    let sink = OfflineSink::new(SR, m.params());
    m.initialize_with(Box::new(sink.clone())).unwrap();
    (m, sink)
}

// pump in short slices until `n` ticks have been played
fn pump_ticks(m: &mut Middle, n: usize) {
    let give_up = Instant::now() + Duration::from_secs(5);
    let mut played = 0;
    while played < n {
        assert!(Instant::now() < give_up, "only {played} of {n} ticks arrived");
        played += m.pump_for(Duration::from_millis(5));
    }
    assert_eq!(played, n);
}

#[test]
fn single_cell_indexes_and_maps_to_scale_pitch() {
    let (mut m, _sink) = engine(64);
    let mut rows = vec![vec![false; 64]; 64];
    rows[10][3] = true;
    m.set_matrix(rows).unwrap();
    assert_eq!(m.active_rows(3), &[10]);
    assert!(m.active_rows(4).is_empty());
    assert_eq!(m.active_notes_count(), 1);

    m.set_scale("Major").unwrap();
    m.set_octave(4).unwrap();
    let table = scales::scale_frequencies("Major", 4).unwrap();
    let want = table[10 % 7] * 2f32.powi(10 / 7);
    assert!((m.frequency_for(3, 10) - want).abs() < 1e-3);
    assert!((m.volume_for(10) - (1.0 - 10.0 / 64.0)).abs() < 1e-6);
}

#[test]
fn forward_at_120_bpm_reaches_step_four_after_four_ticks() {
    let (mut m, _sink) = engine(16);
    let steps = Rc::new(RefCell::new(Vec::new()));
    let seen = steps.clone();
    m.on_step_change(move |s| seen.borrow_mut().push(s));

    m.set_bpm(120.0).unwrap();
    m.start_sequence().unwrap();
    let started = Instant::now();
    pump_ticks(&mut m, 4);
    let elapsed = started.elapsed();

    assert_eq!(m.current_step(), 4);
    assert_eq!(*steps.borrow(), vec![0, 1, 2, 3]);
    // first tick is immediate, then 125 ms apart
    assert!(elapsed >= Duration::from_millis(370), "too fast: {elapsed:?}");
    m.stop_sequence();
}

#[test]
fn filter_cutoff_settles_on_the_master_filter() {
    let (mut m, sink) = engine(8);
    m.set_cell(0, 0, true).unwrap();
    m.set_parameter("filterCutoff", 500.0).unwrap();
    m.start_sequence().unwrap();
    m.play_current_step();
    sink.render_seconds(1.5); // fifteen time constants
    let cutoff = sink.engine().unwrap().master_cutoff();
    assert!((cutoff - 500.0).abs() < 0.5, "cutoff {cutoff}");
    m.stop_sequence();
}

#[test]
fn resize_clears_everything_and_rewinds() {
    let (mut m, _sink) = engine(8);
    m.set_cell(1, 1, true).unwrap();
    m.start_sequence().unwrap();
    m.play_current_step();
    m.play_current_step();
    assert_eq!(m.current_step(), 2);

    m.resize_matrix(16).unwrap();
    assert_eq!(m.matrix_size(), 16);
    assert_eq!(m.current_step(), 0);
    assert_eq!(m.active_notes_count(), 0);
    assert!(!m.is_playing());
    assert!(!m.is_note_playing(1, 1));
    assert!(m.matrix().rows().iter().all(|r| r.len() == 16 && r.iter().all(|c| !c)));
    assert!((0..16).all(|c| m.active_rows(c).is_empty()));

    assert!(matches!(m.resize_matrix(0), Err(EngineError::InvalidSize(0))));
    // scheduler was replaced and still works
    m.start_sequence().unwrap();
    pump_ticks(&mut m, 1);
    assert_eq!(m.current_step(), 1);
    m.stop_sequence();
}

#[test]
fn ticks_queued_before_stop_are_ignored() {
    let (mut m, _sink) = engine(8);
    m.set_bpm(600.0).unwrap(); // 25 ms steps
    m.start_sequence().unwrap();
    pump_ticks(&mut m, 1);
    m.stop_sequence();
    let step = m.current_step();
    // anything still in flight gets drained without moving the playhead
    assert_eq!(m.pump_for(Duration::from_millis(60)), 0);
    assert_eq!(m.current_step(), step);
}

#[test]
fn unknown_parameter_is_an_error() {
    let (mut m, _sink) = engine(8);
    match m.set_parameter("wobble", 1.0) {
        Err(EngineError::UnknownParameter(name)) => assert_eq!(name, "wobble"),
        other => panic!("expected UnknownParameter, got {other:?}"),
    }
    assert!(matches!(m.set_scale("Klingon"), Err(EngineError::UnknownScale(_))));
    assert!(matches!(m.set_matrix(vec![vec![false; 3]; 8]), Err(EngineError::InvalidMatrix { expected: 8 })));
}

#[test]
fn stop_silences_immediately() {
    let (mut m, sink) = engine(8);
    for row in 0..8 {
        m.set_cell(row, 0, true).unwrap();
    }
    m.start_sequence().unwrap();
    m.play_current_step();
    assert!(sink.render_seconds(0.1).iter().any(|f| f.peak() > 0.01));

    m.stop_sequence();
    assert_eq!(sink.engine().unwrap().active_voices(), 0);
    assert!(sink.render_seconds(0.5).iter().all(|f| f.peak() == 0.0));
}

#[test]
fn pattern_switch_while_playing_restarts_at_zero() {
    let (mut m, _sink) = engine(8);
    m.start_sequence().unwrap();
    m.play_current_step();
    m.play_current_step();
    m.play_current_step();
    assert_eq!(m.current_step(), 3);

    m.set_playback_pattern(PlaybackPattern::Backward).unwrap();
    assert!(m.is_playing());
    assert_eq!(m.current_step(), 0);
    m.play_current_step();
    assert_eq!(m.current_step(), 7);
    m.stop_sequence();
}

#[test]
fn bad_tempo_is_refused_and_scheduler_can_be_replaced() {
    let (mut m, _sink) = engine(8);
    assert!(matches!(m.set_bpm(f32::INFINITY), Err(EngineError::InvalidTempo(_))));
    assert!(matches!(m.set_parameter("tempo", 0.0), Err(EngineError::InvalidTempo(_))));
    assert_eq!(m.bpm(), 120.0);

    m.reinitialize_scheduler().unwrap();
    m.set_parameter("tempo", 300.0).unwrap();
    m.start_sequence().unwrap();
    pump_ticks(&mut m, 2);
    assert_eq!(m.current_step(), 2);
    assert!(m.last_error().is_none());
    m.stop_sequence();
}

#[test]
fn preview_strikes_the_lead_tone() {
    let (m, sink) = engine(8);
    m.preview_note(0, 0).unwrap();
    let out = sink.render_seconds(0.1);
    assert!(out.iter().any(|f| f.peak() > 0.05));
    let freq = sink.engine().unwrap().lead().frequency();
    assert!((freq - m.frequency_for(0, 0)).abs() < 0.1);
}

fn loudest(frames: &[stepgrid::audio::StereoFrame]) -> f32 {
    frames.iter().map(|f| f.peak()).fold(0.0, f32::max)
}

#[test]
fn preview_still_sounds_after_stop() {
    let (mut m, sink) = engine(8);
    m.preview_note(0, 0).unwrap();
    assert!(loudest(&sink.render_seconds(0.1)) > 0.05);

    m.start_sequence().unwrap();
    m.stop_sequence();
    sink.render_seconds(0.1);
    m.preview_note(0, 0).unwrap();
    assert!(loudest(&sink.render_seconds(0.1)) > 0.05);
}

#[test]
fn painting_after_resize_is_audible() {
    use stepgrid::shared::InputEvent;

    let (mut m, sink) = engine(8);
    m.resize_matrix(16).unwrap();
    m.handle_input(InputEvent::PaintCell { row: 2, col: 3 }).unwrap();
    assert!(m.matrix().get(2, 3));
    assert!(loudest(&sink.render_seconds(0.1)) > 0.05);
}

#[test]
fn runaway_feedback_in_config_is_tamed() {
    let mut cfg = config(8);
    cfg.params.delay_feedback = 1.5;
    cfg.params.delay_time = 0.05;
    let mut m = Middle::with_seed(cfg, 3).unwrap();
    assert_eq!(m.params().delay_feedback, 0.99);

    let sink = OfflineSink::new(SR, m.params());
    m.initialize_with(Box::new(sink.clone())).unwrap();
    m.preview_note(0, 0).unwrap();
    let out = sink.render_seconds(3.0);
    assert!(out.iter().all(|f| f.left.is_finite() && f.right.is_finite()));
    assert!(loudest(&out) < 50.0);
    assert!(loudest(&out[out.len() - 800..]) < loudest(&out));
}

// a one-sample click: the "room" passes the dry signal through and adds no tail
fn write_click(dir: &std::path::Path, name: &str) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SR,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut w = hound::WavWriter::create(dir.join(name), spec).unwrap();
    for i in 0..64 {
        let s = if i == 0 { 1.0f32 } else { 0.0 };
        w.write_sample(s).unwrap();
        w.write_sample(s).unwrap();
    }
    w.finalize().unwrap();
}

#[test]
fn switching_rooms_swaps_the_reverb_tail() {
    use stepgrid::pipeline::effects::ImpulseType;

    let dir = tempfile::tempdir().unwrap();
    write_click(dir.path(), &ImpulseType::GuitarCab.file_name());
    let cfg = EngineConfig {
        matrix_size: 8,
        impulse_dir: dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    let mut m = Middle::with_seed(cfg, 5).unwrap();
    m.set_parameter("delayFeedback", 0.0).unwrap(); // one echo only
    m.set_impulse_type(ImpulseType::GuitarCab);
    assert_eq!(m.impulse_type(), ImpulseType::GuitarCab);

    let sink = OfflineSink::new(SR, m.params());
    assert!(!sink.engine().unwrap().has_impulse());
    m.initialize_with(Box::new(sink.clone())).unwrap();
    assert!(sink.engine().unwrap().has_impulse());

    // note, release and echo are over within a second; what's left is the room
    let tail = |m: &mut Middle| {
        m.preview_note(0, 0).unwrap();
        sink.render_seconds(1.0);
        loudest(&sink.render_seconds(0.5))
    };
    let cab = tail(&mut m);
    m.set_impulse_type(ImpulseType::PlateReverb);
    assert!(sink.engine().unwrap().has_impulse());
    let plate = tail(&mut m);

    assert!(plate > 1e-3, "synthetic plate tail {plate}");
    assert!(cab < plate * 0.01, "click room tail {cab} vs plate {plate}");
}
