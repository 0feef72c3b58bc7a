// The engine proper. Owns every piece of sequencer state and is the only
// thing that talks to both the scheduler and the audio side. Lives on the
// main thread; ticks reach it as channel messages drained by `pump`.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;

use crate::audio;
use crate::audio_api::{AudioCommand, AudioSink, ChainParam, LeadParams, TriggerParams};
use crate::error::{EngineError, Result};
use crate::loader::impulse_loader::{self, ImpulseBank};
use crate::pipeline::config::EngineConfig;
use crate::pipeline::effects::ImpulseType;
use crate::pipeline::grid_index::GridIndex;
use crate::pipeline::matrix::Matrix;
use crate::pipeline::params::{ParamName, ParamValue, Parameters};
use crate::pipeline::playback::{PlaybackPattern, PlaybackState};
use crate::scales::{self, NoteName};
use crate::scheduler::{self, Scheduler, SchedulerEvent};
use crate::shared::{CellState, DisplayState, InputEvent, MAX_BPM, MIN_BPM};

// chromatic fallback when no scale is loaded: C2 up four octaves
const SWEEP_OCTAVES: f32 = 4.0;
const MIN_OCTAVE: i32 = 0;
const MAX_OCTAVE: i32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type StepListener = Box<dyn FnMut(usize)>;

pub struct Middle {
    config: EngineConfig,
    matrix: Matrix,
    grid: GridIndex,
    params: Parameters,
    playback: PlaybackState,
    bpm: f32,

    scale: Option<&'static str>,
    octave: i32,
    scale_freqs: Vec<f32>,
    impulse: ImpulseType,

    // (row, col) pairs triggered on the last tick
    playing_notes: HashSet<(usize, usize)>,
    listeners: Vec<(ListenerId, StepListener)>,
    next_listener: u64,

    scheduler: Option<Scheduler>,
    sink: Option<Box<dyn AudioSink>>,
    impulses: Option<ImpulseBank>,
    last_error: Option<String>,
}

impl Middle {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Self::build(config, PlaybackState::new)
    }

    /// Same as `new`, with a fixed seed for the random pattern.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Self::build(config, |size| PlaybackState::with_seed(size, seed))
    }

    fn build(mut config: EngineConfig, playback: impl FnOnce(usize) -> PlaybackState) -> Result<Self> {
        config.params = config.params.sanitized()?;
        let size = config.matrix_size;
        let mut playback = playback(size);
        playback.set_pattern(config.pattern);
        let scheduler = Scheduler::spawn(config.bpm)?;

        let mut middle = Self {
            matrix: Matrix::new(size),
            grid: GridIndex::new(size),
            params: config.params,
            playback,
            bpm: config.bpm,
            scale: None,
            octave: config.octave,
            scale_freqs: Vec::new(),
            impulse: config.impulse,
            playing_notes: HashSet::new(),
            listeners: Vec::new(),
            next_listener: 0,
            scheduler: Some(scheduler),
            sink: None,
            impulses: None,
            last_error: None,
            config,
        };
        if let Some(name) = middle.config.scale.clone() {
            middle.set_scale(&name)?;
        }
        Ok(middle)
    }

    // ── lifecycle ────────────────────────────────────────────────

    /// Opens the default output device. Idempotent.
    pub fn initialize(&mut self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let handle = audio::start_audio(&self.params)
            .map_err(|e| EngineError::AudioUnavailable(format!("{e:#}")))?;
        self.initialize_with(Box::new(handle))
    }

    /// Attaches any sink (the offline renderer in tests and headless runs),
    /// loads the impulse responses and pushes the current sound settings.
    pub fn initialize_with(&mut self, sink: Box<dyn AudioSink>) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        if self.scheduler.is_none() {
            // first use after cleanup
            self.scheduler = Some(Scheduler::spawn(self.bpm)?);
        }
        let sample_rate = sink.sample_rate();
        log::info!(target: "engine", "initializing at {sample_rate} Hz");
        self.impulses = Some(impulse_loader::load_bank(&self.config.impulse_dir, sample_rate));
        self.sink = Some(sink);

        for param in [
            ParamName::FilterCutoff,
            ParamName::FilterResonance,
            ParamName::DelayTime,
            ParamName::DelayFeedback,
            ParamName::ReverbMix,
            ParamName::Distortion,
            ParamName::Waveform,
        ] {
            self.push_param(param);
        }
        self.set_impulse_type(self.impulse);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.sink.is_some()
    }

    /// Stops everything and releases the audio device and scheduler thread.
    /// `initialize` may be called again afterwards.
    pub fn cleanup(&mut self) {
        self.stop_sequence();
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.terminate();
        }
        self.sink = None;
        self.impulses = None;
        log::info!(target: "engine", "cleaned up");
    }

    /// Throws away the scheduler thread and starts a fresh one. The way back
    /// after a scheduler fault; playback is left stopped.
    pub fn reinitialize_scheduler(&mut self) -> Result<()> {
        if self.playback.is_playing() {
            self.stop_sequence();
        }
        if let Some(mut old) = self.scheduler.take() {
            old.terminate();
        }
        self.scheduler = Some(Scheduler::spawn(self.bpm)?);
        self.last_error = None;
        log::debug!(target: "engine", "scheduler restarted at {} bpm", self.bpm);
        Ok(())
    }

    // ── grid ─────────────────────────────────────────────────────

    pub fn set_matrix(&mut self, rows: Vec<Vec<bool>>) -> Result<()> {
        self.matrix = Matrix::from_rows(rows, self.matrix.size())?;
        self.grid.rescan(&self.matrix);
        Ok(())
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: bool) -> Result<()> {
        self.matrix.set(row, col, value)?;
        self.grid.rescan(&self.matrix);
        Ok(())
    }

    pub fn toggle_cell(&mut self, row: usize, col: usize) -> Result<bool> {
        let value = self.matrix.toggle(row, col)?;
        self.grid.rescan(&self.matrix);
        Ok(value)
    }

    pub fn clear_matrix(&mut self) {
        self.matrix.clear();
        self.grid.rescan(&self.matrix);
    }

    /// New empty n x n grid. Stops playback and restarts the scheduler so no
    /// tick from the old geometry can land on the new one.
    pub fn resize_matrix(&mut self, size: usize) -> Result<()> {
        let matrix = Matrix::resized(size)?;
        self.stop_sequence();
        self.matrix = matrix;
        self.grid.clear(size);
        self.playback.resize(size);
        self.playing_notes.clear();
        self.reinitialize_scheduler()
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn matrix_size(&self) -> usize {
        self.matrix.size()
    }

    pub fn active_rows(&self, column: usize) -> &[usize] {
        self.grid.active_rows(column)
    }

    pub fn active_notes_count(&self) -> usize {
        self.grid.count_active()
    }

    // ── transport ────────────────────────────────────────────────

    pub fn set_bpm(&mut self, bpm: f32) -> Result<()> {
        let bpm = scheduler::validate_bpm(bpm)?;
        self.scheduler()?.set_tempo(bpm)?;
        self.bpm = bpm;
        Ok(())
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Switching while playing restarts from column 0.
    pub fn set_playback_pattern(&mut self, pattern: PlaybackPattern) -> Result<()> {
        self.playback.set_pattern(pattern);
        if self.playback.is_playing() {
            self.stop_sequence();
            self.start_sequence()?;
        }
        Ok(())
    }

    pub fn playback_pattern(&self) -> PlaybackPattern {
        self.playback.pattern()
    }

    pub fn start_sequence(&mut self) -> Result<()> {
        let sink = self.sink.as_ref().ok_or(EngineError::NotInitialized)?;
        sink.send(AudioCommand::Resume);
        self.playback.start();
        let (bpm, pattern) = (self.bpm, self.playback.pattern());
        if let Err(e) = self.scheduler().and_then(|s| s.start(bpm, pattern)) {
            self.playback.stop();
            return Err(e);
        }
        log::info!(target: "engine", "playing at {bpm} bpm, {pattern}");
        Ok(())
    }

    /// Stops the clock and cuts every sound at once, tails included.
    pub fn stop_sequence(&mut self) {
        if let Some(scheduler) = self.scheduler.as_ref() {
            if let Err(e) = scheduler.stop() {
                log::debug!(target: "engine", "stop on a halted scheduler: {e}");
            }
        }
        self.playback.stop();
        if let Some(sink) = self.sink.as_ref() {
            sink.send(AudioCommand::Silence);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn current_step(&self) -> usize {
        self.playback.current_step()
    }

    pub fn is_column_active(&self, col: usize) -> bool {
        self.playback.current_step() == col
    }

    pub fn is_note_playing(&self, row: usize, col: usize) -> bool {
        self.playing_notes.contains(&(row, col))
            || (self.playback.is_playing() && col == self.playback.current_step())
    }

    // ── listeners ────────────────────────────────────────────────

    /// `callback` runs on every tick with the column being played, before
    /// the playhead moves on.
    pub fn on_step_change(&mut self, callback: impl FnMut(usize) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    // ── scheduler events ─────────────────────────────────────────

    /// Handles whatever the scheduler has sent so far without waiting.
    /// Returns the number of ticks played.
    pub fn pump(&mut self) -> usize {
        let Some(events) = self.scheduler.as_ref().map(|s| s.events().clone()) else {
            return 0;
        };
        let mut ticks = 0;
        while let Ok(event) = events.try_recv() {
            ticks += self.handle_event(event);
        }
        ticks
    }

    /// Handles scheduler events as they arrive for up to `duration`.
    pub fn pump_for(&mut self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let Some(events) = self.scheduler.as_ref().map(|s| s.events().clone()) else {
            std::thread::sleep(duration);
            return 0;
        };
        let mut ticks = 0;
        loop {
            match events.recv_deadline(deadline) {
                Ok(event) => ticks += self.handle_event(event),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    // scheduler gone; still honor the wait
                    let left = deadline.saturating_duration_since(Instant::now());
                    std::thread::sleep(left);
                    break;
                }
            }
        }
        ticks
    }

    fn handle_event(&mut self, event: SchedulerEvent) -> usize {
        match event {
            SchedulerEvent::PlayStep => {
                let was_playing = self.playback.is_playing();
                self.play_current_step();
                usize::from(was_playing)
            }
            SchedulerEvent::Error(message) => {
                log::error!(target: "engine", "scheduler fault: {message}");
                self.playback.stop();
                if let Some(sink) = self.sink.as_ref() {
                    sink.send(AudioCommand::Silence);
                }
                self.last_error = Some(message);
                0
            }
        }
    }

    /// One tick: sound the current column, tell listeners, move the playhead.
    /// Does nothing when stopped, so ticks still queued from before a stop
    /// are harmless.
    pub fn play_current_step(&mut self) {
        if !self.playback.is_playing() {
            return;
        }
        let step = self.playback.current_step();
        self.playing_notes.clear();

        if let Some(sink) = self.sink.as_ref() {
            let now = sink.current_time();
            for &row in self.grid.active_rows(step) {
                let t = TriggerParams::new(self.frequency_for(step, row), self.volume_for(row), now, &self.params);
                sink.send(AudioCommand::Trigger(t));
                self.playing_notes.insert((row, step));
            }
        }

        for (_, listener) in self.listeners.iter_mut() {
            listener(step);
        }

        self.playback.advance();
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── pitch ────────────────────────────────────────────────────

    pub fn set_scale(&mut self, name: &str) -> Result<()> {
        let scale = scales::find_scale(name).ok_or_else(|| EngineError::UnknownScale(name.to_string()))?;
        self.scale = Some(scale.name);
        self.update_frequency_map();
        Ok(())
    }

    pub fn scale(&self) -> Option<&'static str> {
        self.scale
    }

    pub fn set_octave(&mut self, octave: i32) -> Result<()> {
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(EngineError::InvalidParameterValue("octave"));
        }
        self.octave = octave;
        self.update_frequency_map();
        Ok(())
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    // rebuild the table; a playing column is struck again at the new pitches
    fn update_frequency_map(&mut self) {
        self.scale_freqs = self
            .scale
            .and_then(|name| scales::scale_frequencies(name, self.octave))
            .unwrap_or_default();

        if !self.playback.is_playing() {
            return;
        }
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let step = self.playback.current_step();
        let now = sink.current_time();
        for &row in self.grid.active_rows(step) {
            let t = TriggerParams::new(self.frequency_for(step, row), self.volume_for(row), now, &self.params);
            sink.send(AudioCommand::Trigger(t));
        }
    }

    /// Pitch of a cell. Only the row matters; the column is accepted so
    /// callers can pass a cell as-is.
    pub fn frequency_for(&self, _column: usize, row: usize) -> f32 {
        let len = self.scale_freqs.len();
        if len == 0 {
            let n = self.matrix.size().max(1) as f32;
            return scales::note_frequency(NoteName::C, 2) * 2f32.powf(row as f32 / n * SWEEP_OCTAVES);
        }
        let octave = (row / len) as i32;
        self.scale_freqs[row % len] * 2f32.powi(octave)
    }

    // top rows are loudest
    pub fn volume_for(&self, row: usize) -> f32 {
        1.0 - row as f32 / self.matrix.size().max(1) as f32
    }

    // ── sound ────────────────────────────────────────────────────

    /// Validates and stores a parameter. Continuous chain parameters glide on
    /// the running engine; envelope values apply to the next voice.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<()> {
        let name: ParamName = name.parse()?;
        let value = value.into();
        if name == ParamName::Tempo {
            return self.set_bpm(value.number(name)?);
        }
        self.params.apply(name, value)?;
        self.push_param(name);
        Ok(())
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    fn push_param(&self, name: ParamName) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let p = &self.params;
        let chain = |param, value| AudioCommand::SetChain { param, value };
        let cmd = match name {
            ParamName::FilterCutoff => chain(ChainParam::FilterCutoff, p.filter_cutoff),
            ParamName::FilterResonance => chain(ChainParam::FilterResonance, p.filter_resonance),
            ParamName::DelayTime => chain(ChainParam::DelayTime, p.delay_time),
            ParamName::DelayFeedback => chain(ChainParam::DelayFeedback, p.delay_feedback),
            ParamName::ReverbMix => chain(ChainParam::ReverbMix, p.reverb_mix),
            ParamName::Distortion => AudioCommand::SetDistortion(p.distortion),
            ParamName::Waveform => AudioCommand::SetLeadWaveform(p.waveform),
            // stored, picked up by the next trigger
            ParamName::Attack | ParamName::Decay | ParamName::Sustain | ParamName::Release | ParamName::Tempo => {
                return;
            }
        };
        sink.send(cmd);
    }

    /// Swaps the reverb room. Before initialization this only records the
    /// choice.
    pub fn set_impulse_type(&mut self, impulse: ImpulseType) {
        self.impulse = impulse;
        let (Some(sink), Some(bank)) = (self.sink.as_ref(), self.impulses.as_ref()) else {
            return;
        };
        let convolver = audio::Convolver::new(bank.get(impulse), sink.sample_rate() as f32);
        log::debug!(
            target: "engine",
            "impulse {} ({} partitions{})",
            impulse.name(),
            convolver.num_partitions(),
            if bank.is_synthetic(impulse) { ", synthetic" } else { "" }
        );
        sink.send(AudioCommand::SetImpulse(Box::new(convolver)));
    }

    pub fn impulse_type(&self) -> ImpulseType {
        self.impulse
    }

    /// Strikes the lead tone at a cell's pitch, for auditioning while painting.
    /// Works whether or not the sequence is playing.
    pub fn preview_note(&self, column: usize, row: usize) -> Result<()> {
        let sink = self.sink.as_ref().ok_or(EngineError::NotInitialized)?;
        // a stop leaves the bus muted; voices and tails are already gone
        sink.send(AudioCommand::Resume);
        let lead = LeadParams::new(
            self.frequency_for(column, row),
            self.volume_for(row),
            sink.current_time(),
            &self.params,
        );
        sink.send(AudioCommand::Lead(lead));
        Ok(())
    }

    fn scheduler(&self) -> Result<&Scheduler> {
        self.scheduler.as_ref().ok_or(EngineError::SchedulerHalted)
    }

    // ── TUI glue ─────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::ToggleCell { row, col } => {
                self.toggle_cell(row, col)?;
            }
            InputEvent::PaintCell { row, col } => {
                self.set_cell(row, col, true)?;
                self.preview_note(col, row)?;
            }
            InputEvent::EraseCell { row, col } => self.set_cell(row, col, false)?,
            InputEvent::PreviewCell { row, col } => self.preview_note(col, row)?,
            InputEvent::ClearGrid => self.clear_matrix(),
            InputEvent::PlayPress => {
                if self.is_playing() {
                    self.stop_sequence();
                } else {
                    self.start_sequence()?;
                }
            }
            InputEvent::NextPattern => self.set_playback_pattern(self.playback.pattern().next())?,
            InputEvent::AdjustBpm(delta) => self.set_bpm((self.bpm + delta).clamp(MIN_BPM, MAX_BPM))?,
            InputEvent::NextScale => {
                let names: Vec<&str> = scales::scale_names().collect();
                let next = match self.scale.and_then(|s| names.iter().position(|n| *n == s)) {
                    Some(i) => names[(i + 1) % names.len()],
                    None => names[0],
                };
                self.set_scale(next)?;
            }
            InputEvent::OctaveUp => self.set_octave((self.octave + 1).min(MAX_OCTAVE))?,
            InputEvent::OctaveDown => self.set_octave((self.octave - 1).max(MIN_OCTAVE))?,
            InputEvent::NextWaveform => {
                let next = self.params.waveform.next();
                self.set_parameter(ParamName::Waveform.key(), next)?;
            }
            InputEvent::NextImpulse => self.set_impulse_type(self.impulse.next()),
            InputEvent::AdjustParam(name, delta) => {
                if let Some(ParamValue::Number(v)) = self.params.get(name) {
                    self.set_parameter(name.key(), v + delta)?;
                }
            }
            InputEvent::Quit => {}
        }
        Ok(())
    }

    pub fn display_state(&self) -> DisplayState {
        let size = self.matrix.size();
        let playing = self.playback.is_playing();
        let step = self.playback.current_step();
        let cells = (0..size)
            .map(|row| {
                (0..size)
                    .map(|col| {
                        let on = self.matrix.get(row, col);
                        match (on, self.playing_notes.contains(&(row, col))) {
                            (true, true) => CellState::Playing,
                            (true, false) => CellState::On,
                            (false, _) if playing && col == step => CellState::Playhead,
                            _ => CellState::Off,
                        }
                    })
                    .collect()
            })
            .collect();

        DisplayState {
            size,
            cells,
            current_step: step,
            playing,
            active_notes: self.grid.count_active(),
            bpm: self.bpm,
            pattern: self.playback.pattern(),
            scale: self.scale.unwrap_or("chromatic").to_string(),
            octave: self.octave,
            waveform: self.params.waveform,
            impulse: self.impulse,
            params: self.params,
            status: self.last_error.clone(),
        }
    }
}

impl Drop for Middle {
    fn drop(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineSink;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config(size: usize) -> EngineConfig {
        EngineConfig {
            matrix_size: size,
            impulse_dir: std::path::PathBuf::from("/nonexistent"),
            ..EngineConfig::default()
        }
    }

    fn engine(size: usize) -> (Middle, OfflineSink) {
        let mut m = Middle::with_seed(config(size), 1).unwrap();
        let sink = OfflineSink::new(8000, m.params());
        m.initialize_with(Box::new(sink.clone())).unwrap();
        (m, sink)
    }

    #[test]
    fn tempo_is_kept_when_the_scheduler_is_gone() {
        let (mut m, _sink) = engine(8);
        m.cleanup();
        assert!(matches!(m.set_bpm(90.0), Err(EngineError::SchedulerHalted)));
        assert_eq!(m.bpm(), 120.0);
        m.reinitialize_scheduler().unwrap();
        m.set_bpm(90.0).unwrap();
        assert_eq!(m.bpm(), 90.0);
    }

    #[test]
    fn tick_triggers_column_notifies_then_advances() {
        let (mut m, sink) = engine(8);
        m.set_cell(2, 0, true).unwrap();
        m.set_cell(5, 0, true).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        m.on_step_change(move |s| log.borrow_mut().push(s));

        m.start_sequence().unwrap();
        m.play_current_step();

        assert_eq!(*seen.borrow(), vec![0]);
        assert_eq!(m.current_step(), 1);
        assert!(m.is_note_playing(2, 0));
        assert!(m.is_note_playing(5, 0));
        assert!(!m.is_note_playing(3, 0));
        // the playhead column counts as playing too
        assert!(m.is_note_playing(7, 1));
        assert_eq!(sink.engine().unwrap().active_voices(), 2);
        m.stop_sequence();
    }

    #[test]
    fn stray_tick_after_stop_is_ignored() {
        let (mut m, _sink) = engine(8);
        m.start_sequence().unwrap();
        m.play_current_step();
        m.stop_sequence();
        let step = m.current_step();
        m.play_current_step();
        assert_eq!(m.current_step(), step);
    }

    #[test]
    fn chromatic_sweep_without_scale() {
        let mut cfg = config(64);
        cfg.scale = None;
        let m = Middle::new(cfg).unwrap();
        assert!((m.frequency_for(0, 0) - 65.41).abs() < 1e-3);
        assert!((m.frequency_for(0, 32) - 65.41 * 4.0).abs() < 1e-2);
        assert_eq!(m.volume_for(0), 1.0);
        assert_eq!(m.volume_for(32), 0.5);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let (mut m, _sink) = engine(4);
        let hits = Rc::new(RefCell::new(0));
        let (a, b) = (hits.clone(), hits.clone());
        let first = m.on_step_change(move |_| *a.borrow_mut() += 1);
        m.on_step_change(move |_| *b.borrow_mut() += 10);
        assert!(m.unsubscribe(first));
        assert!(!m.unsubscribe(first));
        m.start_sequence().unwrap();
        m.play_current_step();
        assert_eq!(*hits.borrow(), 10);
        m.stop_sequence();
    }

    #[test]
    fn parameters_reach_the_engine() {
        let (mut m, sink) = engine(4);
        m.set_parameter("reverbMix", 0.9).unwrap();
        m.set_parameter("distortion", 0.4).unwrap();
        sink.render_seconds(2.0);
        let e = sink.engine().unwrap();
        assert!((e.reverb_gain() - 0.9).abs() < 1e-3);
        assert_eq!(e.distortion_drive(), 0.4);
    }

    #[test]
    fn bad_parameter_values_are_rejected() {
        let (mut m, _sink) = engine(4);
        assert!(matches!(
            m.set_parameter("waveform", 1.0),
            Err(EngineError::InvalidParameterValue("waveform"))
        ));
        assert!(matches!(
            m.set_parameter("attack", f32::NAN),
            Err(EngineError::InvalidParameterValue("attack"))
        ));
        assert!(matches!(m.set_parameter("tempo", -4.0), Err(EngineError::InvalidTempo(_))));
        assert_eq!(m.bpm(), 120.0);
    }

    #[test]
    fn scale_change_while_playing_restrikes_the_column() {
        let (mut m, sink) = engine(8);
        m.set_cell(1, 0, true).unwrap();
        m.start_sequence().unwrap();
        m.play_current_step(); // plays column 0, moves to 1
        m.set_cell(3, 1, true).unwrap();
        let before = sink.engine().unwrap().active_voices();
        m.set_scale("Minor").unwrap();
        assert_eq!(sink.engine().unwrap().active_voices(), before + 1);
        m.stop_sequence();
    }

    #[test]
    fn scheduler_fault_stops_and_mutes() {
        let (mut m, sink) = engine(4);
        m.start_sequence().unwrap();
        m.handle_event(SchedulerEvent::Error("invalid tempo: NaN".into()));
        assert!(!m.is_playing());
        assert_eq!(m.last_error(), Some("invalid tempo: NaN"));
        assert_eq!(sink.engine().unwrap().output_gain(), 0.0);
        m.reinitialize_scheduler().unwrap();
        assert!(m.last_error().is_none());
    }

    #[test]
    fn start_requires_initialization() {
        let mut m = Middle::new(config(4)).unwrap();
        assert!(matches!(m.start_sequence(), Err(EngineError::NotInitialized)));
        assert!(!m.is_playing());
        assert!(matches!(m.preview_note(0, 0), Err(EngineError::NotInitialized)));
    }

    #[test]
    fn display_marks_playing_cells_and_playhead() {
        let (mut m, _sink) = engine(4);
        m.set_cell(0, 0, true).unwrap();
        m.set_cell(1, 1, true).unwrap();
        m.start_sequence().unwrap();
        m.play_current_step();
        let ds = m.display_state();
        assert_eq!(ds.cells[0][0], CellState::Playing);
        assert_eq!(ds.cells[1][1], CellState::On);
        assert_eq!(ds.cells[2][1], CellState::Playhead);
        assert_eq!(ds.cells[2][2], CellState::Off);
        assert_eq!(ds.active_notes, 2);
        m.stop_sequence();
    }

    #[test]
    fn input_events_drive_the_engine() {
        let (mut m, _sink) = engine(4);
        m.handle_input(InputEvent::ToggleCell { row: 1, col: 2 }).unwrap();
        assert_eq!(m.active_rows(2), &[1]);
        m.handle_input(InputEvent::NextScale).unwrap();
        assert_eq!(m.scale(), Some("Minor"));
        m.handle_input(InputEvent::AdjustParam(ParamName::FilterCutoff, -1000.0)).unwrap();
        assert_eq!(m.params().filter_cutoff, 1000.0);
        m.handle_input(InputEvent::AdjustBpm(1000.0)).unwrap();
        assert_eq!(m.bpm(), MAX_BPM);
        assert!(m.handle_input(InputEvent::ToggleCell { row: 9, col: 0 }).is_err());
    }
}
