// The step clock. Lives on its own thread so a slow frame on the main thread
// can't stall timing; the only way in or out is a channel in each direction.
//
//   main -> scheduler: StartPlayback / StopPlayback / SetTempo
//   scheduler -> main: PlayStep / Error
//
// Nothing is shared. The main thread owns the playhead and decides what a
// PlayStep means; the scheduler only knows *when*.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{EngineError, Result};
use crate::pipeline::playback::PlaybackPattern;

// never re-arm sooner than this, even when we've fallen behind
pub const FLOOR_DELAY: Duration = Duration::from_millis(10);
const STEPS_PER_BEAT: f64 = 4.0; // sixteenth notes

#[derive(Clone, Debug, PartialEq)]
pub enum SchedulerCommand {
    StartPlayback { bpm: f32, pattern: PlaybackPattern },
    StopPlayback,
    SetTempo(f32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SchedulerEvent {
    PlayStep,
    Error(String),
}

pub fn step_interval(bpm: f32) -> Duration {
    Duration::from_secs_f64(60.0 / (bpm as f64 * STEPS_PER_BEAT))
}

pub fn validate_bpm(bpm: f32) -> Result<f32> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(EngineError::InvalidTempo(bpm))
    }
}

/// Deadline bookkeeping for the tick loop.
///
/// Deadlines are accumulated (`next += interval`) rather than measured from
/// the moment a tick actually fired, so wakeup lateness never compounds: each
/// tick is off by at most its own jitter.
#[derive(Debug)]
pub struct TickTimer {
    bpm: f32,
    next_deadline: Option<Instant>,
}

impl TickTimer {
    pub fn new(bpm: f32) -> Self {
        Self { bpm, next_deadline: None }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm;
    }

    // next tick starts a fresh phase from whenever it fires
    pub fn rebase(&mut self) {
        self.next_deadline = None;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    /// Call right after a tick went out at `now`; returns when to wake for the
    /// next one.
    pub fn schedule_after_tick(&mut self, now: Instant) -> Instant {
        let base = self.next_deadline.unwrap_or(now);
        let deadline = base + step_interval(self.bpm);
        self.next_deadline = Some(deadline);
        now + deadline.saturating_duration_since(now).max(FLOOR_DELAY)
    }
}

pub struct Scheduler {
    tx: Option<Sender<SchedulerCommand>>,
    events: Receiver<SchedulerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn spawn(initial_bpm: f32) -> Result<Self> {
        let (tx, cmd_rx) = crossbeam_channel::unbounded::<SchedulerCommand>();
        let (event_tx, events) = crossbeam_channel::unbounded::<SchedulerEvent>();
        let handle = thread::Builder::new()
            .name("stepgrid-scheduler".into())
            .spawn(move || run_loop(cmd_rx, event_tx, initial_bpm))?;

        Ok(Self {
            tx: Some(tx),
            events,
            handle: Some(handle),
        })
    }

    pub fn start(&self, bpm: f32, pattern: PlaybackPattern) -> Result<()> {
        self.send(SchedulerCommand::StartPlayback { bpm, pattern })
    }

    pub fn stop(&self) -> Result<()> {
        self.send(SchedulerCommand::StopPlayback)
    }

    pub fn set_tempo(&self, bpm: f32) -> Result<()> {
        self.send(SchedulerCommand::SetTempo(bpm))
    }

    pub fn events(&self) -> &Receiver<SchedulerEvent> {
        &self.events
    }

    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn send(&self, cmd: SchedulerCommand) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(EngineError::SchedulerHalted)?;
        tx.send(cmd).map_err(|_| EngineError::SchedulerHalted)
    }

    // closes the command channel and waits for the loop to notice
    pub fn terminate(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!(target: "scheduler", "scheduler thread panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn run_loop(commands: Receiver<SchedulerCommand>, events: Sender<SchedulerEvent>, initial_bpm: f32) {
    let mut timer = TickTimer::new(initial_bpm);
    let mut playing = false;
    let mut wake: Option<Instant> = None;

    loop {
        let received = match wake {
            Some(at) => commands.recv_deadline(at),
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(SchedulerCommand::StartPlayback { bpm, pattern }) => {
                if playing {
                    continue;
                }
                if let Err(e) = validate_bpm(bpm) {
                    fault(&events, e);
                    return;
                }
                log::debug!(target: "scheduler", "start at {bpm} bpm ({pattern})");
                timer.set_bpm(bpm);
                timer.rebase();
                playing = true;
                match tick(&mut timer, &events) {
                    Some(at) => wake = Some(at),
                    None => return,
                }
            }
            Ok(SchedulerCommand::StopPlayback) => {
                playing = false;
                timer.rebase();
                wake = None;
            }
            Ok(SchedulerCommand::SetTempo(bpm)) => {
                if let Err(e) = validate_bpm(bpm) {
                    fault(&events, e);
                    return;
                }
                timer.set_bpm(bpm);
                if playing {
                    timer.rebase();
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !playing {
                    wake = None;
                    continue;
                }
                match tick(&mut timer, &events) {
                    Some(at) => wake = Some(at),
                    None => return,
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

// emit first, then work out the next wakeup. None once nobody is listening.
fn tick(timer: &mut TickTimer, events: &Sender<SchedulerEvent>) -> Option<Instant> {
    events.send(SchedulerEvent::PlayStep).ok()?;
    Some(timer.schedule_after_tick(Instant::now()))
}

fn fault(events: &Sender<SchedulerEvent>, err: EngineError) {
    log::error!(target: "scheduler", "halting: {err}");
    let _ = events.send(SchedulerEvent::Error(err.to_string()));
}
