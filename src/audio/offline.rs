use std::sync::{Arc, Mutex, MutexGuard};

use super::engine::Engine;
use super::frame::StereoFrame;
use crate::audio_api::{AudioCommand, AudioSink};
use crate::pipeline::params::Parameters;

/// Renders on demand instead of on a device clock. Commands land on the
/// engine right away; time only moves when someone calls `render`.
/// Clones share the same engine, so a test can hand one to `Middle` and keep
/// another to pull audio and inspect state.
#[derive(Clone)]
pub struct OfflineSink {
    engine: Arc<Mutex<Engine>>,
    sample_rate: u32,
}

impl OfflineSink {
    pub fn new(sample_rate: u32, params: &Parameters) -> Self {
        Self {
            engine: Arc::new(Mutex::new(Engine::new(sample_rate, params))),
            sample_rate,
        }
    }

    pub fn render(&self, frames: usize) -> Vec<StereoFrame> {
        let mut buf = vec![StereoFrame::zero(); frames];
        if let Ok(mut engine) = self.engine.lock() {
            engine.render_block(&mut buf);
        }
        buf
    }

    pub fn render_seconds(&self, seconds: f64) -> Vec<StereoFrame> {
        self.render((seconds * self.sample_rate as f64).round() as usize)
    }

    // None only if a render panicked mid-block
    pub fn engine(&self) -> Option<MutexGuard<'_, Engine>> {
        self.engine.lock().ok()
    }
}

impl AudioSink for OfflineSink {
    fn send(&self, cmd: AudioCommand) {
        if let Ok(mut engine) = self.engine.lock() {
            engine.handle_cmd(cmd);
        }
    }

    fn current_time(&self) -> f64 {
        self.engine.lock().map(|e| e.now()).unwrap_or(0.0)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
