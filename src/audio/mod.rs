use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::{AudioCommand, AudioSink};
use crate::pipeline::params::Parameters;

mod convolver;
mod delay;
mod effect;
mod engine;
mod filter;
mod frame;
mod offline;
mod param;
mod sample_buffer;
mod voice;

pub use convolver::Convolver;
pub use engine::{AudioClock, Engine, MAX_VOICES};
pub use frame::StereoFrame;
pub use offline::OfflineSink;
pub use sample_buffer::SampleBuffer;
pub use voice::{LeadTone, Voice};

const COMMAND_QUEUE: usize = 1024;
const SCRATCH_FRAMES: usize = 1024; // render granularity inside one callback

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    clock: AudioClock,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioSink for AudioHandle {
    fn send(&self, cmd: AudioCommand) {
        if let Err(e) = self.tx.try_send(cmd) {
            log::warn!(target: "audio", "dropping command, queue unavailable: {e}");
        }
    }

    fn current_time(&self) -> f64 {
        self.clock.seconds(self.sample_rate)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub fn start_audio(params: &Parameters) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;
    log::info!(
        target: "audio",
        "output device ready: {sample_rate} Hz, {channels} channel(s), {:?}",
        config.sample_format()
    );

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let engine = Engine::new(sample_rate, params);
            let clock = engine.clock();
            let output_stream = build_output_stream_f32(&device, &config.into(), rx, engine, channels)?;
            output_stream.play().context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                clock,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut scratch = vec![StereoFrame::zero(); SCRATCH_FRAMES];

    let err_fn = |err| log::error!(target: "audio", "output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }
            if channels == 0 {
                return;
            }

            // the engine renders stereo; fold or spread to whatever the device has
            for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
                let n_frames = chunk.len() / channels;
                let frames = &mut scratch[..n_frames];
                engine.render_block(frames);
                for (out, frame) in chunk.chunks_exact_mut(channels).zip(frames.iter()) {
                    match out.len() {
                        1 => out[0] = (frame.left + frame.right) * 0.5,
                        _ => {
                            out[0] = frame.left;
                            out[1] = frame.right;
                            for extra in &mut out[2..] {
                                *extra = 0.0;
                            }
                        }
                    }
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
