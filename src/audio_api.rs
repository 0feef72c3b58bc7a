// The only vocabulary the control side and the render side share. Everything
// in here crosses a thread boundary, so it is plain data (or, for the reverb,
// a fully prepared convolver the render thread just swaps in).

pub use crate::audio::{Convolver, SampleBuffer};
use crate::pipeline::params::{Parameters, Waveform};

/// One note: oscillator -> per-voice lowpass -> envelope -> shared chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerParams {
    pub frequency: f32,
    pub volume: f32,
    pub at: f64, // engine clock, seconds
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub cutoff: f32,
    pub resonance: f32,
    pub waveform: Waveform,
}

impl TriggerParams {
    // snapshot of the synth parameters at trigger time
    pub fn new(frequency: f32, volume: f32, at: f64, params: &Parameters) -> Self {
        Self {
            frequency,
            volume,
            at,
            attack: params.attack,
            decay: params.decay,
            sustain: params.sustain,
            release: params.release,
            cutoff: params.filter_cutoff,
            resonance: params.filter_resonance,
            waveform: params.waveform,
        }
    }

    pub fn release_end(&self) -> f64 {
        self.at + (self.attack.max(0.0) + self.decay.max(0.0) + self.release.max(0.0)) as f64
    }
}

/// Re-strike of the persistent lead oscillator (cell preview while painting).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeadParams {
    pub frequency: f32,
    pub volume: f32,
    pub at: f64,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl LeadParams {
    pub fn new(frequency: f32, volume: f32, at: f64, params: &Parameters) -> Self {
        Self {
            frequency,
            volume,
            at,
            attack: params.attack,
            decay: params.decay,
            sustain: params.sustain,
            release: params.release,
        }
    }
}

/// Continuous parameters of the shared chain; all of them glide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainParam {
    FilterCutoff,
    FilterResonance,
    DelayTime,
    DelayFeedback,
    ReverbMix,
}

#[derive(Debug)]
pub enum AudioCommand {
    Trigger(TriggerParams),
    Lead(LeadParams),
    SetChain { param: ChainParam, value: f32 },
    SetLeadWaveform(Waveform),
    SetDistortion(f32),

    // Impulse decoding and FFT prep happen on the control thread; the engine
    // only ever receives a ready-to-run convolver.
    SetImpulse(Box<Convolver>),

    // stop: mute the output and drop every voice and tail
    Silence,
    // start: open the output again
    Resume,
}

/// Where the control side sends audio work. The realtime device handle and
/// the offline renderer both implement it.
pub trait AudioSink {
    fn send(&self, cmd: AudioCommand);

    /// Seconds of audio rendered so far; the time base for `at` fields.
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> u32;
}
