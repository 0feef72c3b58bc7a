use std::f32::consts::TAU;

use super::filter::LowPass;
use super::param::{Envelope, SmoothedParam};
use crate::audio_api::{LeadParams, TriggerParams};
use crate::pipeline::params::Waveform;
use crate::scales::{self, NoteName};

const NOTE_GLIDE: f32 = 0.03; // seconds
const LEAD_GLIDE: f32 = 0.003;
// a voice outlives its release by this much before the slot is freed
pub const STOP_GRACE: f64 = 0.1;

// Naive (non band-limited) oscillator. Phase runs 0..1.
#[derive(Clone, Copy, Debug)]
pub struct Oscillator {
    phase: f32,
    waveform: Waveform,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self { phase: 0.0, waveform }
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    #[inline]
    pub fn next(&mut self, freq: f32, sample_rate: f32) -> f32 {
        let p = self.phase;
        let out = match self.waveform {
            Waveform::Sine => (TAU * p).sin(),
            Waveform::Square => {
                if p < 0.5 { 1.0 } else { -1.0 }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => {
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            }
        };
        self.phase += freq / sample_rate;
        self.phase -= self.phase.floor();
        out
    }
}

#[derive(Clone, Debug)]
pub struct Voice {
    osc: Oscillator,
    freq: SmoothedParam,
    filter: LowPass,
    env: Envelope,
    volume: f32,
    stop_at: f64,
    pub serial: u64, // trigger order, oldest gets stolen first
}

impl Voice {
    pub fn new(t: &TriggerParams, sample_rate: f32, serial: u64) -> Self {
        let env = Envelope::one_shot(
            t.at,
            t.volume * 0.8,
            t.volume * t.sustain,
            t.attack,
            t.decay,
            t.release,
        );
        let mut freq = SmoothedParam::new(t.frequency, NOTE_GLIDE, sample_rate);
        freq.set_target(t.frequency);
        Self {
            osc: Oscillator::new(t.waveform),
            freq,
            filter: LowPass::new(sample_rate, t.cutoff, t.resonance),
            env,
            volume: t.volume,
            stop_at: t.release_end() + STOP_GRACE,
            serial,
        }
    }

    /// One sample at engine time `t`. Silent (and not advancing) until the
    /// scheduled start.
    #[inline]
    pub fn render(&mut self, t: f64, sample_rate: f32) -> f32 {
        if t < self.env.start_time() || self.is_finished(t) {
            return 0.0;
        }
        let x = self.filter.process(self.osc.next(self.freq.next(), sample_rate));
        x * self.env.value_at(t)
    }

    pub fn is_finished(&self, t: f64) -> bool {
        t >= self.stop_at
    }

    pub fn frequency(&self) -> f32 {
        self.freq.target()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn start_time(&self) -> f64 {
        self.env.start_time()
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_at
    }
}

// The always-running oscillator behind cell previews. Silent until struck;
// each strike restarts the envelope from zero and glides to the new pitch.
#[derive(Clone, Debug)]
pub struct LeadTone {
    osc: Oscillator,
    freq: SmoothedParam,
    env: Envelope,
}

impl LeadTone {
    pub fn new(sample_rate: f32, waveform: Waveform) -> Self {
        Self {
            osc: Oscillator::new(waveform),
            freq: SmoothedParam::new(scales::note_frequency(NoteName::A, 4), LEAD_GLIDE, sample_rate),
            env: Envelope::silent(),
        }
    }

    pub fn strike(&mut self, p: &LeadParams) {
        self.env = Envelope::one_shot(
            p.at,
            p.volume,
            p.volume * p.sustain,
            p.attack,
            p.decay,
            p.release,
        );
        self.freq.set_target(p.frequency);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.osc.set_waveform(waveform);
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }

    pub fn silence(&mut self) {
        self.env = Envelope::silent();
    }

    pub fn frequency(&self) -> f32 {
        self.freq.value()
    }

    #[inline]
    pub fn render(&mut self, t: f64, sample_rate: f32) -> f32 {
        // the oscillator free-runs even while the gain is closed
        let x = self.osc.next(self.freq.next(), sample_rate);
        x * self.env.value_at(t)
    }
}
