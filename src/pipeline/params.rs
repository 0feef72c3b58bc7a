use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub const MAX_DELAY_SECONDS: f32 = 2.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Waveform::Sine => Waveform::Square,
            Waveform::Square => Waveform::Sawtooth,
            Waveform::Sawtooth => Waveform::Triangle,
            Waveform::Triangle => Waveform::Sine,
        }
    }
}

impl FromStr for Waveform {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Waveform::ALL
            .into_iter()
            .find(|w| w.label() == s)
            .ok_or(EngineError::InvalidParameterValue("waveform"))
    }
}

/// Defaults shared by every new voice and by the persistent effects chain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Parameters {
    pub attack: f32,  // seconds
    pub decay: f32,   // seconds
    pub sustain: f32, // 0..1 of the note volume
    pub release: f32, // seconds
    pub delay_time: f32,
    pub delay_feedback: f32,
    pub reverb_mix: f32,
    pub filter_cutoff: f32,    // Hz
    pub filter_resonance: f32, // dB, same convention as a browser lowpass biquad
    pub distortion: f32,       // drive 0..1, 0 bypasses
    pub waveform: Waveform,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            attack: 0.05,
            decay: 0.2,
            sustain: 0.7,
            release: 0.3,
            delay_time: 0.3,
            delay_feedback: 0.3,
            reverb_mix: 0.3,
            filter_cutoff: 2000.0,
            filter_resonance: 2.0,
            distortion: 0.0,
            waveform: Waveform::Sine,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamName {
    Attack,
    Decay,
    Sustain,
    Release,
    DelayTime,
    DelayFeedback,
    ReverbMix,
    FilterCutoff,
    FilterResonance,
    Distortion,
    Waveform,
    Tempo,
}

impl ParamName {
    pub const ALL: [ParamName; 12] = [
        ParamName::Attack,
        ParamName::Decay,
        ParamName::Sustain,
        ParamName::Release,
        ParamName::DelayTime,
        ParamName::DelayFeedback,
        ParamName::ReverbMix,
        ParamName::FilterCutoff,
        ParamName::FilterResonance,
        ParamName::Distortion,
        ParamName::Waveform,
        ParamName::Tempo,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ParamName::Attack => "attack",
            ParamName::Decay => "decay",
            ParamName::Sustain => "sustain",
            ParamName::Release => "release",
            ParamName::DelayTime => "delayTime",
            ParamName::DelayFeedback => "delayFeedback",
            ParamName::ReverbMix => "reverbMix",
            ParamName::FilterCutoff => "filterCutoff",
            ParamName::FilterResonance => "filterResonance",
            ParamName::Distortion => "distortion",
            ParamName::Waveform => "waveform",
            ParamName::Tempo => "tempo",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ParamName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        ParamName::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| EngineError::UnknownParameter(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Number(f32),
    Waveform(Waveform),
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Number(v)
    }
}

impl From<Waveform> for ParamValue {
    fn from(w: Waveform) -> Self {
        ParamValue::Waveform(w)
    }
}

impl ParamValue {
    pub fn number(self, name: ParamName) -> Result<f32> {
        match self {
            ParamValue::Number(v) if v.is_finite() => Ok(v),
            _ => Err(EngineError::InvalidParameterValue(name.key())),
        }
    }
}

impl Parameters {
    /// Validates and stores one value. Tempo isn't part of the voice defaults
    /// (the scheduler owns it), so it is accepted here without being stored.
    pub fn apply(&mut self, name: ParamName, value: ParamValue) -> Result<()> {
        if name == ParamName::Waveform {
            return match value {
                ParamValue::Waveform(w) => {
                    self.waveform = w;
                    Ok(())
                }
                ParamValue::Number(_) => Err(EngineError::InvalidParameterValue(name.key())),
            };
        }

        let v = value.number(name)?;
        match name {
            ParamName::Attack => self.attack = v.max(0.0),
            ParamName::Decay => self.decay = v.max(0.0),
            ParamName::Sustain => self.sustain = v.clamp(0.0, 1.0),
            ParamName::Release => self.release = v.max(0.0),
            ParamName::DelayTime => self.delay_time = v.clamp(0.0, MAX_DELAY_SECONDS),
            ParamName::DelayFeedback => self.delay_feedback = v.clamp(0.0, 0.99), // keeps the loop from running away
            ParamName::ReverbMix => self.reverb_mix = v.max(0.0),
            ParamName::FilterCutoff => self.filter_cutoff = v.max(1.0),
            ParamName::FilterResonance => self.filter_resonance = v,
            ParamName::Distortion => self.distortion = v.clamp(0.0, 1.0),
            ParamName::Waveform | ParamName::Tempo => {}
        }
        Ok(())
    }

    /// Runs every stored value back through `apply`, so values read from a
    /// file get the same clamping as live edits. Non-finite numbers are
    /// rejected.
    pub fn sanitized(self) -> Result<Self> {
        let mut out = self;
        for name in ParamName::ALL {
            if let Some(value) = self.get(name) {
                out.apply(name, value)?;
            }
        }
        Ok(out)
    }

    pub fn get(&self, name: ParamName) -> Option<ParamValue> {
        let v = match name {
            ParamName::Attack => self.attack,
            ParamName::Decay => self.decay,
            ParamName::Sustain => self.sustain,
            ParamName::Release => self.release,
            ParamName::DelayTime => self.delay_time,
            ParamName::DelayFeedback => self.delay_feedback,
            ParamName::ReverbMix => self.reverb_mix,
            ParamName::FilterCutoff => self.filter_cutoff,
            ParamName::FilterResonance => self.filter_resonance,
            ParamName::Distortion => self.distortion,
            ParamName::Waveform => return Some(ParamValue::Waveform(self.waveform)),
            ParamName::Tempo => return None,
        };
        Some(ParamValue::Number(v))
    }
}
