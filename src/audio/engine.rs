use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::convolver::Convolver;
use super::delay::FeedbackDelay;
use super::effect::{Distortion, Effect};
use super::filter::LowPass;
use super::frame::StereoFrame;
use super::param::SmoothedParam;
use super::voice::{LeadTone, Voice};
use crate::audio_api::{AudioCommand, ChainParam, TriggerParams};
use crate::pipeline::params::{MAX_DELAY_SECONDS, Parameters};

pub const MAX_VOICES: usize = 64; // hard cap so we wont malloc in audio callback
const CHAIN_SMOOTHING: f32 = 0.1; // seconds, for every continuous chain param

/// Frames rendered so far, shared with the control thread so it can stamp
/// triggers against the same clock the engine renders on.
#[derive(Clone, Debug, Default)]
pub struct AudioClock(Arc<AtomicU64>);

impl AudioClock {
    pub fn frames(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn seconds(&self, sample_rate: u32) -> f64 {
        self.frames() as f64 / sample_rate.max(1) as f64
    }

    fn publish(&self, frames: u64) {
        self.0.store(frames, Ordering::Relaxed);
    }
}

// Signal flow, per sample:
//
//   voices ─┐
//           ├─► [distortion] ─► master lowpass ─┬────────────────────► dry ─┐
//   lead  ──┘                                   ├─► feedback delay ───────► ├─► × output gain
//                                               └─► convolver × reverb ───► ┘
pub struct Engine {
    sample_rate: f32,
    frames: u64,
    clock: AudioClock,

    voices: Vec<Voice>, // never grows past MAX_VOICES
    next_serial: u64,
    lead: LeadTone,

    distortion: Distortion,
    cutoff: SmoothedParam,
    resonance: SmoothedParam,
    master: LowPass,
    delay: FeedbackDelay,
    reverb_gain: SmoothedParam,
    convolver: Option<Box<Convolver>>,
    output_gain: f32,
}

impl Engine {
    pub fn new(sample_rate: u32, params: &Parameters) -> Self {
        let sr = sample_rate as f32;
        Self {
            sample_rate: sr,
            frames: 0,
            clock: AudioClock::default(),
            voices: Vec::with_capacity(MAX_VOICES),
            next_serial: 0,
            lead: LeadTone::new(sr, params.waveform),
            distortion: Distortion::new(params.distortion),
            cutoff: SmoothedParam::new(params.filter_cutoff, CHAIN_SMOOTHING, sr),
            resonance: SmoothedParam::new(params.filter_resonance, CHAIN_SMOOTHING, sr),
            master: LowPass::new(sr, params.filter_cutoff, params.filter_resonance),
            delay: FeedbackDelay::new(
                sr,
                MAX_DELAY_SECONDS,
                params.delay_time,
                params.delay_feedback,
                CHAIN_SMOOTHING,
            ),
            reverb_gain: SmoothedParam::new(params.reverb_mix, CHAIN_SMOOTHING, sr),
            convolver: None,
            output_gain: 1.0,
        }
    }

    pub fn clock(&self) -> AudioClock {
        self.clock.clone()
    }

    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Trigger(t) => self.trigger_voice(&t),
            AudioCommand::Lead(p) => self.lead.strike(&p),
            AudioCommand::SetChain { param, value } => self.set_chain(param, value),
            AudioCommand::SetLeadWaveform(w) => self.lead.set_waveform(w),
            AudioCommand::SetDistortion(drive) => self.distortion.set_drive(drive),
            AudioCommand::SetImpulse(conv) => {
                // frees the previous convolver on this thread; impulse swaps are rare
                self.convolver = Some(conv);
            }
            AudioCommand::Silence => self.silence(),
            AudioCommand::Resume => self.output_gain = 1.0,
        }
    }

    fn trigger_voice(&mut self, t: &TriggerParams) {
        let voice = Voice::new(t, self.sample_rate, self.next_serial);
        self.next_serial += 1;

        if self.voices.len() < MAX_VOICES {
            self.voices.push(voice);
            return;
        }
        // full: steal the oldest
        if let Some(slot) = self
            .voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.serial)
            .map(|(i, _)| i)
        {
            self.voices[slot] = voice;
        }
    }

    fn set_chain(&mut self, param: ChainParam, value: f32) {
        match param {
            ChainParam::FilterCutoff => self.cutoff.set_target(value),
            ChainParam::FilterResonance => self.resonance.set_target(value),
            ChainParam::DelayTime => self.delay.set_time(value),
            ChainParam::DelayFeedback => self.delay.set_feedback(value),
            ChainParam::ReverbMix => self.reverb_gain.set_target(value),
        }
    }

    fn silence(&mut self) {
        self.output_gain = 0.0;
        self.voices.clear();
        self.lead.silence();
        self.delay.clear();
        self.master.reset();
        if let Some(conv) = self.convolver.as_mut() {
            conv.reset();
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        let sr = self.sample_rate;
        let start = self.frames;

        // pass 1: voice bus, written into `out` as scratch
        for (i, frame) in out.iter_mut().enumerate() {
            let t = (start + i as u64) as f64 / sr as f64;
            let mut s = self.lead.render(t, sr);
            for v in self.voices.iter_mut() {
                s += v.render(t, sr);
            }
            *frame = StereoFrame::mono(s);
        }

        if !self.distortion.is_bypassed() {
            self.distortion.process(out);
        }

        // pass 2: shared chain
        for frame in out.iter_mut() {
            self.master.set(self.cutoff.next(), self.resonance.next());
            let filtered = self.master.process(frame.left);

            let dry = StereoFrame::mono(filtered);
            let echo = StereoFrame::mono(self.delay.process(filtered));
            let reverb_gain = self.reverb_gain.next();
            let wet = match self.convolver.as_mut() {
                Some(conv) => conv.process(filtered).scaled(reverb_gain),
                None => StereoFrame::zero(),
            };

            *frame = (dry + echo + wet).scaled(self.output_gain);
        }

        self.frames += out.len() as u64;
        let now = self.now();
        self.voices.retain(|v| !v.is_finished(now));
        self.clock.publish(self.frames);
    }

    // read-back for the control side and tests

    pub fn master_cutoff(&self) -> f32 {
        self.master.cutoff()
    }

    pub fn master_resonance(&self) -> f32 {
        self.master.resonance()
    }

    pub fn delay_time(&self) -> f32 {
        self.delay.time()
    }

    pub fn delay_feedback(&self) -> f32 {
        self.delay.feedback()
    }

    pub fn reverb_gain(&self) -> f32 {
        self.reverb_gain.value()
    }

    pub fn distortion_drive(&self) -> f32 {
        self.distortion.drive()
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn lead(&self) -> &LeadTone {
        &self.lead
    }

    pub fn has_impulse(&self) -> bool {
        self.convolver.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::LeadParams;
    use crate::pipeline::params::Waveform;

    const SR: u32 = 8000;

    fn engine() -> Engine {
        Engine::new(SR, &Parameters::default())
    }

    fn render(e: &mut Engine, frames: usize) -> Vec<StereoFrame> {
        let mut buf = vec![StereoFrame::zero(); frames];
        e.render_block(&mut buf);
        buf
    }

    fn note(e: &Engine, freq: f32) -> AudioCommand {
        AudioCommand::Trigger(TriggerParams::new(freq, 1.0, e.now(), &Parameters::default()))
    }

    #[test]
    fn triggered_voice_expires_after_release_plus_grace() {
        let mut e = engine();
        e.handle_cmd(note(&e, 440.0));
        assert_eq!(e.active_voices(), 1);
        let out = render(&mut e, SR as usize / 2);
        assert!(out.iter().any(|f| f.peak() > 0.05));
        assert_eq!(e.active_voices(), 1);
        // 0.55 s of envelope + 0.1 s grace
        render(&mut e, SR as usize / 4);
        assert_eq!(e.active_voices(), 0);
    }

    #[test]
    fn full_arena_steals_the_oldest() {
        let mut e = engine();
        for i in 0..MAX_VOICES + 3 {
            e.handle_cmd(note(&e, 100.0 + i as f32));
        }
        assert_eq!(e.active_voices(), MAX_VOICES);
        assert!(e.voices().iter().all(|v| v.serial >= 3));
    }

    #[test]
    fn chain_params_glide_to_target() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::SetChain { param: ChainParam::FilterCutoff, value: 500.0 });
        e.handle_cmd(AudioCommand::SetChain { param: ChainParam::ReverbMix, value: 0.8 });
        render(&mut e, 80); // 10 ms, a tenth of the time constant
        assert!(e.master_cutoff() > 1500.0);
        render(&mut e, SR as usize * 2);
        assert!((e.master_cutoff() - 500.0).abs() < 0.5);
        assert!((e.reverb_gain() - 0.8).abs() < 1e-3);
    }

    #[test]
    fn silence_mutes_and_drops_voices_and_resume_reopens() {
        let mut e = engine();
        e.handle_cmd(note(&e, 440.0));
        e.handle_cmd(AudioCommand::Lead(LeadParams::new(330.0, 1.0, 0.0, &Parameters::default())));
        render(&mut e, 200);
        e.handle_cmd(AudioCommand::Silence);
        assert_eq!(e.active_voices(), 0);
        assert_eq!(e.output_gain(), 0.0);
        assert!(render(&mut e, 400).iter().all(|f| f.peak() == 0.0));

        e.handle_cmd(AudioCommand::Resume);
        e.handle_cmd(note(&e, 440.0));
        assert!(render(&mut e, 800).iter().any(|f| f.peak() > 0.05));
    }

    #[test]
    fn future_trigger_waits_for_its_start_time() {
        let mut e = engine();
        let at = e.now() + 0.1;
        e.handle_cmd(AudioCommand::Trigger(TriggerParams::new(440.0, 1.0, at, &Parameters::default())));
        let out = render(&mut e, 700); // < 0.1 s
        assert!(out.iter().all(|f| f.peak() == 0.0));
        assert!(render(&mut e, 800).iter().any(|f| f.peak() > 0.01));
    }

    #[test]
    fn waveform_and_drive_apply_immediately() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::SetLeadWaveform(Waveform::Square));
        e.handle_cmd(AudioCommand::SetDistortion(0.5));
        assert_eq!(e.lead().waveform(), Waveform::Square);
        assert_eq!(e.distortion_drive(), 0.5);
    }

    #[test]
    fn clock_publishes_rendered_frames() {
        let mut e = engine();
        let clock = e.clock();
        render(&mut e, 400);
        assert_eq!(clock.frames(), 400);
        assert!((clock.seconds(SR) - 0.05).abs() < 1e-9);
    }
}
