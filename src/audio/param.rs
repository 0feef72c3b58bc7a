// Parameter automation for the render thread. Two shapes cover everything the
// engine does: an exponential approach toward a target (chain parameters,
// frequency glide) and a fixed run of linear ramps (note envelopes).

/// Exponential approach toward `target` with time constant `tau` seconds,
/// stepped once per sample. After one `tau` the value has covered ~63% of the
/// distance; after five it is within 1%.
#[derive(Clone, Copy, Debug)]
pub struct SmoothedParam {
    value: f32,
    target: f32,
    coeff: f32,
}

impl SmoothedParam {
    pub fn new(value: f32, tau: f32, sample_rate: f32) -> Self {
        Self {
            value,
            target: value,
            coeff: one_pole_coeff(tau, sample_rate),
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.value != self.target {
            let next = self.value + (self.target - self.value) * self.coeff;
            // once a step is below f32 resolution the value would stall short
            if next == self.value
                || (self.target - next).abs() <= f32::EPSILON * self.target.abs().max(1.0)
            {
                self.value = self.target;
            } else {
                self.value = next;
            }
        }
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.value == self.target
    }
}

fn one_pole_coeff(tau: f32, sample_rate: f32) -> f32 {
    if tau <= 0.0 || sample_rate <= 0.0 {
        1.0
    } else {
        1.0 - (-1.0 / (tau * sample_rate)).exp()
    }
}

/// Attack / decay / release as straight lines between four breakpoints:
///
/// ```text
///   0 @ start -> peak @ +attack -> peak*sustain_ratio @ +decay -> 0 @ +release
/// ```
///
/// There is no held sustain stage; a note is a one-shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    points: [(f64, f32); 4],
}

impl Envelope {
    pub fn silent() -> Self {
        Self { points: [(0.0, 0.0); 4] }
    }

    pub fn one_shot(start: f64, peak: f32, sustain_level: f32, attack: f32, decay: f32, release: f32) -> Self {
        let attack_end = start + attack.max(0.0) as f64;
        let decay_end = attack_end + decay.max(0.0) as f64;
        let release_end = decay_end + release.max(0.0) as f64;
        Self {
            points: [
                (start, 0.0),
                (attack_end, peak),
                (decay_end, sustain_level),
                (release_end, 0.0),
            ],
        }
    }

    pub fn start_time(&self) -> f64 {
        self.points[0].0
    }

    pub fn end_time(&self) -> f64 {
        self.points[3].0
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let (t0, v0) = self.points[0];
        if t <= t0 {
            return v0;
        }
        for pair in self.points.windows(2) {
            let (ta, va) = pair[0];
            let (tb, vb) = pair[1];
            if t <= tb {
                if tb <= ta {
                    return vb; // zero-length segment jumps straight to its end
                }
                let frac = ((t - ta) / (tb - ta)) as f32;
                return va + (vb - va) * frac;
            }
        }
        self.points[3].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothed_param_reaches_target_after_a_few_time_constants() {
        let sr = 1000.0;
        let mut p = SmoothedParam::new(2000.0, 0.1, sr);
        p.set_target(500.0);
        // one time constant covers ~63%
        for _ in 0..100 {
            p.next();
        }
        let covered = (2000.0 - p.value()) / 1500.0;
        assert!((covered - 0.632).abs() < 0.01, "covered {covered}");
        for _ in 0..2000 {
            p.next();
        }
        assert!((p.value() - 500.0).abs() < 0.01);
    }

    #[test]
    fn zero_time_constant_jumps() {
        let mut p = SmoothedParam::new(1.0, 0.0, 48000.0);
        p.set_target(3.0);
        assert_eq!(p.next(), 3.0);
        assert!(p.is_settled());
    }

    #[test]
    fn envelope_hits_each_breakpoint() {
        let env = Envelope::one_shot(1.0, 0.8, 0.56, 0.1, 0.2, 0.3);
        assert_eq!(env.value_at(0.5), 0.0);
        assert_eq!(env.value_at(1.0), 0.0);
        assert!((env.value_at(1.05) - 0.4).abs() < 1e-4);
        assert!((env.value_at(1.1) - 0.8).abs() < 1e-6);
        assert!((env.value_at(1.3) - 0.56).abs() < 1e-5);
        assert!((env.value_at(1.45) - 0.28).abs() < 1e-4);
        assert!(env.value_at(1.6) < 1e-6);
        assert_eq!(env.value_at(9.0), 0.0);
        assert!((env.end_time() - 1.6).abs() < 1e-6);
    }

    #[test]
    fn zero_attack_starts_at_peak() {
        let env = Envelope::one_shot(0.0, 1.0, 0.5, 0.0, 0.1, 0.1);
        assert!((env.value_at(1e-9) - 1.0).abs() < 1e-3);
    }
}
