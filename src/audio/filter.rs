// 2-pole lowpass biquad (RBJ cookbook, transposed direct form II).
//
// Resonance follows the browser BiquadFilterNode convention for lowpass: Q is
// a peak gain in dB, so alpha = sin(w0) / (2 * 10^(Q/20)). 0 dB is a plain
// Butterworth-ish knee; positive values add a bump at the cutoff.

use std::f32::consts::PI;

const MIN_CUTOFF: f32 = 10.0;

#[derive(Clone, Copy, Debug)]
pub struct LowPass {
    sample_rate: f32,
    cutoff: f32,
    resonance_db: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl LowPass {
    pub fn new(sample_rate: f32, cutoff: f32, resonance_db: f32) -> Self {
        let mut f = Self {
            sample_rate,
            cutoff: f32::NAN, // forces the first set() to compute
            resonance_db,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        f.set(cutoff, resonance_db);
        f
    }

    // cheap when nothing moved, so the engine can call it every sample
    #[inline]
    pub fn set(&mut self, cutoff: f32, resonance_db: f32) {
        if cutoff == self.cutoff && resonance_db == self.resonance_db {
            return;
        }
        self.cutoff = cutoff;
        self.resonance_db = resonance_db;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        let nyquist = self.sample_rate * 0.5;
        let fc = self.cutoff.clamp(MIN_CUTOFF, nyquist);
        if fc >= nyquist {
            // wide open: pass straight through
            self.b0 = 1.0;
            self.b1 = 0.0;
            self.b2 = 0.0;
            self.a1 = 0.0;
            self.a2 = 0.0;
            return;
        }

        let w0 = 2.0 * PI * fc / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * 10f32.powf(self.resonance_db / 20.0));

        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos_w0) / a0;
        self.b0 = b1 * 0.5;
        self.b1 = b1;
        self.b2 = b1 * 0.5;
        self.a1 = (-2.0 * cos_w0) / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn resonance(&self) -> f32 {
        self.resonance_db
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
