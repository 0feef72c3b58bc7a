// Convolution reverb: uniformly partitioned overlap-save.
//
// The impulse response is cut into BLOCK-sized partitions and each one is
// transformed once, up front, off the audio thread. At run time every BLOCK
// input samples we do one forward FFT, multiply-accumulate against all
// partitions through a frequency-domain delay line, and one inverse FFT per
// output channel. Latency is one block.
//
// Input is mono (the chain is mono up to here); a stereo impulse gives a
// stereo tail.

use std::fmt;
use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;

pub const BLOCK: usize = 512;
const FFT_SIZE: usize = BLOCK * 2;

// browser ConvolverNode normalization constants
const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

pub struct Convolver {
    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    partitions: [Vec<Vec<Complex<f32>>>; 2], // per channel, per partition
    fdl: Vec<Vec<Complex<f32>>>,              // past input spectra, newest at `fdl_head`
    fdl_head: usize,
    input: Vec<f32>, // previous block | current block
    pos: usize,
    output: [Vec<f32>; 2],
    time_buf: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch_fwd: Vec<Complex<f32>>,
    scratch_inv: Vec<Complex<f32>>,
}

impl Convolver {
    /// Prepares a convolver for `ir`. Does all the allocation and the impulse
    /// FFTs, so build it on the main thread and hand it to the engine.
    pub fn new(ir: &SampleBuffer, sample_rate: f32) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(FFT_SIZE);
        let c2r = planner.plan_fft_inverse(FFT_SIZE);

        let scale = normalization_scale(ir, sample_rate);
        let left: Vec<f32> = ir.data.iter().map(|f| f.left * scale).collect();
        let right: Vec<f32> = ir.data.iter().map(|f| f.right * scale).collect();

        let num_partitions = ir.data.len().div_ceil(BLOCK).max(1);
        let mut scratch_fwd = r2c.make_scratch_vec();
        let partitions = [
            transform_partitions(&left, num_partitions, &r2c, &mut scratch_fwd),
            transform_partitions(&right, num_partitions, &r2c, &mut scratch_fwd),
        ];

        let bins = FFT_SIZE / 2 + 1;
        Self {
            fdl: vec![vec![Complex::new(0.0, 0.0); bins]; num_partitions],
            fdl_head: 0,
            input: vec![0.0; FFT_SIZE],
            pos: 0,
            output: [vec![0.0; BLOCK], vec![0.0; BLOCK]],
            time_buf: r2c.make_input_vec(),
            spectrum: r2c.make_output_vec(),
            accum: r2c.make_output_vec(),
            scratch_inv: c2r.make_scratch_vec(),
            scratch_fwd,
            partitions,
            r2c,
            c2r,
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.fdl.len()
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> StereoFrame {
        let out = StereoFrame {
            left: self.output[0][self.pos],
            right: self.output[1][self.pos],
        };
        self.input[BLOCK + self.pos] = x;
        self.pos += 1;
        if self.pos == BLOCK {
            self.run_block();
            self.pos = 0;
        }
        out
    }

    fn run_block(&mut self) {
        let n = self.fdl.len();

        self.time_buf.copy_from_slice(&self.input);
        if self
            .r2c
            .process_with_scratch(&mut self.time_buf, &mut self.spectrum, &mut self.scratch_fwd)
            .is_err()
        {
            self.output[0].fill(0.0);
            self.output[1].fill(0.0);
            return;
        }
        self.fdl_head = (self.fdl_head + n - 1) % n;
        self.fdl[self.fdl_head].copy_from_slice(&self.spectrum);

        let norm = 1.0 / FFT_SIZE as f32;
        for ch in 0..2 {
            self.accum.fill(Complex::new(0.0, 0.0));
            for (k, h) in self.partitions[ch].iter().enumerate() {
                let x = &self.fdl[(self.fdl_head + k) % n];
                for ((acc, xi), hi) in self.accum.iter_mut().zip(x).zip(h) {
                    *acc += xi * hi;
                }
            }
            // real signals: DC and Nyquist bins carry no imaginary part
            let last = self.accum.len() - 1;
            self.accum[0].im = 0.0;
            self.accum[last].im = 0.0;

            let ok = self
                .c2r
                .process_with_scratch(&mut self.accum, &mut self.time_buf, &mut self.scratch_inv)
                .is_ok();
            let out = &mut self.output[ch];
            if ok {
                // overlap-save: only the second half is valid linear convolution
                for (o, t) in out.iter_mut().zip(&self.time_buf[BLOCK..]) {
                    *o = t * norm;
                }
            } else {
                out.fill(0.0);
            }
        }

        self.input.copy_within(BLOCK.., 0);
    }

    pub fn reset(&mut self) {
        for spectrum in &mut self.fdl {
            spectrum.fill(Complex::new(0.0, 0.0));
        }
        self.input.fill(0.0);
        self.output[0].fill(0.0);
        self.output[1].fill(0.0);
        self.pos = 0;
    }
}

impl fmt::Debug for Convolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Convolver")
            .field("partitions", &self.fdl.len())
            .field("block", &BLOCK)
            .finish()
    }
}

fn transform_partitions(
    channel: &[f32],
    num_partitions: usize,
    r2c: &Arc<dyn RealToComplex<f32>>,
    scratch: &mut [Complex<f32>],
) -> Vec<Vec<Complex<f32>>> {
    let mut out = Vec::with_capacity(num_partitions);
    for p in 0..num_partitions {
        let mut padded = r2c.make_input_vec();
        let start = (p * BLOCK).min(channel.len());
        let end = (start + BLOCK).min(channel.len());
        padded[..end - start].copy_from_slice(&channel[start..end]);
        let mut spectrum = r2c.make_output_vec();
        if r2c.process_with_scratch(&mut padded, &mut spectrum, scratch).is_err() {
            spectrum.fill(Complex::new(0.0, 0.0));
        }
        out.push(spectrum);
    }
    out
}

/// Same loudness rule a browser ConvolverNode applies with `normalize = true`:
/// scale by the inverse RMS power of the response, calibrated so different
/// rooms land at comparable levels.
pub fn normalization_scale(ir: &SampleBuffer, sample_rate: f32) -> f32 {
    let samples = ir.data.len() * 2;
    if samples == 0 {
        return 0.0;
    }
    let energy: f32 = ir
        .data
        .iter()
        .map(|f| f.left * f.left + f.right * f.right)
        .sum();
    let mut power = (energy / samples as f32).sqrt();
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    let mut scale = GAIN_CALIBRATION / power;
    if sample_rate > 0.0 {
        scale *= GAIN_CALIBRATION_SAMPLE_RATE / sample_rate;
    }
    scale
}
