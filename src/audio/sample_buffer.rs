use std::path::Path;

use rand::Rng;

use super::frame::StereoFrame;

#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
}

impl SampleBuffer {
    // Load a WAV from disk, resampled to the device rate. Mono files are
    // duplicated to both sides, anything past two channels is dropped.
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let frames: Vec<StereoFrame> = if channels == 1 {
            samples.into_iter().map(StereoFrame::mono).collect()
        } else {
            samples
                .chunks_exact(channels)
                .map(|c| StereoFrame {
                    left: c[0],
                    right: c[1],
                })
                .collect()
        };

        if frames.is_empty() {
            anyhow::bail!("{} holds no audio", path.display());
        }

        Ok(Self {
            data: resample_linear(&frames, spec.sample_rate, target_rate),
        })
    }

    /// Stand-in room for when an impulse file can't be read: stereo white
    /// noise under an e^(-4t) envelope.
    pub fn synthetic_decay<R: Rng>(sample_rate: u32, seconds: f32, rng: &mut R) -> Self {
        let len = (sample_rate as f32 * seconds).max(1.0) as usize;
        let data = (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let env = (-4.0 * t).exp();
                StereoFrame {
                    left: rng.gen_range(-1.0f32..1.0) * env,
                    right: rng.gen_range(-1.0f32..1.0) * env,
                }
            })
            .collect();
        Self { data }
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        self.data.len() as f32 / sample_rate.max(1) as f32
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    // plain linear interpolation; impulses are smooth enough that it doesn't matter
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        if idx >= frames.len().saturating_sub(1) {
            out.push(*frames.last().unwrap_or(&StereoFrame::zero()));
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            });
        }
    }
    out
}
