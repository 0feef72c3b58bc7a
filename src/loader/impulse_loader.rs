use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::audio::SampleBuffer;
use crate::pipeline::effects::ImpulseType;

const FALLBACK_SECONDS: f32 = 2.0;

/// Every room, decoded and resampled once at startup. Indexed by
/// `ImpulseType::index`.
#[derive(Clone, Debug)]
pub struct ImpulseBank {
    buffers: [SampleBuffer; 3],
    synthetic: [bool; 3],
}

impl ImpulseBank {
    pub fn get(&self, impulse: ImpulseType) -> &SampleBuffer {
        &self.buffers[impulse.index()]
    }

    // true when the file couldn't be read and the noise stand-in is in use
    pub fn is_synthetic(&self, impulse: ImpulseType) -> bool {
        self.synthetic[impulse.index()]
    }
}

// Load every impulse file from `dir`. A file that is missing or unreadable
// is replaced by its own synthetic decay; the others still load.
pub fn load_bank(dir: &Path, sample_rate: u32) -> ImpulseBank {
    let mut rng = StdRng::from_entropy();
    let mut buffers: [SampleBuffer; 3] = Default::default();
    let mut synthetic = [false; 3];

    for impulse in ImpulseType::ALL {
        let path = dir.join(impulse.file_name());
        let slot = impulse.index();
        match SampleBuffer::load_wav(&path, sample_rate) {
            Ok(buffer) => {
                log::info!(
                    target: "engine",
                    "loaded impulse {} ({:.2}s)",
                    impulse.name(),
                    buffer.duration_secs(sample_rate)
                );
                buffers[slot] = buffer;
            }
            Err(e) => {
                log::warn!(
                    target: "engine",
                    "using fallback impulse for {}: {}: {e:#}",
                    impulse.name(),
                    path.display()
                );
                buffers[slot] = SampleBuffer::synthetic_decay(sample_rate, FALLBACK_SECONDS, &mut rng);
                synthetic[slot] = true;
            }
        }
    }

    ImpulseBank { buffers, synthetic }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 1000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = 1.0 / (i + 1) as f32;
            w.write_sample(v).unwrap();
            w.write_sample(-v).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn missing_files_fall_back_one_by_one() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("impulse-guitar-cab.wav"), 300);

        let bank = load_bank(dir.path(), 1000);
        assert!(!bank.is_synthetic(ImpulseType::GuitarCab));
        assert_eq!(bank.get(ImpulseType::GuitarCab).data.len(), 300);
        assert_eq!(bank.get(ImpulseType::GuitarCab).data[0].right, -1.0);

        for impulse in [ImpulseType::PlateReverb, ImpulseType::DrumRoom] {
            assert!(bank.is_synthetic(impulse));
            assert_eq!(bank.get(impulse).data.len(), 2000);
        }
    }
}
