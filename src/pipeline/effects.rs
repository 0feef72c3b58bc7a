// Reverb room selection
use serde::{Deserialize, Serialize};

/// Which prerecorded room the convolution reverb uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImpulseType {
    #[default]
    PlateReverb,
    GuitarCab,
    DrumRoom,
}

impl ImpulseType {
    pub const ALL: [ImpulseType; 3] = [
        ImpulseType::PlateReverb,
        ImpulseType::GuitarCab,
        ImpulseType::DrumRoom,
    ];

    // asset name, also the serde spelling
    pub fn name(self) -> &'static str {
        match self {
            ImpulseType::PlateReverb => "plate-reverb",
            ImpulseType::GuitarCab => "guitar-cab",
            ImpulseType::DrumRoom => "drum-room",
        }
    }

    pub fn file_name(self) -> String {
        format!("impulse-{}.wav", self.name())
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Self {
        match self {
            ImpulseType::PlateReverb => ImpulseType::GuitarCab,
            ImpulseType::GuitarCab => ImpulseType::DrumRoom,
            ImpulseType::DrumRoom => ImpulseType::PlateReverb,
        }
    }
}
