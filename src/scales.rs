// Scale + frequency lookup. Everything here is immutable; the engine only ever
// asks for "the frequencies of scale X at octave Y" and indexes into the result.

pub const REFERENCE_PITCH: f32 = 261.63; // middle C (C4)
pub const REFERENCE_OCTAVE: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoteName {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C, NoteName::Cs, NoteName::D, NoteName::Ds,
        NoteName::E, NoteName::F, NoteName::Fs, NoteName::G,
        NoteName::Gs, NoteName::A, NoteName::As, NoteName::B,
    ];

    // equal-tempered ratio against C of the same octave
    pub fn ratio(self) -> f32 {
        match self {
            NoteName::C => 1.0,
            NoteName::Cs => 1.059463,
            NoteName::D => 1.122462,
            NoteName::Ds => 1.189207,
            NoteName::E => 1.259921,
            NoteName::F => 1.334840,
            NoteName::Fs => 1.414214,
            NoteName::G => 1.498307,
            NoteName::Gs => 1.587401,
            NoteName::A => 1.681793,
            NoteName::As => 1.781797,
            NoteName::B => 1.887749,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::Cs => "C#",
            NoteName::D => "D",
            NoteName::Ds => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::Fs => "F#",
            NoteName::G => "G",
            NoteName::Gs => "G#",
            NoteName::A => "A",
            NoteName::As => "A#",
            NoteName::B => "B",
        }
    }
}

// C2..C6 per note, indexed by `NoteName as usize`
const LOWEST_TABLE_OCTAVE: i32 = 2;
const BASE_FREQUENCIES: [[f32; 5]; 12] = [
    [65.41, 130.81, 261.63, 523.25, 1046.5],
    [69.30, 138.59, 277.18, 554.37, 1108.73],
    [73.42, 146.83, 293.66, 587.33, 1174.66],
    [77.78, 155.56, 311.13, 622.25, 1244.51],
    [82.41, 164.81, 329.63, 659.26, 1318.51],
    [87.31, 174.61, 349.23, 698.46, 1396.91],
    [92.50, 185.00, 369.99, 739.99, 1479.98],
    [98.00, 196.00, 392.00, 783.99, 1567.98],
    [103.83, 207.65, 415.30, 830.61, 1661.22],
    [110.00, 220.00, 440.00, 880.00, 1760.00],
    [116.54, 233.08, 466.16, 932.33, 1864.66],
    [123.47, 246.94, 493.88, 987.77, 1975.53],
];

/// Looks a note up in the fixed reference table. Octaves outside 2..=6 clamp
/// to the nearest end of the table.
pub fn note_frequency(note: NoteName, octave: i32) -> f32 {
    let row = &BASE_FREQUENCIES[note as usize];
    let idx = (octave - LOWEST_TABLE_OCTAVE).clamp(0, row.len() as i32 - 1);
    row[idx as usize]
}

#[derive(Clone, Copy, Debug)]
pub struct Scale {
    pub name: &'static str,
    pub notes: &'static [NoteName],
}

use NoteName::*;

pub const SCALES: &[Scale] = &[
    // basics
    Scale { name: "Major", notes: &[C, D, E, F, G, A, B] },
    Scale { name: "Minor", notes: &[C, D, Ds, F, G, Gs, As] },
    Scale { name: "Pentatonic", notes: &[C, D, E, G, A] },
    Scale { name: "Blues", notes: &[C, Ds, F, Fs, G, As] },
    Scale { name: "Chromatic", notes: &[C, Cs, D, Ds, E, F, Fs, G, Gs, A, As, B] },
    // jazz
    Scale { name: "Dorian", notes: &[C, D, Ds, F, G, A, As] },
    Scale { name: "Mixolydian", notes: &[C, D, E, F, G, A, As] },
    Scale { name: "Bebop", notes: &[C, D, E, F, G, A, As, B] },
    // world
    Scale { name: "HarmonicMinor", notes: &[C, D, Ds, F, G, Gs, B] },
    Scale { name: "ReggaeMinor", notes: &[C, D, Ds, F, G, Gs, As] },
    Scale { name: "Phrygian", notes: &[C, Cs, Ds, F, G, Gs, As] },
    // modal
    Scale { name: "Lydian", notes: &[C, D, E, Fs, G, A, B] },
    Scale { name: "Locrian", notes: &[C, Cs, Ds, F, Fs, Gs, As] },
    // pentatonic variations
    Scale { name: "MinorPentatonic", notes: &[C, Ds, F, G, As] },
    Scale { name: "Japanese", notes: &[C, Cs, F, G, Gs] },
    // contemporary
    Scale { name: "WholeTone", notes: &[C, D, E, Fs, Gs, As] },
    Scale { name: "Diminished", notes: &[C, D, Ds, F, Fs, Gs, A, B] },
    Scale { name: "Altered", notes: &[C, Cs, Ds, E, Fs, Gs, As] },
];

pub fn find_scale(name: &str) -> Option<&'static Scale> {
    SCALES.iter().find(|s| s.name == name)
}

pub fn scale_names() -> impl Iterator<Item = &'static str> {
    SCALES.iter().map(|s| s.name)
}

/// Frequencies of every note in `name`, relative to C4 and shifted by whole
/// octaves from octave 4. `None` when the scale doesn't exist.
pub fn scale_frequencies(name: &str, octave: i32) -> Option<Vec<f32>> {
    let scale = find_scale(name)?;
    let octave_shift = 2.0_f32.powi(octave - REFERENCE_OCTAVE);
    Some(
        scale
            .notes
            .iter()
            .map(|note| REFERENCE_PITCH * note.ratio() * octave_shift)
            .collect(),
    )
}
