// Types the TUI and the middle layer both speak. The TUI resolves keys into
// InputEvents and renders whatever DisplayState it is handed; all sequencer
// state stays in `Middle`.
//
// Keys (see tui/input.rs):
//   arrows / hjkl   move the cursor (local to the TUI)
//   Enter / x       toggle the cell under the cursor
//   o / d           paint / erase the cell and move on (freehand strokes)
//   p               preview the cell's note on the lead tone
//   Space           play / stop
//   P               next playback pattern
//   s               next scale
//   < / >           octave down / up
//   w               next waveform
//   i               next impulse response
//   - / =           tempo down / up
//   [ / ]           filter cutoff down / up
//   { / }           filter resonance down / up
//   , / .           reverb mix down / up
//   ; / '           delay time down / up
//   : / "           delay feedback down / up
//   ( / )           distortion down / up
//   c               clear the grid
//   q / Esc         quit

use crate::pipeline::effects::ImpulseType;
use crate::pipeline::params::{ParamName, Parameters, Waveform};
use crate::pipeline::playback::PlaybackPattern;

pub const BPM_STEP: f32 = 5.0;
pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 400.0;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // grid edits, resolved against the TUI's cursor
    ToggleCell { row: usize, col: usize },
    PaintCell { row: usize, col: usize },
    EraseCell { row: usize, col: usize },
    PreviewCell { row: usize, col: usize },
    ClearGrid,

    // transport
    PlayPress,
    NextPattern,
    AdjustBpm(f32),

    // pitch
    NextScale,
    OctaveUp,
    OctaveDown,

    // sound
    NextWaveform,
    NextImpulse,
    AdjustParam(ParamName, f32), // delta added to the current value

    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Off,
    On,
    Playing,  // painted and sounding on this tick
    Playhead, // empty, but in the column being played
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub size: usize,
    pub cells: Vec<Vec<CellState>>, // [row][col]
    pub current_step: usize,
    pub playing: bool,
    pub active_notes: usize,
    pub bpm: f32,
    pub pattern: PlaybackPattern,
    pub scale: String,
    pub octave: i32,
    pub waveform: Waveform,
    pub impulse: ImpulseType,
    pub params: Parameters,
    pub status: Option<String>, // last error worth showing
}
