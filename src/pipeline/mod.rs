// sequencer-side state: the painted grid, its column index, the playhead,
// and the parameter record every new voice is built from
pub mod config;
pub mod effects;
pub mod grid_index;
pub mod matrix;
pub mod params;
pub mod playback;
