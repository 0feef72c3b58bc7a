// stepgrid: a step sequencer you paint on a grid. `Middle` is the engine;
// everything else is its parts.
pub mod audio;
pub mod audio_api;
pub mod error;
pub mod loader;
pub mod middle;
pub mod pipeline;
pub mod scales;
pub mod scheduler;
pub mod shared;
pub mod tui;

pub use error::{EngineError, Result};
pub use middle::{ListenerId, Middle};
