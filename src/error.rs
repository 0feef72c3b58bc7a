use thiserror::Error;

/// Errors surfaced by the engine API. Asset problems never show up here: a
/// missing impulse response is swapped for a synthetic one and logged instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio backend unavailable: {0}")]
    AudioUnavailable(String),

    #[error("engine not initialized")]
    NotInitialized,

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("invalid value for parameter {0}")]
    InvalidParameterValue(&'static str),

    #[error("unknown scale: {0}")]
    UnknownScale(String),

    #[error("matrix must be {expected}x{expected}")]
    InvalidMatrix { expected: usize },

    #[error("invalid matrix size: {0}")]
    InvalidSize(usize),

    #[error("invalid tempo: {0}")]
    InvalidTempo(f32),

    #[error("cell ({row}, {col}) is outside the grid")]
    CellOutOfRange { row: usize, col: usize },

    #[error("scheduler has halted; reinitialize it before playing")]
    SchedulerHalted,

    #[error("could not spawn scheduler thread: {0}")]
    SchedulerSpawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
