// engine config, read once at startup from <project_dir>/stepgrid.json
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::scales;

use super::effects::ImpulseType;
use super::matrix::DEFAULT_MATRIX_SIZE;
use super::params::Parameters;
use super::playback::PlaybackPattern;

const CONFIG_FILE: &str = "stepgrid.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub matrix_size: usize,
    pub bpm: f32,
    pub scale: Option<String>, // None = chromatic sweep across four octaves
    pub octave: i32,
    pub pattern: PlaybackPattern,
    pub impulse_dir: PathBuf,
    pub impulse: ImpulseType,
    pub params: Parameters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matrix_size: DEFAULT_MATRIX_SIZE,
            bpm: 120.0,
            scale: Some(String::from("Major")),
            octave: 4,
            pattern: PlaybackPattern::Forward,
            impulse_dir: PathBuf::from("assets"),
            impulse: ImpulseType::PlateReverb,
            params: Parameters::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.matrix_size == 0 {
            return Err(EngineError::InvalidSize(self.matrix_size));
        }
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(EngineError::InvalidTempo(self.bpm));
        }
        if let Some(name) = &self.scale {
            if scales::find_scale(name).is_none() {
                return Err(EngineError::UnknownScale(name.clone()));
            }
        }
        self.params.sanitized()?;
        Ok(())
    }
}

pub fn config_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_FILE)
}

// a missing file means defaults; a broken one is an error worth reporting.
// relative impulse dirs are resolved against the project dir.
pub fn load_config(project_dir: &Path) -> anyhow::Result<EngineConfig> {
    let path = config_file_path(project_dir);
    let mut config = if path.exists() {
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str::<EngineConfig>(&data)
            .with_context(|| format!("parsing {}", path.display()))?
    } else {
        EngineConfig::default()
    };
    if config.impulse_dir.is_relative() {
        config.impulse_dir = project_dir.join(&config.impulse_dir);
    }
    config.validate()?;
    config.params = config.params.sanitized()?;
    Ok(config)
}
