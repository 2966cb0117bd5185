//! Run settings loaded from a TOML file.
//!
//! ```toml
//! [trainer]
//! max_epochs = 20
//! seed = 7
//! score_metric = "margin"
//!
//! [data]
//! batch_size = 300
//! mnist_dir = "data/mnist"
//! model_dir = "models"
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::BrainError;
use crate::learning::TrainerConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSettings {
    /// Items per training batch.
    pub batch_size: usize,

    /// Directory holding the MNIST IDX files.
    pub mnist_dir: PathBuf,

    /// Directory of versioned brain files.
    pub model_dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            batch_size: config::BATCH_SIZE,
            mnist_dir: PathBuf::from("data/mnist"),
            model_dir: PathBuf::from("models"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub trainer: TrainerConfig,
    pub data: DataSettings,
}

impl RunSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings '{}'", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("invalid settings in '{}'", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: RunSettings = toml::from_str(text).context("failed to parse TOML")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        self.trainer.validate()?;
        if self.data.batch_size == 0 {
            return Err(BrainError::InvalidConfig("batch_size must be positive".into()));
        }
        Ok(())
    }
}
