//! Brain persistence.
//!
//! [`FileModelStore`] keeps a directory of versioned bincode files:
//! `brain.bin`, `brain1.bin`, `brain2.bin`, ... Loading picks the highest
//! version present; saving writes the next free one, so earlier brains are
//! never overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::network::Brain;

const STEM: &str = "brain";
const EXTENSION: &str = "bin";

/// Loads and saves trained brains.
pub trait ModelStore {
    fn save(&mut self, brain: &Brain) -> Result<()>;
    fn load(&self) -> Result<Option<Brain>>;
}

#[derive(Clone, Debug)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    /// Store rooted at `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of version `index` (0 is the unnumbered base file).
    pub fn version_path(&self, index: usize) -> PathBuf {
        let name = if index == 0 {
            format!("{}.{}", STEM, EXTENSION)
        } else {
            format!("{}{}.{}", STEM, index, EXTENSION)
        };
        self.dir.join(name)
    }

    /// Highest version on disk. Numbering is contiguous from 1; the
    /// unnumbered base file counts as version 0.
    pub fn latest_version(&self) -> Option<usize> {
        let mut latest = self.version_path(0).exists().then_some(0);
        let mut index = 1;
        while self.version_path(index).exists() {
            latest = Some(index);
            index += 1;
        }
        latest
    }

    /// First numbered version not yet on disk.
    pub fn next_version(&self) -> usize {
        let mut index = 1;
        while self.version_path(index).exists() {
            index += 1;
        }
        index
    }
}

impl ModelStore for FileModelStore {
    fn save(&mut self, brain: &Brain) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create model directory '{}'", self.dir.display()))?;
        let path = self.version_path(self.next_version());
        let bytes = brain.to_bytes();
        fs::write(&path, &bytes)
            .with_context(|| format!("failed to write brain '{}'", path.display()))?;
        info!(
            path = %path.display(),
            bytes = bytes.len(),
            layers = brain.depth(),
            "saved brain"
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<Brain>> {
        let Some(version) = self.latest_version() else {
            debug!(dir = %self.dir.display(), "no stored brain");
            return Ok(None);
        };
        let path = self.version_path(version);
        let bytes =
            fs::read(&path).with_context(|| format!("failed to read brain '{}'", path.display()))?;
        let brain = Brain::from_bytes(&bytes)
            .with_context(|| format!("failed to decode brain '{}'", path.display()))?;
        info!(path = %path.display(), layers = brain.depth(), "loaded brain");
        Ok(Some(brain))
    }
}
