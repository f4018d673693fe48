use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "retrace.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding version snapshots, the history log, and the commit
    /// counter.
    pub versions_root: PathBuf,
    /// Directory holding safety backups taken before a restore.
    pub backups_root: PathBuf,
    /// Every Nth commit stores full copies instead of deltas.
    pub commit_interval: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            versions_root: PathBuf::from("versions"),
            backups_root: PathBuf::from("backups"),
            commit_interval: 5,
        }
    }
}

impl Config {
    /// Loads from an explicit path if given, then from `retrace.toml` in the
    /// working directory, then falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("no {CONFIG_FILE} found, using defaults");
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }

    /// The fields are public, so `SnapshotStore::open` runs this again: a
    /// zero interval would divide by zero in the commit cadence.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.commit_interval == 0 {
            return Err(Error::Config(
                "commit_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
