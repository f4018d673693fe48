use std::path::PathBuf;

use thiserror::Error;

use crate::models::VersionId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Failed to read source file {}: {}", .path.display(), .source)]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("Delta chain broken for {} at version {}: {}", .path.display(), .version, .reason)]
    ChainBroken {
        path: PathBuf,
        version: VersionId,
        reason: String,
    },

    #[error("Failed to apply patch: {0}")]
    PatchApply(String),

    #[error("Backup failed: {0}")]
    BackupFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
