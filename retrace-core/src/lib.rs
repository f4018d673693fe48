//! # retrace-core
//!
//! Core library for retrace - lightweight local version control for a single
//! file or directory tree.
//!
//! Versions are plain directories: every Nth commit stores full copies,
//! the rest store unified-diff deltas against the previous state. This crate
//! provides the snapshot store, the reconstruction engine that replays delta
//! chains, and the backup-guarded restore protocol on top of them.

pub mod backup;
pub mod config;
pub mod diff;
pub mod error;
pub mod models;
pub mod patch;
pub mod reconstruct;
pub mod restore;
pub mod store;

pub use backup::BackupGuard;
pub use config::Config;
pub use diff::{DiffLine, DiffLineKind, FileDiff};
pub use error::{Error, Result};
pub use models::{
    BackupId, BackupInfo, EntryKind, FileOutcome, FileStatus, Reconstruction, RestoreOptions,
    RestoreOutcome, RestoreReport, VersionEntry, VersionId, VersionInfo,
};
pub use reconstruct::ReconstructionEngine;
pub use restore::{RestoreCoordinator, RestorePreview};
pub use store::SnapshotStore;
