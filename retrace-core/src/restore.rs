use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::backup::BackupGuard;
use crate::diff::FileDiff;
use crate::error::{Error, Result};
use crate::models::{
    BackupId, FileOutcome, FileStatus, RestoreOptions, RestoreOutcome, RestoreReport, VersionId,
};
use crate::reconstruct::ReconstructionEngine;
use crate::store::{self, SnapshotStore};

/// Drives the restore protocol: confirm, back up the current state, then
/// rewrite the tracked path. The backup always lands before the first write.
pub struct RestoreCoordinator<'a> {
    store: &'a SnapshotStore,
    guard: &'a BackupGuard,
}

/// Changes a restore would make, computed without writing.
pub struct RestorePreview {
    pub version: VersionId,
    pub diffs: Vec<FileDiff>,
    pub removals: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, Error)>,
}

impl<'a> RestoreCoordinator<'a> {
    pub fn new(store: &'a SnapshotStore, guard: &'a BackupGuard) -> Self {
        Self { store, guard }
    }

    /// Rewrites `tracked` to match `version`. `confirm` is consulted unless
    /// `options.force` is set; declining leaves the workspace and the backup
    /// area untouched.
    pub fn restore(
        &self,
        tracked: &Path,
        version: &VersionId,
        options: &RestoreOptions,
        confirm: impl FnOnce() -> bool,
    ) -> Result<RestoreReport> {
        self.store.resolve(version.as_str())?;

        if !options.force && !confirm() {
            info!(version = %version, "restore cancelled");
            return Ok(RestoreReport {
                outcome: RestoreOutcome::Cancelled,
                files: Vec::new(),
            });
        }

        let backup = self.guard.snapshot_current_state(tracked, None)?;
        let reconstruction = ReconstructionEngine::new(self.store).reconstruct(version)?;
        let live = self.live_files(tracked)?;
        let root = target_root(tracked, reconstruction.files.keys());
        fs::create_dir_all(&root)?;

        let mut outcomes = Vec::new();
        let mut preserved: BTreeSet<PathBuf> = BTreeSet::new();

        for (rel, bytes) in &reconstruction.files {
            preserved.insert(rel.clone());
            let dest = root.join(rel);
            let written = dest
                .parent()
                .map(fs::create_dir_all)
                .unwrap_or(Ok(()))
                .and_then(|_| fs::write(&dest, bytes));
            match written {
                Ok(()) => outcomes.push(FileOutcome {
                    path: rel.clone(),
                    status: FileStatus::Restored,
                }),
                Err(e) => {
                    warn!(path = %rel.display(), error = %e, "failed to write restored file");
                    outcomes.push(FileOutcome {
                        path: rel.clone(),
                        status: FileStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        // Files whose chains could not be replayed keep their live content.
        for (rel, error) in &reconstruction.failures {
            preserved.insert(rel.clone());
            outcomes.push(FileOutcome {
                path: rel.clone(),
                status: FileStatus::Failed(error.to_string()),
            });
        }

        // Live files the target version does not record are removed, so the
        // result is the version's state rather than a merge of the two.
        for rel in &live {
            if preserved.contains(rel) {
                continue;
            }
            match fs::remove_file(root.join(rel)) {
                Ok(()) => {
                    prune_empty_dirs(&root, rel);
                    outcomes.push(FileOutcome {
                        path: rel.clone(),
                        status: FileStatus::Removed,
                    });
                }
                Err(e) => {
                    warn!(path = %rel.display(), error = %e, "failed to remove stale file");
                    outcomes.push(FileOutcome {
                        path: rel.clone(),
                        status: FileStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        info!(
            version = %version,
            backup = %backup,
            files = outcomes.len(),
            "restore complete"
        );
        Ok(RestoreReport {
            outcome: RestoreOutcome::Completed { backup },
            files: outcomes,
        })
    }

    /// Copies a backup's contents over `tracked`. Backups are overlays:
    /// live files absent from the backup are left alone.
    pub fn restore_from_backup(
        &self,
        tracked: &Path,
        backup: &BackupId,
        options: &RestoreOptions,
        confirm: impl FnOnce() -> bool,
    ) -> Result<RestoreReport> {
        let bdir = self.guard.backup_dir(backup);
        if !bdir.is_dir() {
            return Err(Error::BackupNotFound(backup.as_str().to_string()));
        }

        if !options.force && !confirm() {
            info!(backup = %backup, "restore cancelled");
            return Ok(RestoreReport {
                outcome: RestoreOutcome::Cancelled,
                files: Vec::new(),
            });
        }

        let safety = self.guard.snapshot_current_state(tracked, Some("current"))?;

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in WalkDir::new(&bdir) {
            let entry = entry.map_err(std::io::Error::from)?;
            let rel = match entry.path().strip_prefix(&bdir) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
                _ => continue,
            };
            if entry.file_type().is_dir() {
                dirs.push(rel);
            } else if entry.file_type().is_file() {
                files.push(rel);
            }
        }
        files.sort();

        let root = target_root(tracked, files.iter());
        fs::create_dir_all(&root)?;
        for rel in &dirs {
            fs::create_dir_all(root.join(rel))?;
        }

        let mut outcomes = Vec::new();
        for rel in &files {
            match fs::copy(bdir.join(rel), root.join(rel)) {
                Ok(_) => outcomes.push(FileOutcome {
                    path: rel.clone(),
                    status: FileStatus::Restored,
                }),
                Err(e) => {
                    warn!(path = %rel.display(), error = %e, "failed to copy from backup");
                    outcomes.push(FileOutcome {
                        path: rel.clone(),
                        status: FileStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        info!(
            backup = %backup,
            safety = %safety,
            files = outcomes.len(),
            "backup restored"
        );
        Ok(RestoreReport {
            outcome: RestoreOutcome::Completed { backup: safety },
            files: outcomes,
        })
    }

    /// Diffs the live state against `version` without touching the tree.
    pub fn preview(&self, tracked: &Path, version: &VersionId) -> Result<RestorePreview> {
        let reconstruction = ReconstructionEngine::new(self.store).reconstruct(version)?;
        let root = target_root(tracked, reconstruction.files.keys());

        let mut diffs = Vec::new();
        for (rel, bytes) in &reconstruction.files {
            let target_text = String::from_utf8_lossy(bytes);
            let live_text = match fs::read(root.join(rel)) {
                Ok(current) => String::from_utf8_lossy(&current).into_owned(),
                Err(_) => String::new(),
            };
            let diff = FileDiff::between(rel.clone(), &live_text, &target_text);
            if diff.has_changes() {
                diffs.push(diff);
            }
        }

        let removals = self
            .live_files(tracked)?
            .into_iter()
            .filter(|rel| {
                !reconstruction.files.contains_key(rel)
                    && !reconstruction.failures.iter().any(|(path, _)| path == rel)
            })
            .collect();

        Ok(RestorePreview {
            version: version.clone(),
            diffs,
            removals,
            failures: reconstruction.failures,
        })
    }

    fn live_files(&self, tracked: &Path) -> Result<Vec<PathBuf>> {
        if fs::metadata(tracked).is_err() {
            return Ok(Vec::new());
        }
        let scan = store::scan_tracked(
            tracked,
            &[self.store.versions_root(), self.guard.backups_root()],
        )?;
        Ok(scan.files)
    }
}

/// Directory the relative paths are written under. A missing tracked path
/// is treated as a directory to create, unless the version holds exactly
/// one file named like the tracked path itself.
fn target_root<'p>(
    tracked: &Path,
    mut files: impl ExactSizeIterator<Item = &'p PathBuf>,
) -> PathBuf {
    match fs::metadata(tracked) {
        Ok(meta) if meta.is_dir() => tracked.to_path_buf(),
        Ok(_) => parent_or_dot(tracked),
        Err(_) => {
            let count = files.len();
            let first = files.next();
            let single_file_target = count == 1
                && tracked
                    .file_name()
                    .is_some_and(|name| first.map(PathBuf::as_path) == Some(Path::new(name)));
            if single_file_target {
                parent_or_dot(tracked)
            } else {
                tracked.to_path_buf()
            }
        }
    }
}

fn parent_or_dot(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Removes directories emptied by a deletion, walking up toward the root.
fn prune_empty_dirs(root: &Path, removed: &Path) {
    let mut current = removed.parent();
    while let Some(rel_dir) = current {
        if rel_dir.as_os_str().is_empty() {
            break;
        }
        match fs::remove_dir(root.join(rel_dir)) {
            Ok(()) => current = rel_dir.parent(),
            Err(_) => break,
        }
    }
}
