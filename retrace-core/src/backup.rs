use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{BackupId, BackupInfo};
use crate::store;

const BACKUP_SUFFIX: &str = ".backup";

/// Takes timestamped safety copies of the tracked path before a restore
/// overwrites it.
pub struct BackupGuard {
    backups_root: PathBuf,
    versions_root: PathBuf,
}

impl BackupGuard {
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.backups_root)?;
        debug!(root = %config.backups_root.display(), "opened backup area");
        Ok(Self {
            backups_root: config.backups_root.clone(),
            versions_root: config.versions_root.clone(),
        })
    }

    pub fn backups_root(&self) -> &Path {
        &self.backups_root
    }

    /// Copies the current state of `tracked` into a fresh backup directory.
    /// A missing tracked path yields an empty backup, so a restore into it
    /// can still be undone.
    pub fn snapshot_current_state(&self, tracked: &Path, label: Option<&str>) -> Result<BackupId> {
        let base = store::target_base_name(tracked);
        let id = self.allocate_backup_id(&base, label);
        let bdir = self.backup_dir(&id);
        fs::create_dir_all(&bdir).map_err(|e| Error::BackupFailed(e.to_string()))?;

        // A failed copy must not leave a half-written backup behind.
        match self.copy_into(tracked, &bdir) {
            Ok(copied) => {
                info!(backup = %id, files = copied, "backup created");
                Ok(id)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&bdir);
                Err(Error::BackupFailed(e.to_string()))
            }
        }
    }

    /// Known backups, newest first.
    pub fn backups(&self) -> Result<Vec<BackupInfo>> {
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.backups_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(BACKUP_SUFFIX) {
                continue;
            }
            let id = BackupId::from_name(name);
            backups.push(BackupInfo {
                timestamp: id.timestamp(),
                id,
            });
        }
        backups.sort_by_key(|info| {
            std::cmp::Reverse(
                info.timestamp
                    .map(|t| t.timestamp_millis())
                    .unwrap_or(i64::MIN),
            )
        });
        Ok(backups)
    }

    /// Accepts the listed name with or without the `.backup` suffix.
    pub fn resolve(&self, name: &str) -> Result<BackupId> {
        if name.ends_with(BACKUP_SUFFIX) && self.backups_root.join(name).is_dir() {
            return Ok(BackupId::from_name(name));
        }
        let suffixed = format!("{name}{BACKUP_SUFFIX}");
        if self.backups_root.join(&suffixed).is_dir() {
            return Ok(BackupId::from_name(suffixed));
        }
        Err(Error::BackupNotFound(name.to_string()))
    }

    pub fn backup_dir(&self, id: &BackupId) -> PathBuf {
        self.backups_root.join(id.as_str())
    }

    fn copy_into(&self, tracked: &Path, bdir: &Path) -> io::Result<u64> {
        let meta = match fs::metadata(tracked) {
            Ok(meta) => meta,
            Err(_) => {
                info!(path = %tracked.display(), "tracked path missing, backup left empty");
                return Ok(0);
            }
        };

        if meta.is_file() {
            let name = tracked.file_name().ok_or_else(|| {
                io::Error::new(io::ErrorKind::Other, "file target has no name")
            })?;
            fs::copy(tracked, bdir.join(name))?;
            return Ok(1);
        }
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "target is neither a file nor a directory",
            ));
        }

        let root = tracked.canonicalize()?;
        let excluded: Vec<PathBuf> = [&self.versions_root, &self.backups_root]
            .iter()
            .filter_map(|path| path.canonicalize().ok())
            .collect();

        let mut copied = 0;
        let walker = WalkDir::new(&root)
            .into_iter()
            .filter_entry(|entry| !excluded.iter().any(|ex| ex.as_path() == entry.path()));
        for entry in walker {
            let entry = entry?;
            let rel = match entry.path().strip_prefix(&root) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel,
                _ => continue,
            };
            if entry.file_type().is_dir() {
                fs::create_dir_all(bdir.join(rel))?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), bdir.join(rel))?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    fn allocate_backup_id(&self, base: &str, label: Option<&str>) -> BackupId {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = BackupId::new(base, label, millis);
            if !self.backup_dir(&id).exists() {
                return id;
            }
            millis += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            versions_root: dir.path().join("versions"),
            backups_root: dir.path().join("backups"),
            commit_interval: 5,
        }
    }

    fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn tree_files(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut state = BTreeMap::new();
        for entry in WalkDir::new(root) {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
                state.insert(rel, fs::read(entry.path()).unwrap());
            }
        }
        state
    }

    #[test]
    fn test_backup_copies_tree() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("project");
        write_file(&work, "a.txt", "alpha\n");
        write_file(&work, "sub/deep/b.txt", "beta\n");
        fs::create_dir_all(work.join("empty")).unwrap();

        let guard = BackupGuard::open(&test_config(&dir)).unwrap();
        let id = guard.snapshot_current_state(&work, None).unwrap();

        let bdir = guard.backup_dir(&id);
        assert_eq!(tree_files(&bdir), tree_files(&work));
        assert!(bdir.join("empty").is_dir());
        assert!(id.as_str().starts_with("project_"));
        assert!(id.as_str().ends_with(".backup"));
    }

    #[test]
    fn test_file_target_backup() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "scribble\n").unwrap();

        let guard = BackupGuard::open(&test_config(&dir)).unwrap();
        let id = guard.snapshot_current_state(&file, None).unwrap();

        let copied = guard.backup_dir(&id).join("notes.txt");
        assert_eq!(fs::read_to_string(copied).unwrap(), "scribble\n");
    }

    #[test]
    fn test_label_lands_in_name() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("project");
        write_file(&work, "a.txt", "alpha\n");

        let guard = BackupGuard::open(&test_config(&dir)).unwrap();
        let id = guard
            .snapshot_current_state(&work, Some("current"))
            .unwrap();

        assert!(id.as_str().starts_with("project_current_"));
        assert!(id.as_str().ends_with(".backup"));
    }

    #[test]
    fn test_missing_tracked_path_gives_empty_backup() {
        let dir = TempDir::new().unwrap();
        let guard = BackupGuard::open(&test_config(&dir)).unwrap();

        let id = guard
            .snapshot_current_state(&dir.path().join("ghost"), None)
            .unwrap();

        assert!(guard.backup_dir(&id).is_dir());
        assert!(tree_files(&guard.backup_dir(&id)).is_empty());
    }

    #[test]
    fn test_backups_listed_newest_first() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("project");
        write_file(&work, "a.txt", "alpha\n");

        let guard = BackupGuard::open(&test_config(&dir)).unwrap();
        let first = guard.snapshot_current_state(&work, None).unwrap();
        let second = guard.snapshot_current_state(&work, None).unwrap();

        let listed = guard.backups().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].id, first);
    }

    #[test]
    fn test_resolve_with_and_without_suffix() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("project");
        write_file(&work, "a.txt", "alpha\n");

        let guard = BackupGuard::open(&test_config(&dir)).unwrap();
        let id = guard.snapshot_current_state(&work, None).unwrap();

        assert_eq!(guard.resolve(id.as_str()).unwrap(), id);
        let bare = id.as_str().strip_suffix(".backup").unwrap();
        assert_eq!(guard.resolve(bare).unwrap(), id);

        let err = guard.resolve("project_0.backup").unwrap_err();
        assert!(matches!(err, Error::BackupNotFound(_)));
    }

    #[test]
    fn test_store_roots_inside_tracked_excluded() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("project");
        write_file(&work, "a.txt", "alpha\n");

        let config = Config {
            versions_root: work.join("versions"),
            backups_root: work.join("backups"),
            commit_interval: 5,
        };
        fs::create_dir_all(&config.versions_root).unwrap();
        write_file(&config.versions_root, "stored.txt", "internal\n");

        let guard = BackupGuard::open(&config).unwrap();
        let id = guard.snapshot_current_state(&work, None).unwrap();

        let copied = tree_files(&guard.backup_dir(&id));
        assert_eq!(copied.len(), 1);
        assert!(copied.contains_key(Path::new("a.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_backup_leaves_nothing() {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let dir = TempDir::new().unwrap();
        let work = dir.path().join("project");
        write_file(&work, "a.txt", "alpha\n");
        let sealed = work.join("sealed");
        fs::create_dir_all(&sealed).unwrap();
        write_file(&sealed, "inner.txt", "hidden\n");

        if fs::metadata(&sealed).unwrap().uid() == 0 {
            // Privileged runs bypass mode bits, nothing to assert.
            return;
        }
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o000)).unwrap();

        let config = test_config(&dir);
        let guard = BackupGuard::open(&config).unwrap();
        let err = guard.snapshot_current_state(&work, None).unwrap_err();

        assert!(matches!(err, Error::BackupFailed(_)));
        assert_eq!(fs::read_dir(&config.backups_root).unwrap().count(), 0);

        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
