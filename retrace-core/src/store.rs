use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{EntryKind, VersionEntry, VersionId, VersionInfo};
use crate::patch;
use crate::reconstruct;

const HISTORY_FILE: &str = "history.log";
const COUNTER_FILE: &str = "commit_count.txt";
const MESSAGE_FILE: &str = "commit_message.txt";
const DELTA_SUFFIX: &str = ".diff";
const DELTA_EXTENSION: &str = "diff";
const FALLBACK_BASE: &str = "repo";

/// Filesystem-backed version store. One directory per version, with the
/// history log and commit counter living next to them.
#[derive(Debug)]
pub struct SnapshotStore {
    versions_root: PathBuf,
    backups_root: PathBuf,
    commit_interval: u32,
}

impl SnapshotStore {
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.versions_root)?;
        debug!(root = %config.versions_root.display(), "opened version store");
        Ok(Self {
            versions_root: config.versions_root.clone(),
            backups_root: config.backups_root.clone(),
            commit_interval: config.commit_interval,
        })
    }

    pub fn versions_root(&self) -> &Path {
        &self.versions_root
    }

    pub fn commit_interval(&self) -> u32 {
        self.commit_interval
    }

    /// Records the current state of `tracked` as a new version and registers
    /// it at the end of the history log. Nothing is registered if any source
    /// file cannot be read.
    pub fn commit(&self, tracked: &Path, message: &str) -> Result<VersionId> {
        let scan = scan_tracked(
            tracked,
            &[self.versions_root.as_path(), self.backups_root.as_path()],
        )?;
        let history = self.history()?;
        let counter = self.commit_count()?;
        let full_commit = (counter + 1) % u64::from(self.commit_interval) == 0;

        let base = target_base_name(tracked);
        let id = self.allocate_version_id(&base);
        let vdir = self.version_dir(&id);
        fs::create_dir_all(&vdir)?;

        debug!(
            version = %id,
            files = scan.files.len(),
            full_commit,
            "writing version"
        );

        // Unregistered version directories must not survive a failed commit.
        if let Err(e) = self.populate_version(&vdir, &scan, &history, full_commit, message) {
            let _ = fs::remove_dir_all(&vdir);
            return Err(e);
        }
        if let Err(e) = self.append_history(&id) {
            let _ = fs::remove_dir_all(&vdir);
            return Err(e);
        }
        // The history append is the registration point. A crash before the
        // counter write below skews the next interval decision by one.
        self.write_commit_count(counter + 1)?;

        info!(version = %id, files = scan.files.len(), "version committed");
        Ok(id)
    }

    /// Number of commits recorded so far. Missing or unreadable counters
    /// restart the interval cycle rather than blocking commits.
    pub fn commit_count(&self) -> Result<u64> {
        let path = self.versions_root.join(COUNTER_FILE);
        if !path.exists() {
            return Ok(0);
        }
        let text = fs::read_to_string(&path)?;
        match text.trim().parse() {
            Ok(count) => Ok(count),
            Err(_) => {
                warn!(value = %text.trim(), "unreadable commit counter, starting from 0");
                Ok(0)
            }
        }
    }

    /// Registered versions, oldest first. The log order is authoritative
    /// even when embedded timestamps disagree.
    pub fn history(&self) -> Result<Vec<VersionId>> {
        let path = self.versions_root.join(HISTORY_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path)?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(VersionId::from_name)
            .collect())
    }

    /// History enriched with messages, timestamps, and entry counts.
    pub fn versions(&self) -> Result<Vec<VersionInfo>> {
        let history = self.history()?;
        let mut infos = Vec::with_capacity(history.len());
        for (position, id) in history.into_iter().enumerate() {
            let message = self.message(&id)?;
            let entry_count = self.entries(&id).map(|e| e.len()).unwrap_or(0);
            infos.push(VersionInfo {
                position,
                timestamp: id.timestamp(),
                message,
                entry_count,
                id,
            });
        }
        Ok(infos)
    }

    pub fn resolve(&self, name: &str) -> Result<(usize, VersionId)> {
        self.history()?
            .into_iter()
            .enumerate()
            .find(|(_, id)| id.as_str() == name)
            .ok_or_else(|| Error::VersionNotFound(name.to_string()))
    }

    pub fn message(&self, id: &VersionId) -> Result<String> {
        let path = self.version_dir(id).join(MESSAGE_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok("No commit message found.".to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Files recorded in a version, classified by how they were stored.
    pub fn entries(&self, id: &VersionId) -> Result<Vec<VersionEntry>> {
        let vdir = self.version_dir(id);
        if !vdir.is_dir() {
            return Err(Error::VersionNotFound(id.as_str().to_string()));
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(&vdir) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(&vdir) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            if rel == Path::new(MESSAGE_FILE) {
                continue;
            }
            // Extension check on the raw OsStr, so entry names that are not
            // valid UTF-8 keep their exact bytes.
            if is_delta_name(rel) {
                entries.push(VersionEntry {
                    path: rel.with_extension(""),
                    kind: EntryKind::Delta,
                });
            } else {
                entries.push(VersionEntry {
                    path: rel.to_path_buf(),
                    kind: EntryKind::Full,
                });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    pub fn version_dir(&self, id: &VersionId) -> PathBuf {
        self.versions_root.join(id.as_str())
    }

    pub fn full_entry_path(&self, id: &VersionId, rel: &Path) -> PathBuf {
        self.version_dir(id).join(rel)
    }

    pub fn delta_entry_path(&self, id: &VersionId, rel: &Path) -> PathBuf {
        let mut path = self.version_dir(id).join(rel).into_os_string();
        path.push(DELTA_SUFFIX);
        PathBuf::from(path)
    }

    pub(crate) fn read_full(&self, id: &VersionId, rel: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(self.full_entry_path(id, rel))?)
    }

    pub(crate) fn read_patch(&self, id: &VersionId, rel: &Path) -> Result<String> {
        Ok(fs::read_to_string(self.delta_entry_path(id, rel))?)
    }

    fn populate_version(
        &self,
        vdir: &Path,
        scan: &TrackedScan,
        history: &[VersionId],
        full_commit: bool,
        message: &str,
    ) -> Result<()> {
        for rel in &scan.files {
            let source = scan.root.join(rel);
            let bytes = fs::read(&source).map_err(|e| Error::SourceRead {
                path: source.clone(),
                source: e,
            })?;

            let repr = if full_commit {
                StoredRepr::Full
            } else {
                self.delta_or_full(history, rel, &bytes)
            };

            let dest = match &repr {
                StoredRepr::Full => vdir.join(rel),
                StoredRepr::Delta(_) => {
                    let mut path = vdir.join(rel).into_os_string();
                    path.push(DELTA_SUFFIX);
                    PathBuf::from(path)
                }
            };
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            match repr {
                StoredRepr::Full => fs::write(dest, &bytes)?,
                StoredRepr::Delta(patch_text) => fs::write(dest, patch_text)?,
            }
        }
        fs::write(vdir.join(MESSAGE_FILE), message)?;
        Ok(())
    }

    /// Picks delta storage when the file has a readable text history, full
    /// storage otherwise. First appearances and binary content are always
    /// stored whole.
    fn delta_or_full(&self, history: &[VersionId], rel: &Path, bytes: &[u8]) -> StoredRepr {
        if history.is_empty() {
            return StoredRepr::Full;
        }
        let previous = match reconstruct::file_state_at(self, history, history.len() - 1, rel) {
            Ok(Some(previous)) => previous,
            Ok(None) => return StoredRepr::Full,
            Err(e) => {
                warn!(
                    path = %rel.display(),
                    error = %e,
                    "prior state unreadable, storing full copy"
                );
                return StoredRepr::Full;
            }
        };
        let previous = match String::from_utf8(previous) {
            Ok(text) => text,
            Err(_) => {
                debug!(path = %rel.display(), "previous content not text, storing full copy");
                return StoredRepr::Full;
            }
        };
        match std::str::from_utf8(bytes) {
            Ok(current) => StoredRepr::Delta(patch::diff(&previous, current)),
            Err(_) => {
                debug!(path = %rel.display(), "binary content, storing full copy");
                StoredRepr::Full
            }
        }
    }

    fn allocate_version_id(&self, base: &str) -> VersionId {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = VersionId::new(base, millis);
            if !self.version_dir(&id).exists() {
                return id;
            }
            millis += 1;
        }
    }

    fn append_history(&self, id: &VersionId) -> Result<()> {
        use std::io::Write;

        let path = self.versions_root.join(HISTORY_FILE);
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{id}")?;
        Ok(())
    }

    fn write_commit_count(&self, count: u64) -> Result<()> {
        fs::write(self.versions_root.join(COUNTER_FILE), count.to_string())?;
        Ok(())
    }
}

enum StoredRepr {
    Full,
    Delta(String),
}

/// What a commit or restore operates on: the directory the relative paths
/// hang off, and every regular file beneath it.
pub(crate) struct TrackedScan {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Walks the tracked path. Store directories nested inside it are excluded,
/// as are names the store reserves for its own artifacts.
pub(crate) fn scan_tracked(tracked: &Path, excluded: &[&Path]) -> Result<TrackedScan> {
    let meta = fs::metadata(tracked)
        .map_err(|_| Error::InvalidTarget(format!("{} does not exist", tracked.display())))?;

    if meta.is_file() {
        let name = tracked.file_name().ok_or_else(|| {
            Error::InvalidTarget(format!("{} has no file name", tracked.display()))
        })?;
        // A single-file target lands at the version root, where reserved
        // names collide with the store's own artifacts.
        let file = Path::new(name);
        if file == Path::new(MESSAGE_FILE) || is_delta_name(file) {
            return Err(Error::InvalidTarget(format!(
                "{} uses a name reserved for store artifacts",
                tracked.display()
            )));
        }
        let root = match tracked.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        return Ok(TrackedScan {
            root,
            files: vec![PathBuf::from(name)],
        });
    }
    if !meta.is_dir() {
        return Err(Error::InvalidTarget(format!(
            "{} is neither a file nor a directory",
            tracked.display()
        )));
    }

    let root = tracked.canonicalize()?;
    let excluded: Vec<PathBuf> = excluded
        .iter()
        .filter_map(|path| path.canonicalize().ok())
        .collect();
    for ex in &excluded {
        if ex.starts_with(&root) {
            debug!(path = %ex.display(), "store directory sits inside the tracked tree, excluding");
        }
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(&root)
        .into_iter()
        .filter_entry(|entry| !excluded.iter().any(|ex| ex.as_path() == entry.path()));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(&root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };
        if rel == Path::new(MESSAGE_FILE) {
            warn!(path = %rel.display(), "name is reserved for version metadata, skipping");
            continue;
        }
        if is_delta_name(&rel) {
            warn!(path = %rel.display(), "delta suffix is reserved, skipping");
            continue;
        }
        files.push(rel);
    }
    files.sort();
    Ok(TrackedScan { root, files })
}

/// True when the last path component carries the reserved delta extension.
fn is_delta_name(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(DELTA_EXTENSION))
}

/// Base component of version and backup names, taken from the tracked
/// path's resolved file name.
pub(crate) fn target_base_name(tracked: &Path) -> String {
    let resolved = tracked
        .canonicalize()
        .unwrap_or_else(|_| tracked.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_BASE.to_string())
}
