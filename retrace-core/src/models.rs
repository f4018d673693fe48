use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifier of a stored version, `<base>_<millis>`. The name doubles as
/// the version directory name, so it must stay round-trip stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(base: &str, timestamp_millis: i64) -> Self {
        Self(format!("{base}_{timestamp_millis}"))
    }

    pub fn from_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time recovered from the name. `None` when the name does not
    /// carry a parseable millisecond suffix.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let (_, millis) = self.0.rsplit_once('_')?;
        let millis: i64 = millis.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Full,
    Delta,
}

impl EntryKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntryKind::Full => "full",
            EntryKind::Delta => "delta",
        }
    }
}

/// A single file recorded in a version, addressed relative to the tracked
/// root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub id: VersionId,
    /// Zero-based position in the history log.
    pub position: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub message: String,
    pub entry_count: usize,
}

/// Identifier of a safety backup, `<base>[_<label>]_<millis>.backup`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupId(String);

impl BackupId {
    pub fn new(base: &str, label: Option<&str>, timestamp_millis: i64) -> Self {
        match label {
            Some(label) => Self(format!("{base}_{label}_{timestamp_millis}.backup")),
            None => Self(format!("{base}_{timestamp_millis}.backup")),
        }
    }

    pub fn from_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let stem = self.0.strip_suffix(".backup")?;
        let (_, millis) = stem.rsplit_once('_')?;
        let millis: i64 = millis.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub id: BackupId,
    pub timestamp: Option<DateTime<Utc>>,
}

/// In-memory result of rebuilding a version. Files that could not be
/// rebuilt are reported in `failures` instead of aborting the whole
/// reconstruction.
#[derive(Debug)]
pub struct Reconstruction {
    pub version: VersionId,
    pub files: BTreeMap<PathBuf, Vec<u8>>,
    pub failures: Vec<(PathBuf, Error)>,
}

impl Reconstruction {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Skip the confirmation collaborator and proceed straight to restore.
    pub force: bool,
}

#[derive(Debug)]
pub enum RestoreOutcome {
    /// The workspace was rewritten. `backup` names the pre-restore copy.
    Completed { backup: BackupId },
    /// The confirmation collaborator declined. Nothing was touched.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Restored,
    Removed,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug)]
pub struct RestoreReport {
    pub outcome: RestoreOutcome,
    pub files: Vec<FileOutcome>,
}

impl RestoreReport {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, RestoreOutcome::Cancelled)
    }

    pub fn has_failures(&self) -> bool {
        self.files
            .iter()
            .any(|f| matches!(f.status, FileStatus::Failed(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_id_round_trip() {
        let id = VersionId::new("project", 1_700_000_000_000);
        assert_eq!(id.as_str(), "project_1700000000000");
        assert_eq!(VersionId::from_name("project_1700000000000"), id);
    }

    #[test]
    fn test_version_id_timestamp() {
        let id = VersionId::new("notes", 1_700_000_000_000);
        let ts = id.timestamp().unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_version_id_without_timestamp() {
        assert!(VersionId::from_name("plain").timestamp().is_none());
        assert!(VersionId::from_name("notes_abc").timestamp().is_none());
    }

    #[test]
    fn test_base_with_underscores() {
        let id = VersionId::new("my_project", 42);
        assert_eq!(id.as_str(), "my_project_42");
        assert_eq!(id.timestamp().unwrap().timestamp_millis(), 42);
    }

    #[test]
    fn test_backup_id_naming() {
        let plain = BackupId::new("project", None, 99);
        assert_eq!(plain.as_str(), "project_99.backup");
        assert_eq!(plain.timestamp().unwrap().timestamp_millis(), 99);

        let labelled = BackupId::new("project", Some("current"), 99);
        assert_eq!(labelled.as_str(), "project_current_99.backup");
        assert_eq!(labelled.timestamp().unwrap().timestamp_millis(), 99);
    }

    #[test]
    fn test_restore_report_failures() {
        let report = RestoreReport {
            outcome: RestoreOutcome::Cancelled,
            files: vec![
                FileOutcome {
                    path: PathBuf::from("a.txt"),
                    status: FileStatus::Restored,
                },
                FileOutcome {
                    path: PathBuf::from("b.txt"),
                    status: FileStatus::Failed("disk full".to_string()),
                },
            ],
        };

        assert!(report.is_cancelled());
        assert!(report.has_failures());
    }
}
