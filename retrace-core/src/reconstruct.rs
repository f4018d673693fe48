use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Reconstruction, VersionId};
use crate::patch;
use crate::store::SnapshotStore;

/// Rebuilds full file contents from stored versions by walking each delta
/// chain back to its nearest full copy.
pub struct ReconstructionEngine<'a> {
    store: &'a SnapshotStore,
}

impl<'a> ReconstructionEngine<'a> {
    pub fn new(store: &'a SnapshotStore) -> Self {
        Self { store }
    }

    /// Rebuilds every file recorded in `version`. Files whose chains cannot
    /// be replayed are reported as failures without affecting the rest.
    /// Reconstruction never writes to the store.
    pub fn reconstruct(&self, version: &VersionId) -> Result<Reconstruction> {
        let (position, _) = self.store.resolve(version.as_str())?;
        let history = self.store.history()?;
        let entries = self.store.entries(version)?;

        let mut files = BTreeMap::new();
        let mut failures = Vec::new();
        for entry in entries {
            match file_state_at(self.store, &history, position, &entry.path) {
                Ok(Some(bytes)) => {
                    files.insert(entry.path, bytes);
                }
                Ok(None) => failures.push((
                    entry.path.clone(),
                    Error::ChainBroken {
                        path: entry.path,
                        version: version.clone(),
                        reason: "entry disappeared during reconstruction".to_string(),
                    },
                )),
                Err(e) => failures.push((entry.path, e)),
            }
        }

        debug!(
            version = %version,
            rebuilt = files.len(),
            failed = failures.len(),
            "reconstruction finished"
        );
        Ok(Reconstruction {
            version: version.clone(),
            files,
            failures,
        })
    }
}

/// State of one file as of `history[upto]`, or `None` when no version up to
/// that point records it. Walks backward to the nearest full copy, then
/// replays the intervening patches oldest first.
pub(crate) fn file_state_at(
    store: &SnapshotStore,
    history: &[VersionId],
    upto: usize,
    rel: &Path,
) -> Result<Option<Vec<u8>>> {
    // (history index, patch text), collected newest first.
    let mut patches: Vec<(usize, String)> = Vec::new();
    let mut base: Option<(usize, Vec<u8>)> = None;

    for index in (0..=upto).rev() {
        let id = &history[index];
        if store.full_entry_path(id, rel).exists() {
            base = Some((index, store.read_full(id, rel)?));
            break;
        }
        if store.delta_entry_path(id, rel).exists() {
            patches.push((index, store.read_patch(id, rel)?));
        }
    }

    let (base_index, base_bytes) = match base {
        Some(found) => found,
        None if patches.is_empty() => return Ok(None),
        None => {
            let (oldest, _) = patches[patches.len() - 1];
            return Err(Error::ChainBroken {
                path: rel.to_path_buf(),
                version: history[oldest].clone(),
                reason: "no full copy precedes the delta chain".to_string(),
            });
        }
    };

    if patches.is_empty() {
        return Ok(Some(base_bytes));
    }

    let mut text = String::from_utf8(base_bytes).map_err(|_| Error::ChainBroken {
        path: rel.to_path_buf(),
        version: history[base_index].clone(),
        reason: "full copy anchoring the chain is not text".to_string(),
    })?;
    for (index, patch_text) in patches.iter().rev() {
        text = patch::apply(&text, patch_text).map_err(|e| Error::ChainBroken {
            path: rel.to_path_buf(),
            version: history[*index].clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(Some(text.into_bytes()))
}
