//! Change detection for a single file.
//!
//! The cheap inode/mtime fingerprint short-circuits unchanged files; only
//! otherwise is the content read and hashed. The file row is updated
//! before the caller decides whether to tokenize.

use crate::error::Result;
use crate::index::store::Store;
use crate::index::types::{ContentHash, FileId};
use crate::utils::metadata_fingerprint;
use std::fs::{self, Metadata};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Fingerprint or content unchanged; postings are kept
    Unchanged,
    /// Known path with new content
    Reindex,
    /// Same content as another file; the file keeps no postings of its own
    Duplicate,
    /// Path seen for the first time
    New,
}

#[derive(Debug)]
pub struct ChangeReport {
    pub file_id: FileId,
    pub classification: Classification,
    /// False when the fingerprint matched and the content was not read
    pub hashed: bool,
    /// A duplicate cluster was invalidated; the tree needs another pass
    pub second_pass_required: bool,
    /// File content, kept for [`Classification::Reindex`] and
    /// [`Classification::New`] so it is not read twice
    pub content: Option<Vec<u8>>,
}

/// Classifies files and counts how many content hashes it computed.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    pub hashes_computed: usize,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `path` (store key) read from `full_path`, updating its row.
    pub fn classify(
        &mut self,
        store: &Store,
        path: &str,
        full_path: &Path,
        meta: &Metadata,
    ) -> Result<ChangeReport> {
        let fingerprint = metadata_fingerprint(meta);
        let record = store.find_file(path)?;

        if let Some(record) = &record {
            if record.fingerprint == Some(fingerprint) {
                store.mark_found(record.id)?;
                return Ok(ChangeReport {
                    file_id: record.id,
                    classification: Classification::Unchanged,
                    hashed: false,
                    second_pass_required: false,
                    content: None,
                });
            }
        }

        let content = fs::read(full_path)?;
        let hash = ContentHash::of(&content);
        self.hashes_computed += 1;

        let old_hash = record.as_ref().and_then(|r| r.content_hash);
        let mut second_pass_required = false;

        if let Some(old) = old_hash {
            if old != hash && store.count_with_hash(old)? > 1 {
                let cleared = store.invalidate_cluster(old)?;
                debug!(path, cleared, "Duplicate cluster invalidated");
                second_pass_required = true;
            }
        }

        let file_id = match &record {
            Some(record) => {
                store.update_file(record.id, hash, fingerprint)?;
                record.id
            }
            None => store.insert_file(path, hash, fingerprint)?,
        };

        let classification = if old_hash == Some(hash) {
            Classification::Unchanged
        } else if store.count_others_with_hash(hash, file_id)? > 0 {
            Classification::Duplicate
        } else if record.is_some() {
            Classification::Reindex
        } else {
            Classification::New
        };

        let content = match classification {
            Classification::Reindex | Classification::New => Some(content),
            Classification::Unchanged | Classification::Duplicate => None,
        };

        Ok(ChangeReport {
            file_id,
            classification,
            hashed: true,
            second_pass_required,
            content,
        })
    }
}
