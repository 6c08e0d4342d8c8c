use crate::error::Result;
use crate::index::detect::{ChangeDetector, Classification};
use crate::index::interner::TokenInterner;
use crate::index::store::Store;
use crate::index::types::{IndexConfig, IndexStats};
use crate::index::writer;
use crate::utils::{
    decode, is_binary, is_state_file, list_entry_path, store_key, Decoded, Tokenizer, LIST_FILE,
};
use ignore::WalkBuilder;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A pass can be followed by at most one more
const MAX_PASSES: usize = 2;

/// Per-file status lines: `info` for explicit index runs, `debug` for
/// updates and second passes.
macro_rules! progress {
    ($quiet:expr, $($arg:tt)+) => {
        if $quiet {
            debug!($($arg)+)
        } else {
            info!($($arg)+)
        }
    };
}

/// Outcome of [`Indexer::run`]
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub stats: IndexStats,
    /// The run stopped early; reconciliation was skipped
    pub batch_limit_reached: bool,
}

enum PassOutcome {
    Complete { second_pass_required: bool },
    BatchLimitReached,
}

enum FileOutcome {
    Done { second_pass_required: bool },
    BatchLimitReached,
}

/// Drives indexing passes over one tree
pub struct Indexer<'a> {
    store: &'a Store,
    interner: &'a mut TokenInterner,
    tokenizer: &'a Tokenizer,
    root: &'a Path,
    config: &'a IndexConfig,
    detector: ChangeDetector,
    stats: IndexStats,
    files_read: usize,
}

impl<'a> Indexer<'a> {
    pub fn new(
        store: &'a Store,
        interner: &'a mut TokenInterner,
        tokenizer: &'a Tokenizer,
        root: &'a Path,
        config: &'a IndexConfig,
    ) -> Self {
        Self {
            store,
            interner,
            tokenizer,
            root,
            config,
            detector: ChangeDetector::new(),
            stats: IndexStats::default(),
            files_read: 0,
        }
    }

    /// Index the tree. `update` selects quieter logging. A second pass runs
    /// when the first one invalidated duplicate clusters or removed files.
    pub fn run(mut self, update: bool) -> Result<IndexReport> {
        if self.config.reset_fingerprints {
            self.store.clear_fingerprints()?;
        }

        let mut quiet = update;
        let mut batch_limit_reached = false;

        for pass in 1..=MAX_PASSES {
            self.stats.passes = pass;
            if pass > 1 {
                progress!(update, "Second pass");
            }

            match self.run_pass(quiet)? {
                PassOutcome::BatchLimitReached => {
                    info!(limit = self.config.batch_limit, "Batch limit reached");
                    batch_limit_reached = true;
                    break;
                }
                PassOutcome::Complete {
                    second_pass_required: false,
                } => break,
                PassOutcome::Complete {
                    second_pass_required: true,
                } => {
                    if pass == MAX_PASSES {
                        debug!("Pass limit reached with pending invalidations");
                    }
                }
            }
            quiet = true;
        }

        self.stats.files_hashed = self.detector.hashes_computed;
        Ok(IndexReport {
            stats: self.stats,
            batch_limit_reached,
        })
    }

    fn run_pass(&mut self, quiet: bool) -> Result<PassOutcome> {
        let list_file = self.root.join(LIST_FILE);
        let walking = !list_file.is_file();

        let paths = if walking {
            walk_tree(self.root, self.config)
        } else {
            read_list_file(self.root, &list_file)?
        };

        // Partial runs cannot tell missing files apart from unvisited ones
        let reconcile = walking && self.config.batch_limit == 0;
        if reconcile {
            self.store.clear_found()?;
        }

        let mut second_pass_required = false;

        for rel in &paths {
            match self.index_file(rel, quiet) {
                Ok(FileOutcome::Done {
                    second_pass_required: required,
                }) => second_pass_required |= required,
                Ok(FileOutcome::BatchLimitReached) => return Ok(PassOutcome::BatchLimitReached),
                Err(e) if !e.is_fatal() => {
                    warn!(path = %rel.display(), error = %e, "Skipping file");
                    self.stats.files_skipped += 1;
                    self.interner.rollback(self.store)?;
                }
                Err(e) => return Err(e),
            }
        }

        if reconcile && self.reconcile(quiet)? {
            second_pass_required = true;
        }

        Ok(PassOutcome::Complete {
            second_pass_required,
        })
    }

    /// Purge rows of files not seen in this pass. Returns true when rows
    /// were removed.
    fn reconcile(&mut self, quiet: bool) -> Result<bool> {
        let tx = self.store.transaction()?;
        let missing = self.store.count_missing()?;
        if missing == 0 {
            return Ok(false);
        }

        let removed = self.store.purge_missing()?;
        tx.commit()?;

        progress!(quiet, missing, removed, "Removed missing files");
        self.stats.files_removed += removed;
        Ok(true)
    }

    fn index_file(&mut self, rel: &Path, quiet: bool) -> Result<FileOutcome> {
        let key = store_key(rel);
        let full_path = self.root.join(rel);

        let meta = match fs::metadata(&full_path) {
            Ok(meta) => meta,
            Err(_) => {
                progress!(quiet, "{key}: not found, skipping");
                self.stats.files_skipped += 1;
                return Ok(FileOutcome::Done {
                    second_pass_required: false,
                });
            }
        };
        if !meta.is_file() {
            progress!(quiet, "{key}: not a plain file, skipping");
            self.stats.files_skipped += 1;
            return Ok(FileOutcome::Done {
                second_pass_required: false,
            });
        }

        self.stats.files_seen += 1;

        let tx = self.store.transaction()?;
        let report = self.detector.classify(self.store, &key, &full_path, &meta)?;
        let done = FileOutcome::Done {
            second_pass_required: report.second_pass_required,
        };

        match report.classification {
            Classification::Unchanged => {
                tx.commit()?;
                self.stats.files_unchanged += 1;
                if report.hashed {
                    progress!(quiet, "{key}: not changed, skipping");
                } else {
                    progress!(quiet, "{key}: uptodate");
                }
                return Ok(done);
            }
            Classification::Duplicate => {
                writer::clear_file(self.store, report.file_id)?;
                tx.commit()?;
                self.stats.files_duplicate += 1;
                progress!(quiet, "{key}: duplicated, skipping");
                return Ok(done);
            }
            Classification::Reindex | Classification::New => {}
        }

        let content = report.content.unwrap_or_default();

        if is_binary(&content) {
            writer::clear_file(self.store, report.file_id)?;
            tx.commit()?;
            self.stats.files_binary += 1;
            progress!(quiet, "{key}: is binary, skipping");
            return Ok(done);
        }

        self.files_read += 1;
        if self.config.batch_limit > 0 && self.files_read > self.config.batch_limit {
            drop(tx);
            self.interner.rollback(self.store)?;
            return Ok(FileOutcome::BatchLimitReached);
        }

        match decode(&content) {
            Decoded::Text { text, encoding } => {
                let tokens = self.tokenizer.tokenize(&text);
                let written =
                    writer::replace_postings(self.store, self.interner, report.file_id, &tokens)?;
                self.store.set_encoding(report.file_id, encoding)?;
                tx.commit()?;

                self.stats.files_indexed += 1;
                self.stats.tokens_created += written.new_tokens;
                self.stats.postings_written += written.unique;
                progress!(
                    quiet,
                    "{key}: indexed {}/{} ({:.3}) new: {} {encoding}",
                    written.unique,
                    written.emitted,
                    written.ratio(),
                    written.new_tokens
                );

                if self.interner.trim() {
                    progress!(quiet, "Clear cache");
                }
            }
            Decoded::Failed { encoding } => {
                writer::clear_file(self.store, report.file_id)?;
                self.store.set_encoding(report.file_id, encoding)?;
                tx.commit()?;
                self.stats.decode_failures += 1;
                warn!("{key}: decoding failed {encoding}");
            }
        }

        Ok(done)
    }
}

/// True when the last extension, or a second-to-last one of at most four
/// characters, is ignored.
fn ignored_extension(name: &str, ignored: &FxHashSet<String>) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    let last = parts[parts.len() - 1].to_lowercase();
    if ignored.contains(&last) {
        return true;
    }

    if parts.len() > 2 {
        let second = parts[parts.len() - 2].to_lowercase();
        if second.chars().count() <= 4 && ignored.contains(&second) {
            return true;
        }
    }

    false
}

/// Root-relative paths of indexable files, sorted per directory.
/// Dot directories and dotfiles are skipped, as are ignored directories,
/// ignored extensions and the store's own files.
pub fn walk_tree(root: &Path, config: &IndexConfig) -> Vec<PathBuf> {
    let ignore_dirs = config.ignore_dirs.clone();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir && ignore_dirs.contains(entry.file_name().to_string_lossy().as_ref()))
        })
        .build();

    walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Walk error");
                None
            }
        })
        .filter(|entry| !entry.file_type().map(|t| t.is_dir()).unwrap_or(true))
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            !is_state_file(&name) && !ignored_extension(&name, &config.ignore_extensions)
        })
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}

/// Paths listed in the list file, one per line
pub fn read_list_file(root: &Path, list_file: &Path) -> Result<Vec<PathBuf>> {
    let content = fs::read_to_string(list_file)?;
    Ok(content
        .lines()
        .filter_map(|line| list_entry_path(root, line))
        .collect())
}
