use crate::error::Result;
use crate::index::interner::TokenInterner;
use crate::index::store::Store;
use crate::utils::progress::heartbeat;
use tracing::info;

/// Result of a compaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactReport {
    pub tokens_removed: usize,
}

/// Remove tokens without postings, then rebuild the database file.
///
/// A spinner ticks while SQLite works when `visible` is set.
pub fn compact(store: &Store, interner: &mut TokenInterner, visible: bool) -> Result<CompactReport> {
    let spinner = heartbeat("Compacting database...", visible);

    let tx = store.transaction()?;
    let tokens_removed = store.delete_free_tokens()?;
    tx.commit()?;

    // Cached ids may point at removed tokens
    interner.clear();

    store.vacuum()?;
    spinner.finish_and_clear();

    info!(tokens_removed, "Compaction done");
    Ok(CompactReport { tokens_removed })
}
