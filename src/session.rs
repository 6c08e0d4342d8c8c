//! Per-invocation context tying the store to the indexing and search code.

use crate::error::Result;
use crate::index::{
    compact, summarize, CompactReport, IndexConfig, IndexReport, IndexSummary, Indexer, Store,
    TokenInterner,
};
use crate::query::{self, SearchRequest, SearchResults};
use crate::utils::{find_store_root, Tokenizer};
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything one invocation needs: the tree root, the open store, the token
/// interner, the tokenizer configured for this store and the index settings.
pub struct Session {
    root: PathBuf,
    store: Store,
    interner: TokenInterner,
    tokenizer: Tokenizer,
    config: IndexConfig,
}

impl Session {
    /// Open the store in `root`, creating it when missing
    pub fn create(root: &Path, config: IndexConfig) -> Result<Self> {
        Self::open_store(root, true, config)
    }

    /// Open the existing store in `root`
    pub fn open(root: &Path, config: IndexConfig) -> Result<Self> {
        Self::open_store(root, false, config)
    }

    /// Open the store of the tree containing `start`
    pub fn discover(start: &Path, config: IndexConfig) -> Result<Self> {
        let root = find_store_root(start)?;
        Self::open(&root, config)
    }

    fn open_store(root: &Path, create: bool, config: IndexConfig) -> Result<Self> {
        let root = root.canonicalize()?;
        let store = Store::open(&root, create, config.interpunct)?;
        // The stored setting wins over the flag once the store exists
        let tokenizer = Tokenizer::new(store.interpunct()?);
        let interner = TokenInterner::load(&store, config.cache_budget)?;

        Ok(Self {
            root,
            store,
            interner,
            tokenizer,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Index the tree; `update` marks an incremental run with quiet logging
    pub fn run_index(&mut self, update: bool) -> Result<IndexReport> {
        let report = Indexer::new(
            &self.store,
            &mut self.interner,
            &self.tokenizer,
            &self.root,
            &self.config,
        )
        .run(update)?;

        let stats = &report.stats;
        if update {
            tracing::debug!(?stats, "Update done");
        } else {
            info!(
                passes = stats.passes,
                indexed = stats.files_indexed,
                unchanged = stats.files_unchanged,
                duplicates = stats.files_duplicate,
                removed = stats.files_removed,
                "Indexing done"
            );
        }
        Ok(report)
    }

    /// Search, running an update first when the request asks for it.
    /// Returns `None` when that update stopped at the batch limit.
    pub fn search(&mut self, request: &SearchRequest) -> Result<Option<SearchResults>> {
        if request.update && self.run_index(true)?.batch_limit_reached {
            return Ok(None);
        }
        query::search(&self.store, &mut self.interner, request).map(Some)
    }

    pub fn compact(&mut self, visible: bool) -> Result<CompactReport> {
        compact(&self.store, &mut self.interner, visible)
    }

    pub fn summary(&self) -> Result<IndexSummary> {
        summarize(&self.store)
    }
}
