use crate::error::Result;
use crate::index::interner::TokenInterner;
use crate::index::store::Store;
use crate::index::types::{FileId, TokenId, FILE_LEVEL_LINE};
use crate::utils::Tokens;
use rustc_hash::FxHashSet;

/// Counts reported after writing a file's postings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Postings written, file-level ones included
    pub unique: usize,
    /// Tokens emitted by the tokenizer before deduplication
    pub emitted: usize,
    /// Tokens created by this file
    pub new_tokens: usize,
}

impl WriteReport {
    pub fn ratio(&self) -> f64 {
        self.unique as f64 / (self.emitted as f64 + 1e-10)
    }
}

/// Replace the postings of `file` with `tokens`.
///
/// Adds one file-level posting per distinct token and commits the interner,
/// so new token ids land in the same transaction as the postings using them.
/// The caller owns the transaction.
pub fn replace_postings(
    store: &Store,
    interner: &mut TokenInterner,
    file: FileId,
    tokens: &Tokens,
) -> Result<WriteReport> {
    let mut postings: FxHashSet<(TokenId, i64)> = FxHashSet::default();
    for (key, line) in &tokens.pairs {
        let id = interner.get_or_insert(store, key)?;
        postings.insert((id, *line));
        postings.insert((id, FILE_LEVEL_LINE));
    }

    let mut postings: Vec<(TokenId, i64)> = postings.into_iter().collect();
    postings.sort_unstable();

    let new_tokens = interner.commit(store)?;
    store.clear_postings(file)?;
    let unique = store.insert_postings(file, &postings)?;

    Ok(WriteReport {
        unique,
        emitted: tokens.emitted,
        new_tokens,
    })
}

/// Drop every posting of `file`, leaving it indexed as empty
pub fn clear_file(store: &Store, file: FileId) -> Result<usize> {
    store.clear_postings(file)
}
