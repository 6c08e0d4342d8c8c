use crate::error::Result;
use crate::index::interner::TokenInterner;
use crate::index::store::Store;
use crate::index::types::{FileId, TokenId};
use crate::query::planner::SearchPlan;
use crate::utils::cleanup;
use tracing::debug;

/// A search as requested on the command line
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub terms: Vec<String>,
    /// Substrings; files whose path contains one are left out
    pub path_ignores: Vec<String>,
    /// Match terms anywhere in a file instead of on one line
    pub file_mode: bool,
    /// Run an incremental index before searching
    pub update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub file_id: FileId,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    pub file_id: FileId,
    pub path: String,
    pub line: i64,
    pub encoding: Option<String>,
}

/// Matches sorted by path, then line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResults {
    Files(Vec<FileMatch>),
    Lines(Vec<LineMatch>),
}

impl SearchResults {
    fn empty(file_mode: bool) -> Self {
        if file_mode {
            SearchResults::Files(Vec::new())
        } else {
            SearchResults::Lines(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResults::Files(m) => m.len(),
            SearchResults::Lines(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run an AND search over all terms of `request`.
///
/// Terms are normalized like indexed text. A term that was never indexed, or
/// that normalizes to nothing, makes the result empty. The remaining terms
/// are joined rarest first.
pub fn search(
    store: &Store,
    interner: &mut TokenInterner,
    request: &SearchRequest,
) -> Result<SearchResults> {
    if request.terms.is_empty() {
        return Ok(SearchResults::empty(request.file_mode));
    }

    let mut tokens: Vec<TokenId> = Vec::with_capacity(request.terms.len());
    for term in &request.terms {
        let Some(key) = cleanup(term) else {
            debug!(term, "Term too short to be indexed");
            return Ok(SearchResults::empty(request.file_mode));
        };
        match interner.lookup(store, &key)? {
            Some(id) => tokens.push(id),
            None => {
                debug!(term, "Term not in index");
                return Ok(SearchResults::empty(request.file_mode));
            }
        }
    }
    tokens.sort_unstable();
    tokens.dedup();

    let tokens = order_by_cardinality(store, tokens)?;
    let plan = SearchPlan::new(tokens.len(), request.path_ignores.len(), request.file_mode);
    let params = plan.bind(&tokens, &request.path_ignores);
    debug!(sql = %plan.sql, "Search query");

    let results = if request.file_mode {
        SearchResults::Files(store.run_search(&plan.sql, &params, |row| {
            Ok(FileMatch {
                path: row.get(0)?,
                file_id: row.get(1)?,
            })
        })?)
    } else {
        SearchResults::Lines(store.run_search(&plan.sql, &params, |row| {
            Ok(LineMatch {
                path: row.get(0)?,
                file_id: row.get(1)?,
                line: row.get(2)?,
                encoding: row.get(3)?,
            })
        })?)
    };

    Ok(results)
}

/// Sort tokens by ascending posting count
fn order_by_cardinality(store: &Store, tokens: Vec<TokenId>) -> Result<Vec<TokenId>> {
    let mut counted = Vec::with_capacity(tokens.len());
    for token in tokens {
        counted.push((store.token_cardinality(token)?, token));
    }
    counted.sort_unstable();
    Ok(counted.into_iter().map(|(_, token)| token).collect())
}
