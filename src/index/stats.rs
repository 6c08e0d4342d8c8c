use crate::error::Result;
use crate::index::store::{Store, StoreSummary};
use std::fmt;
use std::fs;

/// Store counts plus the size of the database file
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub counts: StoreSummary,
    /// None for in-memory stores
    pub size_bytes: Option<u64>,
}

pub fn summarize(store: &Store) -> Result<IndexSummary> {
    let counts = store.summary()?;
    let size_bytes = fs::metadata(store.path()).ok().map(|m| m.len());
    Ok(IndexSummary { counts, size_bytes })
}

impl fmt::Display for IndexSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files:              {}", self.counts.files)?;
        writeln!(f, "Tokens:             {}", self.counts.tokens)?;
        writeln!(f, "Postings:           {}", self.counts.postings)?;
        writeln!(f, "Duplicate clusters: {}", self.counts.duplicate_clusters)?;
        writeln!(f, "Token watermark:    {}", self.counts.token_watermark)?;
        if let Some(size) = self.size_bytes {
            writeln!(f, "Database size:      {}", format_size(size))?;
        }
        Ok(())
    }
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
