pub mod build;
pub mod compact;
pub mod detect;
pub mod interner;
pub mod stats;
pub mod store;
pub mod types;
pub mod writer;

pub use build::{IndexReport, Indexer};
pub use compact::{compact, CompactReport};
pub use detect::{ChangeDetector, ChangeReport, Classification};
pub use interner::TokenInterner;
pub use stats::{summarize, IndexSummary};
pub use store::{Store, StoreSummary};
pub use types::*;
