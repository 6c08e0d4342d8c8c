//! # finja - Index and find stuff
//!
//! finja indexes every word of the text files below a directory into a
//! small SQLite database (`FINJA`) and answers multi-term AND queries on
//! whole lines or whole files.
//!
//! ## Architecture
//!
//! - [`utils`] - Tokenizer, hashing, decoding and path helpers
//! - [`index`] - Store, token interner, change detection and the indexer
//! - [`query`] - Search SQL planning and execution
//! - [`output`] - Result formatting (grouped, context, raw)
//! - [`raw`] - Raw-stream helpers used by `finjacol` and `finjadup`
//! - [`session`] - Per-invocation context
//!
//! ## Quick Start
//!
//! ```no_run
//! use finja::index::IndexConfig;
//! use finja::query::{SearchRequest, SearchResults};
//! use finja::session::Session;
//! use std::path::Path;
//!
//! let mut session = Session::create(Path::new("."), IndexConfig::default())?;
//! session.run_index(false)?;
//!
//! let request = SearchRequest {
//!     terms: vec!["alpha".into(), "beta".into()],
//!     ..SearchRequest::default()
//! };
//! if let Some(SearchResults::Lines(lines)) = session.search(&request)? {
//!     for m in lines {
//!         println!("{}:{}", m.path, m.line);
//!     }
//! }
//! # Ok::<(), finja::FinjaError>(())
//! ```
//!
//! ## Incremental updates
//!
//! Unchanged files are recognized by an inode/mtime fingerprint without
//! reading them. Files with identical content are indexed once; the others
//! are listed as duplicates of it at search time.

pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod raw;
pub mod session;
pub mod utils;

pub use error::{FinjaError, Result};
pub use session::Session;
