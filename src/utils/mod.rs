//! Utility functions shared by indexing and searching.
//!
//! ## Modules
//!
//! - [`app_data`] - User configuration file
//! - [`binary`] - Binary content sniffing
//! - [`decode`] - UTF-8 decoding with encoding detection fallback
//! - [`hash`] - Content digests and inode/mtime fingerprints
//! - [`logging`] - Log subscriber setup for the binaries
//! - [`paths`] - Store location and relative path helpers
//! - [`progress`] - Heartbeat spinner
//! - [`tokenizer`] - Line tokenization and token normalization
//!
//! ```no_run
//! use finja::utils::{cleanup, Tokenizer};
//!
//! let tokenizer = Tokenizer::new(false);
//! let tokens = tokenizer.line_tokens("foo_bar-baz");
//! // foo_bar-baz, foo_bar, bar-baz, foo, bar, baz, ...
//! assert!(tokens.contains(&cleanup("foo").unwrap()));
//! ```

pub mod app_data;
pub mod binary;
pub mod decode;
pub mod hash;
pub mod logging;
pub mod paths;
pub mod progress;
pub mod tokenizer;

pub use app_data::*;
pub use binary::*;
pub use decode::*;
pub use hash::*;
pub use logging::init_logging;
pub use paths::*;
pub use tokenizer::*;
