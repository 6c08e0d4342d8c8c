use crate::utils::{digest128, TokenKey};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rustc_hash::FxHashSet;

/// Identifier of a token row
pub type TokenId = i64;

/// Identifier of a file row
pub type FileId = i64;

/// Line number of a posting that means "somewhere in this file"
pub const FILE_LEVEL_LINE: i64 = -1;

/// Version of the store layout; a store with another version is rejected
pub const SCHEMA_VERSION: i64 = 1;

/// Token ids are allocated above this initial watermark
pub const INITIAL_TOKEN_WATERMARK: TokenId = 41;

/// Directory names never descended into
pub const IGNORE_DIRS: &[&str] = &["__pycache__", "__MACOSX"];

/// Very common binary files and annoying text files like svg
pub const IGNORE_EXTENSIONS: &[&str] = &[
    "log", "svg", "hex", "ihex", "vmdk", "vdi", "pyc", "ai", "ps", "pdf", "png", "bmp", "gif",
    "tif", "tiff", "jpg", "jpeg", "ico", "avi", "mpg", "mpeg", "mp3", "wav", "aiff", "mp4", "m4a",
    "m4v", "zip", "gz", "tar", "rar", "mov", "ogg", "ogv", "raw", "jar", "so", "ko", "o", "bin",
];

/// 128-bit digest of a file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 16]);

impl ContentHash {
    pub fn of(content: &[u8]) -> Self {
        ContentHash(digest128(content))
    }
}

impl ToSql for ContentHash {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.0[..]))
    }
}

impl FromSql for ContentHash {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        let bytes: [u8; 16] = blob.try_into().map_err(|_| FromSqlError::InvalidBlobSize {
            expected_size: 16,
            blob_size: blob.len(),
        })?;
        Ok(ContentHash(bytes))
    }
}

/// Literal tokens are stored as TEXT, digested tokens as a BLOB, in the
/// same column.
impl ToSql for TokenKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            TokenKey::Text(s) => ToSqlOutput::from(s.as_str()),
            TokenKey::Digest(d) => ToSqlOutput::from(&d[..]),
        })
    }
}

/// Persisted process-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Interpunct = 0,
    MaxId = 1,
    Version = 2,
}

impl SettingKey {
    pub fn name(self) -> &'static str {
        match self {
            SettingKey::Interpunct => "interpunct",
            SettingKey::MaxId => "max_id",
            SettingKey::Version => "version",
        }
    }
}

/// Stored state of one indexed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: FileId,
    pub path: String,
    pub content_hash: Option<ContentHash>,
    pub fingerprint: Option<i64>,
    pub found: bool,
    pub encoding: Option<String>,
}

/// Settings for an index run
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Stop after this many files were read; 0 disables the limit
    pub batch_limit: usize,
    /// Forget all fingerprints first so every file is hashed again
    pub reset_fingerprints: bool,
    /// Cached token ids before the interner cache is cleared
    pub cache_budget: usize,
    /// Use international separators; only applies when creating a store
    pub interpunct: bool,
    pub ignore_dirs: FxHashSet<String>,
    /// Lowercase extensions without the leading dot
    pub ignore_extensions: FxHashSet<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_limit: 0,
            reset_fingerprints: false,
            cache_budget: 1024 * 1024,
            interpunct: false,
            ignore_dirs: IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            ignore_extensions: IGNORE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Counters collected over an index run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub passes: usize,
    pub files_seen: usize,
    pub files_skipped: usize,
    pub files_unchanged: usize,
    pub files_duplicate: usize,
    pub files_binary: usize,
    pub files_indexed: usize,
    pub decode_failures: usize,
    /// Content hashes computed; unchanged fingerprints skip hashing
    pub files_hashed: usize,
    pub files_removed: usize,
    pub tokens_created: usize,
    pub postings_written: usize,
}
