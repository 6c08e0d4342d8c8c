//! Embedded SQLite store holding tokens, files and postings.
//!
//! All SQL of the crate lives here, except the search query which is built
//! by [`crate::query::planner`] and run through [`Store::run_search`].

use crate::error::{FinjaError, Result};
use crate::index::types::*;
use crate::utils::{STORE_FILE, TokenKey};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE posting(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token_id INTEGER NOT NULL,
        file_id INTEGER NOT NULL,
        line INTEGER NOT NULL
    );
    CREATE INDEX posting_token_idx ON posting (token_id);
    CREATE INDEX posting_file_idx ON posting (file_id);
    CREATE INDEX posting_file_line_idx ON posting (file_id, line);

    CREATE TABLE token(
        string PRIMARY KEY,
        id INTEGER NOT NULL
    );
    CREATE INDEX token_id_idx ON token (id);

    CREATE TABLE file(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT NOT NULL UNIQUE,
        content_hash BLOB,
        fingerprint INTEGER,
        found INTEGER NOT NULL DEFAULT 1,
        encoding TEXT
    );
    CREATE INDEX file_hash_idx ON file (content_hash);
    CREATE INDEX file_found_idx ON file (found);

    CREATE TABLE key_value(
        key INTEGER PRIMARY KEY,
        value
    );
"#;

/// Connection to the store of one tree
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open the store in `root`. With `create`, a missing store is created
    /// and `interpunct` recorded; otherwise a missing store is an error.
    pub fn open(root: &Path, create: bool, interpunct: bool) -> Result<Self> {
        let path = root.join(STORE_FILE);
        let exists = path.is_file();
        if !exists && !create {
            return Err(FinjaError::StoreNotFound {
                start: root.to_path_buf(),
            });
        }

        let conn = Connection::open(&path)?;
        let store = Self { conn, path };

        if !exists {
            store.create_schema(interpunct)?;
        }
        store.check_version()?;

        Ok(store)
    }

    /// In-memory store, used by tests and benchmarks
    pub fn open_in_memory(interpunct: bool) -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        store.create_schema(interpunct)?;
        Ok(store)
    }

    fn create_schema(&self, interpunct: bool) -> Result<()> {
        debug!(path = %self.path.display(), "Creating store");
        self.conn.execute_batch("PRAGMA encoding = \"UTF-8\";")?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(SCHEMA)?;
        self.set_setting(SettingKey::Interpunct, interpunct as i64)?;
        self.set_setting(SettingKey::Version, SCHEMA_VERSION)?;
        tx.commit()?;
        Ok(())
    }

    fn check_version(&self) -> Result<()> {
        let found = self.setting(SettingKey::Version).ok().flatten();
        if found != Some(SCHEMA_VERSION) {
            return Err(FinjaError::VersionMismatch {
                found,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a transaction. Store methods called while it is open take part
    /// in it; dropping it without commit rolls back.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    // === Settings ===

    pub fn setting(&self, key: SettingKey) -> Result<Option<i64>> {
        let value: Option<Value> = self
            .conn
            .query_row(
                "SELECT value FROM key_value WHERE key = ?1",
                [key as i64],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Integer(v)) => Ok(Some(v)),
            Some(_) => Err(FinjaError::InvalidSetting { key: key.name() }),
        }
    }

    pub fn set_setting(&self, key: SettingKey, value: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO key_value(key, value) VALUES (?1, ?2)",
            params![key as i64, value],
        )?;
        Ok(())
    }

    pub fn interpunct(&self) -> Result<bool> {
        Ok(self.setting(SettingKey::Interpunct)?.unwrap_or(0) != 0)
    }

    // === Tokens ===

    pub fn find_token(&self, key: &TokenKey) -> Result<Option<TokenId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM token WHERE string = ?1")?;
        Ok(stmt.query_row([key], |row| row.get(0)).optional()?)
    }

    pub fn insert_tokens(&self, tokens: &[(TokenId, TokenKey)]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO token(id, string) VALUES (?1, ?2)")?;
        for (id, key) in tokens {
            stmt.execute(params![id, key])?;
        }
        Ok(())
    }

    /// Number of postings of a token, used to order search terms
    pub fn token_cardinality(&self, token: TokenId) -> Result<i64> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM posting WHERE token_id = ?1")?;
        Ok(stmt.query_row([token], |row| row.get(0))?)
    }

    /// Remove tokens without postings; returns how many were removed
    pub fn delete_free_tokens(&self) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM token WHERE id NOT IN (SELECT DISTINCT token_id FROM posting)",
            [],
        )?)
    }

    // === Files ===

    pub fn find_file(&self, path: &str) -> Result<Option<FileRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, path, content_hash, fingerprint, found, encoding FROM file WHERE path = ?1",
        )?;
        Ok(stmt.query_row([path], file_record).optional()?)
    }

    pub fn file_by_id(&self, id: FileId) -> Result<Option<FileRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, path, content_hash, fingerprint, found, encoding FROM file WHERE id = ?1",
        )?;
        Ok(stmt.query_row([id], file_record).optional()?)
    }

    /// All file rows ordered by path
    pub fn files(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, path, content_hash, fingerprint, found, encoding FROM file ORDER BY path",
        )?;
        let files = stmt
            .query_map([], file_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn insert_file(&self, path: &str, hash: ContentHash, fingerprint: i64) -> Result<FileId> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO file(path, content_hash, fingerprint, found) VALUES (?1, ?2, ?3, 1)",
        )?;
        stmt.execute(params![path, hash, fingerprint])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_file(&self, id: FileId, hash: ContentHash, fingerprint: i64) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE file SET content_hash = ?1, fingerprint = ?2, found = 1 WHERE id = ?3",
        )?;
        stmt.execute(params![hash, fingerprint, id])?;
        Ok(())
    }

    pub fn mark_found(&self, id: FileId) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("UPDATE file SET found = 1 WHERE id = ?1")?;
        stmt.execute([id])?;
        Ok(())
    }

    pub fn set_encoding(&self, id: FileId, encoding: &str) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("UPDATE file SET encoding = ?1 WHERE id = ?2")?;
        stmt.execute(params![encoding, id])?;
        Ok(())
    }

    /// Rows sharing a content hash
    pub fn count_with_hash(&self, hash: ContentHash) -> Result<i64> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM file WHERE content_hash = ?1")?;
        Ok(stmt.query_row([hash], |row| row.get(0))?)
    }

    /// Rows other than `id` sharing a content hash
    pub fn count_others_with_hash(&self, hash: ContentHash, id: FileId) -> Result<i64> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM file WHERE content_hash = ?1 AND id != ?2")?;
        Ok(stmt.query_row(params![hash, id], |row| row.get(0))?)
    }

    /// Forget fingerprint and hash of every row in a duplicate cluster so
    /// each member is evaluated from scratch when it is visited next.
    pub fn invalidate_cluster(&self, hash: ContentHash) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE file SET fingerprint = NULL, content_hash = NULL WHERE content_hash = ?1",
            [hash],
        )?)
    }

    /// Paths of the other files with the same content as `id`
    pub fn duplicates_of(&self, id: FileId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT f.path FROM file AS f JOIN file AS ff ON ff.content_hash = f.content_hash \
             WHERE ff.id = ?1 AND f.id != ?1 ORDER BY f.path",
        )?;
        let paths = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(paths)
    }

    pub fn clear_found(&self) -> Result<()> {
        self.conn.execute("UPDATE file SET found = 0", [])?;
        Ok(())
    }

    pub fn clear_fingerprints(&self) -> Result<()> {
        self.conn.execute("UPDATE file SET fingerprint = NULL", [])?;
        Ok(())
    }

    pub fn count_missing(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM file WHERE found = 0", [], |row| row.get(0))?)
    }

    /// Delete rows not seen in the last pass together with every row of
    /// their duplicate clusters, and all their postings. Surviving cluster
    /// members are rediscovered from disk by the next pass.
    pub fn purge_missing(&self) -> Result<usize> {
        const DOOMED: &str = "SELECT id FROM file WHERE found = 0 \
             OR content_hash IN (SELECT content_hash FROM file \
                                 WHERE found = 0 AND content_hash IS NOT NULL)";

        self.conn.execute(
            &format!("DELETE FROM posting WHERE file_id IN ({DOOMED})"),
            [],
        )?;
        Ok(self
            .conn
            .execute(&format!("DELETE FROM file WHERE id IN ({DOOMED})"), [])?)
    }

    // === Postings ===

    pub fn clear_postings(&self, file: FileId) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM posting WHERE file_id = ?1")?;
        Ok(stmt.execute([file])?)
    }

    pub fn insert_postings<'a, I>(&self, file: FileId, postings: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a (TokenId, i64)>,
    {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO posting(token_id, file_id, line) VALUES (?1, ?2, ?3)")?;
        let mut count = 0;
        for (token, line) in postings {
            stmt.execute(params![token, file, line])?;
            count += 1;
        }
        Ok(count)
    }

    /// Postings of a file as sorted (token, line) pairs
    pub fn postings_of(&self, file: FileId) -> Result<Vec<(TokenId, i64)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT token_id, line FROM posting WHERE file_id = ?1 ORDER BY token_id, line",
        )?;
        let rows = stmt
            .query_map([file], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // === Search ===

    /// Run a generated search query; `map` converts each row.
    pub fn run_search<T, F>(&self, sql: &str, params: &[Value], map: F) -> Result<Vec<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), map)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    // === Maintenance ===

    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM;")?;
        Ok(())
    }

    /// Row counts for reporting
    pub fn summary(&self) -> Result<StoreSummary> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };

        Ok(StoreSummary {
            files: count("SELECT COUNT(*) FROM file")?,
            tokens: count("SELECT COUNT(*) FROM token")?,
            postings: count("SELECT COUNT(*) FROM posting")?,
            duplicate_clusters: count(
                "SELECT COUNT(*) FROM (SELECT content_hash FROM file \
                 WHERE content_hash IS NOT NULL GROUP BY content_hash HAVING COUNT(*) > 1)",
            )?,
            token_watermark: self
                .setting(SettingKey::MaxId)?
                .unwrap_or(INITIAL_TOKEN_WATERMARK),
        })
    }
}

/// Row counts of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSummary {
    pub files: i64,
    pub tokens: i64,
    pub postings: i64,
    pub duplicate_clusters: i64,
    pub token_watermark: TokenId,
}

fn file_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        content_hash: row.get(2)?,
        fingerprint: row.get(3)?,
        found: row.get::<_, i64>(4)? != 0,
        encoding: row.get(5)?,
    })
}
