//! Token interner: maps normalized tokens to ids.
//!
//! Lookups go through an in-memory cache, then the store. Tokens seen for
//! the first time get the next id above the persisted watermark and are
//! queued until [`TokenInterner::commit`] writes them, together with the new
//! watermark, inside the caller's transaction.

use crate::error::{FinjaError, Result};
use crate::index::store::Store;
use crate::index::types::{SettingKey, TokenId, INITIAL_TOKEN_WATERMARK};
use crate::utils::TokenKey;
use rustc_hash::FxHashMap;
use tracing::debug;

pub struct TokenInterner {
    cache: FxHashMap<TokenKey, TokenId>,
    pending: Vec<(TokenId, TokenKey)>,
    watermark: TokenId,
    budget: usize,
}

impl TokenInterner {
    /// Create an interner continuing from the store's watermark
    pub fn load(store: &Store, budget: usize) -> Result<Self> {
        let watermark = stored_watermark(store)?;
        debug!(watermark, budget, "Loaded token interner");

        Ok(Self {
            cache: FxHashMap::default(),
            pending: Vec::new(),
            watermark,
            budget,
        })
    }

    /// Id of `key`, allocating a new one on first sight
    pub fn get_or_insert(&mut self, store: &Store, key: &TokenKey) -> Result<TokenId> {
        if let Some(&id) = self.cache.get(key) {
            return Ok(id);
        }

        let id = match store.find_token(key)? {
            Some(id) => id,
            None => {
                if self.watermark == TokenId::MAX {
                    return Err(FinjaError::TokenSpaceExhausted);
                }
                self.watermark += 1;
                self.pending.push((self.watermark, key.clone()));
                self.watermark
            }
        };

        self.cache.insert(key.clone(), id);
        Ok(id)
    }

    /// Id of `key` if it was ever indexed; never allocates
    pub fn lookup(&mut self, store: &Store, key: &TokenKey) -> Result<Option<TokenId>> {
        if let Some(&id) = self.cache.get(key) {
            return Ok(Some(id));
        }

        let found = store.find_token(key)?;
        if let Some(id) = found {
            self.cache.insert(key.clone(), id);
        }
        Ok(found)
    }

    /// Write queued tokens and the watermark. Must run inside the same
    /// transaction as the postings that reference the new ids. Returns the
    /// number of tokens created.
    pub fn commit(&mut self, store: &Store) -> Result<usize> {
        let created = self.pending.len();
        if created > 0 {
            store.insert_tokens(&self.pending)?;
            store.set_setting(SettingKey::MaxId, self.watermark)?;
            self.pending.clear();
        }
        Ok(created)
    }

    /// Forget everything not yet committed, after the transaction it would
    /// have been part of was rolled back.
    pub fn rollback(&mut self, store: &Store) -> Result<()> {
        self.pending.clear();
        self.cache.clear();
        self.watermark = stored_watermark(store)?;
        Ok(())
    }

    /// Clear the cache when it grew past the budget. Returns true if it did.
    pub fn trim(&mut self) -> bool {
        if self.cache.len() > self.budget {
            debug!(entries = self.cache.len(), "Clearing token cache");
            self.cache.clear();
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Cached entries
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn watermark(&self) -> TokenId {
        self.watermark
    }
}

fn stored_watermark(store: &Store) -> Result<TokenId> {
    Ok(store
        .setting(SettingKey::MaxId)?
        .unwrap_or(INITIAL_TOKEN_WATERMARK))
}
