//! In-memory bearer token store.
//!
//! Maps token strings to the identity they were issued for, and tracks the
//! most recently issued token per identity name. All access goes through one
//! lock; callers sign tokens before calling [`TokenStore::insert`].

use chrono::{DateTime, Utc};
use gatehouse_core::Identity;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A stored token's identity and validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    /// The identity the token was issued for.
    pub identity: Identity,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreInner {
    tokens: HashMap<String, StoredToken>,
    current: HashMap<String, String>,
}

/// Concurrent token map owned by one authentication service.
///
/// Entries are never removed implicitly; renewal adds a new entry and leaves
/// the old one in place. [`TokenStore::evict_expired`] is the only removal.
#[derive(Debug, Default)]
pub struct TokenStore {
    inner: RwLock<StoreInner>,
}

impl TokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a signed token and makes it the current token for its
    /// identity's `name`.
    pub fn insert(&self, token: String, entry: StoredToken) {
        let mut inner = self.inner.write();
        if let Some(name) = entry.identity.name() {
            inner.current.insert(name.to_string(), token.clone());
        }
        inner.tokens.insert(token, entry);
    }

    /// Looks up a token.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<StoredToken> {
        self.inner.read().tokens.get(token).cloned()
    }

    /// The most recently stored token for an identity.
    #[must_use]
    pub fn current_token(&self, identity: &Identity) -> Option<String> {
        let name = identity.name()?;
        self.inner.read().current.get(name).cloned()
    }

    /// Number of stored tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().tokens.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().tokens.is_empty()
    }

    /// Removes every token expired as of `now`. Returns how many were removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write();
        let before = inner.tokens.len();
        inner.tokens.retain(|_, entry| entry.expires_at > now);

        let StoreInner { tokens, current } = &mut *inner;
        current.retain(|_, token| tokens.contains_key(token));

        before - tokens.len()
    }
}
