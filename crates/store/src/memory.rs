//! In-memory client and token stores backed by collections behind a `Mutex`.
//!
//! They mirror the database stores' observable behavior, including
//! clear-then-sweep removal of tokens, without a background task.

use async_trait::async_trait;
use oauthkeep_types::{
    Client, ClientStore, Result, StoreError, Token, TokenStore, token::unix_now,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-memory [`ClientStore`] for testing and ephemeral use.
#[derive(Default)]
pub struct InMemoryClientStore {
    data: Mutex<HashMap<String, Client>>,
}

impl InMemoryClientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn create(&self, client: &Client) -> Result<()> {
        let mut data = lock(&self.data);
        if data.contains_key(&client.id) {
            return Err(StoreError::Duplicate(format!("client '{}'", client.id)));
        }
        data.insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Client>> {
        if id.is_empty() {
            return Ok(None);
        }
        Ok(lock(&self.data).get(id).cloned())
    }
}

struct Entry {
    expired_at: u64,
    code: String,
    access: String,
    refresh: String,
    token: Token,
}

impl Entry {
    fn is_dead(&self, now: u64) -> bool {
        self.expired_at <= now
            || (self.code.is_empty() && self.access.is_empty() && self.refresh.is_empty())
    }
}

/// An in-memory [`TokenStore`] for testing and ephemeral use.
///
/// Dead entries are only dropped by an explicit [`InMemoryTokenStore::sweep`].
#[derive(Default)]
pub struct InMemoryTokenStore {
    entries: Mutex<Vec<Entry>>,
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops expired and fully cleared entries, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = unix_now();
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|e| !e.is_dead(now));
        before - entries.len()
    }

    /// Number of stored entries, dead or alive.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self, value: &str, key: fn(&mut Entry) -> &mut String) {
        if value.is_empty() {
            return;
        }
        for entry in lock(&self.entries).iter_mut() {
            let k = key(entry);
            if k.as_str() == value {
                k.clear();
            }
        }
    }

    fn find(&self, value: &str, key: fn(&Entry) -> &str) -> Option<Token> {
        if value.is_empty() {
            return None;
        }
        lock(&self.entries)
            .iter()
            .find(|&e| key(e) == value)
            .map(|e| e.token.clone())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn create(&self, token: &Token) -> Result<()> {
        let entry = if token.code.is_empty() {
            Entry {
                expired_at: token.expires_at(),
                code: String::new(),
                access: token.access.clone(),
                refresh: token.refresh.clone(),
                token: token.clone(),
            }
        } else {
            Entry {
                expired_at: token.expires_at(),
                code: token.code.clone(),
                access: String::new(),
                refresh: String::new(),
                token: token.clone(),
            }
        };
        lock(&self.entries).push(entry);
        Ok(())
    }

    async fn remove_by_code(&self, code: &str) -> Result<()> {
        self.clear(code, |e| &mut e.code);
        Ok(())
    }

    async fn remove_by_access(&self, access: &str) -> Result<()> {
        self.clear(access, |e| &mut e.access);
        Ok(())
    }

    async fn remove_by_refresh(&self, refresh: &str) -> Result<()> {
        self.clear(refresh, |e| &mut e.refresh);
        Ok(())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<Token>> {
        Ok(self.find(code, |e| e.code.as_str()))
    }

    async fn get_by_access(&self, access: &str) -> Result<Option<Token>> {
        Ok(self.find(access, |e| e.access.as_str()))
    }

    async fn get_by_refresh(&self, refresh: &str) -> Result<Option<Token>> {
        Ok(self.find(refresh, |e| e.refresh.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_create_and_get() {
        let store = InMemoryClientStore::new();
        let c = Client::new("app", "s", "https://app.example");
        store.create(&c).await.unwrap();
        assert_eq!(store.get_by_id("app").await.unwrap(), Some(c));
        assert!(store.get_by_id("").await.unwrap().is_none());
        assert!(store.get_by_id("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_client_duplicate() {
        let store = InMemoryClientStore::new();
        store.create(&Client::new("app", "s", "d")).await.unwrap();
        let err = store.create(&Client::new("app", "x", "d")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_client_empty_id_never_resolves() {
        let store = InMemoryClientStore::new();
        store.create(&Client::new("", "s", "d")).await.unwrap();
        assert!(store.get_by_id("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_lookups() {
        let store = InMemoryTokenStore::new();
        let t = Token::access_token("acc", 3600).with_refresh("ref", 7200);
        store.create(&t).await.unwrap();
        assert_eq!(store.get_by_access("acc").await.unwrap(), Some(t.clone()));
        assert_eq!(store.get_by_refresh("ref").await.unwrap(), Some(t));
        assert!(store.get_by_code("acc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_remove_then_sweep() {
        let store = InMemoryTokenStore::new();
        store
            .create(&Token::authorization_code("code", 600))
            .await
            .unwrap();
        store.remove_by_code("code").await.unwrap();
        assert!(store.get_by_code("code").await.unwrap().is_none());
        assert_eq!(store.len(), 1);

        assert_eq!(store.sweep(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_token_remove_access_keeps_refresh() {
        let store = InMemoryTokenStore::new();
        let t = Token::access_token("acc", 3600).with_refresh("ref", 7200);
        store.create(&t).await.unwrap();
        store.remove_by_access("acc").await.unwrap();

        assert!(store.get_by_access("acc").await.unwrap().is_none());
        assert_eq!(store.get_by_refresh("ref").await.unwrap(), Some(t));
        assert_eq!(store.sweep(), 0);
    }

    #[tokio::test]
    async fn test_token_remove_refresh() {
        let store = InMemoryTokenStore::new();
        let t = Token::access_token("acc", 3600).with_refresh("ref", 7200);
        store.create(&t).await.unwrap();
        store.remove_by_refresh("ref").await.unwrap();

        assert!(store.get_by_refresh("ref").await.unwrap().is_none());
        assert_eq!(store.get_by_access("acc").await.unwrap(), Some(t));
        assert_eq!(store.len(), 1);

        store.remove_by_access("acc").await.unwrap();
        assert_eq!(store.sweep(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_token_sweep_expired() {
        let store = InMemoryTokenStore::new();
        let old = Token {
            access: "old".into(),
            access_create_at: 10,
            access_expires_in: 10,
            ..Token::default()
        };
        store.create(&old).await.unwrap();
        store
            .create(&Token::access_token("live", 3600))
            .await
            .unwrap();

        assert_eq!(store.sweep(), 1);
        assert!(store.get_by_access("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_token_remove_unknown() {
        let store = InMemoryTokenStore::new();
        store.remove_by_refresh("nope").await.unwrap();
        assert!(store.is_empty());
    }
}
