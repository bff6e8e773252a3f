//! Async store traits consumed by the OAuth2 server.
//!
//! Every backend in the workspace implements these, so the server holds
//! `Arc<dyn ClientStore>` / `Arc<dyn TokenStore>` and never names a backend.

use crate::{Client, Result, Token};
use async_trait::async_trait;

/// Persistent storage for registered OAuth2 clients.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Persist a newly registered client.
    ///
    /// # Errors
    ///
    /// Fails if a client with the same id already exists, or if the record
    /// cannot be serialized or written.
    async fn create(&self, client: &Client) -> Result<()>;

    /// Look up a client by id. An empty or unknown id yields `Ok(None)`.
    async fn get_by_id(&self, id: &str) -> Result<Option<Client>>;
}

/// Persistent storage for issued authorization codes, access tokens and
/// refresh tokens.
///
/// `remove_*` only clears the matching credential; the stored record stays
/// behind until the backend's expiry sweep deletes it. Removing a credential
/// that does not exist is not an error.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist newly issued credentials.
    async fn create(&self, token: &Token) -> Result<()>;

    /// Invalidate an authorization code.
    async fn remove_by_code(&self, code: &str) -> Result<()>;
    /// Invalidate an access token.
    async fn remove_by_access(&self, access: &str) -> Result<()>;
    /// Invalidate a refresh token.
    async fn remove_by_refresh(&self, refresh: &str) -> Result<()>;

    /// Look up credentials by authorization code.
    async fn get_by_code(&self, code: &str) -> Result<Option<Token>>;
    /// Look up credentials by access token.
    async fn get_by_access(&self, access: &str) -> Result<Option<Token>>;
    /// Look up credentials by refresh token.
    async fn get_by_refresh(&self, refresh: &str) -> Result<Option<Token>>;
}
