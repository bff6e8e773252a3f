//! OAuth2 client application record.

use serde::{Deserialize, Serialize};

/// A registered OAuth2 client application.
///
/// The whole struct is stored as a JSON blob; `id`, `secret` and `domain` are
/// also written to their own columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub secret: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
}

impl Client {
    /// Create a client with the given credentials and no owning user.
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            domain: domain.into(),
            user_id: String::new(),
        }
    }

    /// Attach the id of the user that owns this client.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}
