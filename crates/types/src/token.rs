//! OAuth2 token representation and expiry logic.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// Current wall-clock time as unix seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Credentials issued by the OAuth2 server for one grant.
///
/// An authorization-code grant populates the `code_*` fields; a token grant
/// populates `access_*` and optionally `refresh_*`. An empty string means the
/// credential is absent. Timestamps are unix seconds, lifetimes are seconds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Token {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub redirect_uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code_challenge: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code_challenge_method: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub code_create_at: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub code_expires_in: u64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub access: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub access_create_at: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub access_expires_in: u64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub refresh: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub refresh_create_at: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub refresh_expires_in: u64,
}

impl Token {
    /// An authorization code issued now, valid for `expires_in_secs`.
    pub fn authorization_code(code: impl Into<String>, expires_in_secs: u64) -> Self {
        Self {
            code: code.into(),
            code_create_at: unix_now(),
            code_expires_in: expires_in_secs,
            ..Self::default()
        }
    }

    /// An access token issued now, valid for `expires_in_secs`.
    pub fn access_token(access: impl Into<String>, expires_in_secs: u64) -> Self {
        Self {
            access: access.into(),
            access_create_at: unix_now(),
            access_expires_in: expires_in_secs,
            ..Self::default()
        }
    }

    /// Attach a refresh token issued now, valid for `expires_in_secs`.
    #[must_use]
    pub fn with_refresh(mut self, refresh: impl Into<String>, expires_in_secs: u64) -> Self {
        self.refresh = refresh.into();
        self.refresh_create_at = unix_now();
        self.refresh_expires_in = expires_in_secs;
        self
    }

    /// Set the client the credentials were issued to.
    #[must_use]
    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the granted scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Unix time at which the authorization code expires.
    #[must_use]
    pub fn code_expires_at(&self) -> u64 {
        self.code_create_at.saturating_add(self.code_expires_in)
    }

    /// Unix time at which the access token expires.
    #[must_use]
    pub fn access_expires_at(&self) -> u64 {
        self.access_create_at.saturating_add(self.access_expires_in)
    }

    /// Unix time at which the refresh token expires.
    #[must_use]
    pub fn refresh_expires_at(&self) -> u64 {
        self.refresh_create_at.saturating_add(self.refresh_expires_in)
    }

    /// The expiry that governs the stored row.
    ///
    /// A code grant expires with its code. Otherwise a refresh token outlives
    /// the access token it came with, so its expiry wins when present.
    #[must_use]
    pub fn expires_at(&self) -> u64 {
        if !self.code.is_empty() {
            self.code_expires_at()
        } else if !self.refresh.is_empty() {
            self.refresh_expires_at()
        } else {
            self.access_expires_at()
        }
    }
}
