//! Core types and traits for the oauthkeep workspace.
//!
//! This crate defines the OAuth2 domain objects persisted by the stores, the
//! unified error type, and the async store traits an OAuth2 server depends on.
//! Storage backends live in `oauthkeep-store`; callers only need this crate.

pub mod client;
pub mod error;
pub mod token;
pub mod traits;

pub use client::Client;
pub use error::{Result, StoreError};
pub use token::Token;
pub use traits::{ClientStore, TokenStore};
