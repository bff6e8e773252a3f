//! Relational storage backends for OAuth2 clients and tokens.
//!
//! [`DbClientStore`] and [`DbTokenStore`] persist records through sea-orm into
//! any database it has a driver for; the in-memory stores implement the same
//! traits for tests and ephemeral use.

pub mod client;
pub mod gc;
pub mod memory;
pub mod schema;
pub mod token;

pub use client::{ClientStoreOptions, DbClientStore};
pub use memory::{InMemoryClientStore, InMemoryTokenStore};
pub use sea_orm::DatabaseConnection;
pub use token::{DbTokenStore, TokenStoreOptions};

use oauthkeep_types::Result;
use sea_orm::{ConnectOptions, Database};
use std::time::Duration;

/// Lifetime of the single connection holding an in-memory database. Recycling
/// it would drop every table.
const MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Opens a connection pool for `database_url`
/// (e.g. `"sqlite://tokens.db?mode=rwc"` or `"sqlite::memory:"`).
///
/// An in-memory `SQLite` database lives inside a single connection, so the
/// pool is pinned to exactly one connection that is never reaped.
///
/// # Errors
///
/// Returns [`oauthkeep_types::StoreError::Database`] if the connection fails.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    Ok(Database::connect(connect_options(database_url)).await?)
}

fn connect_options(database_url: &str) -> ConnectOptions {
    let mut opts = ConnectOptions::new(database_url);
    opts.sqlx_logging(false);
    if database_url.contains(":memory:") || database_url.contains("mode=memory") {
        opts.max_connections(1)
            .min_connections(1)
            .idle_timeout(MEMORY_CONN_LIFETIME)
            .max_lifetime(MEMORY_CONN_LIFETIME);
    }
    opts
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_connection_is_pinned() {
        let opts = connect_options("sqlite::memory:");
        assert_eq!(opts.get_max_connections(), Some(1));
        assert_eq!(opts.get_min_connections(), Some(1));
        assert_eq!(opts.get_idle_timeout(), Some(MEMORY_CONN_LIFETIME));
        assert_eq!(opts.get_max_lifetime(), Some(MEMORY_CONN_LIFETIME));
    }

    #[test]
    fn test_file_connection_uses_pool_defaults() {
        let opts = connect_options("sqlite://tokens.db?mode=rwc");
        assert_eq!(opts.get_max_connections(), None);
        assert_eq!(opts.get_idle_timeout(), None);
    }

    #[tokio::test]
    async fn test_memory_tables_shared_across_queries() {
        let db = connect("sqlite::memory:").await.unwrap();
        testutil::exec(&db, "CREATE TABLE t (id INTEGER)").await;
        testutil::exec(&db, "INSERT INTO t VALUES (1)").await;
        assert_eq!(testutil::count_rows(&db, "t").await, 1);
    }
}
