//! Database-backed token store.
//!
//! One row per grant. The credential that keys the row depends on the grant:
//! an authorization code, or an access token plus an optional refresh token.
//! `remove_by_*` clears the credential column instead of deleting the row; the
//! sweep in [`crate::gc`] physically deletes cleared and expired rows later.

use crate::gc::{self, GcHandle};
use crate::schema::{self, DATA, TokenColumn};
use async_trait::async_trait;
use oauthkeep_types::{Result, StoreError, Token, TokenStore};
use sea_orm::{
    ConnectionTrait, DatabaseConnection,
    sea_query::{Alias, Expr, Query},
};
use std::time::Duration;

/// Default name of the token table.
pub const DEFAULT_TOKEN_TABLE: &str = "oauth2_tokens";
/// Default time between two sweeps.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Construction options for [`DbTokenStore`].
#[derive(Debug, Clone)]
pub struct TokenStoreOptions {
    table_name: String,
    auto_create: bool,
    gc_enabled: bool,
    gc_interval: Duration,
}

impl Default for TokenStoreOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TOKEN_TABLE.to_string(),
            auto_create: true,
            gc_enabled: true,
            gc_interval: DEFAULT_GC_INTERVAL,
        }
    }
}

impl TokenStoreOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store tokens in `name` instead of `oauth2_tokens`.
    #[must_use]
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Skip creating the table at construction; it must already exist.
    #[must_use]
    pub fn without_auto_create(mut self) -> Self {
        self.auto_create = false;
        self
    }

    /// Do not run the background sweep. Dead rows accumulate until
    /// [`DbTokenStore::sweep`] is called.
    #[must_use]
    pub fn without_gc(mut self) -> Self {
        self.gc_enabled = false;
        self
    }

    /// Sweep every `interval` instead of every ten minutes.
    #[must_use]
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }
}

/// The column values a token is stored under.
struct TokenKeys<'a> {
    code: &'a str,
    access: &'a str,
    refresh: &'a str,
    expired_at: i64,
}

impl<'a> TokenKeys<'a> {
    fn of(token: &'a Token) -> Self {
        let expired_at = i64::try_from(token.expires_at()).unwrap_or(i64::MAX);
        if token.code.is_empty() {
            Self {
                code: "",
                access: &token.access,
                refresh: &token.refresh,
                expired_at,
            }
        } else {
            Self {
                code: &token.code,
                access: "",
                refresh: "",
                expired_at,
            }
        }
    }
}

/// A persistent [`TokenStore`] on top of a sea-orm connection, with an
/// optional background sweep of dead rows.
pub struct DbTokenStore {
    db: DatabaseConnection,
    table: String,
    gc: Option<GcHandle>,
}

impl DbTokenStore {
    /// Creates the store, creating its table and starting the sweep unless
    /// disabled in `options`.
    ///
    /// Must be called from within a tokio runtime when the sweep is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOption`] for an empty table name or a zero
    /// sweep interval, or a database error if the table cannot be created.
    pub async fn new(db: DatabaseConnection, options: TokenStoreOptions) -> Result<Self> {
        schema::validate_table_name(&options.table_name)?;
        if options.gc_enabled && options.gc_interval.is_zero() {
            return Err(StoreError::InvalidOption(
                "gc interval must be non-zero".into(),
            ));
        }
        if options.auto_create {
            schema::create_token_table(&db, &options.table_name).await?;
        }

        let gc = options.gc_enabled.then(|| {
            GcHandle::spawn(db.clone(), options.table_name.clone(), options.gc_interval)
        });

        Ok(Self {
            db,
            table: options.table_name,
            gc,
        })
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Deletes expired and fully cleared rows now, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a database error if the count or delete query fails.
    pub async fn sweep(&self) -> Result<u64> {
        gc::sweep_table(&self.db, &self.table, gc::now_secs()).await
    }

    /// Stops the background sweep, waiting for a sweep in progress to finish.
    ///
    /// The store stays usable afterwards; only the sweep is gone.
    pub async fn close(&self) {
        if let Some(gc) = &self.gc {
            gc.stop().await;
        }
    }

    async fn clear(&self, column: TokenColumn, value: &str) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        let stmt = Query::update()
            .table(Alias::new(&self.table))
            .value(column, "")
            .and_where(Expr::col(column).eq(value))
            .to_owned();
        self.db
            .execute(self.db.get_database_backend().build(&stmt))
            .await?;
        Ok(())
    }

    async fn find(&self, column: TokenColumn, value: &str) -> Result<Option<Token>> {
        if value.is_empty() {
            return Ok(None);
        }
        let stmt = Query::select()
            .column(TokenColumn::Data)
            .from(Alias::new(&self.table))
            .and_where(Expr::col(column).eq(value))
            .limit(1)
            .to_owned();

        let Some(row) = self
            .db
            .query_one(self.db.get_database_backend().build(&stmt))
            .await?
        else {
            return Ok(None);
        };
        let data: String = row.try_get("", DATA)?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

#[async_trait]
impl TokenStore for DbTokenStore {
    async fn create(&self, token: &Token) -> Result<()> {
        let data = serde_json::to_string(token)?;
        let keys = TokenKeys::of(token);
        let stmt = Query::insert()
            .into_table(Alias::new(&self.table))
            .columns([
                TokenColumn::ExpiredAt,
                TokenColumn::Code,
                TokenColumn::Access,
                TokenColumn::Refresh,
                TokenColumn::Data,
            ])
            .values_panic([
                keys.expired_at.into(),
                keys.code.into(),
                keys.access.into(),
                keys.refresh.into(),
                data.into(),
            ])
            .to_owned();

        self.db
            .execute(self.db.get_database_backend().build(&stmt))
            .await?;
        Ok(())
    }

    async fn remove_by_code(&self, code: &str) -> Result<()> {
        self.clear(TokenColumn::Code, code).await
    }

    async fn remove_by_access(&self, access: &str) -> Result<()> {
        self.clear(TokenColumn::Access, access).await
    }

    async fn remove_by_refresh(&self, refresh: &str) -> Result<()> {
        self.clear(TokenColumn::Refresh, refresh).await
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<Token>> {
        self.find(TokenColumn::Code, code).await
    }

    async fn get_by_access(&self, access: &str) -> Result<Option<Token>> {
        self.find(TokenColumn::Access, access).await
    }

    async fn get_by_refresh(&self, refresh: &str) -> Result<Option<Token>> {
        self.find(TokenColumn::Refresh, refresh).await
    }
}
