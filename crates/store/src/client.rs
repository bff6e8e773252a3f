//! Database-backed client store.

use crate::schema::{self, ClientColumn, DATA};
use async_trait::async_trait;
use oauthkeep_types::{Client, ClientStore, Result};
use sea_orm::{
    ConnectionTrait, DatabaseConnection,
    sea_query::{Alias, Expr, Query},
};

/// Default name of the client table.
pub const DEFAULT_CLIENT_TABLE: &str = "oauth2_clients";

/// Construction options for [`DbClientStore`].
#[derive(Debug, Clone)]
pub struct ClientStoreOptions {
    table_name: String,
    auto_create: bool,
}

impl Default for ClientStoreOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_CLIENT_TABLE.to_string(),
            auto_create: true,
        }
    }
}

impl ClientStoreOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store clients in `name` instead of `oauth2_clients`.
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
}

/// A persistent [`ClientStore`] on top of a sea-orm connection.
pub struct DbClientStore {
    db: DatabaseConnection,
    table: String,
}

impl DbClientStore {
    /// Creates the store, creating its table unless disabled in `options`.
    ///
    /// # Errors
    ///
    /// Returns [`oauthkeep_types::StoreError::InvalidOption`] for an empty table
    /// name, or a database error if the table cannot be created.
    pub async fn new(db: DatabaseConnection, options: ClientStoreOptions) -> Result<Self> {
        schema::validate_table_name(&options.table_name)?;
        if options.auto_create {
            schema::create_client_table(&db, &options.table_name).await?;
        }
        Ok(Self {
            db,
            table: options.table_name,
        })
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl ClientStore for DbClientStore {
    async fn create(&self, client: &Client) -> Result<()> {
        let data = serde_json::to_string(client)?;
        let stmt = Query::insert()
            .into_table(Alias::new(&self.table))
            .columns([
                ClientColumn::Id,
                ClientColumn::Secret,
                ClientColumn::Domain,
                ClientColumn::Data,
            ])
            .values_panic([
                client.id.as_str().into(),
                client.secret.as_str().into(),
                client.domain.as_str().into(),
                data.into(),
            ])
            .to_owned();

        self.db
            .execute(self.db.get_database_backend().build(&stmt))
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Client>> {
        if id.is_empty() {
            return Ok(None);
        }

        let stmt = Query::select()
            .column(ClientColumn::Data)
            .from(Alias::new(&self.table))
            .and_where(Expr::col(ClientColumn::Id).eq(id))
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
