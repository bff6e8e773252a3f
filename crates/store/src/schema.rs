//! Table layouts for the client and token stores.
//!
//! ```text
//! clients(id PK, secret, domain, data)
//! tokens(id PK autoincrement, expired_at, code, access, refresh, data)
//! ```
//!
//! `data` holds the JSON-serialized record; the other columns exist only for
//! lookup. Token lookups and the sweep go through non-unique indexes on
//! `expired_at`, `code`, `access` and `refresh`.

use oauthkeep_types::{Result, StoreError};
use sea_orm::{
    ConnectionTrait, DeriveIden,
    sea_query::{Alias, ColumnDef, Index, Table},
};

/// Column identifiers of the client table.
#[derive(DeriveIden, Debug, Clone, Copy)]
pub enum ClientColumn {
    Id,
    Secret,
    Domain,
    Data,
}

/// Column identifiers of the token table.
#[derive(DeriveIden, Debug, Clone, Copy)]
pub enum TokenColumn {
    Id,
    ExpiredAt,
    Code,
    Access,
    Refresh,
    Data,
}

/// Name of the `data` column in both tables, for reading query results.
pub(crate) const DATA: &str = "data";

pub(crate) fn validate_table_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidOption(
            "table name must not be empty".into(),
        ));
    }
    Ok(())
}

/// Creates the client table if it does not exist yet.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the DDL statement fails.
pub async fn create_client_table<C: ConnectionTrait>(db: &C, table: &str) -> Result<()> {
    let stmt = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(
            ColumnDef::new(ClientColumn::Id)
                .string_len(255)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(ClientColumn::Secret).string_len(255).not_null())
        .col(ColumnDef::new(ClientColumn::Domain).string_len(255).not_null())
        .col(ColumnDef::new(ClientColumn::Data).text().not_null())
        .to_owned();

    db.execute(db.get_database_backend().build(&stmt)).await?;
    tracing::debug!(table, "client table ready");
    Ok(())
}

/// Creates the token table and its lookup indexes if they do not exist yet.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if any DDL statement fails.
pub async fn create_token_table<C: ConnectionTrait>(db: &C, table: &str) -> Result<()> {
    let backend = db.get_database_backend();

    let stmt = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(
            ColumnDef::new(TokenColumn::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(TokenColumn::ExpiredAt).big_integer().not_null())
        .col(ColumnDef::new(TokenColumn::Code).string_len(255).not_null())
        .col(ColumnDef::new(TokenColumn::Access).string_len(3072).not_null())
        .col(ColumnDef::new(TokenColumn::Refresh).string_len(1024).not_null())
        .col(ColumnDef::new(TokenColumn::Data).text().not_null())
        .to_owned();
    db.execute(backend.build(&stmt)).await?;

    let indexed = [
        (TokenColumn::ExpiredAt, "expired_at"),
        (TokenColumn::Code, "code"),
        (TokenColumn::Access, "access"),
        (TokenColumn::Refresh, "refresh"),
    ];
    for (column, suffix) in indexed {
        let stmt = Index::create()
            .if_not_exists()
            .name(format!("idx_{table}_{suffix}"))
            .table(Alias::new(table))
            .col(column)
            .to_owned();
        db.execute(backend.build(&stmt)).await?;
    }

    tracing::debug!(table, "token table ready");
    Ok(())
}
