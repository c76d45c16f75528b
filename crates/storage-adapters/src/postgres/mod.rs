//! # Postgres adapters
//!
//! [`PgStore`] implements every repository port plus the permission oracle
//! and role store on a single `PgPool`. Queries are built at runtime; rows
//! are decoded into `*Row` structs and converted into domain models.
//!
//! Soft deletion is the `deleted_at` column. `Lifecycle::Destroyed` never
//! reaches the database.

mod accounts;
mod content;
mod rows;

use sqlx::postgres::PgPool;

use domains::{DomainError, Scope};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Unique violations become `Conflict` carrying the offending column, taken
/// from constraint names of the form `<table>_<column>_key`.
pub(crate) fn db_err(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let column = db
                .constraint()
                .and_then(|c| c.strip_suffix("_key"))
                .and_then(|c| c.split_once('_'))
                .map(|(_, column)| column.to_string())
                .unwrap_or_else(|| "unique".to_string());
            return DomainError::Conflict(column);
        }
    }
    tracing::error!(error = %err, "database error");
    DomainError::internal(err)
}

pub(crate) fn scope_sql(alias: &str, scope: Scope) -> String {
    match scope {
        Scope::Active => format!("{alias}.deleted_at IS NULL"),
        Scope::WithTrashed => "TRUE".to_string(),
        Scope::OnlyTrashed => format!("{alias}.deleted_at IS NOT NULL"),
    }
}
