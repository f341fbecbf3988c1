//! Connection pool with URI scheme dispatch (`sqlite3:<path>`,
//! `mariadb:<host>:<user>:<pass>`, `postgresql:<host>:<user>:<pass>`).
//!
//! Only the embedded `sqlite3:` scheme is backed by a real pool in this
//! build; the client-server schemes are recognized and routed the same way
//! so that a future build can add real `sqlx::Postgres`/`MySql` pools
//! without changing any call site, per the pooling note in the catalog
//! design. Selecting one today fails with [`Error::BackendUnavailable`].

use sqlx::sqlite::{SqlitePoolOptions, SqliteConnectOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unrecognized database uri {0:?}")]
    UnknownScheme(String),
    #[error("{0} backend is not available in this build")]
    BackendUnavailable(&'static str),
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// A connection pool to the catalog database. Variants beyond `Sqlite` are
/// reserved for future client-server backends behind the same API.
pub enum CatalogPool {
    Sqlite(SqlitePool),
}

impl CatalogPool {
    /// Opens a pool for `uri`, applying schema migrations once under the
    /// caller-held lock (callers typically hold a process-wide mutex around
    /// this call so concurrent workers never race a migration).
    pub async fn open(uri: &str) -> Result<Self, Error> {
        if let Some(path) = uri.strip_prefix("sqlite3:") {
            let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
                .create_if_missing(true)
                .foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(8)
                .connect_with(options)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Ok(CatalogPool::Sqlite(pool))
        } else if uri.starts_with("mariadb:") {
            Err(Error::BackendUnavailable("mariadb"))
        } else if uri.starts_with("postgresql:") {
            Err(Error::BackendUnavailable("postgresql"))
        } else {
            Err(Error::UnknownScheme(uri.to_string()))
        }
    }

    /// In-memory sqlite pool, used by tests and by jobs that don't persist
    /// a catalog across runs.
    pub async fn open_memory() -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(CatalogPool::Sqlite(pool))
    }

    pub fn sqlite(&self) -> &SqlitePool {
        match self {
            CatalogPool::Sqlite(pool) => pool,
        }
    }

    /// Toggles foreign-key enforcement, used by maintenance windows that
    /// need to bulk-mutate rows outside the normal invariant-preserving
    /// call paths.
    pub async fn set_foreign_keys_enforced(&self, enforced: bool) -> Result<(), Error> {
        let pragma = if enforced { "ON" } else { "OFF" };
        sqlx::query(&format!("PRAGMA foreign_keys = {pragma}"))
            .execute(self.sqlite())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_in_memory_pool_and_applies_migrations() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM uuids")
            .fetch_one(pool.sqlite())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let result = CatalogPool::open("gopher:nowhere").await;
        assert!(matches!(result, Err(Error::UnknownScheme(_))));
    }

    #[tokio::test]
    async fn mariadb_scheme_is_recognized_but_unavailable() {
        let result = CatalogPool::open("mariadb:host:user:pass").await;
        assert!(matches!(result, Err(Error::BackendUnavailable("mariadb"))));
    }
}
