use std::str::FromStr;

use sqlx::{Pool, Postgres, Sqlite};

use crate::storage::errors::StorageError;

// Types
#[derive(Clone, Debug)]
pub struct SqliteDataStore {
    pub(super) pool: sqlx::SqlitePool,
}

#[derive(Clone, Debug)]
pub struct PostgresDataStore {
    pub(super) pool: sqlx::PgPool,
}

// Trait
pub trait DataStore: Send + Sync {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>>;
    fn as_postgres(&self) -> Option<&Pool<Postgres>>;
}

impl SqliteDataStore {
    /// Lazily connecting pool; the database file is created when missing.
    pub fn connect_lazy(url: &str) -> Result<Self, StorageError> {
        let opts = sqlx::sqlite::SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Configuration(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true);

        Ok(Self {
            pool: sqlx::sqlite::SqlitePool::connect_lazy_with(opts),
        })
    }

    /// Single-connection in-memory database.
    pub fn in_memory() -> Result<Self, StorageError> {
        let opts = sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Configuration(e.to_string()))?;

        // The database lives as long as its one connection.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(opts);

        Ok(Self { pool })
    }
}

impl PostgresDataStore {
    pub fn connect_lazy(url: &str) -> Result<Self, StorageError> {
        Ok(Self {
            pool: sqlx::PgPool::connect_lazy(url)
                .map_err(|e| StorageError::Configuration(format!("Invalid Postgres URL: {e}")))?,
        })
    }
}

// Store implementations
impl DataStore for SqliteDataStore {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>> {
        Some(&self.pool)
    }

    fn as_postgres(&self) -> Option<&Pool<Postgres>> {
        None
    }
}

impl DataStore for PostgresDataStore {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>> {
        None
    }

    fn as_postgres(&self) -> Option<&Pool<Postgres>> {
        Some(&self.pool)
    }
}
