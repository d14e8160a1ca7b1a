//! Data store selection from the environment

use std::env;
use std::sync::Arc;

use super::types::{DataStore, PostgresDataStore, SqliteDataStore};
use crate::storage::errors::StorageError;

/// Build the data store named by `GENERIC_DATA_STORE_TYPE` (`sqlite` or
/// `postgres`) at `GENERIC_DATA_STORE_URL`.
pub fn data_store_from_env() -> Result<Arc<dyn DataStore>, StorageError> {
    let store_type = env::var("GENERIC_DATA_STORE_TYPE")
        .map_err(|_| StorageError::Configuration("GENERIC_DATA_STORE_TYPE must be set".into()))?;
    let store_url = env::var("GENERIC_DATA_STORE_URL")
        .map_err(|_| StorageError::Configuration("GENERIC_DATA_STORE_URL must be set".into()))?;

    data_store_from_parts(&store_type, &store_url)
}

pub(crate) fn data_store_from_parts(
    store_type: &str,
    store_url: &str,
) -> Result<Arc<dyn DataStore>, StorageError> {
    tracing::info!(
        "Initializing data store with type: {}, url: {}",
        store_type,
        store_url
    );

    let store: Arc<dyn DataStore> = match store_type {
        "sqlite" => Arc::new(SqliteDataStore::connect_lazy(store_url)?),
        "postgres" => Arc::new(PostgresDataStore::connect_lazy(store_url)?),
        t => {
            return Err(StorageError::Configuration(format!(
                "Unsupported store type: {t}. Supported types are 'sqlite' and 'postgres'"
            )));
        }
    };

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_store() {
        let store = data_store_from_parts("sqlite", "sqlite::memory:").expect("store");
        assert!(store.as_sqlite().is_some());
        assert!(store.as_postgres().is_none());
    }

    #[tokio::test]
    async fn test_postgres_store_is_lazy() {
        let store = data_store_from_parts("postgres", "postgres://u:p@localhost:5432/db")
            .expect("lazy pool does not connect");
        assert!(store.as_postgres().is_some());
    }

    #[test]
    fn test_unsupported_store_type() {
        let result = data_store_from_parts("redis", "redis://localhost");
        assert!(
            matches!(result, Err(StorageError::Configuration(msg)) if msg.contains("Unsupported store type"))
        );
    }
}
