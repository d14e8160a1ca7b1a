mod config;
mod data_store;
mod errors;

pub use data_store::{DataStore, PostgresDataStore, SqliteDataStore, data_store_from_env};
pub use errors::StorageError;

pub(crate) use config::{
    DB_TABLE_AUTHENTICATION_PROVIDERS, DB_TABLE_TEAMS, DB_TABLE_USER_AUTHENTICATIONS,
    DB_TABLE_USERS,
};
