//! Database table configuration

use std::env;
use std::sync::LazyLock;

/// Table prefix from environment variable
pub static TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("DB_TABLE_PREFIX").unwrap_or_else(|_| "op_".to_string()));

/// Teams table name
pub static DB_TABLE_TEAMS: LazyLock<String> = LazyLock::new(|| format!("{}teams", *TABLE_PREFIX));

/// Users table name
pub static DB_TABLE_USERS: LazyLock<String> = LazyLock::new(|| format!("{}users", *TABLE_PREFIX));

/// Authentication providers table name
pub static DB_TABLE_AUTHENTICATION_PROVIDERS: LazyLock<String> =
    LazyLock::new(|| format!("{}authentication_providers", *TABLE_PREFIX));

/// User authentications table name
pub static DB_TABLE_USER_AUTHENTICATIONS: LazyLock<String> =
    LazyLock::new(|| format!("{}user_authentications", *TABLE_PREFIX));
