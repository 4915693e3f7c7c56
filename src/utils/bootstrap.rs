//! Bootstrap utilities for the orchestrix binary.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{StorageConfig, LOG_ENV_VAR};

/// Initialize tracing with ORCHESTRIX_LOG environment variable.
///
/// Defaults to "info" level if ORCHESTRIX_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Open the SQLite pool described by the storage configuration.
pub async fn connect(storage: &StorageConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&storage.url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(storage.max_connections)
        .connect_with(options)
        .await?;
    info!(url = %storage.url, max_connections = storage.max_connections, "storage connected");
    Ok(pool)
}
