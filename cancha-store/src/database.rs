use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    /// Connect a pool whose sessions carry `statement_timeout` and
    /// `lock_timeout`, so a stuck advisory lock wait fails instead of hanging.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(&config.url)?.options([
            ("statement_timeout", format!("{}ms", config.statement_timeout_ms)),
            ("lock_timeout", format!("{}ms", config.lock_timeout_ms)),
        ]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        info!(max_connections = config.max_connections, "Connected to Postgres");
        Ok(Self { pool })
    }
}
