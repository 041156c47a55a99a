//! Content and metrics data access.

pub mod content;
pub mod metrics;

use crate::config::{Config, PoolTuning};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;

const STARTUP_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only facade over the content warehouse and the optional metrics
/// time-series store. Metrics methods degrade to zero rather than error when
/// no metrics pool was configured. Cheaply cloneable: both pools are
/// internally reference-counted.
#[derive(Clone)]
pub struct Store {
    content_pool: PgPool,
    metrics_pool: Option<PgPool>,
}

impl Store {
    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let content_pool = build_pool(
            &config.database_url,
            config.content_pool,
            !config.allow_db_insecure,
        )
        .await?;
        ping(&content_pool).await?;

        let metrics_pool = match &config.metrics_database_url {
            Some(url) => {
                let pool = build_pool(url, config.metrics_pool, !config.allow_db_insecure).await?;
                ping(&pool).await?;
                Some(pool)
            }
            None => None,
        };

        Ok(Self {
            content_pool,
            metrics_pool,
        })
    }

    pub fn has_metrics(&self) -> bool {
        self.metrics_pool.is_some()
    }

    /// Builds a `Store` directly from already-connected pools, bypassing
    /// `connect`'s TLS/tuning setup. Used by integration tests that provision
    /// their own ephemeral database.
    pub fn for_testing(content_pool: PgPool, metrics_pool: Option<PgPool>) -> Self {
        Self {
            content_pool,
            metrics_pool,
        }
    }
}

async fn build_pool(
    url: &str,
    tuning: PoolTuning,
    require_tls: bool,
) -> Result<PgPool, sqlx::Error> {
    let mut options = PgConnectOptions::from_str(url)?;
    if require_tls {
        options = options.ssl_mode(PgSslMode::Require);
    }

    PgPoolOptions::new()
        .max_connections(tuning.max_connections)
        .min_connections(tuning.min_connections)
        .acquire_timeout(Duration::from_secs(tuning.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(tuning.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(tuning.max_lifetime_secs))
        .connect_with(options)
        .await
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    tokio::time::timeout(STARTUP_PING_TIMEOUT, sqlx::query("SELECT 1").execute(pool))
        .await
        .map_err(|_| sqlx::Error::PoolTimedOut)??;
    Ok(())
}
