//! Process configuration loaded once from the environment at startup.

use ipnetwork::IpNetwork;
use std::net::IpAddr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} is set but invalid: {1}")]
    Invalid(&'static str, String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Connection-pool tuning for a single SQLx pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolTuning {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl PoolTuning {
    const fn content() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 10 * 60,
            max_lifetime_secs: 55 * 60,
        }
    }

    const fn metrics() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 10 * 60,
            max_lifetime_secs: 55 * 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub allow_db_insecure: bool,
    pub metrics_database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub trusted_proxy_cidrs: Vec<IpNetwork>,
    pub cors_allowed_origins: Vec<String>,
    pub enable_hsts: bool,
    pub content_pool: PoolTuning,
    pub metrics_pool: PoolTuning,
}

fn truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "on")
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let allow_db_insecure = std::env::var("ALLOW_DB_INSECURE")
            .map(|v| truthy(&v))
            .unwrap_or(false);

        let metrics_database_url = std::env::var("METRICS_DATABASE_URL").ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .ok()
            .map(|v| {
                v.parse::<u16>()
                    .map_err(|_| ConfigError::Invalid("PORT", v))
            })
            .transpose()?
            .unwrap_or(8080);

        let trusted_proxy_cidrs = std::env::var("TRUSTED_PROXY_CIDRS")
            .ok()
            .map(|raw| parse_cidrs(&raw))
            .transpose()?
            .unwrap_or_default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let enable_hsts = std::env::var("ENABLE_HSTS")
            .map(|v| truthy(&v))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            allow_db_insecure,
            metrics_database_url,
            host,
            port,
            trusted_proxy_cidrs,
            cors_allowed_origins,
            enable_hsts,
            content_pool: PoolTuning::content(),
            metrics_pool: PoolTuning::metrics(),
        })
    }

    pub fn is_trusted_proxy(&self, peer: IpAddr) -> bool {
        self.trusted_proxy_cidrs
            .iter()
            .any(|net| net.contains(peer))
    }
}

fn parse_cidrs(raw: &str) -> ConfigResult<Vec<IpNetwork>> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpNetwork>()
                .map_err(|_| ConfigError::Invalid("TRUSTED_PROXY_CIDRS", s.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_cidrs() {
        let nets = parse_cidrs("10.0.0.0/8, 192.168.1.0/24").unwrap();
        assert_eq!(nets.len(), 2);
        assert!(nets[0].contains("10.1.2.3".parse().unwrap()));
        assert!(nets[1].contains("192.168.1.5".parse().unwrap()));
    }

    #[test]
    fn rejects_malformed_cidr() {
        assert!(parse_cidrs("not-a-cidr").is_err());
    }

    #[test]
    fn truthy_recognizes_common_spellings() {
        for v in ["1", "true", "TRUE", "yes", "on"] {
            assert!(truthy(v));
        }
        assert!(!truthy("0"));
        assert!(!truthy(""));
    }
}
