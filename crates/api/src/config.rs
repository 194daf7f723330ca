//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use bus::RetryPolicy;
use catalog::ReconciliationPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL; unset keeps products and orders in memory
/// - `REDIS_URL`: Redis URL for the cache and bus; unset keeps both in memory
/// - `BUS_CONNECT_ATTEMPTS`: bus connection attempts at startup (default: `5`)
/// - `BUS_CONNECT_BACKOFF_MS`: pause between attempts (default: `2000`)
/// - `RECONCILER_WORKERS`: stock reconciliation workers (default: `1`)
/// - `RECONCILER_DEDUP`: `true` to skip already-reconciled orders (default: `false`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub bus_retry: RetryPolicy,
    pub reconciler_workers: usize,
    pub reconciler_policy: ReconciliationPolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty("DATABASE_URL"),
            redis_url: non_empty("REDIS_URL"),
            bus_retry: RetryPolicy {
                attempts: parse_var(&lookup, "BUS_CONNECT_ATTEMPTS")
                    .unwrap_or(defaults.bus_retry.attempts),
                backoff: parse_var(&lookup, "BUS_CONNECT_BACKOFF_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.bus_retry.backoff),
            },
            reconciler_workers: parse_var(&lookup, "RECONCILER_WORKERS")
                .unwrap_or(defaults.reconciler_workers),
            reconciler_policy: match parse_var::<bool>(&lookup, "RECONCILER_DEDUP") {
                Some(true) => ReconciliationPolicy::Deduplicated,
                _ => ReconciliationPolicy::AtMostOncePerDelivery,
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            redis_url: None,
            bus_retry: RetryPolicy::default(),
            reconciler_workers: 1,
            reconciler_policy: ReconciliationPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.bus_retry.attempts, 5);
        assert_eq!(config.bus_retry.backoff, Duration::from_millis(2000));
        assert_eq!(config.reconciler_workers, 1);
        assert_eq!(
            config.reconciler_policy,
            ReconciliationPolicy::AtMostOncePerDelivery
        );
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.reconciler_workers, 1);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("BUS_CONNECT_ATTEMPTS", "10"),
            ("BUS_CONNECT_BACKOFF_MS", "250"),
            ("RECONCILER_WORKERS", "4"),
            ("RECONCILER_DEDUP", "true"),
        ]);

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/catalog")
        );
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.bus_retry.attempts, 10);
        assert_eq!(config.bus_retry.backoff, Duration::from_millis(250));
        assert_eq!(config.reconciler_workers, 4);
        assert_eq!(config.reconciler_policy, ReconciliationPolicy::Deduplicated);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("RECONCILER_WORKERS", "-2"),
            ("RECONCILER_DEDUP", "yes"),
            ("DATABASE_URL", "  "),
        ]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.reconciler_workers, 1);
        assert_eq!(
            config.reconciler_policy,
            ReconciliationPolicy::AtMostOncePerDelivery
        );
        assert!(config.database_url.is_none());
    }
}
