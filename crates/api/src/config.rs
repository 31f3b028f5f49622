//! Process configuration, read once at startup from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `DATABASE_URL` | required |
//! | `REDIS_URL` | unset: notifications disabled |
//! | `EVENT_STREAM_ID` | generated UUIDv7 |
//! | `API_PASS` | unset: admin probes disabled |
//! | `MAX_REQUESTS_PER_WINDOW` | `60` |
//! | `ORIGIN_REFRESH_SECS` | `60` |
//! | `STORE_TIMEOUT_MS` | `5000` |
//! | `PUBLISH_TIMEOUT_MS` | `2000` |
//!
//! Empty values count as unset.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use originstream_core::StreamId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Settings of the event stream service itself, independent of where its
/// collaborators live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub stream_id: StreamId,
    /// Admin probe password. `None` disables `/api/test*`.
    pub api_pass: Option<String>,
    pub max_requests_per_window: u64,
    /// Origin reload interval, which is also the rate-limit window.
    pub origin_refresh: Duration,
    pub store_timeout: Duration,
    pub publish_timeout: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            stream_id: StreamId::generate(),
            api_pass: None,
            max_requests_per_window: 60,
            origin_refresh: Duration::from_secs(60),
            store_timeout: Duration::from_millis(5000),
            publish_timeout: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub stream: StreamSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = StreamSettings::default();

        let bind_addr = parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;
        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let stream = StreamSettings {
            stream_id: get("EVENT_STREAM_ID")
                .map(StreamId::new)
                .unwrap_or(defaults.stream_id),
            api_pass: get("API_PASS"),
            max_requests_per_window: parse_or(
                &get,
                "MAX_REQUESTS_PER_WINDOW",
                defaults.max_requests_per_window,
            )?,
            origin_refresh: Duration::from_secs(parse_or(&get, "ORIGIN_REFRESH_SECS", 60)?),
            store_timeout: Duration::from_millis(parse_or(&get, "STORE_TIMEOUT_MS", 5000)?),
            publish_timeout: Duration::from_millis(parse_or(&get, "PUBLISH_TIMEOUT_MS", 2000)?),
        };

        if stream.origin_refresh.is_zero() {
            return Err(ConfigError::Invalid {
                name: "ORIGIN_REFRESH_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            database_url,
            redis_url: get("REDIS_URL"),
            stream,
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("DATABASE_URL", "postgres://localhost/events")]).unwrap();

        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.redis_url, None);
        assert_eq!(cfg.stream.api_pass, None);
        assert_eq!(cfg.stream.max_requests_per_window, 60);
        assert_eq!(cfg.stream.origin_refresh, Duration::from_secs(60));
        assert_eq!(cfg.stream.store_timeout, Duration::from_secs(5));
        assert_eq!(cfg.stream.publish_timeout, Duration::from_secs(2));
        assert!(!cfg.stream.stream_id.as_str().is_empty());
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(config(&[]), Err(ConfigError::Missing("DATABASE_URL")));
        assert_eq!(
            config(&[("DATABASE_URL", "  ")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://db"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("REDIS_URL", "redis://cache:6379"),
            ("EVENT_STREAM_ID", "stream-7"),
            ("API_PASS", "hunter2"),
            ("MAX_REQUESTS_PER_WINDOW", "5"),
            ("ORIGIN_REFRESH_SECS", "10"),
        ])
        .unwrap();

        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(cfg.stream.stream_id.as_str(), "stream-7");
        assert_eq!(cfg.stream.api_pass.as_deref(), Some("hunter2"));
        assert_eq!(cfg.stream.max_requests_per_window, 5);
        assert_eq!(cfg.stream.origin_refresh, Duration::from_secs(10));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config(&[("DATABASE_URL", "postgres://db"), ("STORE_TIMEOUT_MS", "soon")])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "STORE_TIMEOUT_MS",
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let err = config(&[("DATABASE_URL", "postgres://db"), ("ORIGIN_REFRESH_SECS", "0")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ORIGIN_REFRESH_SECS", .. }));
    }
}
