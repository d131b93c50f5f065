use axum::http::HeaderValue;
use chrono::Duration;
use ticketdesk_core::consistency::{self, FRESHNESS_WINDOW_DAYS};

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Seconds between background consistency scans. `0` disables the scan.
    pub consistency_scan_interval_secs: u64,
    /// Closed-ticket freshness window in days (default: `30`, at most
    /// [`consistency::MAX_FRESHNESS_WINDOW_DAYS`]).
    pub freshness_window_days: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `3000`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `CONSISTENCY_SCAN_INTERVAL_SECS` | `3600`                  |
    /// | `FRESHNESS_WINDOW_DAYS`          | `30`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_var(&lookup, "PORT", 3000u16)?;

        let cors_raw = lookup("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:5173".into());
        let cors_origins: Vec<String> = cors_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                var: "CORS_ORIGINS",
                value: origin.clone(),
                reason: e.to_string(),
            })?;
        }

        let request_timeout_secs = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;
        let consistency_scan_interval_secs =
            parse_var(&lookup, "CONSISTENCY_SCAN_INTERVAL_SECS", 3600u64)?;

        let freshness_window_days =
            parse_var(&lookup, "FRESHNESS_WINDOW_DAYS", FRESHNESS_WINDOW_DAYS)?;
        if let Err(e) = consistency::freshness_window(freshness_window_days) {
            return Err(ConfigError::Invalid {
                var: "FRESHNESS_WINDOW_DAYS",
                value: freshness_window_days.to_string(),
                reason: e.to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            consistency_scan_interval_secs,
            freshness_window_days,
        })
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::days(self.freshness_window_days)
    }
}

/// Read the required `DATABASE_URL`.
pub fn database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.consistency_scan_interval_secs, 3600);
        assert_eq!(config.freshness_window(), Duration::days(30));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("CONSISTENCY_SCAN_INTERVAL_SECS", "0"),
            ("FRESHNESS_WINDOW_DAYS", "14"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.consistency_scan_interval_secs, 0);
        assert_eq!(config.freshness_window_days, 14);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("PORT has invalid value 'eighty'"));

        let err =
            ServerConfig::from_lookup(lookup(&[("FRESHNESS_WINDOW_DAYS", "0")])).unwrap_err();
        assert_matches!(
            err,
            ConfigError::Invalid {
                var: "FRESHNESS_WINDOW_DAYS",
                ..
            }
        );
    }

    #[test]
    fn oversized_freshness_window_is_rejected() {
        for days in ["36501", "100000000", "200000000000"] {
            let err =
                ServerConfig::from_lookup(lookup(&[("FRESHNESS_WINDOW_DAYS", days)])).unwrap_err();
            assert_matches!(
                err,
                ConfigError::Invalid {
                    var: "FRESHNESS_WINDOW_DAYS",
                    ..
                }
            );
        }

        let config =
            ServerConfig::from_lookup(lookup(&[("FRESHNESS_WINDOW_DAYS", "36500")])).unwrap();
        let cutoff = Utc::now().checked_sub_signed(config.freshness_window());
        assert!(cutoff.is_some());
    }
}
