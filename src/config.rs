//! Runtime configuration.
//!
//! Read once at start-up from `ANIMALERT_*` environment variables.
//!
//! | Variable | Default | Effect |
//! |---|---|---|
//! | `ANIMALERT_PORT` | 3000 | HTTP port |
//! | `ANIMALERT_DATABASE_URL` | unset | SQLite dedup store; in-memory when unset |
//! | `ANIMALERT_EXTERNAL_REPORTS_URL` | unset | enables the external reports sync |
//! | `ANIMALERT_GEODATA_SNAPSHOT` | unset | enables the geodata sync |
//! | `ANIMALERT_SYNC_INTERVAL_SECS` | 3600 | cadence of both syncs |
//! | `ANIMALERT_GEOFENCE_CATALOG` | unset | zone catalog file; built-in when unset |
//! | `ANIMALERT_SMS_GATEWAY_URL` | unset | HTTP SMS gateway; log-only when unset |
//! | `ANIMALERT_SMS_GATEWAY_TOKEN` | unset | bearer token for the gateway |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::sync::DEFAULT_SYNC_INTERVAL_SECS;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub external_reports_url: Option<String>,
    pub geodata_snapshot: Option<PathBuf>,
    pub sync_interval: Duration,
    pub geofence_catalog: Option<PathBuf>,
    pub sms_gateway_url: Option<String>,
    pub sms_gateway_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            external_reports_url: None,
            geodata_snapshot: None,
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            geofence_catalog: None,
            sms_gateway_url: None,
            sms_gateway_token: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a key lookup. Blank values count as unset;
    /// unparseable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = get("ANIMALERT_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let sync_interval = get("ANIMALERT_SYNC_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS));

        Self {
            port,
            database_url: get("ANIMALERT_DATABASE_URL"),
            external_reports_url: get("ANIMALERT_EXTERNAL_REPORTS_URL"),
            geodata_snapshot: get("ANIMALERT_GEODATA_SNAPSHOT").map(PathBuf::from),
            sync_interval,
            geofence_catalog: get("ANIMALERT_GEOFENCE_CATALOG").map(PathBuf::from),
            sms_gateway_url: get("ANIMALERT_SMS_GATEWAY_URL"),
            sms_gateway_token: get("ANIMALERT_SMS_GATEWAY_TOKEN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), AppConfig::default());
    }

    #[test]
    fn test_reads_values() {
        let cfg = config(&[
            ("ANIMALERT_PORT", "8080"),
            ("ANIMALERT_EXTERNAL_REPORTS_URL", "https://reports.example/api"),
            ("ANIMALERT_SYNC_INTERVAL_SECS", "600"),
            ("ANIMALERT_GEODATA_SNAPSHOT", "/data/geodata.json"),
        ]);

        assert_eq!(cfg.port, 8080);
        assert_eq!(
            cfg.external_reports_url.as_deref(),
            Some("https://reports.example/api")
        );
        assert_eq!(cfg.sync_interval, Duration::from_secs(600));
        assert_eq!(cfg.geodata_snapshot, Some(PathBuf::from("/data/geodata.json")));
    }

    #[test]
    fn test_blank_and_invalid_values_fall_back() {
        let cfg = config(&[
            ("ANIMALERT_PORT", "not-a-port"),
            ("ANIMALERT_EXTERNAL_REPORTS_URL", "   "),
            ("ANIMALERT_SYNC_INTERVAL_SECS", "0"),
        ]);

        assert_eq!(cfg.port, DEFAULT_PORT);
        assert!(cfg.external_reports_url.is_none());
        assert_eq!(cfg.sync_interval, Duration::from_secs(3600));
    }
}
