//! Runtime configuration, read from the environment (and `.env` when present).

use std::{net::SocketAddr, time::Duration};

use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://gigs.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_ARTIST_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_ARTIST_CACHE_MAX_ENTRIES: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub artist_cache_ttl: Duration,
    pub artist_cache_max_entries: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            artist_cache_ttl: Duration::from_secs(DEFAULT_ARTIST_CACHE_TTL_SECS),
            artist_cache_max_entries: DEFAULT_ARTIST_CACHE_MAX_ENTRIES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset variables fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => defaults.port,
        };
        let artist_cache_ttl = match get("ARTIST_CACHE_TTL_SECS") {
            Some(value) => Duration::from_secs(value.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    name: "ARTIST_CACHE_TTL_SECS",
                    value,
                }
            })?),
            None => defaults.artist_cache_ttl,
        };
        let artist_cache_max_entries = match get("ARTIST_CACHE_MAX_ENTRIES") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "ARTIST_CACHE_MAX_ENTRIES",
                value,
            })?,
            None => defaults.artist_cache_max_entries,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            host: get("HOST").unwrap_or(defaults.host),
            port,
            artist_cache_ttl,
            artist_cache_max_entries,
        })
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "HOST",
                value: self.host.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, "sqlite://gigs.db");
        assert_eq!(config.port, 3001);
        assert_eq!(config.bind_address().unwrap().to_string(), "127.0.0.1:3001");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("HOST", "0.0.0.0"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("ARTIST_CACHE_TTL_SECS", "5"),
            ("ARTIST_CACHE_MAX_ENTRIES", "250"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.artist_cache_ttl, Duration::from_secs(5));
        assert_eq!(config.artist_cache_max_entries, 250);
        assert_eq!(config.bind_address().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
