//! Process configuration read from the environment.
//!
//! The binary loads a `.env` file first (see `dotenvy`), so every variable
//! below can live there as well.
//!
//! | Variable                 | Default     |
//! |--------------------------|-------------|
//! | `HOST`                   | `127.0.0.1` |
//! | `PORT`                   | `8080`      |
//! | `CACHE_TTL_SECS`         | `3600`      |
//! | `CACHE_SWEEP_SECS`       | `0` (off)   |
//! | `API_URL`                | unset       |
//! | `API_KEY`                | unset       |
//! | `API_READ_ACCESS_TOKEN`  | unset       |

use std::time::Duration;

/// A variable was set but could not be parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Connection details of the movie metadata service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub read_access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub cache_ttl: Duration,
    /// Interval of the background cache sweep; `None` leaves eviction to reads.
    pub cache_sweep: Option<Duration>,
    /// `None` when `API_URL` is unset; favoriting then fails.
    pub metadata: Option<MetadataSettings>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build settings from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let port = parse(get("PORT"), "PORT", "a port number", 8080)?;
        let ttl_secs = parse(get("CACHE_TTL_SECS"), "CACHE_TTL_SECS", "a number of seconds", 3600)?;
        let sweep_secs = parse(get("CACHE_SWEEP_SECS"), "CACHE_SWEEP_SECS", "a number of seconds", 0)?;

        let metadata = get("API_URL").map(|base_url| MetadataSettings {
            base_url,
            api_key: get("API_KEY"),
            read_access_token: get("API_READ_ACCESS_TOKEN"),
        });

        Ok(Self {
            host,
            port,
            cache_ttl: Duration::from_secs(ttl_secs),
            cache_sweep: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            metadata,
        })
    }

    /// `host:port` for [`Server::bind`](crate::Server::bind).
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: std::str::FromStr>(
    raw: Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value,
            expected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.bind_addr(), "127.0.0.1:8080");
        assert_eq!(s.cache_ttl, Duration::from_secs(3600));
        assert_eq!(s.cache_sweep, None);
        assert_eq!(s.metadata, None);
    }

    #[test]
    fn overrides() {
        let s = settings(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "3000"),
            ("CACHE_TTL_SECS", "30"),
            ("CACHE_SWEEP_SECS", "60"),
            ("API_URL", "https://api.themoviedb.org/3"),
            ("API_KEY", "k"),
            ("API_READ_ACCESS_TOKEN", ""),
        ])
        .unwrap();
        assert_eq!(s.bind_addr(), "0.0.0.0:3000");
        assert_eq!(s.cache_ttl, Duration::from_secs(30));
        assert_eq!(s.cache_sweep, Some(Duration::from_secs(60)));
        assert_eq!(
            s.metadata,
            Some(MetadataSettings {
                base_url: "https://api.themoviedb.org/3".into(),
                api_key: Some("k".into()),
                read_access_token: None,
            })
        );
    }

    #[test]
    fn bad_numbers_are_reported() {
        assert_eq!(
            settings(&[("PORT", "http")]),
            Err(ConfigError::Invalid {
                var: "PORT",
                value: "http".into(),
                expected: "a port number",
            })
        );
        let err = settings(&[("CACHE_TTL_SECS", "-1")]).unwrap_err();
        assert_eq!(err.to_string(), r#"CACHE_TTL_SECS must be a number of seconds, got "-1""#);
    }
}
