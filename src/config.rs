//! Process configuration read from `FEATUREPLUS_*` environment variables.

use std::path::PathBuf;

use anyhow::Context;

use crate::api::{generate_token, ApiConfig};
use crate::auth::token::DEFAULT_TOKEN_TTL_HOURS;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    /// Set when no secret was configured and a random one was made up.
    pub jwt_secret_generated: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = default_data_dir();

        let host = match lookup("FEATUREPLUS_HOST") {
            Some(raw) => raw
                .parse::<std::net::Ipv4Addr>()
                .with_context(|| format!("FEATUREPLUS_HOST is not an IPv4 address: {}", raw))?
                .octets(),
            None => [127, 0, 0, 1],
        };

        let port = match lookup("FEATUREPLUS_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("FEATUREPLUS_PORT is not a port number: {}", raw))?,
            None => DEFAULT_PORT,
        };

        let token_ttl_hours = match lookup("FEATUREPLUS_TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("FEATUREPLUS_TOKEN_TTL_HOURS is not a number: {}", raw))?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        let configured_secret = lookup("FEATUREPLUS_JWT_SECRET").filter(|s| !s.is_empty());
        let jwt_secret_generated = configured_secret.is_none();
        let jwt_secret = configured_secret.unwrap_or_else(generate_token);

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                jwt_secret,
                token_ttl_hours,
            },
            db_path: lookup("FEATUREPLUS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("featureplus.db")),
            log_dir: lookup("FEATUREPLUS_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("logs")),
            jwt_secret_generated,
        })
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("featureplus")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api.port, DEFAULT_PORT);
        assert_eq!(config.api.host, [127, 0, 0, 1]);
        assert_eq!(config.api.token_ttl_hours, DEFAULT_TOKEN_TTL_HOURS);
        assert_eq!(config.api.jwt_secret.len(), 32);
        assert!(config.jwt_secret_generated);
        assert!(config.db_path.ends_with("featureplus/featureplus.db"));
    }

    #[test]
    fn values_from_environment() {
        let config = Config::from_lookup(lookup_from(&[
            ("FEATUREPLUS_HOST", "0.0.0.0"),
            ("FEATUREPLUS_PORT", "9000"),
            ("FEATUREPLUS_DB_PATH", "/tmp/fp.db"),
            ("FEATUREPLUS_JWT_SECRET", "s3cret"),
            ("FEATUREPLUS_TOKEN_TTL_HOURS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.api.host, [0, 0, 0, 0]);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.jwt_secret, "s3cret");
        assert!(!config.jwt_secret_generated);
        assert_eq!(config.api.token_ttl_hours, 1);
        assert_eq!(config.db_path, PathBuf::from("/tmp/fp.db"));
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[("FEATUREPLUS_PORT", "http")])).is_err());
    }
}
