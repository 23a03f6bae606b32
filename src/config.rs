use std::{env, time::Duration};

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set when STORE_BACKEND is mongodb")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreBackend,
    pub mongodb_url: Option<String>,
    pub mongodb_database: String,
    /// Overrides the `https://<Host>` base of returned short URLs.
    pub base_url: Option<Url>,
    /// Where unresolvable short ids are sent.
    pub fallback_url: String,
    /// When set, deletes must carry it as the `secret` query parameter.
    pub delete_secret: Option<String>,
    pub store_timeout: Duration,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    ///
    /// # Errors
    ///
    /// Fails when a variable has an unparseable value or a required one is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let invalid = |name: &'static str, value: String| ConfigError::Invalid { name, value };

        let port = match var("PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| invalid("PORT", value))?,
            None => 3000,
        };

        let store = match var("STORE_BACKEND").as_deref() {
            None | Some("mongodb") => StoreBackend::MongoDb,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(invalid("STORE_BACKEND", other.to_owned())),
        };

        let mongodb_url = var("MONGODB_URL");
        if store == StoreBackend::MongoDb && mongodb_url.is_none() {
            return Err(ConfigError::Missing("MONGODB_URL"));
        }

        let base_url = match var("BASE_URL") {
            Some(value) => match Url::parse(&value) {
                Ok(url) if url.has_host() => Some(url),
                _ => return Err(invalid("BASE_URL", value)),
            },
            None => None,
        };

        let store_timeout = match var("STORE_TIMEOUT_MS") {
            Some(value) => match value.parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => return Err(invalid("STORE_TIMEOUT_MS", value)),
            },
            None => Duration::from_secs(5),
        };

        let fallback_url = var("FALLBACK_URL").unwrap_or_else(|| "/".to_owned());
        if !fallback_url.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(invalid("FALLBACK_URL", fallback_url));
        }

        Ok(Self {
            port,
            store,
            mongodb_url,
            mongodb_database: var("MONGODB_DATABASE").unwrap_or_else(|| "db".to_owned()),
            base_url,
            fallback_url,
            delete_secret: var("DELETE_SECRET"),
            store_timeout,
        })
    }

    /// An in-memory configuration with all defaults.
    #[cfg(test)]
    pub fn memory() -> Self {
        Self {
            port: 3000,
            store: StoreBackend::Memory,
            mongodb_url: None,
            mongodb_database: "db".to_owned(),
            base_url: None,
            fallback_url: "/".to_owned(),
            delete_secret: None,
            store_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("MONGODB_URL", "mongodb://localhost")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.store, StoreBackend::MongoDb);
        assert_eq!(config.mongodb_database, "db");
        assert_eq!(config.fallback_url, "/");
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert!(config.base_url.is_none());
        assert!(config.delete_secret.is_none());
    }

    #[test]
    fn mongodb_needs_a_url() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("MONGODB_URL"))));
        assert!(load(&[("STORE_BACKEND", "memory")]).is_ok());
    }

    #[test]
    fn explicit_values_are_read() {
        let config = load(&[
            ("PORT", "8080"),
            ("STORE_BACKEND", "memory"),
            ("BASE_URL", "https://sho.rt"),
            ("FALLBACK_URL", "https://example.com/missing"),
            ("DELETE_SECRET", "hunter2"),
            ("STORE_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.base_url.unwrap().as_str(), "https://sho.rt/");
        assert_eq!(config.fallback_url, "https://example.com/missing");
        assert_eq!(config.delete_secret.as_deref(), Some("hunter2"));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
    }

    #[test]
    fn bad_values_are_reported() {
        for (name, value) in [
            ("PORT", "http"),
            ("STORE_BACKEND", "postgres"),
            ("BASE_URL", "sho.rt"),
            ("STORE_TIMEOUT_MS", "0"),
            ("FALLBACK_URL", "https://example.com/ä b"),
        ] {
            let result = load(&[("STORE_BACKEND", "memory"), (name, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{name}={value} should be rejected"
            );
        }
    }
}
