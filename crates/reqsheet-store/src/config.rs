//! Configuration loaded from the environment
//!
//! A `.env` file in the working directory is read first when present.

use crate::error::{StoreError, StoreResult};

/// Default connection pool size
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Default base URL of the web app, used in notice links
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:5173";

/// Persistence configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Postgres connection string; `None` selects the in-memory store
    pub database_url: Option<String>,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `DATABASE_URL`                | (none)  |
    /// | `REQSHEET_DB_MAX_CONNECTIONS` | `20`    |
    pub fn from_env() -> StoreResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let max_connections = match lookup("REQSHEET_DB_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                StoreError::Config(format!(
                    "REQSHEET_DB_MAX_CONNECTIONS must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

/// Settings for e-mail notices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeConfig {
    /// Base URL request links point at
    pub app_base_url: String,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            app_base_url: DEFAULT_APP_BASE_URL.to_string(),
        }
    }
}

impl NoticeConfig {
    /// Load from `REQSHEET_APP_BASE_URL` (default `http://localhost:5173`)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let app_base_url = std::env::var("REQSHEET_APP_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APP_BASE_URL.to_string());
        Self { app_base_url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_values_from_environment() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/reqsheet"),
            ("REQSHEET_DB_MAX_CONNECTIONS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/reqsheet"));
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_bad_pool_size() {
        let result = StoreConfig::from_lookup(lookup(&[("REQSHEET_DB_MAX_CONNECTIONS", "zero")]));
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
