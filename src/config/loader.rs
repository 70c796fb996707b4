//! Load configuration from the environment (after `.env`, when present).

use crate::config::types::{AppConfig, DatabaseConfig, LoaderConfig};
use crate::error::ConfigError;

impl AppConfig {
    /// Read `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut loader = LoaderConfig::default();
        if let Some(globs) = get("MODULE_GLOBS") {
            loader.module_globs = parse_globs(&globs)?;
        }
        if let Some(p) = get("MODELS_PATH") {
            loader.models_path = p;
        }
        if let Some(p) = get("CONTROLLERS_PATH") {
            loader.controllers_path = p;
        }
        if let Some(p) = get("ROUTES_PATH") {
            loader.routes_path = p;
        }

        let mut database = DatabaseConfig {
            url: get("DATABASE_URL"),
            ..DatabaseConfig::default()
        };
        if let Some(schema) = get("SUPERMODELS_SCHEMA") {
            database.schema = schema;
        }
        if let Some(n) = get("DATABASE_MAX_CONNECTIONS") {
            database.max_connections = n
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "DATABASE_MAX_CONNECTIONS",
                    message: format!("expected a positive integer, got '{}'", n),
                })?;
        }

        Ok(AppConfig { loader, database })
    }
}

fn parse_globs(raw: &str) -> Result<Vec<String>, ConfigError> {
    let globs: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(String::from)
        .collect();
    if globs.is_empty() {
        return Err(ConfigError::Invalid {
            key: "MODULE_GLOBS",
            message: "no glob patterns given".into(),
        });
    }
    Ok(globs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MODULE_GLOB;
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
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.loader.module_globs, vec![DEFAULT_MODULE_GLOB.to_string()]);
        assert_eq!(config.loader.routes_path, "src/routes");
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.schema, "supermodels");
    }

    #[test]
    fn reads_roots_globs_and_database() {
        let config = AppConfig::from_lookup(lookup(&[
            ("MODULE_GLOBS", "/**/*.rs, /*.model.rs"),
            ("MODELS_PATH", "app/models"),
            ("ROUTES_PATH", "app/routes"),
            ("DATABASE_URL", "postgres://localhost/app"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!(config.loader.module_globs, vec!["/**/*.rs", "/*.model.rs"]);
        assert_eq!(config.loader.models_path, "app/models");
        assert_eq!(config.loader.controllers_path, "src/controllers");
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(config.database.max_connections, 12);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AppConfig::from_lookup(lookup(&[("MODULE_GLOBS", " , ")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("MODULE_GLOBS", "   ")])).is_ok());
        assert!(AppConfig::from_lookup(lookup(&[("MODULE_GLOBS", ",,/*.rs")])).is_ok());
        assert!(AppConfig::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "many")])).is_err());
    }
}
