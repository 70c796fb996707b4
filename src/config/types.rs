//! Configuration types for module loading and the database connection.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODULE_GLOB: &str = "/**/*.rs";
pub const DEFAULT_DB_SCHEMA: &str = "supermodels";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Where modules of each role live and which files under those roots count as modules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Glob suffixes appended to each role root (e.g. "/**/*.rs").
    #[serde(default = "default_module_globs")]
    pub module_globs: Vec<String>,
    pub models_path: String,
    pub controllers_path: String,
    pub routes_path: String,
}

fn default_module_globs() -> Vec<String> {
    vec![DEFAULT_MODULE_GLOB.to_string()]
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            module_globs: default_module_globs(),
            models_path: "src/models".into(),
            controllers_path: "src/controllers".into(),
            routes_path: "src/routes".into(),
        }
    }
}

impl LoaderConfig {
    /// Same globs, all three roots under `base` (e.g. "app" -> "app/models", "app/controllers", "app/routes").
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        LoaderConfig {
            module_globs: default_module_globs(),
            models_path: format!("{}/models", base),
            controllers_path: format!("{}/controllers", base),
            routes_path: format!("{}/routes", base),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. When absent the in-memory store is used.
    #[serde(default)]
    pub url: Option<String>,
    /// Schema holding one table per collection.
    pub schema: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: None,
            schema: DEFAULT_DB_SCHEMA.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}
