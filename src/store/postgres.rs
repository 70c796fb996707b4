//! PostgreSQL document store: one table per collection, documents stored as JSONB payloads.
//! Tables live in the schema given at construction (`SUPERMODELS_SCHEMA`, default `supermodels`).

use super::DocumentStore;
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{ConnectOptions, PgPool};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Mutex;

pub struct PgStore {
    pool: PgPool,
    schema: String,
    /// Collections whose table is known to exist.
    ensured: Mutex<HashSet<String>>,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
            ensured: Mutex::new(HashSet::new()),
        }
    }

    /// Create the database if missing, open a pool and create the collection schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::InvalidUrl("DATABASE_URL is not set".into()))?;
        ensure_database_exists(url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&config.schema)))
            .execute(&pool)
            .await?;
        tracing::info!(schema = %config.schema, "postgres document store connected");
        Ok(Self::new(pool, config.schema.clone()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Schema-qualified, quoted table name for a collection (e.g. "supermodels"."users").
    fn table(&self, collection: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(collection))
    }

    fn is_ensured(&self, collection: &str) -> bool {
        self.ensured
            .lock()
            .map(|set| set.contains(collection))
            .unwrap_or(false)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        if self.is_ensured(collection) {
            return Ok(());
        }
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table(collection)
        );
        tracing::debug!(collection = %collection, "ensuring collection table");
        sqlx::query(&ddl).execute(&self.pool).await?;
        self.ensured
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(collection.to_string());
        Ok(())
    }

    async fn insert(&self, collection: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (id, payload) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
            self.table(collection)
        );
        let result = sqlx::query(&sql).bind(id).bind(doc).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let sql = format!("SELECT payload FROM {} WHERE id = $1", self.table(collection));
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self, collection: &str, filter: &Map<String, Value>) -> Result<Vec<Value>, StoreError> {
        let sql = format!(
            "SELECT payload FROM {}{} ORDER BY created_at, id",
            self.table(collection),
            where_clause(filter.len())
        );
        tracing::debug!(sql = %sql, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for (key, value) in filter {
            query = query.bind(key.as_str()).bind(value);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn replace(&self, collection: &str, id: &str, doc: &Value) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE {} SET payload = $2, updated_at = NOW() WHERE id = $1",
            self.table(collection)
        );
        let result = sqlx::query(&sql).bind(id).bind(doc).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table(collection));
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Create the database named in `database_url` when it does not exist, via the `postgres` maintenance database.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::InvalidUrl("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

/// One `payload -> key = value` equality per filter entry; keys and values are bound in pairs.
fn where_clause(entries: usize) -> String {
    if entries == 0 {
        return String::new();
    }
    let conditions: Vec<String> = (0..entries)
        .map(|i| format!("payload -> ${} = ${}", 2 * i + 1, 2 * i + 2))
        .collect();
    format!(" WHERE {}", conditions.join(" AND "))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name_from_url() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@localhost:5432/app?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "app");
    }

    #[test]
    fn url_without_path_is_rejected() {
        assert!(parse_db_name_from_url("localhost").is_err());
    }

    #[test]
    fn filters_compare_each_top_level_key_for_equality() {
        assert_eq!(where_clause(0), "");
        assert_eq!(where_clause(1), " WHERE payload -> $1 = $2");
        assert_eq!(
            where_clause(2),
            " WHERE payload -> $1 = $2 AND payload -> $3 = $4"
        );
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
