//! Connection-scoped model registry and the process-wide connection holder.

use crate::config::DatabaseConfig;
use crate::error::{ModelError, StoreError};
use crate::model::Model;
use crate::schema::{AppSchemaOptions, Schema};
use crate::store::{DocumentStore, MemoryStore, PgStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// A live store plus the models defined on it. A model name can be defined once per connection.
pub struct Connection {
    store: Arc<dyn DocumentStore>,
    models: RwLock<HashMap<String, Arc<Model>>>,
    ready: AtomicBool,
}

impl Connection {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Connection {
            store,
            models: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(true),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Mark the connection unusable; `Database::get_connection` stops handing it out.
    pub fn close(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Model previously defined under `name`.
    pub fn model(&self, name: &str) -> Result<Arc<Model>, ModelError> {
        let models = self.models.read().map_err(|_| ModelError::Poisoned)?;
        models
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::MissingSchema(name.to_string()))
    }

    /// Define a new model. Fails with `ModelError::OverwriteModel` if `name` is taken.
    pub fn define_model(
        &self,
        name: &str,
        schema: Arc<Schema>,
        app_options: Arc<AppSchemaOptions>,
    ) -> Result<Arc<Model>, ModelError> {
        let mut models = self.models.write().map_err(|_| ModelError::Poisoned)?;
        if models.contains_key(name) {
            return Err(ModelError::OverwriteModel(name.to_string()));
        }
        let model = Arc::new(Model::new(name, schema, app_options, self.store()));
        models.insert(name.to_string(), Arc::clone(&model));
        tracing::trace!(schema_name = %name, collection = %model.collection(), "model defined");
        Ok(model)
    }

    /// The model already defined under `name`, or a new one defined with `schema` and
    /// `app_options`. Lookup and definition happen under one write lock, so concurrent callers
    /// sharing a name all receive the same model.
    pub fn model_or_define(
        &self,
        name: &str,
        schema: Arc<Schema>,
        app_options: Arc<AppSchemaOptions>,
    ) -> Result<Arc<Model>, ModelError> {
        let mut models = self.models.write().map_err(|_| ModelError::Poisoned)?;
        if let Some(existing) = models.get(name) {
            tracing::trace!(schema_name = %name, "reusing model already defined on connection");
            return Ok(Arc::clone(existing));
        }
        let model = Arc::new(Model::new(name, schema, app_options, self.store()));
        models.insert(name.to_string(), Arc::clone(&model));
        tracing::trace!(schema_name = %name, collection = %model.collection(), "model defined");
        Ok(model)
    }

    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .models
            .read()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Holder of the process-wide connection, shared by every binder.
#[derive(Clone, Default)]
pub struct Database {
    connection: Arc<RwLock<Option<Arc<Connection>>>>,
}

impl Database {
    /// No connection yet; binders fail with `NoConnection` until one is set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection(connection: Arc<Connection>) -> Self {
        let db = Self::new();
        db.set_connection(connection);
        db
    }

    /// PostgreSQL when `config.url` is set, otherwise an in-memory store.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn DocumentStore> = if config.url.is_some() {
            Arc::new(PgStore::connect(config).await?)
        } else {
            tracing::warn!("DATABASE_URL not set; using in-memory document store");
            Arc::new(MemoryStore::new())
        };
        Ok(Self::with_connection(Arc::new(Connection::new(store))))
    }

    pub fn set_connection(&self, connection: Arc<Connection>) {
        let mut slot = self.connection.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(connection);
    }

    /// The connection, if one is set and ready.
    pub fn get_connection(&self) -> Option<Arc<Connection>> {
        let slot = self.connection.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().filter(|c| c.is_ready()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Fields, SchemaOptions};

    fn schema(name: &str) -> Arc<Schema> {
        Arc::new(Schema::compile(name, Fields::new(), SchemaOptions::default()).unwrap())
    }

    #[test]
    fn model_lookup_requires_definition() {
        let conn = Connection::in_memory();
        assert!(matches!(conn.model("User"), Err(ModelError::MissingSchema(_))));
        let defined = conn
            .define_model("User", schema("User"), Arc::new(AppSchemaOptions::default()))
            .unwrap();
        let found = conn.model("User").unwrap();
        assert!(Arc::ptr_eq(&defined, &found));
    }

    #[test]
    fn defining_twice_is_an_overwrite_error() {
        let conn = Connection::in_memory();
        conn.define_model("User", schema("User"), Arc::new(AppSchemaOptions::default()))
            .unwrap();
        let err = conn
            .define_model("User", schema("User"), Arc::new(AppSchemaOptions::default()))
            .unwrap_err();
        assert!(matches!(err, ModelError::OverwriteModel(name) if name == "User"));
        assert_eq!(conn.model_names(), vec!["User".to_string()]);
    }

    #[test]
    fn concurrent_model_or_define_yields_one_model() {
        let conn = &Connection::in_memory();
        let barrier = &std::sync::Barrier::new(8);
        let models: Vec<Arc<Model>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(move || {
                        barrier.wait();
                        conn.model_or_define("User", schema("User"), Arc::new(AppSchemaOptions::default()))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(models.iter().all(|m| Arc::ptr_eq(m, &models[0])));
        assert_eq!(conn.model_names(), vec!["User".to_string()]);
    }

    #[test]
    fn closed_connections_are_not_handed_out() {
        let conn = Arc::new(Connection::in_memory());
        let db = Database::with_connection(Arc::clone(&conn));
        assert!(db.get_connection().is_some());
        conn.close();
        assert!(db.get_connection().is_none());
        assert!(Database::new().get_connection().is_none());
    }
}
