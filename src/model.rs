//! Live model handle: document operations wrapped in the schema's lifecycle hooks.
//!
//! Operation order for writes is pre-validate, validate, post-validate, pre-save, store,
//! post-save. A failing pre hook aborts the operation before anything is stored.

use crate::error::{ModelError, StoreError};
use crate::schema::{AppSchemaOptions, HookPhase, Operation, Schema, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::store::DocumentStore;
use crate::validation::{validate, ValidationOutcome};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

pub struct Model {
    name: String,
    collection: String,
    schema: Arc<Schema>,
    app_options: Arc<AppSchemaOptions>,
    store: Arc<dyn DocumentStore>,
}

impl Model {
    pub(crate) fn new(
        name: &str,
        schema: Arc<Schema>,
        app_options: Arc<AppSchemaOptions>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Model {
            name: name.to_string(),
            collection: schema.collection(),
            schema,
            app_options,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Application options the model was defined with.
    pub fn app_options(&self) -> &AppSchemaOptions {
        &self.app_options
    }

    /// Check a document against the model's JSON schema without running hooks.
    pub fn validate_document(&self, doc: &Value) -> ValidationOutcome {
        validate(&self.schema.json_schema(), doc)
    }

    /// Insert a new document. Assigns `_id` when missing, fills defaults and timestamps.
    pub async fn create(&self, doc: Value) -> Result<Value, ModelError> {
        let Value::Object(mut map) = doc else {
            return Err(ModelError::NotAnObject);
        };
        self.schema.apply_defaults(&mut map);
        let id = match map.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        map.insert(ID_FIELD.into(), Value::String(id.clone()));
        if self.schema.options().timestamps {
            let now = now_rfc3339();
            map.insert(CREATED_AT_FIELD.into(), Value::String(now.clone()));
            map.insert(UPDATED_AT_FIELD.into(), Value::String(now));
        }
        let mut doc = Value::Object(map);

        self.check(&mut doc)?;
        self.run_hooks(HookPhase::Pre, Operation::Save, &mut doc)?;
        self.store.ensure_collection(&self.collection).await?;
        self.store.insert(&self.collection, &id, &doc).await?;
        tracing::trace!(model = %self.name, id = %id, "document created");
        self.run_hooks(HookPhase::Post, Operation::Save, &mut doc)?;
        Ok(doc)
    }

    /// Merge `patch` into the stored document (top-level keys; `_id` cannot change) and save it.
    pub async fn update(&self, id: &str, patch: Value) -> Result<Value, ModelError> {
        let Value::Object(patch) = patch else {
            return Err(ModelError::NotAnObject);
        };
        let Some(Value::Object(mut map)) = self.load(id).await? else {
            return Err(self.not_found(id));
        };
        for (k, v) in patch {
            if k != ID_FIELD {
                map.insert(k, v);
            }
        }
        self.schema.apply_defaults(&mut map);
        if self.schema.options().timestamps {
            map.insert(UPDATED_AT_FIELD.into(), Value::String(now_rfc3339()));
        }
        let mut doc = Value::Object(map);

        self.check(&mut doc)?;
        self.run_hooks(HookPhase::Pre, Operation::Save, &mut doc)?;
        if !self.store.replace(&self.collection, id, &doc).await? {
            return Err(self.not_found(id));
        }
        self.run_hooks(HookPhase::Post, Operation::Save, &mut doc)?;
        Ok(doc)
    }

    /// Delete a document, returning what was removed.
    pub async fn remove(&self, id: &str) -> Result<Value, ModelError> {
        let Some(mut doc) = self.load(id).await? else {
            return Err(self.not_found(id));
        };
        self.run_hooks(HookPhase::Pre, Operation::Remove, &mut doc)?;
        if !self.store.delete(&self.collection, id).await? {
            return Err(self.not_found(id));
        }
        self.run_hooks(HookPhase::Post, Operation::Remove, &mut doc)?;
        Ok(doc)
    }

    /// One document by id; post-find hooks run on it.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Value>, ModelError> {
        let Some(mut doc) = self.load(id).await? else {
            return Ok(None);
        };
        self.run_hooks(HookPhase::Post, Operation::Find, &mut doc)?;
        Ok(Some(doc))
    }

    /// Documents matching `filter` exactly. Pre-find hooks receive (and may rewrite) the filter;
    /// post-find hooks run on each result.
    pub async fn find(&self, filter: &Map<String, Value>) -> Result<Vec<Value>, ModelError> {
        let mut query = Value::Object(filter.clone());
        self.run_hooks(HookPhase::Pre, Operation::Find, &mut query)?;
        let filter = match query {
            Value::Object(map) => map,
            _ => return Err(ModelError::NotAnObject),
        };
        self.store.ensure_collection(&self.collection).await?;
        let mut docs = self.store.list(&self.collection, &filter).await?;
        for doc in docs.iter_mut() {
            self.run_hooks(HookPhase::Post, Operation::Find, doc)?;
        }
        Ok(docs)
    }

    /// `find` followed by the model's populate step.
    pub async fn find_populated(&self, filter: &Map<String, Value>) -> Result<Vec<Value>, ModelError> {
        let docs = self.find(filter).await?;
        self.populate(docs)
    }

    /// Apply `populate_records` when configured; identity otherwise.
    pub fn populate(&self, records: Vec<Value>) -> Result<Vec<Value>, ModelError> {
        match &self.app_options.populate_records {
            Some(populate) => populate(records).map_err(|e| ModelError::Populate(e.to_string())),
            None => Ok(records),
        }
    }

    async fn load(&self, id: &str) -> Result<Option<Value>, StoreError> {
        self.store.ensure_collection(&self.collection).await?;
        self.store.get(&self.collection, id).await
    }

    fn check(&self, doc: &mut Value) -> Result<(), ModelError> {
        self.run_hooks(HookPhase::Pre, Operation::Validate, doc)?;
        let outcome = self.validate_document(doc);
        if !outcome.success {
            return Err(ModelError::Validation {
                model: self.name.clone(),
                errors: outcome.into_errors(),
            });
        }
        self.run_hooks(HookPhase::Post, Operation::Validate, doc)
    }

    fn run_hooks(&self, phase: HookPhase, operation: Operation, doc: &mut Value) -> Result<(), ModelError> {
        for hook in self.schema.hooks(phase, operation) {
            hook(&mut *doc).map_err(|source| ModelError::Hook {
                model: self.name.clone(),
                phase,
                operation,
                source,
            })?;
        }
        Ok(())
    }

    fn not_found(&self, id: &str) -> ModelError {
        ModelError::NotFound {
            model: self.name.clone(),
            id: id.to_string(),
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("backend", &self.store.backend())
            .finish()
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
