//! Model factory: compiles a schema once and defers binding it to a connection until resolution.

use crate::container::{Dependency, Factory, ResolveContext};
use crate::error::{BinderError, FactoryError, SchemaError};
use crate::model::Model;
use crate::schema::{AppSchemaOptions, Fields, Schema, SchemaOptions};
use crate::validation::{validate, ValidateFn, ValidationOutcome};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a bound model dependency resolves to.
#[derive(Clone)]
pub struct ModelBundle {
    pub model: Arc<Model>,
    pub json_schema: Arc<Value>,
    pub validate: ValidateFn,
}

impl ModelBundle {
    /// Validate `data` against this bundle's JSON schema.
    pub fn check(&self, data: &Value) -> ValidationOutcome {
        (self.validate)(&self.json_schema, data)
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("model", &self.model)
            .field("json_schema", &self.json_schema)
            .finish_non_exhaustive()
    }
}

pub struct ModelFactory;

impl ModelFactory {
    /// Compile the schema and attach `pre` then `post` hooks, each in list order. The returned
    /// binder owns the compiled schema; binding it any number of times never re-attaches hooks.
    pub fn build(
        schema_name: &str,
        fields: Fields,
        schema_options: SchemaOptions,
        app_options: AppSchemaOptions,
    ) -> Result<ModelBinder, SchemaError> {
        let mut schema = Schema::compile(schema_name, fields, schema_options)?;
        for hook in &app_options.pre {
            schema.pre(hook.op, Arc::clone(&hook.callback));
        }
        for hook in &app_options.post {
            schema.post(hook.op, Arc::clone(&hook.callback));
        }
        tracing::debug!(
            schema_name = %schema_name,
            hooks = schema.hook_count(),
            requires = app_options.requires.len(),
            "model schema compiled"
        );
        Ok(ModelBinder {
            schema_name: schema_name.to_string(),
            schema: Arc::new(schema),
            app_options: Arc::new(app_options),
        })
    }
}

/// Deferred binder for one schema. Register it in a container; it binds on resolution.
pub struct ModelBinder {
    schema_name: String,
    schema: Arc<Schema>,
    app_options: Arc<AppSchemaOptions>,
}

impl ModelBinder {
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn requires(&self) -> &[String] {
        &self.app_options.requires
    }

    /// Bind to the context's connection.
    ///
    /// Required dependencies are resolved first, in order. A model already defined on the
    /// connection under the same name is reused as-is; otherwise a new one is defined with this
    /// binder's schema and app options. A missing connection or a failed definition is fatal.
    pub fn bind(&self, ctx: &ResolveContext<'_>) -> Result<ModelBundle, BinderError> {
        let span = tracing::debug_span!("model_binder", schema_name = %self.schema_name);
        let _enter = span.enter();

        for key in &self.app_options.requires {
            ctx.resolve(key).map_err(|source| BinderError::Require {
                schema_name: self.schema_name.clone(),
                key: key.clone(),
                source,
            })?;
        }

        let Some(conn) = ctx.database().get_connection() else {
            tracing::error!(fatal = true, schema_name = %self.schema_name, "DB is not ready");
            return Err(BinderError::NoConnection {
                schema_name: self.schema_name.clone(),
            });
        };

        let model = conn
            .model_or_define(&self.schema_name, Arc::clone(&self.schema), Arc::clone(&self.app_options))
            .map_err(|source| {
                tracing::error!(
                    fatal = true,
                    schema_name = %self.schema_name,
                    json_schema = %self.schema.json_schema(),
                    options = %self.app_options.summary(),
                    error = %source,
                    "model construction failed"
                );
                BinderError::ModelConstruction {
                    schema_name: self.schema_name.clone(),
                    source,
                }
            })?;

        Ok(ModelBundle {
            model,
            json_schema: self.schema.json_schema(),
            validate,
        })
    }
}

impl Factory for ModelBinder {
    fn build(&self, ctx: &ResolveContext<'_>) -> Result<Dependency, FactoryError> {
        let bundle = self.bind(ctx)?;
        Ok(Arc::new(bundle))
    }
}

impl fmt::Debug for ModelBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBinder")
            .field("schema_name", &self.schema_name)
            .field("app_options", &self.app_options)
            .finish()
    }
}
