//! Typed errors and HTTP mapping.

use crate::schema::{HookPhase, Operation};
use crate::validation::ValidationIssue;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Error type produced by container factories. Anything `Send + Sync` converts into it with `?`.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cant determine dep name for: {path}")]
pub struct NameResolutionError {
    pub path: String,
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema name must not be empty")]
    EmptyName,
    #[error("invalid pattern for field '{field}': {message}")]
    InvalidPattern { field: String, message: String },
    #[error("invalid field definition '{field}': {message}")]
    InvalidField { field: String, message: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("invalid module glob '{pattern}': {message}")]
    Glob { pattern: String, message: String },
    #[error("module scan: {0}")]
    Scan(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("document already exists: {collection}/{id}")]
    Conflict { collection: String, id: String },
    #[error("invalid database url: {0}")]
    InvalidUrl(String),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Failure raised by a lifecycle hook callback. Aborts the surrounding operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        HookError(message.into())
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("schema hasn't been registered for model \"{0}\"")]
    MissingSchema(String),
    #[error("cannot overwrite model \"{0}\" once defined")]
    OverwriteModel(String),
    #[error("validation failed for {model}")]
    Validation {
        model: String,
        errors: Vec<ValidationIssue>,
    },
    #[error("{phase} {operation} hook failed on {model}: {source}")]
    Hook {
        model: String,
        phase: HookPhase,
        operation: Operation,
        #[source]
        source: HookError,
    },
    #[error("not found: {model}/{id}")]
    NotFound { model: String, id: String },
    #[error("document must be a JSON object")]
    NotAnObject,
    #[error("populate: {0}")]
    Populate(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("model registry lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("dependency '{0}' is not registered")]
    Unknown(String),
    #[error("dependency '{0}' is already registered")]
    DuplicateKey(String),
    #[error("circular dependency: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("dependency '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
    #[error("failed to construct '{key}': {source}")]
    Construction {
        key: String,
        #[source]
        source: FactoryError,
    },
    #[error("container lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum BinderError {
    #[error("database connection is not ready (model {schema_name})")]
    NoConnection { schema_name: String },
    #[error("required dependency '{key}' of model {schema_name} failed: {source}")]
    Require {
        schema_name: String,
        key: String,
        #[source]
        source: ContainerError,
    },
    #[error("failed to construct model {schema_name}: {source}")]
    ModelConstruction {
        schema_name: String,
        #[source]
        source: ModelError,
    },
}

/// Aggregate error of the startup sequence. Only the binary entry point turns it into an exit code.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Naming(#[from] NameResolutionError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StartupError {
    /// Process exit code for this failure (sysexits-style: 78 for configuration, 1 otherwise).
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Config(_) => 78,
            _ => 1,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ModelError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ModelError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ModelError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            ModelError::NotAnObject => (StatusCode::BAD_REQUEST, "bad_request"),
            ModelError::Hook { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "hook_rejected"),
            ModelError::Store(StoreError::Conflict { .. }) => (StatusCode::CONFLICT, "conflict"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "model_error"),
        };
        let details = match &self {
            ModelError::Validation { errors, .. } => serde_json::to_value(errors).ok(),
            _ => None,
        };
        (status, Json(crate::response::error_body(code, self.to_string(), details))).into_response()
    }
}
