//! Supermodels SDK: convention-based module wiring and lazily bound, validated document models.

pub mod config;
pub mod connection;
pub mod container;
pub mod error;
pub mod factory;
pub mod loader;
pub mod model;
pub mod naming;
pub mod response;
pub mod routes;
pub mod schema;
pub mod startup;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod validation;

pub use config::{AppConfig, DatabaseConfig, LoaderConfig};
pub use connection::{Connection, Database};
pub use container::{factory_fn, Container, Dependency, Factory, Lifetime, Registration, ResolveContext};
pub use error::{
    BinderError, ConfigError, ContainerError, ErrorBody, ErrorDetail, FactoryError, HookError, ModelError,
    NameResolutionError, SchemaError, StartupError, StoreError,
};
pub use factory::{ModelBinder, ModelBundle, ModelFactory};
pub use loader::{AutoLoader, Loaded, Manifest, ModuleEntry};
pub use model::Model;
pub use naming::{resolve_dependency_name, Role};
pub use response::{error_body, success_many, success_one, success_one_ok, validation_failed};
pub use routes::common_routes;
pub use schema::{AppSchemaOptions, FieldDefinition, Fields, HookDefinition, Operation, Schema, SchemaOptions};
pub use startup::{start, start_with, Ready};
pub use state::AppState;
pub use store::{ensure_database_exists, DocumentStore, MemoryStore, PgStore};
pub use telemetry::init_tracing;
pub use validation::{validate, ValidationIssue, ValidationOutcome};
