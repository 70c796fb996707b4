//! Schema definitions: field types, options, lifecycle hooks and compilation to JSON Schema.

mod compile;
mod hooks;
mod types;

pub use compile::{Schema, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
pub use hooks::{AppSchemaOptions, HookDefinition, HookFn, HookPhase, Operation, PopulateFn};
pub use types::{FieldDefinition, FieldType, Fields, SchemaOptions};
