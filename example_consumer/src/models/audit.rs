use serde_json::json;
use supermodels_sdk::{
    AppSchemaOptions, FieldDefinition, Fields, ModelFactory, ModuleEntry, SchemaError, SchemaOptions,
};

pub const PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/models/audit.rs");

/// Append-only record of user-facing actions. Registered as `auditModel`.
pub fn entry() -> Result<ModuleEntry, SchemaError> {
    let fields = Fields::new()
        .field(
            "action",
            FieldDefinition::string()
                .required()
                .one_of(vec![json!("create"), json!("remove")]),
        )
        .field("subject", FieldDefinition::uuid().required())
        .field("note", FieldDefinition::string().max_length(200));
    let options = SchemaOptions {
        timestamps: true,
        ..SchemaOptions::default()
    };
    let binder = ModelFactory::build("Audit", fields, options, AppSchemaOptions::new())?;
    Ok(ModuleEntry::model(PATH, binder))
}
