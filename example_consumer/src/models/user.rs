use serde_json::{json, Value};
use supermodels_sdk::{
    AppSchemaOptions, FieldDefinition, Fields, HookError, ModelFactory, ModuleEntry, Operation, SchemaError,
    SchemaOptions,
};

pub const PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/models/user.rs");

fn fields() -> Fields {
    Fields::new()
        .field("email", FieldDefinition::string().required().pattern(r"^[^@\s]+@[^@\s]+$"))
        .field("name", FieldDefinition::string().min_length(1).max_length(80))
        .field(
            "role",
            FieldDefinition::string()
                .one_of(vec![json!("user"), json!("admin")])
                .default_value(json!("user")),
        )
        .field("age", FieldDefinition::integer().min(0.0))
}

fn lowercase_email(doc: &mut Value) -> Result<(), HookError> {
    if let Some(Value::String(email)) = doc.get_mut("email") {
        *email = email.trim().to_lowercase();
    }
    Ok(())
}

fn reject_reserved(doc: &mut Value) -> Result<(), HookError> {
    match doc.get("email").and_then(Value::as_str) {
        Some(email) if email.ends_with("@example.invalid") => Err(HookError::new("reserved email domain")),
        _ => Ok(()),
    }
}

/// Users model. Registered as `userModel`; builds `auditModel` first.
pub fn entry() -> Result<ModuleEntry, SchemaError> {
    let options = SchemaOptions {
        timestamps: true,
        strict: true,
        ..SchemaOptions::default()
    };
    let app_options = AppSchemaOptions::new()
        .require("auditModel")
        .pre(Operation::Validate, lowercase_email)
        .pre(Operation::Save, reject_reserved)
        .populate_records(|mut records| {
            for record in records.iter_mut() {
                let label = match (record.get("name").and_then(Value::as_str), record.get("email")) {
                    (Some(name), _) => name.to_string(),
                    (None, Some(Value::String(email))) => email.clone(),
                    _ => continue,
                };
                if let Some(map) = record.as_object_mut() {
                    map.insert("label".into(), Value::String(label));
                }
            }
            Ok(records)
        });
    let binder = ModelFactory::build("User", fields(), options, app_options)?;
    Ok(ModuleEntry::model(PATH, binder))
}
