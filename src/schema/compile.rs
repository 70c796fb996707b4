//! Compiled schema: checked field definitions, the derived JSON Schema document and attached hooks.

use crate::error::SchemaError;
use crate::schema::hooks::{HookDefinition, HookFn, HookPhase, Operation};
use crate::schema::types::{FieldDefinition, FieldType, Fields, SchemaOptions};
use jsonschema::JSONSchema;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

const JSON_SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";
const UUID_PATTERN: &str = "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

pub struct Schema {
    name: String,
    fields: Fields,
    options: SchemaOptions,
    json_schema: Arc<Value>,
    pre: Vec<HookDefinition>,
    post: Vec<HookDefinition>,
}

impl Schema {
    /// Check `fields` and derive the JSON Schema document. Hooks are attached afterwards with `pre` / `post`.
    pub fn compile(name: &str, fields: Fields, options: SchemaOptions) -> Result<Schema, SchemaError> {
        if name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        for (field, def) in fields.iter() {
            let reserved = field == ID_FIELD
                || (options.timestamps && (field == CREATED_AT_FIELD || field == UPDATED_AT_FIELD));
            if reserved {
                return Err(SchemaError::InvalidField {
                    field: field.to_string(),
                    message: "name is reserved".into(),
                });
            }
            check_field(field, def)?;
        }
        let json_schema = Arc::new(document_schema(name, &fields, &options));
        Ok(Schema {
            name: name.to_string(),
            fields,
            options,
            json_schema,
            pre: Vec::new(),
            post: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Backing collection name: the configured one, else the lowercased name with a trailing "s".
    pub fn collection(&self) -> String {
        if let Some(c) = &self.options.collection {
            return c.clone();
        }
        let mut out = self.name.to_lowercase();
        if !out.ends_with('s') {
            out.push('s');
        }
        out
    }

    pub fn json_schema(&self) -> Arc<Value> {
        Arc::clone(&self.json_schema)
    }

    pub fn pre(&mut self, op: Operation, callback: HookFn) {
        self.pre.push(HookDefinition { op, callback });
    }

    pub fn post(&mut self, op: Operation, callback: HookFn) {
        self.post.push(HookDefinition { op, callback });
    }

    /// Hooks for `phase` of `op`, in registration order.
    pub fn hooks(&self, phase: HookPhase, op: Operation) -> impl Iterator<Item = &HookFn> + '_ {
        let list = match phase {
            HookPhase::Pre => &self.pre,
            HookPhase::Post => &self.post,
        };
        list.iter().filter(move |h| h.op == op).map(|h| &h.callback)
    }

    pub fn hook_count(&self) -> usize {
        self.pre.len() + self.post.len()
    }

    /// Fill declared defaults for missing properties, recursing into present sub-documents.
    pub fn apply_defaults(&self, doc: &mut Map<String, Value>) {
        apply_field_defaults(&self.fields, doc);
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("options", &self.options)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .finish()
    }
}

fn check_field(field: &str, def: &FieldDefinition) -> Result<(), SchemaError> {
    let invalid = |message: &str| SchemaError::InvalidField {
        field: field.to_string(),
        message: message.to_string(),
    };
    if field.is_empty() {
        return Err(invalid("field name must not be empty"));
    }
    if let Some(pattern) = &def.pattern {
        if !matches!(def.kind, FieldType::String) {
            return Err(invalid("pattern is only valid on string fields"));
        }
        let pattern_schema = json!({ "type": "string", "pattern": pattern });
        JSONSchema::compile(&pattern_schema).map_err(|e| SchemaError::InvalidPattern {
            field: field.to_string(),
            message: e.to_string(),
        })?;
    }
    if let (Some(min), Some(max)) = (def.min, def.max) {
        if min > max {
            return Err(invalid("min is greater than max"));
        }
    }
    if let (Some(min), Some(max)) = (def.min_length, def.max_length) {
        if min > max {
            return Err(invalid("minlength is greater than maxlength"));
        }
    }
    if def.enum_values.as_ref().is_some_and(|v| v.is_empty()) {
        return Err(invalid("enum must list at least one value"));
    }
    match &def.kind {
        FieldType::Array(item) => check_field(&format!("{}[]", field), item),
        FieldType::Object(nested) => {
            for (name, nested_def) in nested.iter() {
                check_field(&format!("{}.{}", field, name), nested_def)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn document_schema(name: &str, fields: &Fields, options: &SchemaOptions) -> Value {
    let mut schema = object_schema(fields);
    if let Some(Value::Object(props)) = schema.get_mut("properties") {
        props.insert(ID_FIELD.into(), json!({ "type": "string", "pattern": UUID_PATTERN }));
        if options.timestamps {
            for ts in [CREATED_AT_FIELD, UPDATED_AT_FIELD] {
                props.insert(ts.into(), json!({ "type": "string", "format": "date-time" }));
            }
        }
    }
    if options.strict {
        schema.insert("additionalProperties".into(), Value::Bool(false));
    }
    schema.insert("title".into(), Value::String(name.to_string()));
    schema.insert("$schema".into(), Value::String(JSON_SCHEMA_DRAFT.into()));
    Value::Object(schema)
}

fn object_schema(fields: &Fields) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, def) in fields.iter() {
        properties.insert(name.to_string(), field_schema(def));
        if def.required {
            required.push(Value::String(name.to_string()));
        }
    }
    let mut out = Map::new();
    out.insert("type".into(), Value::String("object".into()));
    out.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        out.insert("required".into(), Value::Array(required));
    }
    out
}

fn field_schema(def: &FieldDefinition) -> Value {
    let mut s = match &def.kind {
        FieldType::String => type_only("string"),
        FieldType::Number => type_only("number"),
        FieldType::Integer => type_only("integer"),
        FieldType::Boolean => type_only("boolean"),
        FieldType::Date => {
            let mut m = type_only("string");
            m.insert("format".into(), Value::String("date-time".into()));
            m
        }
        FieldType::Uuid => {
            let mut m = type_only("string");
            m.insert("pattern".into(), Value::String(UUID_PATTERN.into()));
            m
        }
        FieldType::Mixed => Map::new(),
        FieldType::Array(item) => {
            let mut m = type_only("array");
            m.insert("items".into(), field_schema(item));
            m
        }
        FieldType::Object(nested) => object_schema(nested),
    };
    if let Some(min) = def.min {
        s.insert("minimum".into(), json!(min));
    }
    if let Some(max) = def.max {
        s.insert("maximum".into(), json!(max));
    }
    if let Some(n) = def.min_length {
        s.insert("minLength".into(), json!(n));
    }
    if let Some(n) = def.max_length {
        s.insert("maxLength".into(), json!(n));
    }
    if let Some(p) = &def.pattern {
        s.insert("pattern".into(), Value::String(p.clone()));
    }
    if let Some(values) = &def.enum_values {
        s.insert("enum".into(), Value::Array(values.clone()));
    }
    if let Some(d) = &def.default {
        s.insert("default".into(), d.clone());
    }
    if let Some(d) = &def.description {
        s.insert("description".into(), Value::String(d.clone()));
    }
    Value::Object(s)
}

fn type_only(ty: &str) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("type".into(), Value::String(ty.into()));
    m
}

fn apply_field_defaults(fields: &Fields, doc: &mut Map<String, Value>) {
    for (name, def) in fields.iter() {
        match doc.get_mut(name) {
            None => {
                if let Some(d) = &def.default {
                    doc.insert(name.to_string(), d.clone());
                }
            }
            Some(Value::Object(nested_doc)) => {
                if let FieldType::Object(nested) = &def.kind {
                    apply_field_defaults(nested, nested_doc);
                }
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_fields() -> Fields {
        Fields::new()
            .field("email", FieldDefinition::string().required().pattern("^.+@.+$"))
            .field("age", FieldDefinition::integer().min(0.0))
            .field("role", FieldDefinition::string().one_of(vec![json!("admin"), json!("user")]).default_value(json!("user")))
    }

    #[test]
    fn json_schema_lists_properties_and_required() {
        let schema = Schema::compile("User", user_fields(), SchemaOptions::default()).unwrap();
        let js = schema.json_schema();
        assert_eq!(js["type"], "object");
        assert_eq!(js["title"], "User");
        assert_eq!(js["required"], json!(["email"]));
        assert_eq!(js["properties"]["age"]["type"], "integer");
        assert_eq!(js["properties"]["age"]["minimum"], json!(0.0));
        assert_eq!(js["properties"]["role"]["default"], "user");
        assert!(js["properties"].get(ID_FIELD).is_some());
        assert!(js.get("additionalProperties").is_none());
    }

    #[test]
    fn timestamps_and_strict_shape_the_document() {
        let options = SchemaOptions {
            timestamps: true,
            strict: true,
            ..SchemaOptions::default()
        };
        let schema = Schema::compile("Post", Fields::new(), options).unwrap();
        let js = schema.json_schema();
        assert_eq!(js["properties"][CREATED_AT_FIELD]["format"], "date-time");
        assert_eq!(js["additionalProperties"], false);
        assert!(js.get("required").is_none());
    }

    #[test]
    fn rejects_bad_definitions() {
        assert!(matches!(
            Schema::compile("", Fields::new(), SchemaOptions::default()),
            Err(SchemaError::EmptyName)
        ));
        let bad_pattern = Fields::new().field("code", FieldDefinition::string().pattern("(unclosed"));
        assert!(matches!(
            Schema::compile("Code", bad_pattern, SchemaOptions::default()),
            Err(SchemaError::InvalidPattern { .. })
        ));
        let reserved = Fields::new().field(ID_FIELD, FieldDefinition::uuid());
        assert!(Schema::compile("X", reserved, SchemaOptions::default()).is_err());
        let inverted = Fields::new().field("n", FieldDefinition::number().min(5.0).max(1.0));
        assert!(Schema::compile("X", inverted, SchemaOptions::default()).is_err());
    }

    #[test]
    fn ecma_patterns_with_lookahead_compile_and_enforce() {
        let fields = Fields::new().field("password", FieldDefinition::string().pattern(r"^(?=.*\d).{8,}$"));
        let schema = Schema::compile("Account", fields, SchemaOptions::default()).unwrap();
        let js = schema.json_schema();
        assert!(crate::validation::validate(&js, &json!({ "password": "abcdefg1" })).success);
        assert!(!crate::validation::validate(&js, &json!({ "password": "abcdefgh" })).success);
    }

    #[test]
    fn collection_defaults_to_plural_lowercase() {
        let schema = Schema::compile("User", Fields::new(), SchemaOptions::default()).unwrap();
        assert_eq!(schema.collection(), "users");
        let options = SchemaOptions {
            collection: Some("people".into()),
            ..SchemaOptions::default()
        };
        let schema = Schema::compile("Person", Fields::new(), options).unwrap();
        assert_eq!(schema.collection(), "people");
    }

    #[test]
    fn defaults_fill_missing_values_only() {
        let schema = Schema::compile("User", user_fields(), SchemaOptions::default()).unwrap();
        let mut doc = Map::new();
        schema.apply_defaults(&mut doc);
        assert_eq!(doc.get("role"), Some(&json!("user")));

        let mut doc = Map::new();
        doc.insert("role".into(), json!("admin"));
        schema.apply_defaults(&mut doc);
        assert_eq!(doc.get("role"), Some(&json!("admin")));
    }

    #[test]
    fn hooks_are_filtered_by_phase_and_operation() {
        let mut schema = Schema::compile("User", Fields::new(), SchemaOptions::default()).unwrap();
        schema.pre(Operation::Save, Arc::new(|_| Ok(())));
        schema.pre(Operation::Remove, Arc::new(|_| Ok(())));
        schema.post(Operation::Save, Arc::new(|_| Ok(())));
        assert_eq!(schema.hooks(HookPhase::Pre, Operation::Save).count(), 1);
        assert_eq!(schema.hooks(HookPhase::Post, Operation::Save).count(), 1);
        assert_eq!(schema.hooks(HookPhase::Post, Operation::Find).count(), 0);
        assert_eq!(schema.hook_count(), 3);
    }
}
