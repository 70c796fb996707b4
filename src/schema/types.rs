//! Field definitions and schema-level options.
//!
//! Definitions deserialize from JSON in three forms: a bare type name (`"String"`), a one-element
//! array for lists (`["String"]`), or an object with a `type` key and constraints. An object
//! without `type` is a nested sub-document.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Uuid,
    Mixed,
    Array(Box<FieldDefinition>),
    Object(Fields),
}

impl FieldType {
    fn from_name(name: &str) -> Option<FieldType> {
        Some(match name.to_lowercase().as_str() {
            "string" => FieldType::String,
            "number" | "decimal" | "double" => FieldType::Number,
            "integer" | "int" => FieldType::Integer,
            "boolean" | "bool" => FieldType::Boolean,
            "date" => FieldType::Date,
            "uuid" | "objectid" => FieldType::Uuid,
            "mixed" | "any" => FieldType::Mixed,
            "array" => FieldType::Array(Box::new(FieldDefinition::new(FieldType::Mixed))),
            "object" => FieldType::Object(Fields::new()),
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub kind: FieldType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDefinition {
    pub fn new(kind: FieldType) -> Self {
        FieldDefinition {
            kind,
            required: false,
            default: None,
            enum_values: None,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            pattern: None,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn uuid() -> Self {
        Self::new(FieldType::Uuid)
    }

    pub fn array_of(item: FieldDefinition) -> Self {
        Self::new(FieldType::Array(Box::new(item)))
    }

    pub fn object(fields: Fields) -> Self {
        Self::new(FieldType::Object(fields))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn one_of(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn min_length(mut self, n: u64) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: u64) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl<'de> Deserialize<'de> for FieldDefinition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        field_from_value(v).map_err(serde::de::Error::custom)
    }
}

fn field_from_value(v: Value) -> Result<FieldDefinition, String> {
    match v {
        Value::String(name) => FieldType::from_name(&name)
            .map(FieldDefinition::new)
            .ok_or_else(|| format!("unknown field type '{}'", name)),
        Value::Array(mut items) => {
            if items.len() > 1 {
                return Err(format!("array field takes one item definition, got {}", items.len()));
            }
            let item = match items.pop() {
                Some(item) => field_from_value(item)?,
                None => FieldDefinition::new(FieldType::Mixed),
            };
            Ok(FieldDefinition::array_of(item))
        }
        Value::Object(mut obj) => {
            let Some(type_value) = obj.remove("type") else {
                return fields_from_map(obj).map(FieldDefinition::object);
            };
            let mut def = field_from_value(type_value)?;
            if let Some(required) = obj.remove("required") {
                def.required = required
                    .as_bool()
                    .ok_or_else(|| "'required' must be a boolean".to_string())?;
            }
            def.default = obj.remove("default");
            if let Some(values) = obj.remove("enum") {
                match values {
                    Value::Array(values) => def.enum_values = Some(values),
                    _ => return Err("'enum' must be an array".into()),
                }
            }
            def.min = take_f64(&mut obj, "min")?;
            def.max = take_f64(&mut obj, "max")?;
            def.min_length = take_u64(&mut obj, "minlength")?.or(take_u64(&mut obj, "min_length")?);
            def.max_length = take_u64(&mut obj, "maxlength")?.or(take_u64(&mut obj, "max_length")?);
            def.pattern = take_string(&mut obj, "match")?.or(take_string(&mut obj, "pattern")?);
            def.description = take_string(&mut obj, "description")?;
            if let Some(fields) = obj.remove("fields") {
                match (&mut def.kind, fields) {
                    (FieldType::Object(existing), Value::Object(map)) => *existing = fields_from_map(map)?,
                    _ => return Err("'fields' is only valid on object fields".into()),
                }
            }
            if !obj.is_empty() {
                return Err(format!(
                    "unsupported field options: {:?}",
                    obj.keys().collect::<Vec<_>>()
                ));
            }
            Ok(def)
        }
        other => Err(format!("field definition must be a string, array or object; got {}", other)),
    }
}

fn take_f64(obj: &mut Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    obj.remove(key)
        .map(|v| v.as_f64().ok_or_else(|| format!("'{}' must be a number", key)))
        .transpose()
}

fn take_u64(obj: &mut Map<String, Value>, key: &str) -> Result<Option<u64>, String> {
    obj.remove(key)
        .map(|v| v.as_u64().ok_or_else(|| format!("'{}' must be a non-negative integer", key)))
        .transpose()
}

fn take_string(obj: &mut Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    obj.remove(key)
        .map(|v| match v {
            Value::String(s) => Ok(s),
            _ => Err(format!("'{}' must be a string", key)),
        })
        .transpose()
}

fn fields_from_map(map: Map<String, Value>) -> Result<Fields, String> {
    let mut fields = Fields::new();
    for (name, v) in map {
        let def = field_from_value(v).map_err(|e| format!("{}: {}", name, e))?;
        fields = fields.field(name, def);
    }
    Ok(fields)
}

/// Ordered field list of a schema or sub-document.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Fields(Vec<(String, FieldDefinition)>);

impl Fields {
    pub fn new() -> Self {
        Fields(Vec::new())
    }

    /// Add a field. A later definition with the same name replaces the earlier one in place.
    pub fn field(mut self, name: impl Into<String>, def: FieldDefinition) -> Self {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = def,
            None => self.0.push((name, def)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.0.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        fields_from_map(map).map_err(serde::de::Error::custom)
    }
}

/// Engine-level options of a schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Backing collection; defaults to the pluralized, lowercased schema name.
    #[serde(default)]
    pub collection: Option<String>,
    /// Maintain `createdAt` / `updatedAt` on every document.
    #[serde(default)]
    pub timestamps: bool,
    /// Reject properties that are not declared.
    #[serde(default)]
    pub strict: bool,
}
