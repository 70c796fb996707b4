//! Stateless JSON Schema validation. Invalid data is an outcome, not an error.

use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signature of the validate function handed out with every model bundle.
pub type ValidateFn = fn(&Value, &Value) -> ValidationOutcome;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// JSON pointer into the validated data ("" for the root).
    pub instance_path: String,
    /// JSON pointer into the schema keyword that failed.
    pub schema_path: String,
    pub message: String,
}

impl From<ValidationError<'_>> for ValidationIssue {
    fn from(err: ValidationError<'_>) -> Self {
        ValidationIssue {
            instance_path: err.instance_path.to_string(),
            schema_path: err.schema_path.to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub success: bool,
    /// `None` on success; owned copies of the validator's errors otherwise.
    pub errors: Option<Vec<ValidationIssue>>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        ValidationOutcome {
            success: true,
            errors: None,
        }
    }

    pub fn failed(errors: Vec<ValidationIssue>) -> Self {
        ValidationOutcome {
            success: false,
            errors: Some(errors),
        }
    }

    pub fn into_errors(self) -> Vec<ValidationIssue> {
        self.errors.unwrap_or_default()
    }
}

/// Compile `json_schema` and check `data` against it. The validator is compiled on every call;
/// callers validating in a loop should hold on to a compiled schema themselves.
pub fn validate(json_schema: &Value, data: &Value) -> ValidationOutcome {
    let compiled = match JSONSchema::compile(json_schema) {
        Ok(compiled) => compiled,
        Err(e) => {
            tracing::debug!(error = %e, "json schema failed to compile");
            return ValidationOutcome::failed(vec![ValidationIssue {
                instance_path: String::new(),
                schema_path: e.schema_path.to_string(),
                message: format!("invalid schema: {}", e),
            }]);
        }
    };
    let result = compiled
        .validate(data)
        .map_err(|errors| errors.map(ValidationIssue::from).collect::<Vec<_>>());
    match result {
        Ok(()) => ValidationOutcome::ok(),
        Err(errors) => ValidationOutcome::failed(errors),
    }
}
