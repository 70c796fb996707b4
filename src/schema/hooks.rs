//! Lifecycle hooks and the application-level schema envelope.

use crate::error::HookError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Model operation a hook is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Validate,
    Save,
    Remove,
    Find,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Validate => "validate",
            Operation::Save => "save",
            Operation::Remove => "remove",
            Operation::Find => "find",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate" => Ok(Operation::Validate),
            "save" => Ok(Operation::Save),
            "remove" | "deleteOne" => Ok(Operation::Remove),
            "find" | "findOne" => Ok(Operation::Find),
            other => Err(HookError(format!("unknown hook operation: {}", other))),
        }
    }
}

/// Whether a hook runs before or after its operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Pre,
    Post,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookPhase::Pre => "pre",
            HookPhase::Post => "post",
        })
    }
}

/// Hook callback. Receives the document the operation works on; pre hooks may mutate it.
pub type HookFn = Arc<dyn Fn(&mut Value) -> Result<(), HookError> + Send + Sync>;

/// Applied to the records returned by `Model::find_populated`.
pub type PopulateFn = Arc<dyn Fn(Vec<Value>) -> Result<Vec<Value>, HookError> + Send + Sync>;

#[derive(Clone)]
pub struct HookDefinition {
    pub op: Operation,
    pub callback: HookFn,
}

impl HookDefinition {
    pub fn new<F>(op: Operation, callback: F) -> Self
    where
        F: Fn(&mut Value) -> Result<(), HookError> + Send + Sync + 'static,
    {
        HookDefinition {
            op,
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for HookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDefinition").field("op", &self.op).finish_non_exhaustive()
    }
}

/// Application-level options: hooks, extra dependencies that must be built first, and a
/// post-population step. Attached to the model it creates as metadata.
#[derive(Clone, Default)]
pub struct AppSchemaOptions {
    pub pre: Vec<HookDefinition>,
    pub post: Vec<HookDefinition>,
    /// Dependency keys resolved, in order, before the model is bound.
    pub requires: Vec<String>,
    pub populate_records: Option<PopulateFn>,
}

impl AppSchemaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pre<F>(mut self, op: Operation, callback: F) -> Self
    where
        F: Fn(&mut Value) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.pre.push(HookDefinition::new(op, callback));
        self
    }

    pub fn post<F>(mut self, op: Operation, callback: F) -> Self
    where
        F: Fn(&mut Value) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.post.push(HookDefinition::new(op, callback));
        self
    }

    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.requires.push(key.into());
        self
    }

    pub fn populate_records<F>(mut self, populate: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>, HookError> + Send + Sync + 'static,
    {
        self.populate_records = Some(Arc::new(populate));
        self
    }

    /// Loggable view (callbacks reduced to their operation names).
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "pre": self.pre.iter().map(|h| h.op.as_str()).collect::<Vec<_>>(),
            "post": self.post.iter().map(|h| h.op.as_str()).collect::<Vec<_>>(),
            "requires": self.requires,
            "populate_records": self.populate_records.is_some(),
        })
    }
}

impl fmt::Debug for AppSchemaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSchemaOptions")
            .field("pre", &self.pre)
            .field("post", &self.post)
            .field("requires", &self.requires)
            .field("populate_records", &self.populate_records.is_some())
            .finish()
    }
}
