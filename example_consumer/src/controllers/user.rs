use serde_json::{json, Map, Value};
use std::sync::Arc;
use supermodels_sdk::{ModelBundle, ModelError, ModuleEntry, ValidationOutcome};

pub const PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/controllers/user.rs");

/// User operations plus audit trail. Registered as `userController`.
pub struct UserController {
    users: Arc<ModelBundle>,
    audit: Arc<ModelBundle>,
}

impl UserController {
    pub fn check(&self, body: &Value) -> ValidationOutcome {
        self.users.check(body)
    }

    pub async fn create(&self, body: Value) -> Result<Value, ModelError> {
        let user = self.users.model.create(body).await?;
        self.record("create", &user).await?;
        Ok(user)
    }

    pub async fn list(&self, filter: Map<String, Value>) -> Result<Vec<Value>, ModelError> {
        self.users.model.find_populated(&filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Value, ModelError> {
        self.users
            .model
            .find_by_id(id)
            .await?
            .ok_or_else(|| ModelError::NotFound {
                model: self.users.model.name().to_string(),
                id: id.to_string(),
            })
    }

    pub async fn remove(&self, id: &str) -> Result<Value, ModelError> {
        let user = self.users.model.remove(id).await?;
        self.record("remove", &user).await?;
        Ok(user)
    }

    async fn record(&self, action: &str, user: &Value) -> Result<(), ModelError> {
        let subject = user.get("_id").cloned().unwrap_or(Value::Null);
        self.audit
            .model
            .create(json!({ "action": action, "subject": subject }))
            .await?;
        Ok(())
    }
}

pub fn entry() -> ModuleEntry {
    ModuleEntry::from_fn(PATH, |ctx| {
        Ok(UserController {
            users: ctx.resolve_as::<ModelBundle>("userModel")?,
            audit: ctx.resolve_as::<ModelBundle>("auditModel")?,
        })
    })
}
