use crate::controllers::user::UserController;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use supermodels_sdk::{success_many, success_one, success_one_ok, validation_failed, ModelError, ModuleEntry};

pub const PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/routes/users.rs");

type Ctl = State<Arc<UserController>>;

async fn create(State(ctl): Ctl, Json(body): Json<Value>) -> Result<Response, ModelError> {
    Ok(success_one(ctl.create(body).await?).into_response())
}

async fn list(State(ctl): Ctl, Query(params): Query<HashMap<String, String>>) -> Result<Response, ModelError> {
    let filter: Map<String, Value> = params.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
    Ok(success_many(ctl.list(filter).await?).into_response())
}

async fn read(State(ctl): Ctl, Path(id): Path<String>) -> Result<Response, ModelError> {
    Ok(success_one_ok(ctl.get(&id).await?).into_response())
}

async fn remove(State(ctl): Ctl, Path(id): Path<String>) -> Result<Response, ModelError> {
    Ok(success_one_ok(ctl.remove(&id).await?).into_response())
}

/// Dry-run validation against the users schema.
async fn check(State(ctl): Ctl, Json(body): Json<Value>) -> Response {
    let outcome = ctl.check(&body);
    if outcome.success {
        success_one_ok(serde_json::json!({ "valid": true })).into_response()
    } else {
        validation_failed(outcome).into_response()
    }
}

/// `usersRoutes`: resolves to the router for /users.
pub fn entry() -> ModuleEntry {
    ModuleEntry::from_fn(PATH, |ctx| {
        let ctl = ctx.resolve_as::<UserController>("userController")?;
        let router: Router = Router::new()
            .route("/users", post(create).get(list))
            .route("/users/validate", post(check))
            .route("/users/:id", get(read).delete(remove))
            .with_state(ctl);
        Ok(router)
    })
}
