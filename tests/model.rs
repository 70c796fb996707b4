use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use supermodels_sdk::{
    AppSchemaOptions, Connection, FieldDefinition, Fields, HookError, MemoryStore, Model, ModelError, Operation,
    Schema, SchemaOptions,
};

fn fields() -> Fields {
    Fields::new()
        .field("email", FieldDefinition::string().required())
        .field("role", FieldDefinition::string().default_value(json!("user")))
        .field("age", FieldDefinition::integer().min(0.0))
}

fn define(options: SchemaOptions, app: AppSchemaOptions) -> (Arc<Model>, MemoryStore) {
    let store = MemoryStore::new();
    let conn = Connection::new(Arc::new(store.clone()));
    let mut schema = Schema::compile("User", fields(), options).unwrap();
    for hook in &app.pre {
        schema.pre(hook.op, Arc::clone(&hook.callback));
    }
    for hook in &app.post {
        schema.post(hook.op, Arc::clone(&hook.callback));
    }
    let model = conn.define_model("User", Arc::new(schema), Arc::new(app)).unwrap();
    (model, store)
}

fn plain() -> (Arc<Model>, MemoryStore) {
    define(SchemaOptions::default(), AppSchemaOptions::new())
}

#[tokio::test]
async fn create_assigns_id_defaults_and_timestamps() {
    let options = SchemaOptions {
        timestamps: true,
        ..SchemaOptions::default()
    };
    let (model, store) = define(options, AppSchemaOptions::new());
    let doc = model.create(json!({ "email": "a@b.c" })).await.unwrap();

    let id = doc["_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(doc["role"], "user");
    assert!(doc["createdAt"].is_string());
    assert_eq!(doc["createdAt"], doc["updatedAt"]);
    assert_eq!(store.count("users"), 1);
    assert_eq!(model.find_by_id(id).await.unwrap(), Some(doc));
}

#[tokio::test]
async fn invalid_documents_are_not_stored() {
    let (model, store) = plain();
    let err = model.create(json!({ "age": -4 })).await.unwrap_err();
    match err {
        ModelError::Validation { model, errors } => {
            assert_eq!(model, "User");
            assert!(!errors.is_empty());
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert_eq!(store.count("users"), 0);
    assert!(matches!(model.create(json!([1, 2])).await, Err(ModelError::NotAnObject)));
}

#[tokio::test]
async fn hooks_run_in_stage_order_and_may_mutate() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = |label: &'static str| {
        let seen = Arc::clone(&seen);
        move |_: &mut Value| -> Result<(), HookError> {
            seen.lock().unwrap().push(label);
            Ok(())
        }
    };
    let app = AppSchemaOptions::new()
        .pre(Operation::Validate, log("pre-validate"))
        .post(Operation::Validate, log("post-validate"))
        .pre(Operation::Save, |doc: &mut Value| {
            doc["email"] = json!(doc["email"].as_str().unwrap_or_default().to_lowercase());
            Ok(())
        })
        .pre(Operation::Save, log("pre-save"))
        .post(Operation::Save, log("post-save"));
    let (model, _store) = define(SchemaOptions::default(), app);

    let doc = model.create(json!({ "email": "A@B.C" })).await.unwrap();
    assert_eq!(doc["email"], "a@b.c");
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["pre-validate", "post-validate", "pre-save", "post-save"]
    );
}

#[tokio::test]
async fn failing_pre_save_prevents_persistence() {
    let app = AppSchemaOptions::new().pre(Operation::Save, |_: &mut Value| Err(HookError::new("read only")));
    let (model, store) = define(SchemaOptions::default(), app);

    let err = model.create(json!({ "email": "a@b.c" })).await.unwrap_err();
    assert_eq!(err.to_string(), "pre save hook failed on User: read only");
    assert_eq!(store.count("users"), 0);
}

#[tokio::test]
async fn remove_runs_hooks_and_reports_missing() {
    let removed = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&removed);
    let app = AppSchemaOptions::new().post(Operation::Remove, move |doc: &mut Value| {
        *sink.lock().unwrap() = doc.get("_id").cloned();
        Ok(())
    });
    let (model, store) = define(SchemaOptions::default(), app);
    let doc = model.create(json!({ "email": "a@b.c" })).await.unwrap();
    let id = doc["_id"].as_str().unwrap().to_string();

    model.remove(&id).await.unwrap();
    assert_eq!(*removed.lock().unwrap(), Some(json!(id.as_str())));
    assert_eq!(store.count("users"), 0);
    assert!(matches!(model.remove(&id).await, Err(ModelError::NotFound { .. })));
}

#[tokio::test]
async fn find_filters_and_post_find_hooks_apply() {
    let app = AppSchemaOptions::new()
        .pre(Operation::Find, |filter: &mut Value| {
            if let Some(map) = filter.as_object_mut() {
                map.remove("ignored");
            }
            Ok(())
        })
        .post(Operation::Find, |doc: &mut Value| {
            doc["seen"] = json!(true);
            Ok(())
        });
    let (model, _store) = define(SchemaOptions::default(), app);
    model.create(json!({ "email": "a@b.c", "role": "admin" })).await.unwrap();
    model.create(json!({ "email": "d@e.f" })).await.unwrap();

    let mut filter = Map::new();
    filter.insert("role".into(), json!("admin"));
    filter.insert("ignored".into(), json!("whatever"));
    let found = model.find(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["email"], "a@b.c");
    assert_eq!(found[0]["seen"], true);

    assert_eq!(model.find(&Map::new()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn populate_is_identity_unless_configured() {
    let (model, _store) = plain();
    let records = vec![json!({ "email": "a@b.c" })];
    assert_eq!(model.populate(records.clone()).unwrap(), records);

    let app = AppSchemaOptions::new().populate_records(|records| {
        Ok(records
            .into_iter()
            .map(|mut r| {
                r["populated"] = json!(true);
                r
            })
            .collect())
    });
    let (model, _store) = define(SchemaOptions::default(), app);
    model.create(json!({ "email": "a@b.c" })).await.unwrap();
    let docs = model.find_populated(&Map::new()).await.unwrap();
    assert_eq!(docs[0]["populated"], true);
}

#[tokio::test]
async fn update_merges_and_revalidates() {
    let options = SchemaOptions {
        timestamps: true,
        ..SchemaOptions::default()
    };
    let (model, _store) = define(options, AppSchemaOptions::new());
    let doc = model.create(json!({ "email": "a@b.c" })).await.unwrap();
    let id = doc["_id"].as_str().unwrap().to_string();

    let updated = model
        .update(&id, json!({ "age": 30, "_id": "not-an-id" }))
        .await
        .unwrap();
    assert_eq!(updated["_id"], id.as_str());
    assert_eq!(updated["age"], 30);
    assert_eq!(updated["createdAt"], doc["createdAt"]);

    assert!(matches!(
        model.update(&id, json!({ "age": -1 })).await,
        Err(ModelError::Validation { .. })
    ));
    assert!(matches!(
        model.update("missing", json!({})).await,
        Err(ModelError::NotFound { .. })
    ));
}
