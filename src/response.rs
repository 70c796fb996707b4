//! Standard response envelope helpers.

use crate::error::{ErrorBody, ErrorDetail};
use crate::validation::ValidationOutcome;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data, meta: None }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data, meta: None }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

/// The `{error:{code,message,details}}` envelope shared with `ModelError` responses. `details` is omitted when `None`.
pub fn error_body(code: &str, message: impl Into<String>, details: Option<serde_json::Value>) -> ErrorBody {
    ErrorBody {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    }
}

/// 422 with the outcome's issues as details. Meant for outcomes that failed.
pub fn validation_failed(outcome: ValidationOutcome) -> (StatusCode, Json<ErrorBody>) {
    let details = serde_json::to_value(outcome.into_errors()).ok();
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(error_body("validation_error", "validation failed", details)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationIssue;

    #[test]
    fn many_counts_items() {
        let (status, Json(body)) = success_many(vec![1, 2, 3]);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.meta.count, 3);
    }

    #[test]
    fn validation_failure_carries_issues() {
        let outcome = ValidationOutcome::failed(vec![ValidationIssue {
            instance_path: "/email".into(),
            schema_path: "/properties/email/type".into(),
            message: "42 is not of type \"string\"".into(),
        }]);
        let (status, Json(body)) = validation_failed(outcome);
        let body = serde_json::to_value(body).unwrap();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"][0]["instance_path"], "/email");
    }

    #[test]
    fn error_body_omits_absent_details() {
        let body = serde_json::to_value(error_body("not_found", "User x not found", None)).unwrap();
        assert_eq!(body, serde_json::json!({ "error": { "code": "not_found", "message": "User x not found" } }));
        assert!(body["error"].get("details").is_none());
    }
}
