/// Request extractors whose rejections are `ApiError`s
///
/// Axum's own `Json`, `Query` and `Path` answer malformed input with plain
/// text (422 for a body that does not match the target type). These wrappers
/// delegate to them and convert the rejection, so clients always receive the
/// JSON error body.
///
/// ```text
/// POST /api/recipes  {"cooking_time": "soon", ...}
///
/// 400 {"error": "validation_error", "details": [{"field": "cooking_time", ...}]}
/// ```

use crate::error::{ApiError, ValidationErrorDetail};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON request body, and JSON response body
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// Path parameters
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

const JSON_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";
const QUERY_PREFIX: &str = "Failed to deserialize query string: ";

/// Splits a serde message into the offending field and the message
///
/// `ingredients[0].amount: invalid type ...` names its field up front;
/// `missing field `cooking_time` at ...` names it in backticks.
fn deserialize_detail(text: &str, prefix: &str) -> ValidationErrorDetail {
    let message = text.strip_prefix(prefix).unwrap_or(text);

    if let Some(rest) = message.strip_prefix("missing field `") {
        if let Some((field, _)) = rest.split_once('`') {
            return ValidationErrorDetail::new(field, "This field is required");
        }
    }

    if let Some((path, reason)) = message.split_once(": ") {
        let is_path = !path.is_empty()
            && path
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
        if is_path {
            return ValidationErrorDetail::new(path, reason);
        }
    }

    ValidationErrorDetail::new("non_field_errors", message)
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) => ApiError::ValidationError(vec![deserialize_detail(
                &rejection.body_text(),
                JSON_PREFIX,
            )]),
            JsonRejection::JsonSyntaxError(_) => {
                ApiError::invalid_field("non_field_errors", rejection.body_text())
            }
            _ if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                ApiError::PayloadTooLarge(rejection.body_text())
            }
            _ => ApiError::BadRequest(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::ValidationError(vec![deserialize_detail(&rejection.body_text(), QUERY_PREFIX)])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            // `/api/recipes/abc` names no resource
            PathRejection::FailedToDeserializePathParams(_) => {
                ApiError::NotFound("Not found".to_string())
            }
            _ => ApiError::InternalError(rejection.body_text()),
        }
    }
}
