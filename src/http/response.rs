//! Response encoding.
//!
//! # Responsibilities
//! - Encode a successful call result as `200` + JSON
//! - Encode a failed call as `500` + `{"error": message}`
//! - Hand failed calls to the error responder override when one is set
//!
//! # Design Decisions
//! - Content-Type is always JSON, whichever branch produced the body
//! - The override owns status and body; nothing is merged into it

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};

use crate::broker::CallResult;
use crate::http::hooks::{ErrorResponder, RequestContext};

/// Media type of every response written by the dispatcher.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Status code and body of an encoded call result.
pub fn encode_result(
    ctx: &RequestContext,
    result: &CallResult,
    on_error: Option<&dyn ErrorResponder>,
) -> (StatusCode, Value) {
    match result {
        Ok(value) => (StatusCode::OK, value.clone()),
        Err(error) => match on_error {
            Some(responder) => responder.respond(ctx, error),
            None => (StatusCode::INTERNAL_SERVER_ERROR, error_body(&error.message)),
        },
    }
}

/// Default error body.
pub fn error_body(message: &str) -> Value {
    json!({ "error": message })
}

/// Build a JSON response.
pub fn json_response(status: StatusCode, body: &Value) -> Response {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            let fallback = error_body("failed to serialize response").to_string();
            (StatusCode::INTERNAL_SERVER_ERROR, fallback.into_bytes())
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}
