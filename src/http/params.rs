//! Call parameter extraction.
//!
//! # Responsibilities
//! - Collect form values from the query string and url-encoded bodies
//! - Fall back to decoding the body as JSON when there are no form values
//! - Turn any failure into an error-valued payload instead of aborting
//! - Reject malformed escapes and non UTF-8 form values
//!
//! # Design Decisions
//! - Body form values come before query values for the same key
//! - A field with one value is a string, more values make an array
//! - An empty body with no form values is an empty object

use std::collections::BTreeMap;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, request::Parts, Method};
use percent_encoding::percent_decode;
use serde_json::{Map, Value};

use crate::broker::Params;

/// Extract call parameters from a request.
pub async fn extract_params(parts: &Parts, body: Body, limit: usize) -> Params {
    let mut body = Some(body);
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut consumed: Option<Bytes> = None;
    let mut form_error: Option<String> = None;

    if is_form_body(parts) {
        if let Some(body) = body.take() {
            match to_bytes(body, limit).await {
                Ok(bytes) => {
                    if let Err(e) = collect_pairs(&bytes, &mut fields) {
                        form_error.get_or_insert(e);
                    }
                    consumed = Some(bytes);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read form body");
                    return Params::Invalid(format!(
                        "Error trying to parse request form values. Error: {}",
                        e
                    ));
                }
            }
        }
    }

    if let Some(query) = parts.uri.query() {
        if let Err(e) = collect_pairs(query.as_bytes(), &mut fields) {
            form_error.get_or_insert(e);
        }
    }

    if !fields.is_empty() {
        return Params::Data(fields_to_value(fields));
    }

    if let Some(e) = form_error {
        return Params::Invalid(format!("Error trying to parse request form values. Error: {}", e));
    }

    let bytes = match (consumed, body) {
        (Some(bytes), _) => bytes,
        (None, Some(body)) => match to_bytes(body, limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Params::Invalid(format!("Error trying to parse request body. Error: {}", e));
            }
        },
        (None, None) => Bytes::new(),
    };

    decode_json(&bytes)
}

fn is_form_body(parts: &Parts) -> bool {
    let has_body = matches!(parts.method, Method::POST | Method::PUT | Method::PATCH);
    let is_form = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    has_body && is_form
}

/// Decode `key=value&...` into `fields`.
///
/// A pair that fails to decode is dropped; the first failure is returned
/// once every other pair has been collected.
fn collect_pairs(input: &[u8], fields: &mut BTreeMap<String, Vec<String>>) -> Result<(), String> {
    let mut first_error = None;
    for pair in input.split(|b| *b == b'&').filter(|pair| !pair.is_empty()) {
        let (key, value) = match pair.iter().position(|b| *b == b'=') {
            Some(i) => (&pair[..i], &pair[i + 1..]),
            None => (pair, &pair[pair.len()..]),
        };
        match (decode_component(key), decode_component(value)) {
            (Ok(key), Ok(value)) => fields.entry(key).or_default().push(value),
            (Err(e), _) | (_, Err(e)) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Strict form decoding: `+` is a space, every `%` needs two hex digits,
/// and the result must be UTF-8.
fn decode_component(raw: &[u8]) -> Result<String, String> {
    let mut rest = raw;
    while let Some(i) = rest.iter().position(|b| *b == b'%') {
        let escape = &rest[i..(i + 3).min(rest.len())];
        if escape.len() < 3 || !escape[1..].iter().all(u8::is_ascii_hexdigit) {
            return Err(format!("invalid URL escape \"{}\"", String::from_utf8_lossy(escape)));
        }
        rest = &rest[i + 3..];
    }

    let spaced: Vec<u8> = raw.iter().map(|b| if *b == b'+' { b' ' } else { *b }).collect();
    percent_decode(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| format!("invalid UTF-8 in form value: {}", e))
}

fn fields_to_value(fields: BTreeMap<String, Vec<String>>) -> Value {
    let mut map = Map::new();
    for (key, mut values) in fields {
        let value = if values.len() == 1 {
            Value::String(values.remove(0))
        } else {
            Value::Array(values.into_iter().map(Value::String).collect())
        };
        map.insert(key, value);
    }
    Value::Object(map)
}

fn decode_json(bytes: &[u8]) -> Params {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Params::Data(Value::Object(Map::new()));
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Params::Data(value),
        Err(e) => Params::Invalid(format!("Error trying to parse request body. Error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    async fn extract(request: Request<Body>) -> Params {
        let (parts, body) = request.into_parts();
        extract_params(&parts, body, 1024).await
    }

    #[tokio::test]
    async fn test_query_values() {
        let req = Request::get("/calc/add?a=1&b=2&tag=x&tag=y")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract(req).await,
            Params::Data(json!({"a": "1", "b": "2", "tag": ["x", "y"]}))
        );
    }

    #[tokio::test]
    async fn test_form_body_before_query() {
        let req = Request::post("/calc/add?a=2")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("a=1&b=hello%20world"))
            .unwrap();
        assert_eq!(
            extract(req).await,
            Params::Data(json!({"a": ["1", "2"], "b": "hello world"}))
        );
    }

    #[tokio::test]
    async fn test_json_body() {
        let req = Request::post("/calc/add")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"a": 1, "b": [2, 3]}"#))
            .unwrap();
        assert_eq!(extract(req).await, Params::Data(json!({"a": 1, "b": [2, 3]})));
    }

    #[tokio::test]
    async fn test_query_wins_over_json_body() {
        let req = Request::post("/calc/add?a=5")
            .body(Body::from(r#"{"a": 1}"#))
            .unwrap();
        assert_eq!(extract(req).await, Params::Data(json!({"a": "5"})));
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        let req = Request::get("/calc/hello").body(Body::empty()).unwrap();
        assert_eq!(extract(req).await, Params::Data(json!({})));
    }

    #[tokio::test]
    async fn test_empty_form_body_falls_back() {
        let req = Request::post("/calc/hello")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract(req).await, Params::Data(json!({})));
    }

    #[tokio::test]
    async fn test_invalid_json_is_error_payload() {
        let req = Request::post("/calc/add").body(Body::from("{not json")).unwrap();
        match extract(req).await {
            Params::Invalid(message) => assert!(message.starts_with("Error trying to parse request body")),
            other => panic!("expected invalid params, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_body_over_limit_is_error_payload() {
        let req = Request::post("/calc/add")
            .body(Body::from(vec![b' '; 4096]))
            .unwrap();
        assert!(extract(req).await.is_invalid());
    }

    #[tokio::test]
    async fn test_form_body_ignored_for_get() {
        let req = Request::get("/calc/add")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("a=1"))
            .unwrap();
        // Not parsed as form; "a=1" is not JSON either
        assert!(extract(req).await.is_invalid());
    }

    #[tokio::test]
    async fn test_bad_escape_in_query_is_error_payload() {
        let req = Request::get("/calc/add?a=%zz").body(Body::empty()).unwrap();
        match extract(req).await {
            Params::Invalid(message) => {
                assert!(message.starts_with("Error trying to parse request form values"));
                assert!(message.contains("%zz"));
            }
            other => panic!("expected invalid params, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_truncated_escape_is_error_payload() {
        let req = Request::get("/calc/add?a=1%2").body(Body::empty()).unwrap();
        assert!(extract(req).await.is_invalid());
    }

    #[tokio::test]
    async fn test_invalid_utf8_form_body_is_error_payload() {
        let req = Request::post("/calc/add")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(&b"a=\xff\xfe"[..]))
            .unwrap();
        match extract(req).await {
            Params::Invalid(message) => assert!(message.contains("UTF-8")),
            other => panic!("expected invalid params, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_escape_is_error_payload() {
        let req = Request::get("/calc/add?a=%FF").body(Body::empty()).unwrap();
        assert!(extract(req).await.is_invalid());
    }

    #[tokio::test]
    async fn test_valid_pairs_survive_a_bad_one() {
        let req = Request::get("/calc/add?a=%zz&b=2&c=%41+b").body(Body::empty()).unwrap();
        assert_eq!(extract(req).await, Params::Data(json!({"b": "2", "c": "A b"})));
    }
}
