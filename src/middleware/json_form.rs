// ABOUTME: Rewrites application/json bodies at the token and revocation endpoints into form encoding
// ABOUTME: Scalars are stringified, arrays space-joined, and nulls dropped before the form handlers run
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{AppError, AppResult};

/// Largest JSON body accepted for rewriting
const MAX_JSON_BODY_BYTES: usize = 64 * 1024;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Flatten a JSON object into form pairs
///
/// # Errors
///
/// Returns `InvalidInput` when the document is not an object or holds nested objects
pub fn flatten_json(object: &Map<String, Value>) -> AppResult<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(object.len());
    for (key, value) in object {
        let rendered = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>()
                .join(" "),
            Value::Object(_) => {
                return Err(AppError::invalid_input(format!(
                    "Nested object in field {key} cannot be form encoded"
                )))
            }
        };
        pairs.push((key.clone(), rendered));
    }
    Ok(pairs)
}

/// Re-encode a JSON body as `application/x-www-form-urlencoded`
///
/// # Errors
///
/// Returns `InvalidInput` for malformed JSON or an unencodable document
pub fn json_to_form(body: &[u8]) -> AppResult<String> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::invalid_input(format!("Malformed JSON body: {e}")))?;
    let Value::Object(object) = value else {
        return Err(AppError::invalid_input("JSON body must be an object"));
    };
    let pairs = flatten_json(&object)?;
    serde_urlencoded::to_string(pairs)
        .map_err(|e| AppError::invalid_input(format!("Cannot form-encode body: {e}")))
}

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("application/json"))
}

/// Middleware applying [`json_to_form`] to JSON requests
pub async fn json_to_form_middleware(req: Request, next: Next) -> Response {
    if !is_json(&req) {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_JSON_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::invalid_input(format!("Unreadable request body: {e}")).into_response()
        }
    };
    let form = match json_to_form(&bytes) {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    debug!(path = %parts.uri.path(), "Rewrote JSON body to form encoding");
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    parts.headers.remove(CONTENT_LENGTH);
    next.run(Request::from_parts(parts, Body::from(form))).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_flatten_rules() {
        let body = json!({
            "grant_type": "origin_password",
            "scope": ["openid", "read"],
            "remember": true,
            "attempt": 3,
            "nonce": null
        });
        let pairs: HashMap<String, String> =
            flatten_json(body.as_object().unwrap())
                .unwrap()
                .into_iter()
                .collect();
        assert_eq!(pairs["grant_type"], "origin_password");
        assert_eq!(pairs["scope"], "openid read");
        assert_eq!(pairs["remember"], "true");
        assert_eq!(pairs["attempt"], "3");
        assert!(!pairs.contains_key("nonce"));
    }

    #[test]
    fn test_json_to_form_encodes_reserved_characters() {
        let form = json_to_form(br#"{"password":"a&b=c d"}"#).unwrap();
        assert_eq!(form, "password=a%26b%3Dc+d");
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(json_to_form(b"[1,2]").is_err());
        assert!(json_to_form(b"{not json").is_err());
        assert!(json_to_form(br#"{"a":{"b":1}}"#).is_err());
    }
}
