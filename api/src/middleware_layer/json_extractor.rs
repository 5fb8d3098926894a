use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request bodies in this API are tiny; anything bigger is not an extractor message.
const MAX_REWRITE_BODY: usize = 64 * 1024;

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REWRITE_BODY)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

fn guess_path_from_serde_msg(msg: &str) -> Option<String> {
    for key in ["question", "text", "value", "session_id"] {
        if msg.contains(&format!("`{key}`")) {
            return Some(key.to_string());
        }
    }
    None
}

fn ensure_request_id(parts: &mut axum::http::response::Parts) {
    let present = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| !v.trim().is_empty());
    if present {
        return;
    }
    if let Ok(v) = HeaderValue::from_str(&format!("req-{}", Uuid::new_v4())) {
        parts.headers.insert(REQUEST_ID_HEADER, v);
    }
}

/// Rewrites axum's plain-text JSON extractor rejections (400/422) into the
/// [`ApiResponse`] envelope. Responses already carrying JSON (our own
/// [`crate::error_handler::AppError`] bodies) pass through untouched.
pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    if !(status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY) {
        return res;
    }
    let is_json = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return res;
    }

    let (mut parts, bytes) = take_body(res).await;
    let original = String::from_utf8_lossy(&bytes);
    ensure_request_id(&mut parts);

    let detail = ApiErrorDetail {
        path: guess_path_from_serde_msg(&original),
        hint: if original.contains("missing field") {
            Some("Required field is missing from the JSON body.".into())
        } else if original.contains("expected a string") || original.contains("invalid type") {
            Some("Expected a JSON string here (e.g. { \"question\": \"...\" }).".into())
        } else if original.contains("Content-Type") {
            Some("Send the body with `Content-Type: application/json`.".into())
        } else {
            None
        },
    };

    let envelope = ApiResponse::<()>::error(
        if status == StatusCode::BAD_REQUEST {
            "BAD_REQUEST"
        } else {
            "UNPROCESSABLE_ENTITY"
        },
        original.trim(),
        vec![detail],
    );

    let body = match serde_json::to_vec(&envelope) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    Response::from_parts(parts, body.into())
}
