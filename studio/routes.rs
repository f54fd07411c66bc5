use std::io::Cursor;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::handlers;
use crate::state::SharedState;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub fn json_response(status: u16, body: &serde_json::Value) -> Response<Cursor<Vec<u8>>> {
    let bytes = body.to_string().into_bytes();
    let len = bytes.len();
    Response::new(
        StatusCode(status),
        vec![content_type(b"application/json")],
        Cursor::new(bytes),
        Some(len),
        None,
    )
}

pub fn error_response(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    json_response(status, &serde_json::json!({ "error": message }))
}

pub fn not_found() -> Response<Cursor<Vec<u8>>> {
    error_response(404, "not found")
}

fn content_type(value: &[u8]) -> Header {
    // Static ASCII header; from_bytes only fails on non-ASCII input.
    Header::from_bytes(&b"Content-Type"[..], value).expect("static header is valid")
}

/// Value of the request's `Content-Type` header, or empty.
pub fn request_content_type(request: &Request) -> String {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches incoming requests to the appropriate handler.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or("").to_owned();

    let response = match (method, path.as_str()) {
        (Method::Get, "/status") => handlers::status::handle_get(&state),
        (Method::Post, "/predict") => handlers::predict::handle_predict(&mut request, &state),
        (Method::Post, "/reset") => handlers::predict::handle_reset(&state),
        _ => not_found(),
    };

    let _ = request.respond(response);
}
