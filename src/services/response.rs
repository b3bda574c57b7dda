//! HTTP response building helpers
//!
//! Every handler answers with JSON. Errors use the body `{"error": message}`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::error::ProgressError;

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

/// Build a JSON response with 201 Created status
pub fn created<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::CREATED, body)
}

fn error_body(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "error": message }))
}

pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    error_body(StatusCode::NOT_FOUND, message)
}

pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    error_body(StatusCode::BAD_REQUEST, message)
}

pub fn method_not_allowed() -> Response<Full<Bytes>> {
    error_body(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Status code for an error
pub fn error_status(error: &ProgressError) -> StatusCode {
    match error {
        ProgressError::NotFound(_) => StatusCode::NOT_FOUND,
        ProgressError::InvalidInput(_) | ProgressError::Json(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a ProgressError to an appropriate HTTP response
pub fn error_response(error: ProgressError) -> Response<Full<Bytes>> {
    let status = error_status(&error);
    let message = match &error {
        ProgressError::NotFound(msg) | ProgressError::InvalidInput(msg) => msg.clone(),
        other => other.to_string(),
    };
    error_body(status, &message)
}

/// Result type alias for handlers
pub type HandlerResult = Result<Response<Full<Bytes>>, ProgressError>;

/// Wrap a service result into an HTTP response
pub fn from_result<T: Serialize>(result: Result<T, ProgressError>) -> Response<Full<Bytes>> {
    match result {
        Ok(value) => ok(&value),
        Err(e) => error_response(e),
    }
}

/// Wrap a create result into an HTTP response with 201 Created
pub fn from_create_result<T: Serialize>(result: Result<T, ProgressError>) -> Response<Full<Bytes>> {
    match result {
        Ok(value) => created(&value),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response() {
        let resp = ok(&serde_json::json!({"test": true}));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            error_response(ProgressError::NotFound("no record".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(ProgressError::invalid("bad score")).status(),
            StatusCode::BAD_REQUEST
        );
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(error_response(ProgressError::Json(json_err)).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_response(ProgressError::Storage("disk full".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_create_result_status() {
        let resp = from_create_result::<u32>(Ok(1));
        assert_eq!(resp.status(), StatusCode::CREATED);
        let resp = from_result::<u32>(Err(ProgressError::Internal("x".into())));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
