//! Response body helpers: JSON success bodies and plain-text error bodies.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct CreatedId {
    pub id: i64,
}

/// Plain-text error with a trailing newline, the same shape for every failure.
pub fn plain_error(status: StatusCode, message: &str) -> Response {
    let mut res = (status, format!("{}\n", message)).into_response();
    let headers = res.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    res
}

/// JSON body with the given status. An encoding failure is logged and the status is kept with an empty body.
pub fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response {
    match serde_json::to_vec(data) {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            let mut res = (status, bytes).into_response();
            res.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            res
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response body");
            let mut res = Response::new(Body::empty());
            *res.status_mut() = status;
            res
        }
    }
}

pub fn created_id(id: i64) -> Response {
    json_response(StatusCode::CREATED, &CreatedId { id })
}

/// Status only, JSON content type and no body (update and delete).
pub fn empty_ok() -> Response {
    let mut res = StatusCode::OK.into_response();
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    res
}

pub fn page_not_found() -> Response {
    plain_error(StatusCode::NOT_FOUND, "404 page not found")
}
