use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, Response, StatusCode};
use serde_json::Value;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

fn with_body(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response<Vec<u8>> {
    let mut res = Response::new(body);
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}

/// Plain-text error: the message is the whole body.
pub(crate) fn text_error(status: StatusCode, message: &str) -> Response<Vec<u8>> {
    let mut res = with_body(status, TEXT_PLAIN, message.as_bytes().to_vec());
    res.headers_mut()
        .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    res
}

pub(crate) fn json(body: &Value) -> Response<Vec<u8>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_body(StatusCode::OK, APPLICATION_JSON, bytes),
        Err(e) => text_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

pub(crate) fn html(body: &str) -> Response<Vec<u8>> {
    with_body(StatusCode::OK, TEXT_HTML, body.as_bytes().to_vec())
}
