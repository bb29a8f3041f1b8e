//! Response body and JSON response helpers.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

/// Response body of the shared-key service. Every response is fully buffered.
pub type SharedKeyResponseBody = Full<Bytes>;

/// Content type of JSON responses.
pub const CONTENT_TYPE: &str = "application/json";

/// Build a JSON response.
#[must_use]
pub fn json_response(
    status: StatusCode,
    value: &serde_json::Value,
) -> http::Response<SharedKeyResponseBody> {
    let body = serde_json::to_vec(value).expect("JSON serialization of a Value cannot fail");

    let mut response = http::Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(CONTENT_TYPE),
    );
    response
}

/// Build a response with an empty body, used for challenges and 403 responses.
#[must_use]
pub fn empty_response() -> http::Response<SharedKeyResponseBody> {
    http::Response::new(Full::default())
}

/// Build a JSON error response of the form `{"error": code, "message": message}`.
#[must_use]
pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
) -> http::Response<SharedKeyResponseBody> {
    json_response(
        status,
        &serde_json::json!({
            "error": code,
            "message": message,
        }),
    )
}
