//! HTTP surface of the cost report.
//!
//! Every response, successful or not, carries the same permissive CORS header set so the
//! dashboard can call the endpoint from any origin. Handlers attach the headers themselves and
//! [`with_access_control_headers`] covers the responses axum produces on its own (405s).

use axum::http::HeaderValue;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, HeaderName,
};
use axum::response::Response;

pub mod handlers;

/// `Access-Control-*` headers attached to every response.
pub fn access_control_headers() -> [(HeaderName, &'static str); 3] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (ACCESS_CONTROL_ALLOW_METHODS, "OPTIONS,GET"),
        (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    ]
}

/// Access control headers plus `Content-Type: application/json`.
pub fn cors_headers() -> [(HeaderName, &'static str); 4] {
    let [origin, methods, headers] = access_control_headers();
    [(CONTENT_TYPE, "application/json"), origin, methods, headers]
}

/// Response mapper installed on the whole router.
pub async fn with_access_control_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in access_control_headers() {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}
