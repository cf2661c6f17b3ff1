//! Response builders for the transport adapter.

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::StatusCode;
use hyper::http::header::{self, HeaderName, HeaderValue};
use std::convert::Infallible;

use gantry_core::error::Exception;
use gantry_core::response::Response;

/// Body type of every adapter response.
pub type Body = UnsyncBoxBody<Bytes, Infallible>;

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Hmac-Token";

/// Wrap bytes in a [`Body`].
pub fn full(bytes: impl Into<Bytes>) -> Body {
    Full::new(bytes.into()).boxed_unsync()
}

/// An empty response with the given status.
pub fn empty(status: StatusCode) -> hyper::Response<Body> {
    let mut response = hyper::Response::new(full(Bytes::new()));
    *response.status_mut() = status;
    response
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Build a JSON response with status code.
pub fn json_response(code: u16, body: &serde_json::Value) -> hyper::Response<Body> {
    let mut response = hyper::Response::new(full(body.to_string()));
    *response.status_mut() = status(code);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Render an engine response: redirect or JSON body, plus its headers and
/// cookies.
pub fn render(engine: &Response) -> hyper::Response<Body> {
    let mut response = match engine.redirection() {
        Some(uri) => {
            let mut redirect = empty(StatusCode::FOUND);
            match HeaderValue::from_str(&uri.full()) {
                Ok(location) => {
                    redirect.headers_mut().insert(header::LOCATION, location);
                }
                Err(e) => tracing::warn!(url = %uri.url, error = %e, "unusable redirect target"),
            }
            redirect
        }
        None => json_response(engine.status_code(), engine.body().as_value()),
    };
    apply_engine_headers(&mut response, engine);
    response
}

/// Copy accumulated headers and cookies onto `response`.
pub fn apply_engine_headers(response: &mut hyper::Response<Body>, engine: &Response) {
    let headers = response.headers_mut();
    for (name, value) in engine.headers() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid response header"),
        }
    }
    for cookie in engine.cookies() {
        match HeaderValue::from_str(&cookie.to_header_value()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!(cookie = %cookie.name, "dropping invalid cookie"),
        }
    }
}

/// Render an exception as `{id, errors}` with public messages only.
pub fn exception(exception: &Exception) -> hyper::Response<Body> {
    json_response(exception.http_status(), &exception.to_public_json())
}

/// Answer a CORS preflight.
pub fn preflight() -> hyper::Response<Body> {
    let mut response = empty(StatusCode::NO_CONTENT);
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

/// Add no-cache and CORS headers.
///
/// The allowed origin is the request origin when it is listed, else the
/// first listed origin, else `*`.
pub fn finish(
    mut response: hyper::Response<Body>,
    origin: Option<&str>,
    allowed_origins: &[String],
) -> hyper::Response<Body> {
    let allow_origin = match origin {
        Some(origin) if allowed_origins.iter().any(|o| o == origin) => origin,
        _ => allowed_origins.first().map(String::as_str).unwrap_or("*"),
    };
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    if let Ok(value) = HeaderValue::from_str(allow_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    response
}
