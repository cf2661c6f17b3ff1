//! Request handling: HTTP in, engine request, engine response out.

use bytes::Bytes;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Body as HttpBody, Frame};
use hyper::http::header::{self, HeaderValue};
use hyper::{Method, StatusCode};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use gantry_core::error::{Exception, Result};
use gantry_core::request::{HttpMethod, Request};
use gantry_core::response::Response;

use super::ServerConfig;
use super::response::{self, Body};
use crate::executor::{Executor, log_exception};

/// State shared by every connection.
#[derive(Debug)]
pub struct ServerState {
    config: ServerConfig,
    executor: Executor,
}

impl ServerState {
    /// Create the state.
    pub fn new(config: ServerConfig, executor: Executor) -> Self {
        Self { config, executor }
    }

    /// Transport settings.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

/// Handle one HTTP request.
pub async fn handle<B>(
    req: hyper::Request<B>,
    state: Arc<ServerState>,
) -> std::result::Result<hyper::Response<Body>, Infallible>
where
    B: HttpBody<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = if req.method() == Method::OPTIONS {
        response::preflight()
    } else {
        match serve(req, &state).await {
            Ok(response) => response,
            Err(exception) => response::exception(&exception),
        }
    };
    Ok(response::finish(
        response,
        origin.as_deref(),
        &state.config.allowed_origins,
    ))
}

async fn serve<B>(req: hyper::Request<B>, state: &Arc<ServerState>) -> Result<hyper::Response<Body>>
where
    B: HttpBody<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let mut request = build_request(req, &state.executor)
        .await
        .inspect_err(log_exception)?;
    let response = state.executor.do_request(&mut request).await?;

    if request.is_event_source() {
        debug!(path = %request.path(), "opening event stream");
        return Ok(event_stream(
            Arc::clone(state),
            request,
            response,
            state.config.event_stream_interval(),
        ));
    }
    Ok(response::render(&response))
}

/// Translate an HTTP request into an engine request.
pub(crate) async fn build_request<B>(req: hyper::Request<B>, executor: &Executor) -> Result<Request>
where
    B: HttpBody<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();
    let method = HttpMethod::from_str(parts.method.as_str())?;
    let (template, path_parameters) = executor.api().match_path(parts.uri.path())?;

    let mut request = Request::new(method, template).with_path_parameters(path_parameters);

    if let Some(query) = parts.uri.query() {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| Exception::user("invalid query string").wrap(e))?;
        for (name, value) in pairs {
            request = request.with_query(name, value);
        }
    }
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    let bytes = body
        .collect()
        .await
        .map_err(|e| Exception::user("unreadable request body").wrap(e))?
        .to_bytes();
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Ok(request.with_body(parse_body(content_type, &bytes)?))
}

fn parse_body(content_type: &str, bytes: &[u8]) -> Result<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
            .map_err(|e| Exception::user("invalid form body").wrap(e))?;
        let form: Map<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        return Ok(Value::Object(form));
    }
    if content_type.contains("json") {
        return serde_json::from_slice(bytes).map_err(|e| Exception::user("invalid json body").wrap(e));
    }
    Ok(serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())))
}

fn event_chunk(events: &[String]) -> Bytes {
    Bytes::from(format!("{}\n\n", events.join("\n")))
}

/// Stream the first cycle's events, then re-run the pipeline every
/// `interval` until the client disconnects or the request is stopped.
fn event_stream(
    state: Arc<ServerState>,
    mut request: Request,
    mut first: Response,
    interval: Duration,
) -> hyper::Response<Body> {
    let (tx, rx) = mpsc::channel::<Bytes>(16);

    let mut response = response::empty(StatusCode::OK);
    response::apply_engine_headers(&mut response, &first);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    let mut pending = first.drain_server_sent_events();
    tokio::spawn(async move {
        loop {
            if !pending.is_empty() && tx.send(event_chunk(&pending)).await.is_err() {
                request.stop();
            }
            if request.is_stopped() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tx.closed() => request.stop(),
            }
            if request.is_stopped() {
                break;
            }
            match state.executor.do_request(&mut request).await {
                Ok(mut next) => pending = next.drain_server_sent_events(),
                Err(_) => break,
            }
        }
        debug!(path = %request.path(), "event stream closed");
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(Frame::data(chunk)), rx))
    });
    let (parts, _) = response.into_parts();
    hyper::Response::from_parts(parts, StreamBody::new(stream).boxed_unsync())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_parsing() {
        assert_eq!(parse_body("application/json", b"").unwrap(), Value::Null);
        assert_eq!(
            parse_body("application/json; charset=utf-8", br#"{"a":1}"#).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            parse_body("application/x-www-form-urlencoded", b"a=1&b=x+y").unwrap(),
            json!({"a": "1", "b": "x y"})
        );
        assert_eq!(parse_body("text/plain", b"hello").unwrap(), json!("hello"));
        assert!(parse_body("application/json", b"{").is_err());
    }

    #[test]
    fn event_chunks_end_with_blank_line() {
        let chunk = event_chunk(&["data: 1".to_string(), "data: 2".to_string()]);
        assert_eq!(chunk, Bytes::from("data: 1\ndata: 2\n\n"));
    }
}
