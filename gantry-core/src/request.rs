//! Request contract between a transport adapter and the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Exception;

/// HTTP methods understood by the API definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// HEAD
    Head,
}

impl HttpMethod {
    /// Lower-case name as used in API definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for HttpMethod {
    type Err = Exception;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            "options" => Ok(Self::Options),
            "head" => Ok(Self::Head),
            other => Err(Exception::not_found(format!("unsupported method [{other}]"))),
        }
    }
}

/// Shared cancellation flag for a request.
///
/// The transport adapter keeps a clone and raises it when the client goes
/// away; event-stream loops check it between cycles.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Create a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check the flag.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An incoming request as seen by the engine.
///
/// `path` is the matched API path template (e.g. `/users/{id}`), not the raw
/// URL; the concrete segment values live in the path parameters.
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpMethod,
    path: String,
    path_parameters: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Value,
    is_event_source: bool,
    stop: StopHandle,
}

impl Request {
    /// Create a request for a matched path template.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_parameters: HashMap::new(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: Value::Null,
            is_event_source: false,
            stop: StopHandle::new(),
        }
    }

    /// Add a path parameter.
    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    /// Replace all path parameters.
    pub fn with_path_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.path_parameters = parameters;
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a header. Names are stored lower-cased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the parsed body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Matched path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path parameter by name.
    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters.get(name).map(String::as_str)
    }

    /// All path parameters.
    pub fn path_parameters(&self) -> &HashMap<String, String> {
        &self.path_parameters
    }

    /// Query parameter by name.
    pub fn query_parameter(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, lower-cased names.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Parsed body (`null` when empty).
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Mark the request as served by an event-stream endpoint.
    pub fn set_event_source(&mut self, is_event_source: bool) {
        self.is_event_source = is_event_source;
    }

    /// Whether the resolved endpoint is an event stream.
    pub fn is_event_source(&self) -> bool {
        self.is_event_source
    }

    /// Clone of the cancellation flag.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Raise the cancellation flag.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Whether the request was stopped.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }
}
