//! Response accumulator and the value types commands hand back to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::value::{JsonValue, to_text};

/// Cookie expiry: a UNIX timestamp in milliseconds or a date string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CookieExpiry {
    /// Milliseconds since the UNIX epoch.
    Millis(i64),
    /// RFC 3339 or RFC 2822 date.
    Date(String),
}

impl CookieExpiry {
    /// Format as an HTTP date, or pass an unparseable string through.
    pub fn to_http_date(&self) -> String {
        let parsed: Option<DateTime<Utc>> = match self {
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Date(text) => DateTime::parse_from_rfc3339(text)
                .or_else(|_| DateTime::parse_from_rfc2822(text))
                .ok()
                .map(|d| d.with_timezone(&Utc)),
        };
        match (parsed, self) {
            (Some(date), _) => date.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            (None, Self::Date(text)) => text.clone(),
            (None, Self::Millis(ms)) => ms.to_string(),
        }
    }
}

/// Optional cookie attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieOptions {
    /// Absolute expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<CookieExpiry>,
    /// Cookie domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Relative expiry in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
}

/// A cookie to set on the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value; non-strings are stored as compact JSON.
    pub value: Value,
    /// Attributes.
    #[serde(default)]
    pub options: CookieOptions,
}

impl Cookie {
    /// Create a cookie without attributes.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options: CookieOptions::default(),
        }
    }

    /// Render as a `Set-Cookie` header value.
    ///
    /// Cookies are always `Path=/; Secure; HttpOnly; SameSite=None`.
    ///
    /// # Example
    ///
    /// ```
    /// use gantry_core::response::Cookie;
    ///
    /// let cookie = Cookie::new("session", "a b");
    /// assert_eq!(
    ///     cookie.to_header_value(),
    ///     "session=a%20b; Path=/; Secure; HttpOnly; SameSite=None"
    /// );
    /// ```
    pub fn to_header_value(&self) -> String {
        let mut header = format!(
            "{}={}; Path=/",
            self.name,
            urlencoding::encode(&to_text(&self.value))
        );
        if let Some(expires) = &self.options.expires {
            header.push_str(&format!("; Expires={}", expires.to_http_date()));
        }
        if let Some(domain) = &self.options.domain {
            header.push_str(&format!("; Domain={domain}"));
        }
        if let Some(max_age) = self.options.max_age {
            header.push_str(&format!("; Max-Age={}", max_age / 1000));
        }
        header.push_str("; Secure; HttpOnly; SameSite=None");
        header
    }
}

/// A redirect target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uri {
    /// Base URL.
    pub url: String,
    /// Query parameters appended to the URL.
    #[serde(
        default,
        rename = "queryParameters",
        skip_serializing_if = "Map::is_empty"
    )]
    pub query_parameters: Map<String, Value>,
}

impl Uri {
    /// Create a target without query parameters.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query_parameters: Map::new(),
        }
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_parameters.insert(name.into(), value.into());
        self
    }

    /// URL with encoded query parameters appended.
    pub fn full(&self) -> String {
        if self.query_parameters.is_empty() {
            return self.url.clone();
        }
        let pairs: Vec<(&str, String)> = self
            .query_parameters
            .iter()
            .map(|(k, v)| (k.as_str(), to_text(v)))
            .collect();
        // Encoding a list of string pairs cannot fail.
        let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.url)
    }
}

/// The in-flight response, built step by step within one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status_code: u16,
    headers: BTreeMap<String, String>,
    cookies: Vec<Cookie>,
    body: JsonValue,
    redirection: Option<Uri>,
    server_sent_events: Vec<String>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Create an empty `200` response with an empty object body.
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: BTreeMap::new(),
            cookies: Vec::new(),
            body: JsonValue::default(),
            redirection: None,
            server_sent_events: Vec::new(),
        }
    }

    /// Status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Set the status code.
    pub fn set_status_code(&mut self, status_code: u16) {
        self.status_code = status_code;
    }

    /// Accumulated headers.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Merge headers; later values win.
    pub fn add_headers<I>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.headers.extend(headers);
    }

    /// Accumulated cookies, in the order they were added.
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Append cookies.
    pub fn add_cookies<I>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = Cookie>,
    {
        self.cookies.extend(cookies);
    }

    /// Body tree.
    pub fn body(&self) -> &JsonValue {
        &self.body
    }

    /// Graft a value into the body at a dotted path.
    pub fn set(&mut self, path: &str, value: Value) {
        self.body.graft(path, value);
    }

    /// Redirect target, if any.
    pub fn redirection(&self) -> Option<&Uri> {
        self.redirection.as_ref()
    }

    /// Set the redirect target.
    pub fn redirect(&mut self, uri: Uri) {
        self.redirection = Some(uri);
    }

    /// Buffered server-sent events.
    pub fn server_sent_events(&self) -> &[String] {
        &self.server_sent_events
    }

    /// Append server-sent events.
    pub fn add_server_sent_events<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.server_sent_events.extend(events);
    }

    /// Take the buffered events, leaving the buffer empty.
    pub fn drain_server_sent_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.server_sent_events)
    }
}
