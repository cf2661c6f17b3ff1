//! Addressable JSON document.
//!
//! [`JsonValue`] wraps `serde_json::Value` with dotted-path access used by
//! the response body builder and by resolvers that read structured values.
//! The path `.` addresses the document root.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path addressing the whole document.
pub const ROOT_PATH: &str = ".";

/// A JSON document addressable by dotted paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonValue(pub Value);

impl Default for JsonValue {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl JsonValue {
    /// Wrap an existing value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take the underlying value.
    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Get the value at a dotted path.
    ///
    /// A missing intermediate segment yields `None`. Numeric segments index
    /// into arrays.
    ///
    /// # Example
    ///
    /// ```
    /// use gantry_core::value::JsonValue;
    /// use serde_json::json;
    ///
    /// let doc = JsonValue::new(json!({"user": {"tags": ["a", "b"]}}));
    /// assert_eq!(doc.get("user.tags.1"), Some(&json!("b")));
    /// assert_eq!(doc.get("user.missing.deeper"), None);
    /// ```
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path == ROOT_PATH {
            return Some(&self.0);
        }
        self.get_segments(&split_path(path))
    }

    /// Get the value at an already split path.
    pub fn get_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        lookup(&self.0, segments)
    }

    /// Get a mutable slot at a dotted path, creating intermediate objects.
    ///
    /// Any non-object value found on the way is replaced by an empty object,
    /// except arrays addressed by an in-range index.
    pub fn get_or_create(&mut self, path: &str) -> &mut Value {
        if path == ROOT_PATH {
            return &mut self.0;
        }
        let mut current = &mut self.0;
        for segment in split_path(path) {
            current = child_or_create(current, segment);
        }
        current
    }

    /// Write `value` at a dotted path. `.` replaces the whole document.
    ///
    /// # Example
    ///
    /// ```
    /// use gantry_core::value::JsonValue;
    /// use serde_json::json;
    ///
    /// let mut doc = JsonValue::default();
    /// doc.graft("a.b", json!({"c": 1}));
    /// assert_eq!(doc.get("a.b.c"), Some(&json!(1)));
    ///
    /// doc.graft(".", json!([1, 2]));
    /// assert_eq!(doc.as_value(), &json!([1, 2]));
    /// ```
    pub fn graft(&mut self, path: &str, value: Value) {
        *self.get_or_create(path) = value;
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Split a dotted path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Follow `segments` from `root`.
pub fn lookup<'v, S: AsRef<str>>(root: &'v Value, segments: &[S]) -> Option<&'v Value> {
    let mut current = root;
    for segment in segments {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn child_or_create<'v>(current: &'v mut Value, segment: &str) -> &'v mut Value {
    let index = match current {
        Value::Array(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
        _ => None,
    };
    if let Some(index) = index {
        return &mut current[index];
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    // Missing keys are inserted as null and become objects on the next descent.
    &mut current[segment]
}

/// Truthiness as used by selectors and conditions.
///
/// `null`, `false`, `0`, `NaN` and `""` are falsy; everything else,
/// including empty objects and arrays, is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Check if a value is a scalar (anything but an object or array).
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Strict scalar equality. Numbers compare by value, so `1` equals `1.0`.
pub fn scalar_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

/// Coerce a value to text for substitution inside a larger string.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
