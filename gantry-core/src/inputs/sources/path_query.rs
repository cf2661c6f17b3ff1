use serde_json::Value;

use crate::error::Result;
use crate::inputs::{InputSource, Inputs, Reference, Scope};

/// `path.<name>` and `query.<name>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathAndQuerySource;

impl InputSource for PathAndQuerySource {
    fn kinds(&self) -> &[&'static str] {
        &["path", "query"]
    }

    fn get(&self, reference: &Reference, _: &Inputs, scope: Scope<'_>) -> Result<Option<Value>> {
        let (Some(request), Some(name)) = (scope.request, reference.path.first()) else {
            return Ok(None);
        };
        let value = match reference.kind.as_str() {
            "path" => request.path_parameter(name),
            _ => request.query_parameter(name),
        };
        Ok(value.map(|v| Value::String(v.to_string())))
    }
}
