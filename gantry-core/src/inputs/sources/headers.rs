use serde_json::Value;

use crate::error::Result;
use crate::inputs::{InputSource, Inputs, Reference, Scope};

/// `headers.<name>`, case-insensitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadersSource;

impl InputSource for HeadersSource {
    fn kinds(&self) -> &[&'static str] {
        &["headers"]
    }

    fn get(&self, reference: &Reference, _: &Inputs, scope: Scope<'_>) -> Result<Option<Value>> {
        Ok(scope
            .request
            .zip(reference.path.first())
            .and_then(|(request, name)| request.header(name))
            .map(|v| Value::String(v.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{HttpMethod, Request};
    use serde_json::json;

    #[test]
    fn reads_headers() {
        let request = Request::new(HttpMethod::Get, "/").with_header("X-Forwarded-For", "10.0.0.1");
        let inputs = Inputs::default();
        let scope = Scope::request(&request);
        assert_eq!(
            inputs.resolve("headers.x-forwarded-for", scope).unwrap(),
            Some(json!("10.0.0.1"))
        );
        assert_eq!(inputs.resolve("headers.'X-Forwarded-For'", scope).unwrap(), Some(json!("10.0.0.1")));
    }
}
