use serde_json::Value;

use super::select;
use crate::error::Result;
use crate::inputs::{InputSource, Inputs, Reference, Scope};

/// `current.<path>`: the response body built by earlier steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentSource;

impl InputSource for CurrentSource {
    fn kinds(&self) -> &[&'static str] {
        &["current"]
    }

    fn get(&self, reference: &Reference, _: &Inputs, scope: Scope<'_>) -> Result<Option<Value>> {
        Ok(scope
            .response
            .and_then(|response| select(response.body().as_value(), &reference.path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{HttpMethod, Request};
    use crate::response::Response;
    use serde_json::json;

    #[test]
    fn reads_response_so_far() {
        let request = Request::new(HttpMethod::Get, "/");
        let mut response = Response::new();
        response.set("user._0", json!({"id": 7}));
        let inputs = Inputs::default();
        assert_eq!(
            inputs
                .resolve("current.user._0.id", Scope::new(&request, &response))
                .unwrap(),
            Some(json!(7))
        );
        assert_eq!(inputs.resolve("current.user", Scope::request(&request)).unwrap(), None);
    }
}
