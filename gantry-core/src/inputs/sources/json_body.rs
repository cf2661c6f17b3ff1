use serde_json::Value;

use super::select;
use crate::error::Result;
use crate::inputs::{InputSource, Inputs, Reference, Scope};

/// `json.<path>` (alias `body.<path>`): the parsed request body.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBodySource;

impl InputSource for JsonBodySource {
    fn kinds(&self) -> &[&'static str] {
        &["json", "body"]
    }

    fn get(&self, reference: &Reference, _: &Inputs, scope: Scope<'_>) -> Result<Option<Value>> {
        Ok(scope
            .request
            .and_then(|request| select(request.body(), &reference.path)))
    }
}
