use serde_json::Value;
use std::sync::Arc;

use crate::error::{Exception, Result};
use crate::inputs::{InputSource, Inputs, Reference, Scope};
use crate::testing::UuidProvider;

/// `gen.uuid`: a fresh identifier on every resolution.
pub struct GeneratorSource {
    uuid: Arc<dyn UuidProvider>,
}

impl GeneratorSource {
    /// Create a generator backed by `uuid`.
    pub fn new(uuid: Arc<dyn UuidProvider>) -> Self {
        Self { uuid }
    }
}

impl InputSource for GeneratorSource {
    fn kinds(&self) -> &[&'static str] {
        &["gen"]
    }

    fn get(&self, reference: &Reference, _: &Inputs, _: Scope<'_>) -> Result<Option<Value>> {
        match reference.field_path().as_str() {
            "uuid" => Ok(Some(Value::String(self.uuid.new_v4().to_string()))),
            other => Err(Exception::config(format!("unknown generator [{other}]"))),
        }
    }
}
