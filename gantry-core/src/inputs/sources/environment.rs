use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::inputs::{InputSource, Inputs, Reference, Scope};
use crate::testing::EnvProvider;

/// `env.<NAME>`: the process environment, then the development fallback.
pub struct EnvironmentSource {
    env: Arc<dyn EnvProvider>,
    env_dev: HashMap<String, String>,
}

impl EnvironmentSource {
    /// Create a source over `env` with a fallback table.
    pub fn new(env: Arc<dyn EnvProvider>, env_dev: HashMap<String, String>) -> Self {
        Self { env, env_dev }
    }
}

impl InputSource for EnvironmentSource {
    fn kinds(&self) -> &[&'static str] {
        &["env"]
    }

    fn get(&self, reference: &Reference, _: &Inputs, _: Scope<'_>) -> Result<Option<Value>> {
        let name = reference.field_path();
        Ok(self
            .env
            .var(&name)
            .or_else(|| self.env_dev.get(&name).cloned())
            .map(Value::String))
    }
}
