//! Environment variable provider.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Read access to environment variables.
pub trait EnvProvider: Send + Sync {
    /// Get an environment variable.
    fn var(&self, key: &str) -> Option<String>;

    /// Check if this is a mock provider.
    fn is_mock(&self) -> bool;
}

/// The process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealEnv;

impl EnvProvider for RealEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// Isolated in-memory environment.
///
/// # Example
///
/// ```
/// use gantry_core::testing::{EnvProvider, MockEnv};
///
/// let env = MockEnv::new().with_var("TEST_ENV", "smurfs");
/// assert_eq!(env.var("TEST_ENV").as_deref(), Some("smurfs"));
/// assert_eq!(env.var("MISSING"), None);
/// ```
#[derive(Debug, Default)]
pub struct MockEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MockEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with_var(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.write().insert(key.into(), value.into());
        self
    }

    /// Build from key/value pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            vars: RwLock::new(vars),
        }
    }

    /// Set a variable after construction.
    pub fn set_var(&self, key: &str, value: &str) {
        self.vars.write().insert(key.to_string(), value.to_string());
    }
}

impl EnvProvider for MockEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.read().get(key).cloned()
    }

    fn is_mock(&self) -> bool {
        true
    }
}
