//! API-shape and pipeline definitions.
//!
//! Both documents are YAML (JSON is accepted as a subset) and are parsed
//! once at startup into typed, validated structures.

mod api;
mod pipeline;

pub use api::{ApiDefinition, ApiMethod, ApiPath, ApiPoint, EngineBinding, Selector};
pub use pipeline::{BreakWith, Check, Condition, ElseAction, EpDefinition, Operator, Pipeline, Step};

use crate::error::{Exception, Result, ResultExt};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse a YAML or JSON document. `origin` names it in error messages.
pub fn parse_document<T: DeserializeOwned>(text: &str, origin: &str) -> Result<T> {
    serde_yaml::from_str(text)
        .or_exception(|| Exception::config(format!("failed to parse '{origin}'")))
}

/// Read and parse a YAML or JSON document from disk.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .or_exception(|| Exception::config(format!("failed to read '{}'", path.display())))?;
    parse_document(&text, &path.display().to_string())
}
