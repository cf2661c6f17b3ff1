//! Pipeline library: named, ordered lists of steps.

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use super::ApiDefinition;
use crate::error::{Exception, Result};

/// Reserved condition key holding the else action.
const ELSE_KEY: &str = "else";
/// Reserved condition key: stop the pipeline after this step when active.
const BREAK_KEY: &str = "break";

/// One expectation applied to a resolved condition value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Value must be truthy.
    IsTruthy,
    /// Value must be falsy or absent.
    IsNotTruthy,
    /// Value must be present.
    IsNotUndefined,
    /// Value must equal the literal.
    Is(Value),
    /// Value must differ from the literal.
    IsNot(Value),
    /// Value must equal one of the literals.
    In(Vec<Value>),
}

impl Operator {
    fn parse(name: &str, argument: &Value) -> Result<Self> {
        match name {
            "is-truthy" => Ok(Self::IsTruthy),
            "is-not-truthy" => Ok(Self::IsNotTruthy),
            "is-not-undefined" => Ok(Self::IsNotUndefined),
            "is" => Ok(Self::Is(argument.clone())),
            "is-not" => Ok(Self::IsNot(argument.clone())),
            "in" => match argument {
                Value::Array(items) => Ok(Self::In(items.clone())),
                other => Err(Exception::ep_definition(format!(
                    "operator [in] expects an array, got {other}"
                ))),
            },
            other => Err(Exception::ep_definition(format!("unknown operator [{other}]"))),
        }
    }

    /// Whether the operator compares against literals and so needs a scalar.
    pub fn needs_scalar(&self) -> bool {
        matches!(self, Self::Is(_) | Self::IsNot(_) | Self::In(_))
    }
}

/// A template expression and the operators it must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    /// Template expanded before the operators run.
    pub expression: String,
    /// Operators, ANDed in declared order.
    pub operators: Vec<Operator>,
}

/// Status and message used to stop the pipeline when a condition fails.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BreakWith {
    /// Response status.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Message placed in the response body.
    pub message: String,
}

/// The `else` branch of a condition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElseAction {
    /// Stop the pipeline with this status and message.
    #[serde(rename = "break", default)]
    pub break_with: Option<BreakWith>,
}

/// A step's `if`: checks ANDed in declared order, plus reserved keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Condition {
    checks: Vec<Check>,
    otherwise: Option<ElseAction>,
    stop_after: bool,
}

impl TryFrom<Map<String, Value>> for Condition {
    type Error = Exception;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut condition = Condition::default();
        for (key, value) in map {
            match key.as_str() {
                ELSE_KEY => {
                    let action = serde_json::from_value(value).map_err(|e| {
                        Exception::ep_definition("invalid else action").wrap(e)
                    })?;
                    condition.otherwise = Some(action);
                }
                BREAK_KEY => {
                    condition.stop_after = value.as_bool().ok_or_else(|| {
                        Exception::ep_definition(format!("[break] must be a boolean, got {value}"))
                    })?;
                }
                _ => {
                    let Value::Object(expectation) = value else {
                        return Err(Exception::ep_definition(format!(
                            "expectation for [{key}] must be a mapping"
                        )));
                    };
                    let operators = expectation
                        .iter()
                        .map(|(name, argument)| Operator::parse(name, argument))
                        .collect::<Result<Vec<_>>>()?;
                    condition.checks.push(Check {
                        expression: key,
                        operators,
                    });
                }
            }
        }
        Ok(condition)
    }
}

impl Condition {
    /// Build a condition from a JSON mapping.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::try_from(map),
            other => Err(Exception::ep_definition(format!(
                "condition must be a mapping, got {other}"
            ))),
        }
    }

    /// The checks in declared order.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Status and message to stop with when the condition fails.
    pub fn else_break(&self) -> Option<&BreakWith> {
        self.otherwise.as_ref().and_then(|o| o.break_with.as_ref())
    }

    /// Whether the pipeline stops after the step when the condition holds.
    pub fn stops_after(&self) -> bool {
        self.stop_after
    }
}

/// One pipeline entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    /// Free-form description for pipeline authors.
    #[serde(default)]
    pub description: Option<String>,
    /// Disabled steps are skipped without evaluating anything.
    #[serde(default)]
    pub disabled: bool,
    /// Command type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Template tree expanded into the command arguments.
    #[serde(default)]
    pub args: Value,
    /// Gating condition.
    #[serde(rename = "if", default)]
    pub condition: Option<Condition>,
    /// Body path where the command's `data` is written.
    #[serde(default)]
    pub graft: Option<String>,
    /// Template tree expanded into cookies appended after the command's.
    #[serde(default)]
    pub cookies: Option<Value>,
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pipeline {
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// The pipeline library.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EpDefinition {
    #[serde(default)]
    pipelines: IndexMap<String, Pipeline>,
}

impl EpDefinition {
    /// Parse from YAML or JSON text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        super::parse_document(text, "pipeline definition")
    }

    /// Load from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        super::load_document(path)
    }

    /// Look up a pipeline by id.
    pub fn get_pipeline(&self, id: &str) -> Result<&Pipeline> {
        self.pipelines
            .get(id)
            .ok_or_else(|| Exception::ep_definition(format!("no pipeline with id [{id}]")))
    }

    /// Pipeline ids in declared order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }

    /// Check that every pipeline referenced by `api` exists.
    pub fn validate(&self, api: &ApiDefinition) -> Result<()> {
        let missing: IndexSet<&str> = api
            .points()
            .map(|p| p.pipeline_id.as_str())
            .filter(|id| !self.pipelines.contains_key(*id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let missing: Vec<&str> = missing.into_iter().collect();
        Err(Exception::ep_definition(format!(
            "api definition references unknown pipelines: {}",
            missing.join(", ")
        )))
    }
}
