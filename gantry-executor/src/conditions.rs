//! Step condition evaluation.

use serde_json::Value;
use tracing::trace;

use gantry_core::definition::{Check, Condition, Operator};
use gantry_core::error::{Exception, Result};
use gantry_core::inputs::{Inputs, Scope};
use gantry_core::value::{is_scalar, is_truthy, scalar_eq};

/// Evaluate a condition against the request and response in `scope`.
///
/// Checks run in declared order and the first failing operator makes the
/// whole condition false. A condition without checks holds.
///
/// # Example
///
/// ```
/// use gantry_core::definition::Condition;
/// use gantry_core::inputs::{Inputs, Scope};
/// use gantry_core::request::{HttpMethod, Request};
/// use gantry_executor::conditions::evaluate;
/// use serde_json::json;
///
/// let condition = Condition::from_value(json!({"{query.tab}": {"in": ["a", "b"]}})).unwrap();
/// let request = Request::new(HttpMethod::Get, "/").with_query("tab", "b");
/// assert!(evaluate(&condition, &Inputs::default(), Scope::request(&request)).unwrap());
/// ```
pub fn evaluate(condition: &Condition, inputs: &Inputs, scope: Scope<'_>) -> Result<bool> {
    for check in condition.checks() {
        if !evaluate_check(check, inputs, scope)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate_check(check: &Check, inputs: &Inputs, scope: Scope<'_>) -> Result<bool> {
    let value = inputs.expand_str(&check.expression, scope)?;
    for operator in &check.operators {
        let holds = apply(operator, value.as_ref(), &check.expression)?;
        trace!(expression = %check.expression, ?operator, holds, "condition operator");
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn apply(operator: &Operator, value: Option<&Value>, expression: &str) -> Result<bool> {
    if operator.needs_scalar() && value.is_some_and(|v| !is_scalar(v)) {
        return Err(Exception::ep_definition(format!(
            "[{expression}] resolved to a non-scalar value and cannot be compared"
        )));
    }
    Ok(match operator {
        Operator::IsTruthy => value.is_some_and(is_truthy),
        Operator::IsNotTruthy => !value.is_some_and(is_truthy),
        Operator::IsNotUndefined => value.is_some(),
        Operator::Is(expected) => value.is_some_and(|v| scalar_eq(v, expected)),
        Operator::IsNot(expected) => !value.is_some_and(|v| scalar_eq(v, expected)),
        Operator::In(candidates) => {
            value.is_some_and(|v| candidates.iter().any(|c| scalar_eq(v, c)))
        }
    })
}
