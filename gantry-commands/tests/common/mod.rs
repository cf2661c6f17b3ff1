//! Common test utilities for command integration tests.

#![allow(dead_code)]

use gantry_commands::sql::{
    Connections, MemoryDriver, QueryDefinition, ResultSet, ResultSets, Row, SqlConnection,
};
use gantry_commands::{CommandConfig, CommandFactory, CommandReturn};
use gantry_core::error::Result;
use gantry_core::inputs::{Inputs, Scope};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Query definitions used across the SQL tests.
pub fn order_queries() -> HashMap<String, QueryDefinition> {
    let definitions = json!({
        "create-order": {
            "query": "insert into orders (user_id, total) values (?1, ?2) returning id",
            "return": {
                "resultsets": [{"expect": "one-row"}],
                "failures": [{"constraint": "orders_user_id_fkey", "message": "no such user"}]
            }
        },
        "delete-user": {
            "query": "delete from users where id = ?1",
            "return": {
                "failures": [{"constraint": "orders_user_id_fkey", "message": "user has orders"}]
            }
        },
        "list-orders": {
            "query": "select id, total from orders where user_id = ?1",
            "return": {"resultsets": [{"expect": "multiple"}, {"expect": "one-row"}]}
        }
    });
    serde_json::from_value(definitions).unwrap()
}

/// A registry with one `main` connection over the given driver.
pub fn connections(driver: &MemoryDriver) -> Connections {
    Connections::new().with(SqlConnection::new(
        "main",
        Arc::new(driver.clone()),
        order_queries(),
    ))
}

/// Build a row from a JSON object literal.
pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

/// A single result set holding `rows`.
pub fn rows(rows: Vec<Value>) -> ResultSets {
    ResultSets::new(vec![ResultSet::Rows(rows.into_iter().map(row).collect())])
}

/// Run one command type against `connections` with no request in scope.
pub async fn run_command(
    factory: &CommandFactory,
    connections: &Connections,
    kind: &str,
    args: Value,
) -> Result<CommandReturn> {
    let inputs = Inputs::default();
    let config = CommandConfig {
        connections,
        inputs: &inputs,
        scope: Scope::empty(),
    };
    let command = factory.get(kind, config)?;
    command.run(args).await
}
