use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use gantry_core::error::{Exception, Result};

use crate::command::{Command, CommandFuture, CommandReturn, parse_args};
use crate::sql::{Connections, Expect, QueryDefinition, SqlError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SqlQueryArgs {
    connection: String,
    query_id: String,
    #[serde(default)]
    args: Vec<Value>,
}

/// `sql-query`: run a declared query on a named connection.
///
/// Each declared result set lands under `_N` in `data`; undeclared sets are
/// still read for failures. Constraint
/// failures listed in the query's failure table become user errors with the
/// declared message; any other failure is a system error.
pub struct SqlQueryCommand<'c> {
    connections: &'c Connections,
}

impl<'c> SqlQueryCommand<'c> {
    /// Create the command over a connection registry.
    pub fn new(connections: &'c Connections) -> Self {
        Self { connections }
    }

    async fn execute(&self, args: SqlQueryArgs) -> Result<Value> {
        let connection = self
            .connections
            .get(&args.connection)
            .ok_or_else(|| Exception::sql(format!("unknown connection [{}]", args.connection)))?;
        let definition = connection.get_query(&args.query_id).ok_or_else(|| {
            Exception::sql(format!(
                "unknown query [{}] on connection [{}]",
                args.query_id, args.connection
            ))
        })?;

        debug!(connection = %args.connection, query = %args.query_id, "running sql query");
        let sets = connection
            .query(&definition.query, &args.args)
            .await
            .map_err(|e| driver_failure(definition, &args.query_id, e))?;

        let mut data = Map::new();
        for (index, set) in sets.enumerate() {
            if let Some(constraint) = set.failed_constraint() {
                return Err(constraint_failure(definition, &args.query_id, constraint, ""));
            }
            let value = match definition.expectation(index) {
                Some(Expect::OneRow) => set.one_row(),
                Some(Expect::Multiple) => set.all_rows(),
                None => continue,
            };
            data.insert(format!("_{index}"), value);
        }
        Ok(Value::Object(data))
    }
}

fn constraint_failure(definition: &QueryDefinition, query_id: &str, name: &str, message: &str) -> Exception {
    match definition.failure_for(name, message) {
        Some(mapping) => Exception::user(mapping.message.clone())
            .with_detail(format!("query [{query_id}] violated constraint [{name}]")),
        None => {
            warn!(query = %query_id, constraint = %name, "unmapped constraint failure");
            Exception::sql(format!("unexpected result from query [{query_id}]: constraint [{name}]"))
        }
    }
}

fn driver_failure(definition: &QueryDefinition, query_id: &str, error: SqlError) -> Exception {
    match &error {
        SqlError::Constraint { name, message } => {
            constraint_failure(definition, query_id, name, message).wrap(error.clone())
        }
        SqlError::Query(message) | SqlError::ConnectionLost(message) => {
            match definition.failure_for("", message).filter(|f| !f.constraint.is_empty()) {
                Some(mapping) => Exception::user(mapping.message.clone()).wrap(error.clone()),
                None => Exception::sql(format!("sql error in query [{query_id}]")).wrap(error.clone()),
            }
        }
    }
}

impl Command for SqlQueryCommand<'_> {
    fn name(&self) -> &'static str {
        "sql-query"
    }

    fn run<'a>(&'a self, args: Value) -> CommandFuture<'a> {
        Box::pin(async move {
            let args: SqlQueryArgs = parse_args(self.name(), args)?;
            Ok(CommandReturn::with_data(self.execute(args).await?))
        })
    }
}
