use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, ErrorCode};
use serde_json::{Number, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::trace;

use super::{ResultSets, Row, SqlConnector, SqlError, SqlFuture, SqlSession};

/// SQLite driver. Statements run on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    /// A connector for the database file at `path` (created if missing).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SqlConnector for SqliteConnector {
    fn driver(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self) -> SqlFuture<'_, Arc<dyn SqlSession>> {
        let path = self.path.clone();
        Box::pin(async move {
            let connection = tokio::task::spawn_blocking(move || {
                let connection = Connection::open(&path)
                    .map_err(|e| SqlError::ConnectionLost(e.to_string()))?;
                connection
                    .execute_batch("PRAGMA foreign_keys = ON;")
                    .map_err(|e| SqlError::ConnectionLost(e.to_string()))?;
                Ok::<_, SqlError>(connection)
            })
            .await
            .map_err(|e| SqlError::ConnectionLost(e.to_string()))??;

            let session: Arc<dyn SqlSession> = Arc::new(SqliteSession {
                connection: Arc::new(Mutex::new(connection)),
            });
            Ok(session)
        })
    }
}

struct SqliteSession {
    connection: Arc<Mutex<Connection>>,
}

impl SqlSession for SqliteSession {
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> SqlFuture<'a, ResultSets> {
        let connection = Arc::clone(&self.connection);
        let sql = sql.to_string();
        let params: Vec<SqlValue> = args.iter().map(to_sql).collect();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let connection = connection.lock();
                run(&connection, &sql, params)
            })
            .await
            .map_err(|e| SqlError::Query(e.to_string()))?
        })
    }
}

fn run(connection: &Connection, sql: &str, params: Vec<SqlValue>) -> Result<ResultSets, SqlError> {
    trace!(%sql, "sqlite statement");
    let mut statement = connection.prepare(sql).map_err(classify)?;
    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = statement
        .query(rusqlite::params_from_iter(params))
        .map_err(classify)?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next().map_err(classify)? {
        let mut record = Row::new();
        for (index, column) in columns.iter().enumerate() {
            let value = row.get_ref(index).map_err(classify)?;
            record.insert(column.clone(), from_sql(value));
        }
        collected.push(record);
    }
    Ok(ResultSets::rows(collected))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

fn classify(error: rusqlite::Error) -> SqlError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, detail)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            let message = detail.clone().unwrap_or_else(|| error.to_string());
            let name = message
                .split_once("constraint failed: ")
                .map(|(_, name)| name.trim().to_string())
                .unwrap_or_else(|| message.clone());
            SqlError::Constraint { name, message }
        }
        _ => SqlError::Query(error.to_string()),
    }
}
